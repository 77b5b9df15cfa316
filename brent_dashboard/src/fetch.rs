//! One-shot retrieval of the dataset and model artifact
//!
//! Every resource is fetched with a single GET, without retry. Local paths
//! and `file://` URLs are read from disk so the service also runs offline.

use anyhow::{anyhow, bail, Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

const REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Remote(Url),
    Local(PathBuf),
}

/// Classify a configured location, rewriting Google Drive share links
pub fn resolve(location: &str) -> Result<Source> {
    let location = location.trim();
    if location.is_empty() {
        bail!("empty resource location");
    }

    match Url::parse(location) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(Source::Remote(normalize_drive_url(&url).unwrap_or(url))),
            "file" => url
                .to_file_path()
                .map(Source::Local)
                .map_err(|_| anyhow!("invalid file URL: {location}")),
            scheme => bail!("unsupported scheme '{scheme}' in {location}"),
        },
        Err(_) => Ok(Source::Local(PathBuf::from(location))),
    }
}

/// Direct download form of a Google Drive share link
///
/// Handles `/file/d/<id>/view` and `/open?id=<id>`; any other URL yields
/// `None` and is used as is.
pub fn normalize_drive_url(url: &Url) -> Option<Url> {
    if url.host_str() != Some("drive.google.com") {
        return None;
    }

    let segments: Vec<&str> = url.path_segments()?.collect();
    let id = match segments.as_slice() {
        ["file", "d", id, ..] => (*id).to_string(),
        ["open"] => url
            .query_pairs()
            .find(|(key, _)| key == "id")
            .map(|(_, value)| value.into_owned())?,
        _ => return None,
    };
    if id.is_empty() {
        return None;
    }

    Url::parse_with_params(
        "https://drive.google.com/uc",
        &[("export", "download"), ("id", id.as_str())],
    )
    .ok()
}

/// Whether a body is an HTML page rather than the expected file
pub fn looks_like_html(bytes: &[u8]) -> bool {
    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(512)]);
    let head = head
        .trim_start_matches('\u{feff}')
        .trim_start()
        .to_ascii_lowercase();
    head.starts_with("<!doctype html") || head.starts_with("<html")
}

#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
}

impl Fetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client })
    }

    pub async fn fetch(&self, location: &str) -> Result<Vec<u8>> {
        let bytes = match resolve(location)? {
            Source::Local(path) => tokio::fs::read(&path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?,
            Source::Remote(url) => {
                tracing::info!(url = %url, "downloading");
                let resp = self
                    .client
                    .get(url.clone())
                    .send()
                    .await
                    .with_context(|| format!("GET {url} failed"))?;

                let status = resp.status();
                if !status.is_success() {
                    bail!("GET {url} failed: {status}");
                }
                resp.bytes()
                    .await
                    .with_context(|| format!("failed to read body of {url}"))?
                    .to_vec()
            }
        };

        if bytes.is_empty() {
            bail!("{location} is empty");
        }
        if looks_like_html(&bytes) {
            bail!("{location} returned an HTML page instead of a data file");
        }

        tracing::debug!(location, bytes = bytes.len(), "fetched resource");
        Ok(bytes)
    }
}

/// Write `bytes` to `path`, creating parent directories
pub async fn write_cache(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    tokio::fs::write(path, bytes)
        .await
        .with_context(|| format!("failed to write {}", path.display()))
}
