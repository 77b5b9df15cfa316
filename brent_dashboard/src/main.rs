use anyhow::Result;
use brent_dashboard::config::Config;
use brent_dashboard::fetch::Fetcher;
use brent_dashboard::{loader, server, state};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    brent_dashboard::init_tracing(&config.log_level);

    let port = config.http_port;

    tracing::info!(
        dataset = %config.dataset_url,
        model = config.model_url.as_deref().unwrap_or("fit locally"),
        port,
        "brent dashboard starting"
    );

    let fetcher = Fetcher::new()?;
    let app_state = state::AppState::new(config);

    // The page is served while the first load runs; API calls answer 503 until then.
    tokio::spawn(loader::reload(app_state.clone(), fetcher));

    let router = server::build_router(app_state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    tracing::info!("HTTP server listening on 0.0.0.0:{port}");
    tracing::info!("open http://localhost:{port} in your browser");

    axum::serve(listener, router).await?;

    Ok(())
}
