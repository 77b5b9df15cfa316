use brent_dashboard::config::{parse_arima_order, Config};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::collections::HashMap;
use std::path::PathBuf;

fn config_from(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Config::from_lookup(|key| vars.get(key).cloned())
}

#[test]
fn defaults_without_environment() {
    let config = config_from(&[]).unwrap();

    assert_eq!(config.dataset_url, "data/brent.csv");
    assert_eq!(config.model_url, None);
    assert_eq!(config.model_cache_path, PathBuf::from("brent_model.json"));
    assert_eq!(config.http_port, 8501);
    assert_eq!(config.log_level, "info");
    assert_eq!(config.default_periods, 30);
    assert_eq!(config.max_periods, 3650);
    assert_eq!(config.rolling_window, 30);
    assert_eq!(config.histogram_bins, 30);
    assert_eq!(config.holdout_ratio, 0.1);
    assert_eq!(config.arima_order, (5, 1, 0));
    assert_eq!(config.interval_width, 0.8);
    assert_eq!(config.uncertainty_samples, 1000);
}

#[test]
fn overrides_are_applied() {
    let config = config_from(&[
        ("DATASET_URL", "https://example.com/brent.csv"),
        ("MODEL_URL", "https://example.com/model.json"),
        ("HTTP_PORT", "9000"),
        ("DEFAULT_PERIODS", "90"),
        ("ARIMA_ORDER", " 2, 1, 1 "),
        ("PAGE_TITLE", "Oil"),
    ])
    .unwrap();

    assert_eq!(config.dataset_url, "https://example.com/brent.csv");
    assert_eq!(
        config.model_url.as_deref(),
        Some("https://example.com/model.json")
    );
    assert_eq!(config.http_port, 9000);
    assert_eq!(config.default_periods, 90);
    assert_eq!(config.arima_order, (2, 1, 1));
    assert_eq!(config.page_title, "Oil");
}

#[test]
fn blank_values_fall_back_to_defaults() {
    let config = config_from(&[("MODEL_URL", "  "), ("HTTP_PORT", "")]).unwrap();

    assert_eq!(config.model_url, None);
    assert_eq!(config.http_port, 8501);
}

#[rstest]
#[case("HTTP_PORT", "not-a-port")]
#[case("MAX_PERIODS", "0")]
#[case("DEFAULT_PERIODS", "0")]
#[case("DEFAULT_PERIODS", "5000")]
#[case("ROLLING_WINDOW", "0")]
#[case("HISTOGRAM_BINS", "0")]
#[case("HOLDOUT_RATIO", "1.5")]
#[case("INTERVAL_WIDTH", "0")]
#[case("UNCERTAINTY_SAMPLES", "-1")]
#[case("ARIMA_ORDER", "5,1")]
fn invalid_values_are_rejected(#[case] key: &str, #[case] value: &str) {
    let result = config_from(&[(key, value)]);
    assert!(result.is_err(), "{key}={value} should be rejected");
}

#[test]
fn arima_order_parsing() {
    assert_eq!(parse_arima_order("5,1,0").unwrap(), (5, 1, 0));
    assert!(parse_arima_order("a,b,c").is_err());
    assert!(parse_arima_order("1,2,3,4").is_err());
}
