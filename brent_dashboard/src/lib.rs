//! # Brent Dashboard
//!
//! HTTP service around `price_forecast`: downloads the price dataset and the
//! model artifact, serves the descriptive dashboard and forecasts on demand.

pub mod config;
pub mod fetch;
pub mod forecast;
pub mod loader;
pub mod server;
pub mod state;
pub mod web;

/// Install the global `tracing` subscriber; `RUST_LOG` wins over `level`
pub fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| level.parse().unwrap_or_default()),
        )
        .with_target(false)
        .init();
}
