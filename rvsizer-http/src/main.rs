use std::net::SocketAddr;
use std::sync::Arc;

use rvsizer_core::{SizerConfig, SizingEngine};
use rvsizer_http::{app, AppState};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = SizerConfig::from_env()?;
    let engine = Arc::new(SizingEngine::new(cfg.build_recommender()?));

    let addr: SocketAddr = std::env::var("RVSIZER_HTTP_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:7000".into())
        .parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "rvsizer HTTP server listening");
    axum::serve(listener, app(AppState { engine })).await?;

    Ok(())
}
