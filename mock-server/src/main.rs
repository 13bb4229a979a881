use std::time::Duration;

use anyhow::Context;
use mock_server::MockOptions;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    let latency_ms = match std::env::var("MOCK_LATENCY_MS") {
        Ok(v) => v
            .parse::<u64>()
            .with_context(|| format!("MOCK_LATENCY_MS is not a number: '{v}'"))?,
        Err(_) => 0,
    };
    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, latency_ms, "mock analytics server listening");

    let options = MockOptions {
        latency: Duration::from_millis(latency_ms),
    };
    mock_server::run_with(listener, options).await?;
    Ok(())
}
