pub mod handlers;
pub mod router;

use std::env;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;

use crate::core::config::ServerConfig;
use crate::state::AppState;

pub use router::router;

/// `host:port` from config; a numeric `PORT` env var overrides the port.
pub fn bind_address(config: &ServerConfig) -> String {
    let port = env::var("PORT")
        .ok()
        .and_then(|val| val.trim().parse::<u16>().ok())
        .unwrap_or(config.port);
    format!("{}:{}", config.host, port)
}

/// Binds and serves until the process is stopped.
pub async fn serve(state: Arc<AppState>) -> anyhow::Result<()> {
    let bind_addr = bind_address(&state.config.server);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;

    tracing::info!(
        "Serving {} records via {} on http://{}",
        state.qa.record_count(),
        state.qa.provider_name(),
        addr
    );

    axum::serve(listener, router(state))
        .await
        .context("Server error")?;
    Ok(())
}
