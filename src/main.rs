use std::sync::Arc;

use anyhow::Context;

use nips_chat::core::config::AppPaths;
use nips_chat::core::logging;
use nips_chat::server;
use nips_chat::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let paths = Arc::new(AppPaths::new(None));
    logging::init(&paths.log_dir, "info");

    let state = AppState::initialize(paths)
        .await
        .context("Failed to initialize nips-chat")?;

    server::serve(state).await
}
