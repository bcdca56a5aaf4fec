use std::sync::Arc;

use static_serve::config::{AppState, Config};
use static_serve::{logger, server, static_cache};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = Config::load()?;
    logger::init(&cfg.logging)?;

    // Worker threads default to the number of CPU cores
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<(), Box<dyn std::error::Error>> {
    let state = Arc::new(AppState::new(cfg));

    let files = &state.config.static_files;
    static_cache::load(
        &state.cache,
        &files.directory,
        &files.default_document,
        &files.default_headers,
    )
    .await;

    server::run(state).await?;
    tracing::info!("Server exited");
    Ok(())
}
