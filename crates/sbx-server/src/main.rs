use std::sync::Arc;

use clap::Parser;
use log::info;
use sbx_container::BollardRuntime;
use sbx_server::{AppState, Config};
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    env_logger::Builder::new().filter_level(config.log_level).init();
    tracing_log::LogTracer::init().expect("LogTracer installs once, before any tracing event fires");

    let runtime = Arc::new(
        BollardRuntime::connect().map_err(|e| anyhow::anyhow!("failed to connect to container runtime: {e}"))?,
    );
    let state = Arc::new(AppState::new(&config, runtime)?);

    let app = sbx_server::routes::router()
        .layer(TraceLayer::new_for_http())
        .with_state(state);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("sandboxed execution engine listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
