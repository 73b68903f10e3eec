//! Weft server binary: loads configuration and flow definitions, then
//! serves the flow controller.

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use weft_core::FlowExecutionManager;
use weft_server::{api, load_flows_from_dir, ServerConfig};
use weft_state_inmemory::{InMemoryExecutionRepository, InMemoryFlowCatalog};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.log_filter)?)
        .init();

    let catalog = Arc::new(InMemoryFlowCatalog::new());
    if let Some(flow_dir) = &config.flow_dir {
        load_flows_from_dir(flow_dir, &catalog)?;
    }

    let manager = FlowExecutionManager::new(
        catalog,
        Arc::new(InMemoryExecutionRepository::new()),
    );
    let app = api::router(api::AppState {
        manager: Arc::new(manager),
    });

    let addr = config.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "weft server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
