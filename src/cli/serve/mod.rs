//! Serve command - runs the HTTP API

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

use crate::api::{create_router, AppState};
use crate::config::AppConfig;
use crate::domain::vector_store::VectorStore;
use crate::domain::DomainError;
use crate::{build_pipeline, build_services};

pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let services = build_services(&config)?;
    log_vector_count(services.store.as_ref()).await;

    let state = AppState::new(Arc::new(build_pipeline(&config, &services)));
    let app = create_router(state, &config.server.cors_origins);

    let addr = build_socket_addr(&config)?;
    info!(%addr, model = %config.llm.model, "Starting NovaPay Docs Q&A API");

    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("API server shutdown complete");
    Ok(())
}

async fn log_vector_count(store: &dyn VectorStore) {
    match store.count().await {
        Ok(count) => info!(collection = %store.collection(), vectors = count, "Vector store loaded"),
        Err(e @ DomainError::VectorStoreNotFound { .. }) => warn!("{}", e),
        Err(e) => warn!(error = %e, "Could not read vector store"),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}

fn build_socket_addr(config: &AppConfig) -> anyhow::Result<SocketAddr> {
    Ok(SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        config.server.port,
    )))
}
