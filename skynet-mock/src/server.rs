/// Axum HTTP server setup and routing

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::*;
use crate::state::PortalState;

pub fn create_router(state: Arc<PortalState>) -> Router {
    // Browser clients upload from other origins
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(health_check))

        // Registry endpoints
        .route(
            "/skynet/registry",
            get(get_registry_entry).post(set_registry_entry),
        )

        // Skyfile endpoints
        .route("/skynet/skyfile", post(upload_skyfile))
        .route("/:skylink", get(download_skyfile))

        // Shared state
        .with_state(state)

        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn run_server(state: Arc<PortalState>, host: String, port: u16) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    log::info!("🚀 Skynet mock portal listening on http://{}", addr);
    log::info!("📒 Registry: GET/POST /skynet/registry");
    log::info!("📦 Skyfiles: POST /skynet/skyfile, GET /<skylink>");

    axum::serve(listener, app).await?;

    Ok(())
}

/// A portal running in the background of the current runtime
pub struct MockPortal {
    pub addr: SocketAddr,
    pub state: Arc<PortalState>,
    handle: JoinHandle<()>,
}

impl MockPortal {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for MockPortal {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Start a fresh portal on an ephemeral localhost port
pub async fn spawn_ephemeral() -> anyhow::Result<MockPortal> {
    let state = Arc::new(PortalState::new());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = create_router(state.clone());

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            log::error!("Mock portal stopped: {}", e);
        }
    });
    log::debug!("Mock portal on http://{}", addr);

    Ok(MockPortal {
        addr,
        state,
        handle,
    })
}
