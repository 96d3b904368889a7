//! Watch2Give API: per-agent endpoints, full pipeline runs and the dashboard
//! read side.
pub mod error;
pub mod handlers;
pub mod logging;
pub mod metrics;
pub mod middleware;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

pub use error::ApiError;
pub use state::AppState;

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/agent/give-router", post(handlers::give_router))
        .route("/agent/photo-validator", post(handlers::photo_validator))
        .route("/agent/vault-decider", post(handlers::vault_decider))
        .route("/agent/reward", post(handlers::reward))
        .route("/pipeline/run", post(handlers::run_pipeline))
        .route("/dashboard/results", get(handlers::results))
        .route("/dashboard/summary", get(handlers::summary))
        .route("/dashboard/activity", get(handlers::activity))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .layer(axum::middleware::from_fn(middleware::log_requests))
        .layer(middleware::cors())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(addr: &str, state: AppState) -> anyhow::Result<()> {
    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Watch2Give API listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
