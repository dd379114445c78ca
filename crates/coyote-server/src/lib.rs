pub mod error;
pub mod routes;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use coyote_core::ShockService;
use std::future::Future;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the axum Router with all API routes and middleware.
/// Used by `serve_on()` and available for integration testing.
pub fn build_router(service: Arc<ShockService>) -> Router {
    let app_state = state::AppState::new(service);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/shock", post(routes::shock::submit_shock))
        .route("/status", get(routes::status::get_status))
        .route("/events", get(routes::events::sse_events))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

/// Serve the API on an already-bound listener until `shutdown` resolves.
///
/// Taking the listener lets the caller bind port 0 and read the real port
/// first. The service itself is left running; shutting it down is the
/// caller's job.
pub async fn serve_on<F>(
    service: Arc<ShockService>,
    listener: tokio::net::TcpListener,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let port = listener.local_addr()?.port();
    let app = build_router(service);

    tracing::info!("shock API listening on http://localhost:{port}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
