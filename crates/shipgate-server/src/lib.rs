pub mod adapters;
pub mod channel;
pub mod error;
pub mod routes;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Build the axum Router with all API routes and middleware.
/// Used by `serve()` and available for integration testing.
pub fn build_router(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Chat
        .route("/api/messages", post(routes::messages::post_message))
        .route(
            "/api/interactions",
            post(routes::interactions::post_interaction),
        )
        // Build server
        .route("/api/callback", post(routes::callback::build_callback))
        // Audit
        .route("/api/history/{app}", get(routes::history::get_history))
        // Approvals
        .route("/api/approvals", get(routes::approvals::list_approvals))
        .route("/api/approvals/{id}", get(routes::approvals::get_approval))
        .route("/health", get(routes::health::health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// Start the shipgate server on `0.0.0.0:{port}`.
pub async fn serve(app_state: AppState, port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    serve_on(app_state, listener).await
}

/// Start the shipgate server on a pre-bound listener.
///
/// Lets the caller read the actual port first (useful with `port = 0`).
pub async fn serve_on(app_state: AppState, listener: tokio::net::TcpListener) -> anyhow::Result<()> {
    let actual_port = listener.local_addr()?.port();
    let app = build_router(app_state);

    tracing::info!("shipgate listening on http://localhost:{actual_port}");

    axum::serve(listener, app).await?;
    Ok(())
}
