//! Route table

use super::handlers;
use super::state::ServerContext;
use axum::routing::post;
use axum::Router;
use tower_http::trace::TraceLayer;

/// Build the command router
pub fn create_router(ctx: ServerContext) -> Router {
    Router::new()
        .route("/steering/:value", post(handlers::steering))
        .route("/speed/:value", post(handlers::speed))
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
