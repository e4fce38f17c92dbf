//! Axum router construction.

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer, trace::TraceLayer};

use super::{handlers, state::AppState};

/// Build the application [`Router`] with all routes and middleware attached.
pub fn build(state: AppState) -> Router {
    let timeout = state.request_timeout;
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/v1/users/:user_id/credentials",
            get(handlers::list_credentials),
        )
        .route(
            "/v1/users/:user_id/credentials/:provider",
            put(handlers::upsert_credential)
                .get(handlers::get_credential)
                .delete(handlers::delete_credential),
        )
        .route(
            "/v1/users/:user_id/credentials/:provider/validate",
            post(handlers::validate_credential),
        )
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(timeout))
        .layer(CompressionLayer::new())
        .with_state(state)
}
