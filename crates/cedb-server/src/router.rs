use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handler;
use crate::state::AppState;

/// Build the axum router.
///
/// Every request goes through one fallback so that unknown paths and
/// methods are answered (and audited) by the same code as known ones.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .fallback(handler::dispatch)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
