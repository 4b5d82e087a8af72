use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handler::{self, AppState};

/// Room for multipart boundaries and part headers on top of the payload.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Build the axum router with all kvdrop endpoints.
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes.saturating_add(FORM_OVERHEAD_BYTES);
    Router::new()
        .route("/", get(handler::index_handler).put(handler::store_handler))
        .route("/:id", get(handler::fetch_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
