use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use sparts_protocol::endpoints;
use tower_http::trace::TraceLayer;

use crate::handler::{self, AppState};

/// Build the axum router serving the validator REST surface.
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_batch_bytes;
    Router::new()
        .route(endpoints::STATE, get(handler::list_state))
        .route("/state/:address", get(handler::get_state))
        .route(endpoints::BLOCKS, get(handler::list_blocks))
        .route("/blocks/:block_num", get(handler::get_block))
        .route(endpoints::BATCHES, post(handler::submit_batches))
        .route(endpoints::BATCH_STATUSES, get(handler::batch_statuses))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
