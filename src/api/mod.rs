//! Host-process HTTP layer: health, status and latest snapshots.

pub mod handlers;

use axum::Router;

use crate::app_state::AppState;

/// Builds the complete router of the host process.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .merge(handlers::system::routes())
        .nest("/snapshots", handlers::snapshots::routes())
}
