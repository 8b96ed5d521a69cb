//! Latest snapshot endpoints, served read-only from the data directory.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::Value;

use crate::app_state::AppState;
use crate::domain::SnapshotKind;
use crate::error::ApiError;

async fn load(state: &AppState, kind: SnapshotKind) -> Result<Json<Value>, ApiError> {
    let files = state.snapshots.as_ref().ok_or(ApiError::NoDataDir)?;
    match files.load(kind).await {
        Ok(Some(doc)) => Ok(Json(doc)),
        Ok(None) => Err(ApiError::SnapshotNotFound(kind)),
        Err(e) => {
            tracing::warn!(%kind, error = %e, "snapshot file unreadable");
            Err(ApiError::SnapshotUnreadable(e.to_string()))
        }
    }
}

/// `GET /snapshots/timings`: Last accepted timings document.
///
/// # Errors
///
/// Returns [`ApiError`] when no data directory is configured or the
/// snapshot is missing or unreadable.
pub async fn timings_handler(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    load(&state, SnapshotKind::Timings).await
}

/// `GET /snapshots/matches`: Last accepted matches document.
///
/// # Errors
///
/// Returns [`ApiError`] when no data directory is configured or the
/// snapshot is missing or unreadable.
pub async fn matches_handler(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    load(&state, SnapshotKind::Matches).await
}

/// Snapshot routes, nested under `/snapshots`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/timings", get(timings_handler))
        .route("/matches", get(matches_handler))
}
