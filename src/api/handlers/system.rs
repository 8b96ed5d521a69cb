//! System endpoints: health check and poller status.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::app_state::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
}

/// Poller status response.
#[derive(Debug, Serialize)]
struct StatusResponse {
    poller: &'static str,
    data_dir: Option<String>,
}

/// `GET /health`: Service health status.
pub async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// `GET /status`: Whether the background poller is still running.
pub async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let poller = if state.poller_running() {
        "running"
    } else {
        "stopped"
    };
    let data_dir = state
        .snapshots
        .as_ref()
        .map(|s| s.dir().display().to_string());
    (StatusCode::OK, Json(StatusResponse { poller, data_dir }))
}

/// System routes mounted at the root level.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use crate::poller::Liveness;
    use serde_json::Value;
    use tower::ServiceExt;

    async fn get_json(state: AppState, uri: &str) -> (StatusCode, Value) {
        let Ok(request) = Request::builder().uri(uri).body(Body::empty()) else {
            panic!("request build failed");
        };
        let Ok(response) = routes().with_state(state).oneshot(request).await else {
            panic!("router failed");
        };
        let status = response.status();
        let Ok(bytes) = to_bytes(response.into_body(), usize::MAX).await else {
            panic!("body read failed");
        };
        (status, serde_json::from_slice(&bytes).unwrap_or_default())
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let state = AppState {
            snapshots: None,
            poller: Liveness::fixed(true),
        };
        let (status, body) = get_json(state, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.get("status").and_then(Value::as_str), Some("ok"));
        assert!(body.get("version").is_some());
    }

    #[tokio::test]
    async fn status_tracks_poller_task() {
        let running = AppState {
            snapshots: None,
            poller: Liveness::fixed(true),
        };
        let (_, body) = get_json(running, "/status").await;
        assert_eq!(body.get("poller").and_then(Value::as_str), Some("running"));

        let stopped = AppState {
            snapshots: None,
            poller: Liveness::fixed(false),
        };
        let (_, body) = get_json(stopped, "/status").await;
        assert_eq!(body.get("poller").and_then(Value::as_str), Some("stopped"));
    }
}
