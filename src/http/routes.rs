//! HTTP route definitions

use std::time::Duration;

use axum::{
    extract::State,
    http::{Method, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::Serialize;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::app::{AppState, StatusSnapshot};
use crate::util::time::uptime_secs;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // Read-only endpoints, open to any origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS]);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .layer(TimeoutLayer::new(Duration::from_secs(10)))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
    })
}

// ============================================================================
// Match status
// ============================================================================

async fn status_handler(State(state): State<AppState>) -> Result<Json<StatusSnapshot>, AppError> {
    state
        .status()
        .map(Json)
        .ok_or(AppError::NotReady)
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Simulation has not published a status yet")]
    NotReady,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::NotReady => StatusCode::SERVICE_UNAVAILABLE,
        };

        let body = serde_json::json!({
            "error": self.to_string()
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::game::MatchPhase;
    use crate::protocol::{MatchStatus, TeamScore};

    fn state() -> AppState {
        AppState::new(Config {
            server_addr: "127.0.0.1:0".parse().expect("addr"),
            log_level: "info".into(),
            json_logs: false,
            balance_path: None,
            seed: Some(1),
            sim_players: 0,
            bots_per_team: None,
        })
    }

    async fn get_json(router: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request"))
            .await
            .expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        (status, serde_json::from_slice(&bytes).expect("json"))
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (status, body) = get_json(build_router(state()), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn status_is_unavailable_before_first_tick() {
        let (status, body) = get_json(build_router(state()), "/status").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body["error"].is_string());
    }

    #[test]
    fn status_serves_the_published_snapshot() {
        let state = state();
        state.publish(StatusSnapshot {
            tick: 42,
            status: MatchStatus {
                phase: MatchPhase::Active,
                time_remaining_secs: 200,
                scores: vec![TeamScore {
                    team_id: 1,
                    name: "Blue Bandits".into(),
                    score: 7,
                }],
                players: 4,
                bots: 0,
                painted_cells: 7,
                clearing: false,
            },
        });
        let (status, body) = tokio_test::block_on(get_json(build_router(state), "/status"));
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tick"], 42);
        assert_eq!(body["phase"], "active");
        assert_eq!(body["scores"][0]["score"], 7);
    }
}
