//! HTTP route definitions

use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::Serialize;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::info;

use crate::app::AppState;
use crate::game::RoomSummary;
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(state.config.client_origin.as_deref());

    let mut router = Router::new()
        .route("/health", get(health_handler))
        .route("/rooms", get(rooms_handler))
        .route("/rooms/:name", get(room_handler))
        .route("/game_ws", get(ws_handler));

    if let Some(dir) = &state.config.static_dir {
        info!(dir = %dir.display(), "Serving static files");
        router = router.fallback_service(ServeDir::new(dir));
    }

    router
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Allow the configured origins (comma separated), anyone when unset
fn cors_layer(origins: Option<&str>) -> CorsLayer {
    let Some(origins) = origins else {
        return CorsLayer::permissive();
    };
    let allowed: Vec<HeaderValue> = origins
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    rooms: usize,
    players: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        rooms: state.rooms.room_count(),
        players: state.rooms.total_players(),
    })
}

// ============================================================================
// Room listing
// ============================================================================

async fn rooms_handler(State(state): State<AppState>) -> Json<Vec<RoomSummary>> {
    Json(state.rooms.summaries())
}

async fn room_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<RoomSummary>, AppError> {
    let room = state
        .rooms
        .get(&name)
        .ok_or_else(|| AppError::NotFound(format!("room '{name}'")))?;

    Ok(Json(RoomSummary {
        name: room.name.clone(),
        players: room.session_count(),
        stuffs: room.stuff_count(),
    }))
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
        };
        let body = serde_json::json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, RoomConfig};
    use crate::game::room::DEFAULT_ROOM;

    fn state() -> AppState {
        let config = Config {
            server_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "info".to_string(),
            log_json: false,
            client_origin: None,
            static_dir: None,
            rooms: RoomConfig {
                initial_stuffs: 3,
                ..RoomConfig::default()
            },
        };
        AppState::new(config)
    }

    #[tokio::test(start_paused = true)]
    async fn test_health_counts_default_room() {
        let Json(health) = health_handler(State(state())).await;
        assert_eq!(health.status, "ok");
        assert_eq!(health.rooms, 1);
        assert_eq!(health.players, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_room_listing() {
        let state = state();
        state.rooms.select(Some("arena"));

        let Json(rooms) = rooms_handler(State(state.clone())).await;
        let names: Vec<&str> = rooms.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["arena", DEFAULT_ROOM]);
        assert!(rooms.iter().all(|r| r.stuffs == 3));

        let Json(room) = room_handler(State(state.clone()), Path("arena".to_string()))
            .await
            .unwrap();
        assert_eq!(room.name, "arena");

        let missing = room_handler(State(state), Path("nowhere".to_string())).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_app_error_status() {
        let response = AppError::BadRequest("no name".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let response = AppError::NotFound("room".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test(start_paused = true)]
    async fn test_router_builds_with_static_dir() {
        let mut state = state();
        let mut config = (*state.config).clone();
        config.static_dir = Some(std::env::temp_dir());
        config.client_origin = Some("http://localhost:3000, http://example.com".to_string());
        state.config = std::sync::Arc::new(config);
        let _router = build_router(state);
    }
}
