//! HTTP and WebSocket router assembly.

use axum::{http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::metrics::metrics_handler;
use crate::state::AppState;
use crate::websocket::ws_handler;

pub fn create_router(state: AppState, metrics_handle: PrometheusHandle) -> Router {
    let ws_path = state.settings.server.ws_path.clone();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let metrics_router = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(health_check))
        .route(&ws_path, get(ws_handler))
        .with_state(state)
        .merge(metrics_router)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

async fn health_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> impl IntoResponse {
    let llama_running = state.llm_supervisor.is_running().await;
    let llama_healthy = if llama_running {
        state.llm_supervisor.health_check().await
    } else {
        false
    };

    let status = if llama_running && llama_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(serde_json::json!({
            "status": if status == StatusCode::OK { "ok" } else { "degraded" },
            "llama_running": llama_running,
            "llama_healthy": llama_healthy,
        })),
    )
}
