//! WebSocket upgrade entrypoint for `/ws/audio`.

use axum::{
    extract::{ws::WebSocketUpgrade, State},
    response::Response,
};
use uuid::Uuid;

use crate::connection::handle_connection;
use crate::state::AppState;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let session_id = Uuid::new_v4().to_string();
    ws.on_upgrade(move |socket| async move {
        tracing::info!(session = %session_id, "connection opened");
        handle_connection(socket, state, session_id).await;
    })
}
