// Plain HTTP routes next to the WebSocket endpoint.

use crate::interface_adapters::protocol::GameStateDto;
use crate::interface_adapters::state::AppState;
use axum::{Json, extract::State};
use std::sync::Arc;

/// Current round snapshot, same shape as the `game_state` join ack.
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Json<GameStateDto> {
    let summary = *state.round_tx.borrow();
    Json(GameStateDto::from(summary))
}
