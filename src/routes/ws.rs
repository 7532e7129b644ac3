//! WebSocket upgrade + message loop. Each client message is parsed as JSON and
//! forwarded to core logic. We reply with a single JSON message per request.
//!
//! Messages are handled one at a time per socket, so a client's questions
//! reach the oracle in the order they were sent.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{info, error, instrument, debug};

use crate::error::AppError;
use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::protocol::to_out;
use crate::logic::*;
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "haigui_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "haigui_backend", "WebSocket connected");
  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target: "haigui_backend", "WS received: {:?}", &incoming);
            handle_client_ws(incoming, &state).await
          }
          Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
        };

        let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "haigui_backend", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "haigui_backend", "WebSocket disconnected");
}

fn ws_error(e: AppError) -> ServerWsMessage {
  ServerWsMessage::Error { message: e.user_message() }
}

#[instrument(level = "info", skip(state))]
pub(crate) async fn handle_client_ws(msg: ClientWsMessage, state: &AppState) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::NewGame => match start_game(state).await {
      Ok(game) => {
        info!(target: "puzzle", id = %game.id, scenario = %game.scenario, "WS new_game served");
        ServerWsMessage::Game { game: to_out(&game) }
      }
      Err(e) => ws_error(e),
    },

    ClientWsMessage::Ask { game_id, question } => match ask_in_game(state, &game_id, &question).await {
      Ok(result) => {
        info!(target: "oracle", id = %game_id, verdict = ?result.verdict, "WS ask answered");
        ServerWsMessage::Answer { game_id, result }
      }
      Err(e) => ws_error(e),
    },

    ClientWsMessage::Reveal { game_id } => match reveal(state, &game_id).await {
      Ok(reveal) => ServerWsMessage::Reveal { game_id, reveal },
      Err(e) => ws_error(e),
    },
  }
}
