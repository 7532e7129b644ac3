//! Haigui · Turtle Soup Backend
//!
//! - Axum HTTP + WebSocket API for lateral-thinking ("turtle soup") puzzles
//! - DeepSeek (or any OpenAI-compatible) chat API generates puzzles and answers questions
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT                  : u16 (default 3000)
//!   DEEPSEEK_API_KEY      : enables the LLM; game endpoints answer 503 without it
//!   DEEPSEEK_BASE_URL     : default "https://api.deepseek.com/v1"
//!   DEEPSEEK_MODEL        : default "deepseek-chat"
//!   DEEPSEEK_TIMEOUT_SECS : request timeout, default 60
//!   GAME_CONFIG_PATH      : path to TOML config (prompts, sampling, scenarios, max_sessions)
//!   LOG_LEVEL             : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT            : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod error;
mod config;
mod state;
mod protocol;
mod deepseek;
mod generator;
mod oracle;
mod logic;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;

use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Shared application state (session store, DeepSeek client, game config).
  let state = Arc::new(AppState::new());

  let app = build_router(state.clone());

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "haigui_backend", %addr, scenarios = state.config.scenarios.len(), "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  info!(target: "haigui_backend", "Server stopped");
  Ok(())
}

/// Resolves on Ctrl-C; in-flight requests finish before the process exits.
async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "haigui_backend", error = %e, "Failed to install Ctrl-C handler");
    std::future::pending::<()>().await;
  }
  info!(target: "haigui_backend", "Shutdown signal received");
}
