//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs parameters and basic result info.

use std::sync::Arc;
use axum::{extract::{State, Query}, Json, response::IntoResponse};
use tracing::{info, instrument};

use crate::error::AppError;
use crate::logic::*;
use crate::protocol::*;
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut { ok: true, llm: state.llm.is_some(), games: state.game_count().await })
}

#[instrument(level = "info", skip(state))]
pub async fn http_new_game(State(state): State<Arc<AppState>>) -> Result<Json<GameOut>, AppError> {
  let game = start_game(&state).await?;
  info!(target: "puzzle", id = %game.id, scenario = %game.scenario, "HTTP game served");
  Ok(Json(to_out(&game)))
}

#[instrument(level = "info", skip(state, body), fields(%body.game_id, question_len = body.question.len()))]
pub async fn http_post_ask(
  State(state): State<Arc<AppState>>,
  Json(body): Json<AskIn>,
) -> Result<Json<AskOut>, AppError> {
  let out = ask_in_game(&state, &body.game_id, &body.question).await?;
  info!(target: "oracle", id = %body.game_id, verdict = ?out.verdict, "HTTP ask answered");
  Ok(Json(out))
}

#[instrument(level = "info", skip(state, body), fields(%body.game_id))]
pub async fn http_post_reveal(
  State(state): State<Arc<AppState>>,
  Json(body): Json<GameRef>,
) -> Result<Json<RevealOut>, AppError> {
  Ok(Json(reveal(&state, &body.game_id).await?))
}

#[instrument(level = "info", skip(state), fields(%q.game_id))]
pub async fn http_get_history(
  State(state): State<Arc<AppState>>,
  Query(q): Query<GameRef>,
) -> Result<Json<HistoryOut>, AppError> {
  let turns = history(&state, &q.game_id).await?;
  Ok(Json(HistoryOut { turns }))
}

#[instrument(level = "info", skip(state, body), fields(history = body.history.len()))]
pub async fn http_post_oracle(
  State(state): State<Arc<AppState>>,
  Json(body): Json<OracleIn>,
) -> Result<Json<AskOut>, AppError> {
  let out = ask_stateless(&state, body).await?;
  info!(target: "oracle", verdict = ?out.verdict, "HTTP stateless oracle answered");
  Ok(Json(out))
}
