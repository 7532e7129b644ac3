//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Starting a game (puzzle generation + session insert)
//!   - Answering a question within a game (history kept server-side)
//!   - Revealing the solution / reading the history
//!   - A stateless oracle call where the client owns the history

use tracing::{error, info, instrument};

use crate::deepseek::DeepSeek;
use crate::domain::{ChatTurn, Game, Puzzle, Role};
use crate::error::AppError;
use crate::generator::generate_puzzle;
use crate::oracle::{ask_question, sanitize_history};
use crate::protocol::{AskOut, OracleIn, RevealOut};
use crate::state::AppState;

fn llm(state: &AppState) -> Result<&DeepSeek, AppError> {
  state.llm.as_ref().ok_or(AppError::LlmDisabled)
}

#[instrument(level = "info", skip(state))]
pub async fn start_game(state: &AppState) -> Result<Game, AppError> {
  let client = llm(state)?;
  let generated = generate_puzzle(client, &state.config).await.inspect_err(|e| {
    error!(target: "puzzle", error = %e, "New game failed");
  })?;
  let game = state.create_game(generated).await;
  info!(target: "puzzle", id = %game.id, scenario = %game.scenario, "Game started");
  Ok(game)
}

/// Answer a question in a running game. The game stays locked for the whole
/// call so concurrent questions of one game are answered in arrival order.
#[instrument(level = "info", skip(state, question), fields(%game_id, question_len = question.len()))]
pub async fn ask_in_game(state: &AppState, game_id: &str, question: &str) -> Result<AskOut, AppError> {
  let client = llm(state)?;
  let handle = state
    .get_game(game_id)
    .await
    .ok_or_else(|| AppError::GameNotFound(game_id.to_string()))?;
  let mut game = handle.lock().await;

  let result = ask_question(client, &state.config, &game.puzzle, &game.history, question)
    .await
    .inspect_err(|e| error!(target: "oracle", %game_id, error = %e, "Question failed"))?;

  game.history.push(ChatTurn::user(question.trim()));
  game.history.push(ChatTurn::assistant(result.answer_text.clone()));
  if result.is_fully_correct {
    game.solved = true;
    info!(target: "puzzle", %game_id, questions = game.questions_asked(), "Puzzle solved");
  }

  let solution = game.solved.then(|| game.puzzle.solution.clone());
  Ok(AskOut::from_result(result, solution, game.questions_asked()))
}

#[instrument(level = "info", skip(state), fields(%game_id))]
pub async fn reveal(state: &AppState, game_id: &str) -> Result<RevealOut, AppError> {
  let handle = state
    .get_game(game_id)
    .await
    .ok_or_else(|| AppError::GameNotFound(game_id.to_string()))?;
  let mut game = handle.lock().await;
  game.solved = true;
  info!(target: "puzzle", %game_id, questions = game.questions_asked(), "Solution revealed");
  Ok(RevealOut {
    solution: game.puzzle.solution.clone(),
    conditions: game.puzzle.conditions.clone(),
  })
}

pub async fn history(state: &AppState, game_id: &str) -> Result<Vec<ChatTurn>, AppError> {
  let handle = state
    .get_game(game_id)
    .await
    .ok_or_else(|| AppError::GameNotFound(game_id.to_string()))?;
  let game = handle.lock().await;
  Ok(game.history.clone())
}

#[instrument(level = "info", skip(state, body), fields(history = body.history.len(), question_len = body.question.len()))]
pub async fn ask_stateless(state: &AppState, body: OracleIn) -> Result<AskOut, AppError> {
  let client = llm(state)?;
  let puzzle = Puzzle {
    text: body.puzzle,
    solution: body.solution,
    conditions: body.conditions,
  };
  let history = sanitize_history(&body.history);
  let result = ask_question(client, &state.config, &puzzle, &history, &body.question)
    .await
    .inspect_err(|e| error!(target: "oracle", error = %e, "Stateless question failed"))?;

  let solution = result.is_fully_correct.then(|| puzzle.solution.clone());
  let asked = history.iter().filter(|t| t.role == Role::User).count() + 1;
  Ok(AskOut::from_result(result, solution, asked))
}
