//! Error types for the chat client, puzzle generation, the oracle, and the HTTP edge.
//!
//! Inner errors keep full detail for logs. `AppError` is what clients see: causes
//! collapse to a generic "please retry later" message.

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use thiserror::Error;

/// Failure of one chat-completion call.
#[derive(Error, Debug)]
pub enum ChatError {
  #[error("HTTP transport error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("upstream HTTP {status}: {message}")]
  Status { status: u16, message: String },

  #[error("upstream reply had no message content")]
  EmptyReply,
}

#[derive(Error, Debug)]
pub enum GenerationError {
  #[error("chat call failed: {0}")]
  Upstream(#[from] ChatError),

  #[error("puzzle reply did not match the expected format: {0}")]
  Format(String),
}

#[derive(Error, Debug)]
pub enum OracleError {
  #[error("chat call failed: {0}")]
  Upstream(#[from] ChatError),

  #[error("question is empty")]
  EmptyQuestion,
}

pub const GENERATION_FAILED_MSG: &str = "无法生成谜题，请稍后重试";
pub const ORACLE_FAILED_MSG: &str = "无法获取回答，请稍后重试";

/// Errors surfaced by HTTP/WS handlers.
#[derive(Error, Debug)]
pub enum AppError {
  #[error(transparent)]
  Generation(#[from] GenerationError),

  #[error(transparent)]
  Oracle(#[from] OracleError),

  #[error("game {0} not found")]
  GameNotFound(String),

  #[error("LLM disabled (no DEEPSEEK_API_KEY)")]
  LlmDisabled,
}

impl AppError {
  pub fn status(&self) -> StatusCode {
    match self {
      AppError::Generation(_) => StatusCode::BAD_GATEWAY,
      AppError::Oracle(OracleError::EmptyQuestion) => StatusCode::BAD_REQUEST,
      AppError::Oracle(OracleError::Upstream(_)) => StatusCode::BAD_GATEWAY,
      AppError::GameNotFound(_) => StatusCode::NOT_FOUND,
      AppError::LlmDisabled => StatusCode::SERVICE_UNAVAILABLE,
    }
  }

  /// Message safe to show to the player.
  pub fn user_message(&self) -> String {
    match self {
      AppError::Generation(_) => GENERATION_FAILED_MSG.into(),
      AppError::Oracle(OracleError::EmptyQuestion) => "问题不能为空".into(),
      AppError::Oracle(OracleError::Upstream(_)) => ORACLE_FAILED_MSG.into(),
      AppError::GameNotFound(_) => "游戏不存在或已过期，请开始新游戏".into(),
      AppError::LlmDisabled => "服务未配置模型密钥，请稍后重试".into(),
    }
  }
}

impl IntoResponse for AppError {
  fn into_response(self) -> Response {
    let body = serde_json::json!({ "error": self.user_message() });
    (self.status(), Json(body)).into_response()
  }
}
