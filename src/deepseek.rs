//! Minimal client for an OpenAI-compatible chat.completions endpoint (DeepSeek by default).
//!
//! One call shape only: a message list plus sampling knobs, plain-text reply back.
//! Calls are instrumented and log model names, latencies, and token usage (not contents).
//!
//! NOTE: We never log the API key.

use std::time::{Duration, Instant};

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::config::Sampling;
use crate::domain::ChatTurn;
use crate::error::ChatError;
use crate::util::trunc_for_log;

pub const DEFAULT_BASE_URL: &str = "https://api.deepseek.com/v1";
pub const DEFAULT_MODEL: &str = "deepseek-chat";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Clone)]
pub struct DeepSeek {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
}

impl DeepSeek {
  /// Construct the client if we find DEEPSEEK_API_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("DEEPSEEK_API_KEY").ok().filter(|k| !k.trim().is_empty())?;
    let base_url = std::env::var("DEEPSEEK_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
    let model = std::env::var("DEEPSEEK_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into());
    let timeout = std::env::var("DEEPSEEK_TIMEOUT_SECS")
      .ok()
      .and_then(|s| s.parse::<u64>().ok())
      .unwrap_or(DEFAULT_TIMEOUT_SECS);

    match Self::new(api_key, base_url, model, Duration::from_secs(timeout)) {
      Ok(ds) => Some(ds),
      Err(e) => {
        warn!(target: "haigui_backend", error = %e, "Failed to build HTTP client; LLM disabled");
        None
      }
    }
  }

  pub fn new(
    api_key: impl Into<String>,
    base_url: impl Into<String>,
    model: impl Into<String>,
    timeout: Duration,
  ) -> Result<Self, ChatError> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    let base_url: String = base_url.into();
    Ok(Self {
      client,
      api_key: api_key.into(),
      base_url: base_url.trim_end_matches('/').to_string(),
      model: model.into(),
    })
  }

  /// Send the full message list and return the assistant's reply text (trimmed).
  #[instrument(level = "info", skip(self, messages), fields(model = %self.model, messages = messages.len(), max_tokens = sampling.max_tokens))]
  pub async fn chat(&self, messages: &[ChatTurn], sampling: Sampling) -> Result<String, ChatError> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: &self.model,
      messages: messages
        .iter()
        .map(|t| ChatMessageReq { role: t.role.as_str(), content: &t.content })
        .collect(),
      max_tokens: sampling.max_tokens,
      temperature: sampling.temperature,
      top_p: sampling.top_p,
    };

    let start = Instant::now();
    let res = self.client.post(&url)
      .header(USER_AGENT, "haigui-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let message = extract_api_error(&body).unwrap_or_else(|| trunc_for_log(&body, 300));
      return Err(ChatError::Status { status: status.as_u16(), message });
    }

    let body: ChatCompletionResponse = res.json().await?;
    let elapsed = start.elapsed();
    if let Some(usage) = &body.usage {
      info!(?elapsed, prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "Chat completion usage");
    } else {
      info!(?elapsed, "Chat completion received");
    }

    let text = body.choices.into_iter().next()
      .and_then(|c| c.message.content)
      .ok_or(ChatError::EmptyReply)?;
    let text = text.trim().to_string();
    debug!(reply = %trunc_for_log(&text, 400), "Raw model reply");
    Ok(text)
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
  model: &'a str,
  messages: Vec<ChatMessageReq<'a>>,
  max_tokens: u32,
  temperature: f32,
  top_p: f32,
}
#[derive(Serialize)]
struct ChatMessageReq<'a> { role: &'a str, content: &'a str }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from an OpenAI-style error body.
fn extract_api_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}

#[cfg(test)]
pub(crate) mod test_support {
  use std::time::Duration;

  use serde_json::json;
  use wiremock::matchers::{header, method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  use super::DeepSeek;

  pub fn client_for(server: &MockServer) -> DeepSeek {
    DeepSeek::new("test-key", server.uri(), "deepseek-chat", Duration::from_secs(5)).unwrap()
  }

  pub fn completion_body(content: &str) -> serde_json::Value {
    json!({
      "id": "chatcmpl-1",
      "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }],
      "usage": { "prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15 }
    })
  }

  /// Mount a mock that answers every chat call with `content`.
  pub async fn reply_with(server: &MockServer, content: &str) {
    Mock::given(method("POST"))
      .and(path("/chat/completions"))
      .and(header("authorization", "Bearer test-key"))
      .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(content)))
      .mount(server)
      .await;
  }
}
