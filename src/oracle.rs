//! Question oracle: answers a player's question against the hidden solution.
//!
//! The model is told the puzzle, numbered core conditions and solution, and must
//! reply with either a sentinel-tagged verdict or one bare token:
//!
//! - `[完全正确]...` the player guessed every core condition
//! - `[部分正确]...` some conditions matched; the rest of the text is the hint
//! - `是` / `否` / `无法回答` for an ordinary yes/no question
//!
//! Anything else is normalized to `无法回答`.

use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::config::GameConfig;
use crate::deepseek::DeepSeek;
use crate::domain::{ChatTurn, OracleResult, Puzzle, Role, Verdict};
use crate::error::OracleError;
use crate::util::{fill_template, trunc_for_log};

pub const YES: &str = "是";
pub const NO: &str = "否";
pub const CANNOT_DETERMINE: &str = "无法回答";

const FULLY_CORRECT_TAGS: [&str; 2] = ["[完全正确]", "【完全正确】"];
const PARTIALLY_CORRECT_TAGS: [&str; 2] = ["[部分正确]", "【部分正确】"];

/// History item as sent by a client. Both fields may be missing.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawTurn {
  #[serde(default)]
  pub role: Option<String>,
  #[serde(default)]
  pub content: Option<String>,
}

fn parse_role(s: &str) -> Option<Role> {
  match s {
    "system" => Some(Role::System),
    "user" => Some(Role::User),
    "assistant" => Some(Role::Assistant),
    _ => None,
  }
}

/// Keep only turns with a known role and non-empty content, preserving order.
pub fn sanitize_history(raw: &[RawTurn]) -> Vec<ChatTurn> {
  let kept: Vec<ChatTurn> = raw
    .iter()
    .filter_map(|t| {
      let role = parse_role(t.role.as_deref()?)?;
      let content = t.content.as_deref().filter(|c| !c.is_empty())?;
      Some(ChatTurn { role, content: content.to_string() })
    })
    .collect();
  if kept.len() != raw.len() {
    warn!(target: "oracle", dropped = raw.len() - kept.len(), "Dropped incomplete history turns");
  }
  kept
}

pub fn numbered_conditions(conditions: &[String]) -> String {
  conditions
    .iter()
    .enumerate()
    .map(|(i, c)| format!("{}. {}", i + 1, c))
    .collect::<Vec<_>>()
    .join("\n")
}

pub fn build_system_prompt(cfg: &GameConfig, puzzle: &Puzzle) -> String {
  let conditions = numbered_conditions(&puzzle.conditions);
  fill_template(
    &cfg.prompts.oracle_system_template,
    &[
      ("puzzle", puzzle.text.as_str()),
      ("conditions", conditions.as_str()),
      ("solution", puzzle.solution.as_str()),
    ],
  )
}

/// System instruction, then prior turns in order, then the new question.
pub fn build_oracle_messages(cfg: &GameConfig, puzzle: &Puzzle, history: &[ChatTurn], question: &str) -> Vec<ChatTurn> {
  let mut messages = Vec::with_capacity(history.len() + 2);
  messages.push(ChatTurn::system(build_system_prompt(cfg, puzzle)));
  messages.extend(history.iter().cloned());
  messages.push(ChatTurn::user(question));
  messages
}

fn strip_tag<'a>(reply: &'a str, tags: &[&str]) -> Option<&'a str> {
  tags.iter().find_map(|tag| reply.strip_prefix(tag)).map(str::trim)
}

/// Map a bare reply to one of the canonical tokens.
fn canonical_token(reply: &str) -> (Verdict, &'static str) {
  let core = reply.trim();
  let core = core
    .strip_suffix(|c: char| matches!(c, '。' | '.' | '！' | '!'))
    .unwrap_or(core)
    .trim();
  match core {
    YES => (Verdict::Yes, YES),
    NO => (Verdict::No, NO),
    _ => (Verdict::CannotDetermine, CANNOT_DETERMINE),
  }
}

/// Classify the model reply into an `OracleResult`.
pub fn classify_reply(reply: &str) -> OracleResult {
  let reply = reply.trim();

  if let Some(rest) = strip_tag(reply, &FULLY_CORRECT_TAGS) {
    return OracleResult {
      answer_text: rest.to_string(),
      verdict: Verdict::FullyCorrect,
      is_fully_correct: true,
      is_partially_correct: false,
      hint: String::new(),
    };
  }

  if let Some(rest) = strip_tag(reply, &PARTIALLY_CORRECT_TAGS) {
    return OracleResult {
      answer_text: rest.to_string(),
      verdict: Verdict::PartiallyCorrect,
      is_fully_correct: false,
      is_partially_correct: true,
      hint: rest.to_string(),
    };
  }

  let (verdict, token) = canonical_token(reply);
  OracleResult {
    answer_text: token.to_string(),
    verdict,
    is_fully_correct: false,
    is_partially_correct: false,
    hint: String::new(),
  }
}

/// Ask one question. `history` holds the prior question/answer turns of this game.
#[instrument(level = "info", skip_all, fields(history = history.len(), question_len = question.len()))]
pub async fn ask_question(
  client: &DeepSeek,
  cfg: &GameConfig,
  puzzle: &Puzzle,
  history: &[ChatTurn],
  question: &str,
) -> Result<OracleResult, OracleError> {
  let question = question.trim();
  if question.is_empty() {
    return Err(OracleError::EmptyQuestion);
  }

  let messages = build_oracle_messages(cfg, puzzle, history, question);
  let reply = client.chat(&messages, cfg.oracle_sampling).await?;
  let result = classify_reply(&reply);
  if result.verdict == Verdict::CannotDetermine && reply.trim() != CANNOT_DETERMINE {
    info!(target: "oracle", reply = %trunc_for_log(&reply, 120), "Off-format reply normalized to 无法回答");
  }
  info!(target: "oracle", verdict = ?result.verdict, "Question answered");
  Ok(result)
}

#[cfg(test)]
mod tests {
  use wiremock::MockServer;

  use super::*;
  use crate::deepseek::test_support::{client_for, reply_with};

  fn puzzle() -> Puzzle {
    Puzzle {
      text: "一个人走进餐厅点了海龟汤，喝了一口后自杀了。".into(),
      solution: "他曾在海难中被骗吃下人肉，以为是海龟汤。".into(),
      conditions: vec!["他经历过海难".into(), "他吃过人肉".into()],
    }
  }

  fn raw(role: Option<&str>, content: Option<&str>) -> RawTurn {
    RawTurn { role: role.map(Into::into), content: content.map(Into::into) }
  }

  #[test]
  fn fully_correct_sentinel_is_stripped() {
    let r = classify_reply("[完全正确]恭喜你完全猜对了！汤底是：他吃过人肉");
    assert!(r.is_fully_correct);
    assert!(!r.is_partially_correct);
    assert_eq!(r.verdict, Verdict::FullyCorrect);
    assert_eq!(r.answer_text, "恭喜你完全猜对了！汤底是：他吃过人肉");
    assert!(r.hint.is_empty());
  }

  #[test]
  fn full_width_bracket_sentinel_is_accepted() {
    let r = classify_reply("【完全正确】 恭喜！");
    assert!(r.is_fully_correct);
    assert_eq!(r.answer_text, "恭喜！");
  }

  #[test]
  fn partial_sentinel_becomes_hint() {
    let r = classify_reply("[部分正确]你猜对了：他经历过海难，还缺少：他吃过人肉");
    assert!(r.is_partially_correct);
    assert!(!r.is_fully_correct);
    assert_eq!(r.hint, "你猜对了：他经历过海难，还缺少：他吃过人肉");
    assert_eq!(r.answer_text, r.hint);
  }

  #[test]
  fn canonical_tokens_pass_through() {
    let yes = classify_reply("是");
    assert_eq!(yes.answer_text, "是");
    assert_eq!(yes.verdict, Verdict::Yes);
    assert!(!yes.is_fully_correct);

    assert_eq!(classify_reply(" 否。").verdict, Verdict::No);
    assert_eq!(classify_reply("无法回答").verdict, Verdict::CannotDetermine);
  }

  #[test]
  fn off_format_reply_is_normalized() {
    for reply in ["maybe", "是的，他确实经历过海难", "", "[完全错误]"] {
      let r = classify_reply(reply);
      assert_eq!(r.answer_text, CANNOT_DETERMINE, "reply: {reply}");
      assert_eq!(r.verdict, Verdict::CannotDetermine);
    }
  }

  #[test]
  fn sentinel_must_lead() {
    let r = classify_reply("是 [完全正确]");
    assert!(!r.is_fully_correct);
    assert_eq!(r.answer_text, CANNOT_DETERMINE);
  }

  #[test]
  fn incomplete_history_items_are_dropped_in_order() {
    let history = vec![
      raw(Some("user"), Some("他是男人吗？")),
      raw(Some("assistant"), None),
      raw(Some("assistant"), Some("是")),
      raw(None, Some("orphan")),
      raw(Some("narrator"), Some("unknown role")),
      raw(Some("user"), Some("")),
      raw(Some("user"), Some("他经历过海难吗？")),
    ];
    let kept = sanitize_history(&history);
    assert_eq!(
      kept,
      vec![
        ChatTurn::user("他是男人吗？"),
        ChatTurn::assistant("是"),
        ChatTurn::user("他经历过海难吗？"),
      ]
    );
  }

  #[test]
  fn raw_turn_deserializes_with_missing_fields() {
    let turns: Vec<RawTurn> = serde_json::from_str(r#"[{"role":"user"},{"content":"x"},{}]"#).unwrap();
    assert!(sanitize_history(&turns).is_empty());
  }

  #[test]
  fn system_prompt_embeds_everything() {
    let p = puzzle();
    let prompt = build_system_prompt(&GameConfig::default(), &p);
    assert!(prompt.contains(&p.text));
    assert!(prompt.contains("1. 他经历过海难\n2. 他吃过人肉"));
    assert!(prompt.contains(&format!("汤底是：{}", p.solution)));
    assert!(!prompt.contains("{solution}"));
  }

  #[test]
  fn messages_are_system_history_question() {
    let history = vec![ChatTurn::user("他是男人吗？"), ChatTurn::assistant("是")];
    let msgs = build_oracle_messages(&GameConfig::default(), &puzzle(), &history, "他吃过人肉吗？");
    assert_eq!(msgs.len(), 4);
    assert_eq!(msgs[0].role, Role::System);
    assert_eq!(&msgs[1..3], &history[..]);
    assert_eq!(msgs[3], ChatTurn::user("他吃过人肉吗？"));
  }

  #[tokio::test]
  async fn empty_question_never_reaches_upstream() {
    let server = MockServer::start().await;
    let err = ask_question(&client_for(&server), &GameConfig::default(), &puzzle(), &[], "   ")
      .await
      .unwrap_err();
    assert!(matches!(err, OracleError::EmptyQuestion));
    assert!(server.received_requests().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn ask_question_classifies_upstream_reply() {
    let server = MockServer::start().await;
    reply_with(&server, "[完全正确]恭喜你完全猜对了！").await;

    let history = vec![ChatTurn::user("他经历过海难吗？"), ChatTurn::assistant("是")];
    let r = ask_question(&client_for(&server), &GameConfig::default(), &puzzle(), &history, "他吃过人肉吗？")
      .await
      .unwrap();
    assert!(r.is_fully_correct);
    assert_eq!(r.answer_text, "恭喜你完全猜对了！");

    let req = &server.received_requests().await.unwrap()[0];
    let body: serde_json::Value = serde_json::from_slice(&req.body).unwrap();
    assert_eq!(body["messages"].as_array().unwrap().len(), 4);
    assert_eq!(body["max_tokens"], 200);
  }

  #[tokio::test]
  async fn upstream_failure_is_oracle_error() {
    let server = MockServer::start().await;
    let err = ask_question(&client_for(&server), &GameConfig::default(), &puzzle(), &[], "他是男人吗？")
      .await
      .unwrap_err();
    assert!(matches!(err, OracleError::Upstream(_)));
  }
}
