//! Domain models used by the backend: puzzle, chat turns, oracle verdicts, game sessions.

use serde::{Deserialize, Serialize};

/// A generated turtle-soup puzzle. Never mutated once a game starts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Puzzle {
  /// What the player sees (谜面).
  pub text: String,
  /// Hidden explanation (汤底).
  pub solution: String,
  /// Core conditions (核心条件), in the order the model listed them.
  pub conditions: Vec<String>,
}

/// Speaker of a chat turn. Serialized the way chat-completion APIs expect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  System,
  User,
  Assistant,
}

impl Role {
  pub fn as_str(&self) -> &'static str {
    match self {
      Role::System => "system",
      Role::User => "user",
      Role::Assistant => "assistant",
    }
  }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
  pub role: Role,
  pub content: String,
}

impl ChatTurn {
  pub fn system(content: impl Into<String>) -> Self {
    Self { role: Role::System, content: content.into() }
  }
  pub fn user(content: impl Into<String>) -> Self {
    Self { role: Role::User, content: content.into() }
  }
  pub fn assistant(content: impl Into<String>) -> Self {
    Self { role: Role::Assistant, content: content.into() }
  }
}

/// Outcome category of one oracle reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
  FullyCorrect,
  PartiallyCorrect,
  Yes,
  No,
  CannotDetermine,
}

/// Classified oracle reply for a single question.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OracleResult {
  pub answer_text: String,
  pub verdict: Verdict,
  pub is_fully_correct: bool,
  pub is_partially_correct: bool,
  /// Matched/missing conditions summary; only set for partial matches.
  pub hint: String,
}

/// One running game held in memory.
#[derive(Clone, Debug)]
pub struct Game {
  pub id: String,
  pub scenario: String,
  pub puzzle: Puzzle,
  /// Question/answer turns, append-only. The system prompt is rebuilt per call.
  pub history: Vec<ChatTurn>,
  pub solved: bool,
  /// Creation order; lower is older.
  pub seq: u64,
}

impl Game {
  pub fn questions_asked(&self) -> usize {
    self.history.iter().filter(|t| t.role == Role::User).count()
  }
}
