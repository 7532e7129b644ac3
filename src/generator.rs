//! Puzzle generation: pick a scenario, ask the model for a puzzle, parse the reply.
//!
//! The model must answer in three sections:
//!
//! ```text
//! 谜题：<puzzle text>
//! 核心条件：1. ... 2. ... 3. ...
//! 汤底：<solution>
//! ```

use std::sync::LazyLock;
use std::time::Instant;

use rand::seq::SliceRandom;
use rand::Rng;
use regex::Regex;
use tracing::{error, info, instrument, warn};

use crate::config::GameConfig;
use crate::deepseek::DeepSeek;
use crate::domain::{ChatTurn, Puzzle};
use crate::error::GenerationError;
use crate::util::{fill_template, preview};

static PUZZLE_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"谜题[：:]([\s\S]*?)核心条件[：:]").expect("invalid regex"));
static CONDITIONS_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"核心条件[：:]([\s\S]*?)汤底[：:]").expect("invalid regex"));
static SOLUTION_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"汤底[：:]([\s\S]*)").expect("invalid regex"));
// A list marker opens the section or follows whitespace; "38.5" or "3、4号楼" inside an item is not one.
static ITEM_MARKER_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?:^|\s)[0-9]+[.．、]").expect("invalid regex"));

const MAX_CONDITIONS: usize = 5;

/// A freshly generated puzzle and the scenario it was drawn from.
#[derive(Clone, Debug)]
pub struct GeneratedPuzzle {
  pub scenario: String,
  pub puzzle: Puzzle,
}

/// Uniform draw from the scenario list.
pub fn pick_scenario<'a, R: Rng + ?Sized>(scenarios: &'a [String], rng: &mut R) -> Option<&'a str> {
  scenarios.choose(rng).map(String::as_str)
}

pub fn build_puzzle_messages(cfg: &GameConfig, scenario: &str) -> Vec<ChatTurn> {
  vec![
    ChatTurn::system(cfg.prompts.puzzle_system.clone()),
    ChatTurn::user(fill_template(&cfg.prompts.puzzle_user_template, &[("scenario", scenario)])),
  ]
}

/// Trim whitespace and markdown emphasis the model sometimes wraps sections in.
fn clean_section(s: &str) -> &str {
  s.trim_matches(|c: char| c.is_whitespace() || c == '*')
}

/// Split a reply into puzzle, conditions and solution.
pub fn parse_puzzle_reply(content: &str) -> Result<Puzzle, GenerationError> {
  let section = |re: &Regex, name: &str| {
    re.captures(content)
      .and_then(|c| c.get(1))
      .map(|m| m.as_str())
      .ok_or_else(|| GenerationError::Format(format!("missing {name} section")))
  };
  let puzzle_raw = section(&PUZZLE_RE, "谜题")?;
  let conditions_raw = section(&CONDITIONS_RE, "核心条件")?;
  let solution_raw = section(&SOLUTION_RE, "汤底")?;

  let conditions: Vec<String> = ITEM_MARKER_RE
    .split(conditions_raw)
    .map(clean_section)
    .filter(|item| !item.is_empty())
    .map(str::to_string)
    .collect();

  let text = clean_section(puzzle_raw).to_string();
  let solution = clean_section(solution_raw).to_string();

  if text.is_empty() {
    return Err(GenerationError::Format("empty puzzle text".into()));
  }
  if solution.is_empty() {
    return Err(GenerationError::Format("empty solution".into()));
  }
  if conditions.is_empty() {
    return Err(GenerationError::Format("no core conditions".into()));
  }
  if conditions.len() > MAX_CONDITIONS {
    warn!(target: "puzzle", count = conditions.len(), "Model listed more core conditions than asked for");
  }

  Ok(Puzzle { text, solution, conditions })
}

/// Generate a new puzzle for a randomly drawn scenario.
#[instrument(level = "info", skip_all, fields(model = %client.model))]
pub async fn generate_puzzle(client: &DeepSeek, cfg: &GameConfig) -> Result<GeneratedPuzzle, GenerationError> {
  let scenario = pick_scenario(&cfg.scenarios, &mut rand::thread_rng())
    .ok_or_else(|| GenerationError::Format("no scenarios configured".into()))?
    .to_string();

  let messages = build_puzzle_messages(cfg, &scenario);
  let start = Instant::now();
  let content = match client.chat(&messages, cfg.puzzle_sampling).await {
    Ok(c) => c,
    Err(e) => {
      error!(target: "puzzle", elapsed = ?start.elapsed(), %scenario, error = %e, "Model call failed during puzzle generation");
      return Err(e.into());
    }
  };

  let puzzle = parse_puzzle_reply(&content).inspect_err(|e| {
    error!(target: "puzzle", %scenario, error = %e, reply_preview = %preview(&content, 80), "Could not parse puzzle reply");
  })?;

  info!(
    target: "puzzle",
    %scenario,
    conditions = puzzle.conditions.len(),
    puzzle_preview = %preview(&puzzle.text, 30),
    elapsed = ?start.elapsed(),
    "Puzzle generated"
  );
  Ok(GeneratedPuzzle { scenario, puzzle })
}
