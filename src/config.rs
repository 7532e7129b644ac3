//! Loading game configuration (prompts, sampling, scenarios, limits) from TOML.
//!
//! Every field is optional in the file; anything left out keeps its default.
//! See `GameConfig` and `Prompts` for the expected schema.

use serde::Deserialize;
use tracing::{error, info, warn};

/// Settings each puzzle is drawn from. One is picked uniformly per game.
pub const DEFAULT_SCENARIOS: [&str; 12] = [
  "医院", "学校", "办公室", "森林", "海边", "太空站",
  "古寺庙", "未来城市", "火车上", "沙漠", "海底", "雪山",
];

pub const DEFAULT_MAX_SESSIONS: usize = 1000;

#[derive(Clone, Debug, Deserialize)]
pub struct GameConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default = "Sampling::puzzle")]
  pub puzzle_sampling: Sampling,
  #[serde(default = "Sampling::oracle")]
  pub oracle_sampling: Sampling,
  #[serde(default = "default_scenarios")]
  pub scenarios: Vec<String>,
  #[serde(default = "default_max_sessions")]
  pub max_sessions: usize,
}

impl Default for GameConfig {
  fn default() -> Self {
    Self {
      prompts: Prompts::default(),
      puzzle_sampling: Sampling::puzzle(),
      oracle_sampling: Sampling::oracle(),
      scenarios: default_scenarios(),
      max_sessions: DEFAULT_MAX_SESSIONS,
    }
  }
}

fn default_scenarios() -> Vec<String> {
  DEFAULT_SCENARIOS.iter().map(|s| s.to_string()).collect()
}

fn default_max_sessions() -> usize { DEFAULT_MAX_SESSIONS }

/// Sampling knobs sent with each chat-completion request.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
pub struct Sampling {
  pub max_tokens: u32,
  pub temperature: f32,
  pub top_p: f32,
}

impl Sampling {
  /// High temperature: puzzles should vary a lot between games.
  pub fn puzzle() -> Self {
    Self { max_tokens: 500, temperature: 1.1, top_p: 0.9 }
  }

  pub fn oracle() -> Self {
    Self { max_tokens: 200, temperature: 0.5, top_p: 0.7 }
  }
}

/// Prompts used by the puzzle generator and the oracle.
/// Placeholders: `{scenario}` in the puzzle user template;
/// `{puzzle}`, `{conditions}`, `{solution}` in the oracle system template.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub puzzle_system: String,
  pub puzzle_user_template: String,
  pub oracle_system_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      puzzle_system: "你是一个海龟汤游戏主持人。请生成一个包含多个核心条件的海龟汤谜题，格式必须严格遵循：
1. 首先输出\"谜题：\"，然后是谜题描述
2. 然后输出\"核心条件：\"，列出3-5个解开谜题必须满足的关键条件，用数字编号
3. 最后输出\"汤底：\"，然后是完整答案。
不要添加任何额外内容或解释。".into(),
      puzzle_user_template: "请生成一个发生在{scenario}场景的海龟汤谜题，确保包含3-5个核心条件。".into(),
      oracle_system_template: "你是一个海龟汤游戏主持人。根据以下谜题情境、核心条件和汤底，回答用户的问题：

谜题情境: {puzzle}
核心条件:
{conditions}
汤底答案: {solution}

回答规则:
1. 首先判断用户的问题是否涉及核心条件
2. 如果用户完全猜对所有核心条件，回答格式：\"[完全正确]恭喜你完全猜对了！汤底是：{solution}\"
3. 如果用户猜对部分核心条件，回答格式：\"[部分正确]你猜对了：[正确条件]，还缺少：[缺少条件]\"
4. 如果用户没有猜对任何核心条件，只能回答\"是\"、\"否\"或\"无法回答\"三者之一
5. 只返回上述规定的内容，不要有任何多余文字".into(),
    }
  }
}

impl GameConfig {
  /// Parse a TOML document, then repair values that would make the game unusable.
  pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
    let mut cfg: GameConfig = toml::from_str(s)?;
    cfg.scenarios.retain(|s| !s.trim().is_empty());
    if cfg.scenarios.is_empty() {
      warn!(target: "haigui_backend", "Config has no usable scenarios; using built-in list");
      cfg.scenarios = default_scenarios();
    }
    if cfg.max_sessions == 0 {
      warn!(target: "haigui_backend", "max_sessions = 0 is not allowed; using default");
      cfg.max_sessions = DEFAULT_MAX_SESSIONS;
    }
    Ok(cfg)
  }
}

/// Load `GameConfig` from GAME_CONFIG_PATH. Missing var or any parsing/IO error yields defaults.
pub fn load_game_config_from_env() -> GameConfig {
  let Ok(path) = std::env::var("GAME_CONFIG_PATH") else {
    return GameConfig::default();
  };
  match std::fs::read_to_string(&path) {
    Ok(s) => match GameConfig::from_toml_str(&s) {
      Ok(cfg) => {
        info!(target: "haigui_backend", %path, scenarios = cfg.scenarios.len(), "Loaded game config (TOML)");
        cfg
      }
      Err(e) => {
        error!(target: "haigui_backend", %path, error = %e, "Failed to parse TOML config");
        GameConfig::default()
      }
    },
    Err(e) => {
      error!(target: "haigui_backend", %path, error = %e, "Failed to read TOML config file");
      GameConfig::default()
    }
  }
}
