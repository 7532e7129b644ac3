//! Application state: in-memory game sessions, game config, and the optional LLM client.
//!
//! This module owns:
//!   - the session store (game id -> game), capped at `max_sessions`
//!   - the game config (prompts, sampling, scenarios) from TOML or defaults
//!   - optional DeepSeek client
//!
//! Each game sits behind its own mutex so questions of one game are answered
//! strictly in the order they arrive, while different games proceed independently.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};
use tokio::sync::{Mutex, RwLock};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::{load_game_config_from_env, GameConfig};
use crate::deepseek::DeepSeek;
use crate::domain::Game;
use crate::generator::GeneratedPuzzle;

pub type GameHandle = Arc<Mutex<Game>>;

#[derive(Clone)]
pub struct AppState {
    pub games: Arc<RwLock<HashMap<String, GameHandle>>>,
    pub llm: Option<DeepSeek>,
    pub config: GameConfig,
    next_seq: Arc<AtomicU64>,
}

impl AppState {
    /// Build state from env: load config, init the DeepSeek client.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let config = load_game_config_from_env();

        let llm = DeepSeek::from_env();
        if let Some(ds) = &llm {
            info!(target: "haigui_backend", base_url = %ds.base_url, model = %ds.model, "LLM enabled.");
        } else {
            warn!(target: "haigui_backend", "LLM disabled (no DEEPSEEK_API_KEY). Game endpoints will answer 503.");
        }

        Self::with_parts(llm, config)
    }

    pub fn with_parts(llm: Option<DeepSeek>, config: GameConfig) -> Self {
        Self {
            games: Arc::new(RwLock::new(HashMap::new())),
            llm,
            config,
            next_seq: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Store a freshly generated puzzle as a new game. Evicts the oldest game when full.
    #[instrument(level = "debug", skip(self, generated), fields(scenario = %generated.scenario))]
    pub async fn create_game(&self, generated: GeneratedPuzzle) -> Game {
        let game = Game {
            id: Uuid::new_v4().to_string(),
            scenario: generated.scenario,
            puzzle: generated.puzzle,
            history: Vec::new(),
            solved: false,
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
        };

        let mut games = self.games.write().await;
        while games.len() >= self.config.max_sessions {
            let Some(oldest) = oldest_game_id(&games) else { break };
            games.remove(&oldest);
            warn!(target: "puzzle", evicted = %oldest, "Session store full; evicted oldest game");
        }
        games.insert(game.id.clone(), Arc::new(Mutex::new(game.clone())));
        game
    }

    #[instrument(level = "debug", skip(self), fields(%id))]
    pub async fn get_game(&self, id: &str) -> Option<GameHandle> {
        self.games.read().await.get(id).cloned()
    }

    pub async fn game_count(&self) -> usize {
        self.games.read().await.len()
    }
}

/// Oldest game by creation order. A game busy with a question is never picked.
fn oldest_game_id(games: &HashMap<String, GameHandle>) -> Option<String> {
    let mut oldest: Option<(u64, &String)> = None;
    for (id, handle) in games {
        let Ok(game) = handle.try_lock() else { continue };
        if oldest.map_or(true, |(seq, _)| game.seq < seq) {
            oldest = Some((game.seq, id));
        }
    }
    oldest.map(|(_, id)| id.clone())
}
