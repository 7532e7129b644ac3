//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::domain::{ChatTurn, Game, OracleResult, Verdict};
use crate::oracle::RawTurn;

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    NewGame,
    Ask {
        #[serde(rename = "gameId")]
        game_id: String,
        question: String,
    },
    Reveal {
        #[serde(rename = "gameId")]
        game_id: String,
    },
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Game {
        game: GameOut,
    },
    Answer {
        #[serde(rename = "gameId")]
        game_id: String,
        #[serde(flatten)]
        result: AskOut,
    },
    Reveal {
        #[serde(rename = "gameId")]
        game_id: String,
        #[serde(flatten)]
        reveal: RevealOut,
    },
    Error {
        message: String,
    },
}

/// DTO used by both WS and HTTP for a new game. The solution stays on the server.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameOut {
    pub id: String,
    pub scenario: String,
    pub puzzle: String,
    pub condition_count: usize,
}

/// Convert a `Game` (internal) to the public DTO.
pub fn to_out(g: &Game) -> GameOut {
    GameOut {
        id: g.id.clone(),
        scenario: g.scenario.clone(),
        puzzle: g.puzzle.text.clone(),
        condition_count: g.puzzle.conditions.len(),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AskOut {
    pub answer: String,
    pub verdict: Verdict,
    pub is_correct: bool,
    pub partial: bool,
    pub hint: String,
    /// Only set once the game is solved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solution: Option<String>,
    pub questions_asked: usize,
}

impl AskOut {
    pub fn from_result(r: OracleResult, solution: Option<String>, questions_asked: usize) -> Self {
        Self {
            answer: r.answer_text,
            verdict: r.verdict,
            is_correct: r.is_fully_correct,
            partial: r.is_partially_correct,
            hint: r.hint,
            solution,
            questions_asked,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RevealOut {
    pub solution: String,
    pub conditions: Vec<String>,
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Deserialize)]
pub struct AskIn {
    #[serde(rename = "gameId")]
    pub game_id: String,
    pub question: String,
}

#[derive(Debug, Deserialize)]
pub struct GameRef {
    #[serde(rename = "gameId")]
    pub game_id: String,
}

#[derive(Serialize)]
pub struct HistoryOut {
    pub turns: Vec<ChatTurn>,
}

/// Stateless oracle call: the client owns puzzle and history.
#[derive(Debug, Deserialize)]
pub struct OracleIn {
    pub puzzle: String,
    pub solution: String,
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default)]
    pub history: Vec<RawTurn>,
    pub question: String,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
    pub llm: bool,
    pub games: usize,
}
