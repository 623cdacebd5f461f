//! Tool argument types. The schemas are published to MCP clients.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AnalyzePositionParams {
    /// Position in Forsyth-Edwards Notation.
    pub fen: String,

    /// Search depth (default 18, deeper requests are capped at 25).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<u32>,

    /// Wall-clock budget in milliseconds (default 5000).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_ms: Option<u64>,

    /// Number of principal variations to report, 1 to 5.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multi_pv: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BestMoveParams {
    /// Position in Forsyth-Edwards Notation.
    pub fen: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ValidateMoveParams {
    /// Position in Forsyth-Edwards Notation.
    pub fen: String,

    /// Move in UCI notation, e.g. `e2e4` or `e7e8q`.
    pub move_uci: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LegalMovesParams {
    /// Position in Forsyth-Edwards Notation.
    pub fen: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FetchUserGamesParams {
    /// Lichess username.
    pub username: String,

    /// How many recent games to fetch (default 10).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_games: Option<u32>,

    /// Lichess perf type: `bullet`, `blitz`, `rapid`, `classical`, ...
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_control: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CloudEvalParams {
    /// Position in Forsyth-Edwards Notation.
    pub fen: String,

    /// Number of variations to request, 1 to 5 (default 1).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multi_pv: Option<u32>,
}
