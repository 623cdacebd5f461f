//! Read-only lookups against a remote game database.

mod lichess;

pub use lichess::LichessClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Failure talking to the remote service.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RemoteError {
    #[error("LICHESS_TOKEN is not set; it is required to fetch user games")]
    MissingCredential,
    #[error("Remote service returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Remote request failed: {0}")]
    Transport(String),
    #[error("Unreadable remote response: {0}")]
    Decode(String),
}

impl RemoteError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Bounded request for a user's most recent games.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GamesQuery {
    pub username: String,
    pub max_games: u32,
    /// Lichess perf type such as `blitz` or `rapid`.
    pub perf_type: Option<String>,
}

/// One game as reported to tool callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameSummary {
    pub id: String,
    pub pgn: String,
    pub white: Option<String>,
    pub black: Option<String>,
    pub winner: Option<String>,
    pub opening: Option<String>,
    pub time_control: Option<String>,
    pub rated: Option<bool>,
    pub url: String,
}

/// Cached cloud evaluation of one exact position. Scores are from White's
/// point of view, as the service reports them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudEval {
    pub fen: String,
    pub depth: u32,
    pub knodes: u64,
    #[serde(default)]
    pub pvs: Vec<CloudPv>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudPv {
    /// Space-separated UCI moves.
    pub moves: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cp: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mate: Option<i32>,
}

#[async_trait]
pub trait GameService: Send + Sync {
    async fn fetch_user_games(&self, query: &GamesQuery) -> Result<Vec<GameSummary>, RemoteError>;

    /// `Ok(None)` when the position has no cached evaluation.
    async fn cloud_eval(&self, fen: &str, multi_pv: u32) -> Result<Option<CloudEval>, RemoteError>;
}
