//! UCI engine plumbing: one external engine process per [`EngineSession`],
//! the line protocol it speaks, and the traits the scheduler drives it by.

pub mod error;
pub mod limits;
pub mod session;
pub mod stockfish;
pub mod traits;
pub mod uci;

pub use error::EngineError;
pub use limits::{AnalysisLimits, LimitsError, MAX_MULTI_PV};
pub use session::{EngineSession, SessionState};
pub use stockfish::{find_stockfish_path, EngineConfig, StockfishLauncher};
pub use traits::{AnalysisEngine, EngineLauncher};
pub use uci::{UciError, UciMessage};

/// The parts of an `info` line the search tracks. Other fields
/// (nodes, nps, hashfull, currmove...) are read past and dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineInfo {
    pub depth: Option<u32>,
    pub multipv: Option<u32>,
    pub score: Option<Score>,
    /// Score is only a lowerbound/upperbound (aspiration window fail).
    pub bound: bool,
    /// Principal variation as UCI move strings.
    pub pv: Vec<String>,
    /// `info string ...` free text.
    pub string: Option<String>,
}

/// Engine evaluation, from the side to move.
///
/// Mate: positive N = side-to-move mates in N moves,
/// negative N = side-to-move gets mated in N moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Score {
    Centipawns(i32),
    Mate(i32),
}

/// One principal variation as reported under a given `multipv` index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PvLine {
    pub multipv: u32,
    pub depth: u32,
    pub score: Option<Score>,
    pub pv: Vec<String>,
}

/// Outcome of a completed search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisResult {
    /// `None` only when the engine reported `bestmove (none)`.
    pub best_move: Option<String>,
    pub score: Option<Score>,
    pub principal_variation: Vec<String>,
    pub depth_reached: u32,
    /// Every tracked line, ordered by `multipv` index.
    pub lines: Vec<PvLine>,
}
