use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use crate::session::EngineSession;
use crate::traits::EngineLauncher;
use crate::EngineError;

/// How long a freshly spawned engine gets to answer `uci` with `uciok`.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for launching and tuning an engine process.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub path: PathBuf,
    pub threads: Option<u32>,
    pub hash_mb: Option<u32>,
    pub handshake_timeout: Duration,
}

impl EngineConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            threads: None,
            hash_mb: None,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }

    /// Options for the handshake, with Threads and Hash clamped to sane ranges.
    pub(crate) fn setoptions(&self) -> Vec<(String, String)> {
        let mut options = Vec::new();
        if let Some(threads) = self.threads {
            options.push(("Threads".to_string(), threads.clamp(1, 16).to_string()));
        }
        if let Some(hash_mb) = self.hash_mb {
            options.push(("Hash".to_string(), hash_mb.clamp(1, 2048).to_string()));
        }
        options
    }
}

/// Launches Stockfish (or any UCI binary) as a child process.
#[derive(Debug, Clone)]
pub struct StockfishLauncher {
    config: EngineConfig,
}

impl StockfishLauncher {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl EngineLauncher for StockfishLauncher {
    type Engine = EngineSession;

    async fn launch(&self) -> Result<EngineSession, EngineError> {
        EngineSession::start(&self.config).await
    }
}

/// Install locations probed when no explicit path is configured, ending
/// with a bare name resolved through `PATH`.
const STOCKFISH_CANDIDATES: &[&str] = &[
    "/usr/local/bin/stockfish",
    "/opt/homebrew/bin/stockfish",
    "/usr/bin/stockfish",
    "/usr/games/stockfish",
    "stockfish",
];

/// First candidate that actually runs. Stockfish treats its arguments as
/// commands, so `stockfish quit` starts and exits at once.
pub fn find_stockfish_path() -> Option<PathBuf> {
    STOCKFISH_CANDIDATES
        .iter()
        .map(PathBuf::from)
        .filter(|path| !path.is_absolute() || path.exists())
        .find(|path| {
            std::process::Command::new(path)
                .arg("quit")
                .output()
                .is_ok_and(|out| out.status.success())
        })
}
