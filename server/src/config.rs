//! Configuration for the chess MCP server
//!
//! Every setting is read from the environment with a compile-time default.
//! Numeric values that fail to parse fall back to the default with a warning.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_DEPTH: u32 = 18;
/// Deepest search a tool call may ask for; deeper requests are clamped.
pub const MAX_DEPTH: u32 = 25;
pub const DEFAULT_TIME_MS: u64 = 5_000;
const DEFAULT_ANALYSIS_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_QUEUE_CAPACITY: usize = 64;
pub const DEFAULT_GAMES: u32 = 10;
const DEFAULT_MAX_GAMES: u32 = 50;
const DEFAULT_LICHESS_API_BASE: &str = "https://lichess.org/api";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;

/// Resolved settings for one server process.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Explicit engine binary; probed from common locations when unset.
    pub stockfish_path: Option<PathBuf>,
    pub stockfish_threads: Option<u32>,
    pub stockfish_hash_mb: Option<u32>,
    pub default_depth: u32,
    pub analysis_timeout: Duration,
    pub queue_capacity: usize,
    pub lichess_token: Option<String>,
    pub lichess_api_base: String,
    pub max_games: u32,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            stockfish_path: env_string("STOCKFISH_PATH").map(PathBuf::from),
            stockfish_threads: env_parse("STOCKFISH_THREADS"),
            stockfish_hash_mb: env_parse("STOCKFISH_HASH_MB"),
            default_depth: env_parse::<u32>("STOCKFISH_DEPTH")
                .filter(|d| *d > 0)
                .map(|d| d.min(MAX_DEPTH))
                .unwrap_or(DEFAULT_DEPTH),
            analysis_timeout: Duration::from_millis(
                env_parse::<u64>("ANALYSIS_TIMEOUT_MS")
                    .filter(|t| *t > 0)
                    .unwrap_or(DEFAULT_ANALYSIS_TIMEOUT_MS),
            ),
            queue_capacity: env_parse::<usize>("ANALYSIS_QUEUE_CAPACITY")
                .filter(|c| *c > 0)
                .unwrap_or(DEFAULT_QUEUE_CAPACITY),
            lichess_token: env_string("LICHESS_TOKEN"),
            lichess_api_base: env_string("LICHESS_API_BASE")
                .map(|base| base.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_LICHESS_API_BASE.to_string()),
            max_games: env_parse::<u32>("LICHESS_MAX_GAMES")
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_MAX_GAMES),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            stockfish_path: None,
            stockfish_threads: None,
            stockfish_hash_mb: None,
            default_depth: DEFAULT_DEPTH,
            analysis_timeout: Duration::from_millis(DEFAULT_ANALYSIS_TIMEOUT_MS),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            lichess_token: None,
            lichess_api_base: DEFAULT_LICHESS_API_BASE.to_string(),
            max_games: DEFAULT_MAX_GAMES,
        }
    }
}

/// Directory for the optional rolling log file (CHESS_MCP_LOG_DIR).
pub fn get_log_dir() -> Option<PathBuf> {
    env_string("CHESS_MCP_LOG_DIR").map(PathBuf::from)
}

/// Listen address for the HTTP transport.
///
/// Priority:
/// 1. `--host` flag
/// 2. HOST env variable
/// 3. 0.0.0.0
pub fn get_host(flag: Option<String>) -> String {
    flag.or_else(|| env_string("HOST"))
        .unwrap_or_else(|| DEFAULT_HOST.to_string())
}

/// Listen port for the HTTP transport: `--port`, then PORT, then 8080.
pub fn get_port(flag: Option<u16>) -> u16 {
    flag.or_else(|| env_parse("PORT")).unwrap_or(DEFAULT_PORT)
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = env_string(key)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring unparseable {}={:?}, using default", key, raw);
            None
        }
    }
}
