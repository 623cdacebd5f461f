mod config;
mod mcp;
mod remote;
mod scheduler;
mod tools;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use engine::{EngineConfig, StockfishLauncher};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use config::ServerConfig;
use remote::LichessClient;
use tools::{ToolDispatcher, ToolSettings};

#[derive(Parser)]
#[command(
    name = "chess-mcp-server",
    version,
    about = "MCP server exposing Stockfish analysis and Lichess lookups as tools"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve MCP over stdin/stdout (default)
    Stdio,
    /// Serve MCP over streamable HTTP at /mcp
    Http {
        /// Listen address [env: HOST, default 0.0.0.0]
        #[arg(long)]
        host: Option<String>,
        /// Listen port [env: PORT, default 8080]
        #[arg(long)]
        port: Option<u16>,
    },
    /// Invoke one tool with JSON arguments and print the result
    Call {
        tool: String,
        #[arg(default_value = "{}")]
        args: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_tracing(config::get_log_dir().as_deref());
    let config = ServerConfig::from_env();

    tracing::info!("Starting chess MCP server");
    tracing::info!("Analysis depth: {}", config.default_depth);
    // Never log the token itself
    if config.lichess_token.is_some() {
        tracing::info!("LICHESS_TOKEN is set");
    } else {
        tracing::warn!("LICHESS_TOKEN is NOT set; fetch_user_games will fail");
    }

    let engine_path = resolve_engine_path(&config);
    tracing::info!("Stockfish path: {}", engine_path.display());
    let engine_config = EngineConfig {
        threads: config.stockfish_threads,
        hash_mb: config.stockfish_hash_mb,
        ..EngineConfig::new(engine_path)
    };
    let scheduler =
        scheduler::spawn_scheduler(StockfishLauncher::new(engine_config), config.queue_capacity);

    let games = Arc::new(LichessClient::new(
        config.lichess_api_base.clone(),
        config.lichess_token.clone(),
    )?);
    let dispatcher = Arc::new(ToolDispatcher::new(
        scheduler.clone(),
        games,
        ToolSettings::from(&config),
    ));

    let outcome = match cli.command.unwrap_or(Command::Stdio) {
        Command::Stdio => mcp::serve_stdio(dispatcher).await,
        Command::Http { host, port } => {
            let host = config::get_host(host);
            let port = config::get_port(port);
            mcp::serve_http(dispatcher, &host, port).await
        }
        Command::Call { tool, args } => run_single_call(&dispatcher, &tool, &args).await,
    };

    scheduler.shutdown().await;
    tracing::info!("Server stopped");
    outcome
}

/// One-shot invocation from the command line; prints the JSON result.
async fn run_single_call(dispatcher: &ToolDispatcher, tool: &str, args: &str) -> anyhow::Result<()> {
    let args: serde_json::Value = serde_json::from_str(args)?;
    match dispatcher.call(tool, args).await {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
        Err(err) => {
            println!("{}", serde_json::to_string_pretty(&err.to_json())?);
            Err(err.into())
        }
    }
}

fn resolve_engine_path(config: &ServerConfig) -> PathBuf {
    if let Some(path) = &config.stockfish_path {
        return path.clone();
    }
    engine::find_stockfish_path().unwrap_or_else(|| {
        tracing::warn!("Stockfish not found in common locations, relying on PATH");
        PathBuf::from("stockfish")
    })
}

/// Logs go to stderr since stdout carries the stdio transport. When a log
/// directory is configured, a daily rolling file is written as well.
fn init_tracing(log_dir: Option<&Path>) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::fmt::format::FmtSpan;

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).ok();
            let file_appender = tracing_appender::rolling::daily(dir, "chess-mcp-server");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_span_events(FmtSpan::CLOSE),
        )
        .with(file_layer)
        .init();

    guard
}
