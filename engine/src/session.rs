use std::collections::BTreeMap;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use chess::Position;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio_stream::wrappers::LinesStream;
use tokio_stream::StreamExt;

use crate::stockfish::EngineConfig;
use crate::traits::AnalysisEngine;
use crate::uci::{parse_uci_message, UciError, UciMessage};
use crate::{AnalysisLimits, AnalysisResult, EngineError, EngineInfo, PvLine};

const READY_TIMEOUT: Duration = Duration::from_secs(5);
const STOP_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);
const QUIT_TIMEOUT: Duration = Duration::from_secs(1);

type EngineReader = Box<dyn AsyncRead + Send + Unpin>;
type EngineWriter = Box<dyn AsyncWrite + Send + Unpin>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Ready,
    /// A `go` has been sent and its `bestmove` not yet read.
    Searching,
    /// Protocol desync or I/O failure. Never leaves this state.
    Faulted,
    Closed,
}

/// Owns one UCI engine and speaks its line protocol.
///
/// Engine output is consumed as a lazy stream of parsed lines. The session
/// assumes a single caller; it never retries or restarts itself. Once
/// faulted, every call fails fast and the owner must build a new session.
pub struct EngineSession {
    process: Option<Child>,
    stdin: EngineWriter,
    lines: LinesStream<BufReader<EngineReader>>,
    state: SessionState,
    name: Option<String>,
    position: Option<Position>,
    multi_pv: u32,
    search: SearchProgress,
}

impl EngineSession {
    /// Spawn the engine binary and complete the UCI handshake.
    #[tracing::instrument(level = "info", skip_all, fields(path = %config.path.display()))]
    pub async fn start(config: &EngineConfig) -> Result<Self, EngineError> {
        tracing::info!("Spawning engine process");
        let mut process = Command::new(&config.path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                tracing::error!("Failed to spawn engine: {}", e);
                EngineError::Unavailable(format!(
                    "failed to spawn {}: {}",
                    config.path.display(),
                    e
                ))
            })?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| EngineError::Unavailable("engine has no stdin".to_string()))?;
        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| EngineError::Unavailable("engine has no stdout".to_string()))?;

        let mut session = Self::new(Box::new(stdout), Box::new(stdin), Some(process));
        session.handshake_or_close(config).await?;
        Ok(session)
    }

    /// Attach to an engine that is already running behind the given streams.
    pub async fn connect<R, W>(reader: R, writer: W, config: &EngineConfig) -> Result<Self, EngineError>
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let mut session = Self::new(Box::new(reader), Box::new(writer), None);
        session.handshake_or_close(config).await?;
        Ok(session)
    }

    fn new(reader: EngineReader, writer: EngineWriter, process: Option<Child>) -> Self {
        Self {
            process,
            stdin: writer,
            lines: LinesStream::new(BufReader::new(reader).lines()),
            state: SessionState::Ready,
            name: None,
            position: None,
            multi_pv: 1,
            search: SearchProgress::default(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Engine name from `id name`, once the handshake is done.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    async fn handshake_or_close(&mut self, config: &EngineConfig) -> Result<(), EngineError> {
        if let Err(e) = self.handshake(config).await {
            tracing::error!("Engine handshake failed: {}", e);
            self.shutdown().await;
            return Err(EngineError::Unavailable(e.to_string()));
        }
        Ok(())
    }

    async fn handshake(&mut self, config: &EngineConfig) -> Result<(), EngineError> {
        self.send("uci").await?;

        let waited = tokio::time::timeout(config.handshake_timeout, async {
            loop {
                match self.next_message().await? {
                    UciMessage::Id { name, value } if name == "name" => self.name = Some(value),
                    UciMessage::UciOk => return Ok::<(), EngineError>(()),
                    _ => {}
                }
            }
        })
        .await;
        match waited {
            Ok(result) => result?,
            Err(_) => return Err(self.fault("timed out waiting for uciok")),
        }

        tracing::info!(
            engine = self.name.as_deref().unwrap_or("unknown"),
            "Received uciok"
        );

        for (name, value) in config.setoptions() {
            self.send_setoption(&name, &value).await?;
        }
        self.sync_ready().await
    }

    /// Set a named engine option and wait until the engine has applied it.
    pub async fn configure(&mut self, name: &str, value: &str) -> Result<(), EngineError> {
        self.ensure_idle()?;
        self.send_setoption(name, value).await?;
        self.sync_ready().await
    }

    pub async fn set_position(&mut self, position: &Position) -> Result<(), EngineError> {
        self.ensure_idle()?;
        self.send(&format!("position fen {}", position.fen())).await?;
        tracing::debug!(fen = %position.fen(), "Position set");
        self.position = Some(position.clone());
        Ok(())
    }

    /// Send `go` for the current position.
    pub async fn start_search(&mut self, limits: &AnalysisLimits) -> Result<(), EngineError> {
        self.ensure_idle()?;
        limits.validate()?;
        if self.position.is_none() {
            return Err(EngineError::NoPosition);
        }

        let wanted = limits.multi_pv_count();
        if wanted != self.multi_pv {
            self.send_setoption("MultiPV", &wanted.to_string()).await?;
            self.multi_pv = wanted;
        }

        self.send(&limits.go_command()).await?;
        self.state = SessionState::Searching;
        self.search = SearchProgress::new(wanted);
        tracing::info!(depth = ?limits.depth, time_ms = ?limits.time_ms, multi_pv = wanted, "Search started");
        Ok(())
    }

    /// Read progress until `bestmove`. Cancel-safe.
    pub async fn await_result(&mut self) -> Result<AnalysisResult, EngineError> {
        self.ensure_usable()?;
        if self.state != SessionState::Searching {
            return Err(EngineError::NoSearch);
        }

        loop {
            match self.next_message().await? {
                UciMessage::Info(info) => self.search.record(info),
                UciMessage::BestMove { mv, .. } => {
                    self.state = SessionState::Ready;
                    let result = std::mem::take(&mut self.search).finish(mv);
                    tracing::info!(
                        best_move = ?result.best_move,
                        depth = result.depth_reached,
                        "Search complete"
                    );
                    return Ok(result);
                }
                other => tracing::trace!("Ignoring UCI message during search: {:?}", other),
            }
        }
    }

    pub async fn go(&mut self, limits: &AnalysisLimits) -> Result<AnalysisResult, EngineError> {
        self.start_search(limits).await?;
        self.await_result().await
    }

    /// Stop the open search and drain through its `bestmove`, so the next
    /// `go` starts from a clean stream. No-op when idle.
    pub async fn stop(&mut self) -> Result<(), EngineError> {
        self.ensure_usable()?;
        if self.state != SessionState::Searching {
            return Ok(());
        }

        tracing::info!("Sending stop command to engine");
        self.send("stop").await?;

        let waited = tokio::time::timeout(STOP_DRAIN_TIMEOUT, async {
            loop {
                if let UciMessage::BestMove { .. } = self.next_message().await? {
                    return Ok::<(), EngineError>(());
                }
            }
        })
        .await;

        match waited {
            Ok(Ok(())) => {
                self.state = SessionState::Ready;
                self.search = SearchProgress::default();
                tracing::debug!("Engine drained after stop");
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(self.fault("timed out draining search after stop")),
        }
    }

    /// Send `quit` and release the process. Safe to call more than once.
    pub async fn shutdown(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        tracing::info!("Shutting down engine");

        if self.state == SessionState::Searching {
            let _ = self.stop().await;
        }
        let _ = self.write_line("quit").await;
        self.state = SessionState::Closed;

        if let Some(mut process) = self.process.take() {
            let _ = tokio::time::timeout(QUIT_TIMEOUT, process.wait()).await;
            let _ = process.kill().await;
        }
    }

    async fn sync_ready(&mut self) -> Result<(), EngineError> {
        self.send("isready").await?;

        let waited = tokio::time::timeout(READY_TIMEOUT, async {
            loop {
                if let UciMessage::ReadyOk = self.next_message().await? {
                    return Ok::<(), EngineError>(());
                }
            }
        })
        .await;

        match waited {
            Ok(result) => result,
            Err(_) => Err(self.fault("timed out waiting for readyok")),
        }
    }

    async fn send_setoption(&mut self, name: &str, value: &str) -> Result<(), EngineError> {
        tracing::info!("Setting option {} = {}", name, value);
        self.send(&format!("setoption name {} value {}", name, value))
            .await
    }

    async fn send(&mut self, cmd: &str) -> Result<(), EngineError> {
        self.ensure_usable()?;
        if let Err(e) = self.write_line(cmd).await {
            return Err(self.fault(format!("failed to write '{}': {}", cmd, e)));
        }
        Ok(())
    }

    async fn write_line(&mut self, cmd: &str) -> std::io::Result<()> {
        tracing::trace!("UCI >> {}", cmd);
        self.stdin.write_all(format!("{}\n", cmd).as_bytes()).await?;
        self.stdin.flush().await
    }

    /// Next line that parses as a known message. Unknown lines are skipped;
    /// an unreadable `bestmove` or a closed stream faults the session.
    async fn next_message(&mut self) -> Result<UciMessage, EngineError> {
        self.ensure_usable()?;
        loop {
            let line = match self.lines.next().await {
                Some(Ok(line)) => line,
                Some(Err(e)) => return Err(self.fault(format!("read error: {}", e))),
                None => return Err(self.fault("engine closed its output")),
            };
            let trimmed = line.trim();
            tracing::trace!("UCI << {}", trimmed);

            match parse_uci_message(trimmed) {
                Ok(msg) => return Ok(msg),
                Err(UciError::MalformedMessage(l)) => {
                    return Err(self.fault(format!("malformed terminal line: {}", l)))
                }
                Err(e) => tracing::trace!("Skipping line: {}", e),
            }
        }
    }

    fn ensure_usable(&self) -> Result<(), EngineError> {
        match self.state {
            SessionState::Faulted => Err(EngineError::Protocol("session is faulted".to_string())),
            SessionState::Closed => Err(EngineError::Protocol("session is closed".to_string())),
            SessionState::Ready | SessionState::Searching => Ok(()),
        }
    }

    fn ensure_idle(&self) -> Result<(), EngineError> {
        self.ensure_usable()?;
        if self.state == SessionState::Searching {
            tracing::error!("Search requested while another search is open");
            return Err(EngineError::Busy);
        }
        Ok(())
    }

    fn fault(&mut self, msg: impl Into<String>) -> EngineError {
        let msg = msg.into();
        tracing::error!("Engine session faulted: {}", msg);
        self.state = SessionState::Faulted;
        EngineError::Protocol(msg)
    }
}

#[async_trait]
impl AnalysisEngine for EngineSession {
    async fn set_position(&mut self, position: &Position) -> Result<(), EngineError> {
        EngineSession::set_position(self, position).await
    }

    async fn start_search(&mut self, limits: &AnalysisLimits) -> Result<(), EngineError> {
        EngineSession::start_search(self, limits).await
    }

    async fn await_result(&mut self) -> Result<AnalysisResult, EngineError> {
        EngineSession::await_result(self).await
    }

    async fn stop(&mut self) -> Result<(), EngineError> {
        EngineSession::stop(self).await
    }

    async fn shutdown(&mut self) {
        EngineSession::shutdown(self).await
    }
}

/// Latest progress per tracked `multipv` index of the open search.
#[derive(Debug, Default)]
struct SearchProgress {
    tracked: u32,
    lines: BTreeMap<u32, PvLine>,
}

impl SearchProgress {
    fn new(tracked: u32) -> Self {
        Self {
            tracked,
            lines: BTreeMap::new(),
        }
    }

    fn record(&mut self, info: EngineInfo) {
        // Free text, currmove/nodes-only and aspiration-window lines carry
        // no usable evaluation
        if info.string.is_some() || info.bound || (info.pv.is_empty() && info.score.is_none()) {
            return;
        }
        let index = info.multipv.unwrap_or(1);
        if index == 0 || index > self.tracked.max(1) {
            return;
        }

        let line = self.lines.entry(index).or_insert_with(|| PvLine {
            multipv: index,
            depth: 0,
            score: None,
            pv: Vec::new(),
        });
        if let Some(depth) = info.depth {
            line.depth = line.depth.max(depth);
        }
        if let Some(score) = info.score {
            line.score = Some(score);
        }
        if !info.pv.is_empty() {
            line.pv = info.pv;
        }
    }

    fn finish(self, best_move: Option<String>) -> AnalysisResult {
        let (score, principal_variation, depth_reached) = match self.lines.get(&1) {
            Some(line) => (line.score, line.pv.clone(), line.depth),
            None => (None, Vec::new(), 0),
        };
        AnalysisResult {
            best_move,
            score,
            principal_variation,
            depth_reached,
            lines: self.lines.into_values().collect(),
        }
    }
}
