//! Seams between the scheduler and a concrete engine.

use async_trait::async_trait;
use chess::Position;

use crate::{AnalysisLimits, AnalysisResult, EngineError};

/// One engine speaking a search protocol. Implementations assume a single
/// caller: at most one search is open at a time.
#[async_trait]
pub trait AnalysisEngine: Send {
    async fn set_position(&mut self, position: &Position) -> Result<(), EngineError>;

    /// Start a search. Must be matched by `await_result` or `stop` before the
    /// next search starts.
    async fn start_search(&mut self, limits: &AnalysisLimits) -> Result<(), EngineError>;

    /// Wait for the open search to finish. Cancel-safe: dropping the future
    /// keeps the search open and its progress intact.
    async fn await_result(&mut self) -> Result<AnalysisResult, EngineError>;

    /// Stop the open search, if any, and drain up to its terminal line.
    async fn stop(&mut self) -> Result<(), EngineError>;

    /// Quit and release the engine. Idempotent.
    async fn shutdown(&mut self);

    async fn go(&mut self, limits: &AnalysisLimits) -> Result<AnalysisResult, EngineError> {
        self.start_search(limits).await?;
        self.await_result().await
    }
}

/// Creates fresh engines, both at first use and after a fault.
#[async_trait]
pub trait EngineLauncher: Send + Sync + 'static {
    type Engine: AnalysisEngine + 'static;

    async fn launch(&self) -> Result<Self::Engine, EngineError>;
}
