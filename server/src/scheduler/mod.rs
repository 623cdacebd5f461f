//! FIFO analysis queue in front of the single engine.
//!
//! Callers hold a [`SchedulerHandle`]; one worker task owns the engine and
//! serves requests in submission order. Deadlines and caller cancellation
//! both end in stop-and-drain, so the engine is always idle before the next
//! request starts.

mod handle;
mod request;
mod worker;

pub use handle::SchedulerHandle;

use engine::{EngineError, EngineLauncher, LimitsError};
use tokio::sync::mpsc;

use worker::SchedulerWorker;

#[derive(Debug, Clone, thiserror::Error)]
pub enum AnalysisError {
    #[error("Analysis did not finish before its deadline")]
    Timeout,
    #[error("Analysis request was canceled")]
    Canceled,
    #[error("Engine unavailable: {0}")]
    EngineUnavailable(String),
    #[error("Engine protocol error: {0}")]
    EngineProtocol(String),
    #[error("Invalid analysis limits: {0}")]
    InvalidLimits(#[from] LimitsError),
    #[error("Analysis scheduler is shut down")]
    SchedulerClosed,
}

impl From<EngineError> for AnalysisError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Unavailable(msg) => Self::EngineUnavailable(msg),
            EngineError::Protocol(msg) => Self::EngineProtocol(msg),
            EngineError::Limits(e) => Self::InvalidLimits(e),
            other @ (EngineError::Busy | EngineError::NoSearch | EngineError::NoPosition) => {
                Self::EngineProtocol(other.to_string())
            }
        }
    }
}

/// Start the worker task and return a handle to it.
///
/// `capacity` bounds the queue; submitters wait for room (up to their
/// deadline) when it is full. No engine is launched until the first request.
pub fn spawn_scheduler<L: EngineLauncher>(launcher: L, capacity: usize) -> SchedulerHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel(capacity.max(1));
    let worker = SchedulerWorker::new(launcher, cmd_rx);
    tokio::spawn(worker.run());
    tracing::info!(capacity, "Analysis scheduler started");
    SchedulerHandle::new(cmd_tx)
}
