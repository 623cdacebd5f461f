use chess::Position;
use engine::{AnalysisLimits, AnalysisResult};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use super::request::{PendingRequest, SchedulerCommand};
use super::AnalysisError;

/// Cheap, cloneable handle to the scheduler worker.
#[derive(Clone)]
pub struct SchedulerHandle {
    cmd_tx: mpsc::Sender<SchedulerCommand>,
}

impl SchedulerHandle {
    pub(crate) fn new(cmd_tx: mpsc::Sender<SchedulerCommand>) -> Self {
        Self { cmd_tx }
    }

    /// Queue an analysis and wait for its result.
    ///
    /// Returns `Timeout` at `deadline` even if the request is still queued.
    /// Dropping the returned future cancels the request; the worker then
    /// stops the engine if that search had already started.
    pub async fn submit(
        &self,
        position: Position,
        limits: AnalysisLimits,
        deadline: Instant,
    ) -> Result<AnalysisResult, AnalysisError> {
        limits.validate()?;

        let (tx, rx) = oneshot::channel();
        let request = PendingRequest::new(position, limits, deadline, tx);
        let request_id = request.id;
        tracing::debug!(%request_id, fen = %request.position.fen(), "Submitting analysis");

        let waited = tokio::time::timeout_at(deadline, async {
            self.cmd_tx
                .send(SchedulerCommand::Analyze(request))
                .await
                .map_err(|_| AnalysisError::SchedulerClosed)?;
            rx.await.map_err(|_| AnalysisError::SchedulerClosed)?
        })
        .await;

        match waited {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::warn!(%request_id, "Analysis deadline elapsed");
                Err(AnalysisError::Timeout)
            }
        }
    }

    /// Close the queue, let the worker answer what is left and wait until
    /// the engine is shut down.
    pub async fn shutdown(&self) {
        let (tx, rx) = oneshot::channel();
        if self
            .cmd_tx
            .send(SchedulerCommand::Shutdown { reply: tx })
            .await
            .is_ok()
        {
            let _ = rx.await;
        }
    }
}
