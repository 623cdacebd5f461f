use chess::Position;
use engine::{AnalysisLimits, AnalysisResult};
use tokio::sync::oneshot;
use tokio::time::Instant;
use uuid::Uuid;

use super::AnalysisError;

pub(crate) type AnalysisReply = oneshot::Sender<Result<AnalysisResult, AnalysisError>>;

/// Commands accepted by the scheduler worker.
pub(crate) enum SchedulerCommand {
    Analyze(PendingRequest),
    Shutdown { reply: oneshot::Sender<()> },
}

/// One queued analysis, owned by the worker until its outcome is delivered.
///
/// Cancellation is observed through the reply channel: once the caller drops
/// its receiver, `reply.is_closed()` turns true.
pub(crate) struct PendingRequest {
    pub id: Uuid,
    pub position: Position,
    pub limits: AnalysisLimits,
    pub submitted_at: Instant,
    pub deadline: Instant,
    /// Extra attempts allowed on a fresh engine after a fault.
    pub retries_left: u8,
    pub reply: AnalysisReply,
}

impl PendingRequest {
    pub fn new(
        position: Position,
        limits: AnalysisLimits,
        deadline: Instant,
        reply: AnalysisReply,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            position,
            limits,
            submitted_at: Instant::now(),
            deadline,
            retries_left: 0,
            reply,
        }
    }

    pub fn is_canceled(&self) -> bool {
        self.reply.is_closed()
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// Deliver the outcome. A caller that already left is not an error.
    pub fn respond(self, outcome: Result<AnalysisResult, AnalysisError>) {
        let _ = self.reply.send(outcome);
    }
}
