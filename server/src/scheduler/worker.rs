use engine::{AnalysisEngine, AnalysisResult, EngineError, EngineLauncher};
use tokio::sync::{mpsc, oneshot};

use super::request::{PendingRequest, SchedulerCommand};
use super::AnalysisError;

/// What ended an attempt that did not run to `bestmove`.
#[derive(Clone, Copy)]
enum Interrupt {
    Deadline,
    Canceled,
}

enum Attempt {
    /// Outcome to deliver; `None` when the caller has gone away.
    Finished(Option<Result<AnalysisResult, AnalysisError>>),
    /// The engine is unusable. The request may be retried on a fresh one.
    Faulted(AnalysisError),
}

/// Sole owner of the engine. Serves queued requests one at a time.
pub(crate) struct SchedulerWorker<L: EngineLauncher> {
    launcher: L,
    engine: Option<L::Engine>,
    cmd_rx: mpsc::Receiver<SchedulerCommand>,
    /// Set after a fault; the next request served gets one retry.
    recovering: bool,
    closing: bool,
}

impl<L: EngineLauncher> SchedulerWorker<L> {
    pub fn new(launcher: L, cmd_rx: mpsc::Receiver<SchedulerCommand>) -> Self {
        Self {
            launcher,
            engine: None,
            cmd_rx,
            recovering: false,
            closing: false,
        }
    }

    pub async fn run(mut self) {
        tracing::info!("Analysis worker started");
        let mut shutdown_acks: Vec<oneshot::Sender<()>> = Vec::new();

        while let Some(cmd) = self.cmd_rx.recv().await {
            match cmd {
                SchedulerCommand::Analyze(request) if self.closing => {
                    tracing::debug!(request_id = %request.id, "Canceling request queued before shutdown");
                    request.respond(Err(AnalysisError::Canceled));
                }
                SchedulerCommand::Analyze(request) => self.serve(request).await,
                SchedulerCommand::Shutdown { reply } => {
                    if !self.closing {
                        tracing::info!("Scheduler shutting down, closing queue");
                        self.closing = true;
                        self.cmd_rx.close();
                    }
                    shutdown_acks.push(reply);
                }
            }
        }

        self.discard_engine().await;
        for ack in shutdown_acks {
            let _ = ack.send(());
        }
        tracing::info!("Analysis worker exiting");
    }

    #[tracing::instrument(level = "info", skip_all, fields(request_id = %request.id))]
    async fn serve(&mut self, mut request: PendingRequest) {
        if request.is_canceled() {
            tracing::debug!("Skipping canceled request");
            return;
        }
        if request.is_expired() {
            tracing::debug!("Skipping request whose deadline passed in the queue");
            request.respond(Err(AnalysisError::Timeout));
            return;
        }

        tracing::debug!(
            queued_ms = request.submitted_at.elapsed().as_millis() as u64,
            "Serving analysis request"
        );
        if self.recovering {
            request.retries_left = 1;
            self.recovering = false;
        }

        loop {
            match self.attempt(&mut request).await {
                Attempt::Finished(Some(outcome)) => {
                    request.respond(outcome);
                    return;
                }
                Attempt::Finished(None) => return,
                Attempt::Faulted(err) => {
                    self.discard_engine().await;
                    let retry = request.retries_left > 0
                        && !request.is_expired()
                        && !request.is_canceled();
                    if retry {
                        request.retries_left -= 1;
                        tracing::warn!("Engine faulted ({}), retrying on a fresh engine", err);
                        continue;
                    }
                    tracing::error!("Analysis failed: {}", err);
                    self.recovering = true;
                    request.respond(Err(err));
                    return;
                }
            }
        }
    }

    async fn attempt(&mut self, request: &mut PendingRequest) -> Attempt {
        let engine = match self.ensure_engine().await {
            Ok(engine) => engine,
            Err(e) => return Attempt::Finished(Some(Err(e.into()))),
        };

        if let Err(e) = engine.set_position(&request.position).await {
            return failed(e);
        }
        if let Err(e) = engine.start_search(&request.limits).await {
            return failed(e);
        }

        let deadline = request.deadline;
        let waited = tokio::select! {
            result = engine.await_result() => Ok(result),
            _ = tokio::time::sleep_until(deadline) => Err(Interrupt::Deadline),
            _ = request.reply.closed() => Err(Interrupt::Canceled),
        };

        let interrupt = match waited {
            Ok(Ok(result)) => return Attempt::Finished(Some(Ok(result))),
            Ok(Err(e)) => return failed(e),
            Err(interrupt) => interrupt,
        };

        match interrupt {
            Interrupt::Deadline => tracing::warn!("Deadline reached mid-search, stopping engine"),
            Interrupt::Canceled => tracing::info!("Caller canceled mid-search, stopping engine"),
        }
        if let Err(e) = engine.stop().await {
            tracing::error!("Engine did not stop cleanly: {}", e);
            self.discard_engine().await;
            self.recovering = true;
        }

        match interrupt {
            Interrupt::Deadline => Attempt::Finished(Some(Err(AnalysisError::Timeout))),
            Interrupt::Canceled => Attempt::Finished(None),
        }
    }

    /// The live engine, launching one if needed. A failed launch is retried
    /// once before giving up.
    async fn ensure_engine(&mut self) -> Result<&mut L::Engine, EngineError> {
        if self.engine.is_none() {
            let engine = match self.launcher.launch().await {
                Ok(engine) => engine,
                Err(first) => {
                    tracing::warn!("Engine launch failed ({}), trying once more", first);
                    self.launcher.launch().await?
                }
            };
            tracing::info!("Engine ready");
            self.engine = Some(engine);
        }
        self.engine
            .as_mut()
            .ok_or_else(|| EngineError::Unavailable("engine not running".to_string()))
    }

    async fn discard_engine(&mut self) {
        if let Some(mut engine) = self.engine.take() {
            engine.shutdown().await;
        }
    }
}

fn failed(e: EngineError) -> Attempt {
    if e.is_fatal() {
        Attempt::Faulted(e.into())
    } else {
        Attempt::Finished(Some(Err(e.into())))
    }
}
