// Analysis scheduler
//
// Drives each analysis through its four steps on its own tokio task, sleeping
// the configured delay before every step. Runs are independent of each other
// and can be cancelled between steps.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{watch, Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{info, Instrument};
use uuid::Uuid;

use crate::analysis::Analysis;
use crate::pipeline::{AnalysisPipeline, PipelineError};
use crate::telemetry::{create_analysis_span, generate_correlation_id};

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("analysis {id} is already scheduled")]
    AlreadyScheduled { id: Uuid },

    #[error("analysis {id} is not scheduled")]
    NotScheduled { id: Uuid },

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("analysis task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

struct Run {
    cancel: Arc<Notify>,
    // Flips to true once `drive` returns, so waiters never need to own the handle
    done: watch::Receiver<bool>,
    handle: JoinHandle<Result<Analysis, PipelineError>>,
}

pub struct AnalysisScheduler {
    pipeline: Arc<AnalysisPipeline>,
    delays: [Duration; 4],
    runs: Mutex<HashMap<Uuid, Run>>,
}

impl AnalysisScheduler {
    pub fn new(pipeline: Arc<AnalysisPipeline>, delays: [Duration; 4]) -> Self {
        Self {
            pipeline,
            delays,
            runs: Mutex::new(HashMap::new()),
        }
    }

    /// Scheduler that steps without waiting.
    pub fn immediate(pipeline: Arc<AnalysisPipeline>) -> Self {
        Self::new(pipeline, [Duration::ZERO; 4])
    }

    pub fn pipeline(&self) -> &Arc<AnalysisPipeline> {
        &self.pipeline
    }

    /// Spawn the run for a stored analysis.
    pub async fn start(&self, owner: &str, id: Uuid) -> Result<(), SchedulerError> {
        // Reject unknown or foreign analyses before spawning
        self.pipeline.get(owner, id).await?;

        let mut runs = self.runs.lock().await;
        if runs.get(&id).is_some_and(|run| !run.handle.is_finished()) {
            return Err(SchedulerError::AlreadyScheduled { id });
        }

        let correlation_id = generate_correlation_id();
        let span = create_analysis_span("scheduled_run", id, Some(&correlation_id));
        let cancel = Arc::new(Notify::new());
        let (done_tx, done) = watch::channel(false);

        let run = drive(
            self.pipeline.clone(),
            owner.to_string(),
            id,
            self.delays,
            cancel.clone(),
        );
        let handle = tokio::spawn(
            async move {
                let result = run.await;
                let _ = done_tx.send(true);
                result
            }
            .instrument(span),
        );

        info!(analysis.id = %id, correlation.id = %correlation_id, "Analysis run scheduled");
        runs.insert(
            id,
            Run {
                cancel,
                done,
                handle,
            },
        );
        Ok(())
    }

    /// Request cancellation before the run's next step.
    ///
    /// Returns false when the run is unknown or has already finished.
    pub async fn cancel(&self, id: Uuid) -> bool {
        let runs = self.runs.lock().await;
        match runs.get(&id) {
            Some(run) if !run.handle.is_finished() => {
                run.cancel.notify_one();
                info!(analysis.id = %id, "Analysis cancellation requested");
                true
            }
            _ => false,
        }
    }

    /// Cancel every unfinished run, returning how many were signalled.
    pub async fn cancel_all(&self) -> usize {
        let runs = self.runs.lock().await;
        let mut cancelled = 0;
        for run in runs.values().filter(|run| !run.handle.is_finished()) {
            run.cancel.notify_one();
            cancelled += 1;
        }
        cancelled
    }

    /// Ids of runs that have not finished yet.
    pub async fn active(&self) -> Vec<Uuid> {
        let runs = self.runs.lock().await;
        runs.iter()
            .filter(|(_, run)| !run.handle.is_finished())
            .map(|(id, _)| *id)
            .collect()
    }

    /// Wait for a run to end and return the analysis as it finished.
    ///
    /// The run stays registered until it has finished, so dropping this
    /// future early leaves it reachable by `cancel_all` and `wait_all`.
    pub async fn wait(&self, id: Uuid) -> Result<Analysis, SchedulerError> {
        let mut done = self
            .runs
            .lock()
            .await
            .get(&id)
            .map(|run| run.done.clone())
            .ok_or(SchedulerError::NotScheduled { id })?;

        // A closed channel means the task ended without reporting (panic or abort)
        let _ = done.wait_for(|finished| *finished).await;

        let run = self
            .runs
            .lock()
            .await
            .remove(&id)
            .ok_or(SchedulerError::NotScheduled { id })?;

        Ok(run.handle.await??)
    }

    /// Wait for every scheduled run, in no particular order.
    pub async fn wait_all(&self) -> Vec<(Uuid, Result<Analysis, SchedulerError>)> {
        let drained: Vec<(Uuid, Run)> = self.runs.lock().await.drain().collect();

        let mut finished = Vec::with_capacity(drained.len());
        for (id, run) in drained {
            let result = match run.handle.await {
                Ok(result) => result.map_err(SchedulerError::from),
                Err(e) => Err(e.into()),
            };
            finished.push((id, result));
        }
        finished
    }
}

async fn drive(
    pipeline: Arc<AnalysisPipeline>,
    owner: String,
    id: Uuid,
    delays: [Duration; 4],
    cancel: Arc<Notify>,
) -> Result<Analysis, PipelineError> {
    for delay in delays {
        tokio::select! {
            _ = cancel.notified() => {
                info!(analysis.id = %id, "Stopping analysis run");
                return pipeline.cancel(&owner, id).await;
            }
            _ = tokio::time::sleep(delay) => {}
        }

        let analysis = pipeline.step(&owner, id).await?;
        if analysis.is_terminal() {
            return Ok(analysis);
        }
    }

    pipeline.get(&owner, id).await
}
