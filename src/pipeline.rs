// Analysis pipeline
//
// Applies one step of the state machine to a persisted analysis and runs the
// terminal side effects once the final stage is reached. Every failure after
// creation ends in the `failed` status; the driver only sees an error when the
// store itself could not be written.

use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::analysis::{
    advance, artifacts, transition, Analysis, AnalysisEvent, AnalysisStatus, NewAnalysis,
    ResultArtifact, TransitionError, ValidationError,
};
use crate::evaluator::{demo, try_evaluate, BiomarkerCandidate, EvaluationError, EvaluationReport};
use crate::input::RecordSource;
use crate::store::{AnalysisStore, StoreError};

pub const CANCELLED_REASON: &str = "cancelled";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] ValidationError),

    #[error("analysis {id} not found")]
    NotFound { id: Uuid },

    #[error("illegal transition: {0}")]
    Transition(#[from] TransitionError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

pub struct AnalysisPipeline {
    store: Arc<dyn AnalysisStore>,
    source: Arc<dyn RecordSource>,
    fallback_on_evaluation_error: bool,
}

impl AnalysisPipeline {
    pub fn new(store: Arc<dyn AnalysisStore>, source: Arc<dyn RecordSource>) -> Self {
        Self {
            store,
            source,
            fallback_on_evaluation_error: false,
        }
    }

    /// Store the demonstration candidate and complete when evaluation errors.
    pub fn with_evaluation_fallback(mut self, enabled: bool) -> Self {
        self.fallback_on_evaluation_error = enabled;
        self
    }

    pub fn store(&self) -> &Arc<dyn AnalysisStore> {
        &self.store
    }

    /// Validate a request and persist it as a queued analysis.
    pub async fn create(&self, request: NewAnalysis) -> Result<Analysis, PipelineError> {
        let analysis = Analysis::new(request)?;
        self.store.insert_analysis(&analysis).await?;

        info!(
            analysis.id = %analysis.id,
            owner = %analysis.owner,
            name = %analysis.name,
            "Analysis queued"
        );
        Ok(analysis)
    }

    pub async fn get(&self, owner: &str, id: Uuid) -> Result<Analysis, PipelineError> {
        self.store
            .get_analysis(owner, id)
            .await?
            .ok_or(PipelineError::NotFound { id })
    }

    /// Move the analysis one stage forward and persist it.
    ///
    /// The step that enters the final stage also evaluates the input, stores
    /// candidates and artifacts, and completes (or fails) the analysis. A
    /// running analysis already at the final stage retries that work.
    pub async fn step(&self, owner: &str, id: Uuid) -> Result<Analysis, PipelineError> {
        let current = self.get(owner, id).await?;
        if current.status == AnalysisStatus::Running
            && current.current_stage.is_some_and(|stage| stage.is_final())
        {
            info!(analysis.id = %id, "Retrying results generation");
            return self.finish(current).await;
        }

        let next = advance(&current)?;

        info!(
            analysis.id = %id,
            stage = ?next.current_stage,
            progress = next.progress,
            status = %next.status,
            "Analysis advanced"
        );

        self.write(&current, &next).await?;

        match next.current_stage {
            Some(stage) if stage.is_final() => self.finish(next).await,
            _ => Ok(next),
        }
    }

    /// Stop a non-terminal analysis, recording it as failed.
    pub async fn cancel(&self, owner: &str, id: Uuid) -> Result<Analysis, PipelineError> {
        let current = self.get(owner, id).await?;
        self.fail(&current, CANCELLED_REASON).await
    }

    pub async fn biomarkers(
        &self,
        owner: &str,
        id: Uuid,
    ) -> Result<Vec<BiomarkerCandidate>, PipelineError> {
        Ok(self.store.biomarkers(owner, id).await?)
    }

    pub async fn artifacts(
        &self,
        owner: &str,
        id: Uuid,
    ) -> Result<Vec<ResultArtifact>, PipelineError> {
        Ok(self.store.artifacts(owner, id).await?)
    }

    async fn finish(&self, running: Analysis) -> Result<Analysis, PipelineError> {
        let report = match self.evaluate(&running) {
            Ok(report) => report,
            Err(e) if self.fallback_on_evaluation_error => {
                warn!(
                    analysis.id = %running.id,
                    error = %e,
                    "Evaluation failed, storing demonstration biomarker"
                );
                match try_evaluate(&[demo::fallback_record()]) {
                    Ok(report) => report,
                    Err(e) => return self.fail(&running, &e.to_string()).await,
                }
            }
            Err(e) => {
                error!(analysis.id = %running.id, error = %e, "Evaluation failed");
                return self.fail(&running, &e.to_string()).await;
            }
        };

        let now = Utc::now();
        let artifacts = artifacts::build(running.id, &report, now);
        let completed = transition(&running, &AnalysisEvent::Complete, now)?;

        if let Err(e) = self
            .store
            .record_results(&completed, &report.candidates, &artifacts)
            .await
        {
            error!(analysis.id = %running.id, error = %e, "Failed to store analysis results");
            self.mark_failed(&running, &e).await;
            return Err(e.into());
        }

        info!(
            analysis.id = %completed.id,
            biomarkers = report.candidates.len(),
            artifacts = artifacts.len(),
            "Analysis completed"
        );
        Ok(completed)
    }

    fn evaluate(&self, analysis: &Analysis) -> Result<EvaluationReport, EvaluationError> {
        let records = self.source.load(analysis)?;
        try_evaluate(&records)
    }

    async fn fail(&self, current: &Analysis, reason: &str) -> Result<Analysis, PipelineError> {
        let failed = transition(
            current,
            &AnalysisEvent::Fail {
                reason: reason.to_string(),
            },
            Utc::now(),
        )?;
        self.write(current, &failed).await?;

        warn!(
            analysis.id = %failed.id,
            stage = ?failed.current_stage,
            progress = failed.progress,
            reason = %reason,
            "Analysis failed"
        );
        Ok(failed)
    }

    /// Persist `next`, falling back to recording `previous` as failed.
    async fn write(&self, previous: &Analysis, next: &Analysis) -> Result<(), PipelineError> {
        if let Err(e) = self.store.update_analysis(next).await {
            error!(analysis.id = %next.id, error = %e, "Failed to persist analysis state");
            if !next.is_terminal() {
                self.mark_failed(previous, &e).await;
            }
            return Err(e.into());
        }
        Ok(())
    }

    async fn mark_failed(&self, analysis: &Analysis, cause: &StoreError) {
        let reason = format!("persistence error: {cause}");
        let failed = match transition(analysis, &AnalysisEvent::Fail { reason }, Utc::now()) {
            Ok(failed) => failed,
            Err(_) => return,
        };

        if let Err(e) = self.store.update_analysis(&failed).await {
            error!(
                analysis.id = %analysis.id,
                error = %e,
                "Could not record persistence failure"
            );
        }
    }
}
