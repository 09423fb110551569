use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::types::{Analysis, AnalysisStatus, Stage};

/// Events accepted by the analysis state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisEvent {
    /// Move to the next stage, starting the run if still queued.
    Advance,
    /// Finish a run that has reached the final stage.
    Complete,
    Fail { reason: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("analysis {status} is terminal, {event:?} not allowed")]
    Terminal {
        status: AnalysisStatus,
        event: AnalysisEvent,
    },

    #[error("no stage follows {stage}, the run must complete")]
    NoNextStage { stage: Stage },

    #[error("cannot complete at {stage:?}, stages remain")]
    StagesRemaining { stage: Option<Stage> },

    #[error("analysis progress {progress} does not match stage {stage:?}")]
    Inconsistent { progress: u8, stage: Option<Stage> },
}

/// Apply one event, returning the next analysis value.
///
/// Status only moves forward (queued, running, then completed or failed) and
/// each `Advance` moves exactly one row down the stage table.
pub fn transition(
    analysis: &Analysis,
    event: &AnalysisEvent,
    now: DateTime<Utc>,
) -> Result<Analysis, TransitionError> {
    if analysis.is_terminal() {
        return Err(TransitionError::Terminal {
            status: analysis.status,
            event: event.clone(),
        });
    }
    if !analysis.progress_matches_stage() {
        return Err(TransitionError::Inconsistent {
            progress: analysis.progress,
            stage: analysis.current_stage,
        });
    }

    let mut next = analysis.clone();

    match (analysis.status, analysis.current_stage, event) {
        (AnalysisStatus::Queued, _, AnalysisEvent::Advance) => {
            next.status = AnalysisStatus::Running;
            next.started_at = Some(now);
            enter(&mut next, Stage::Preprocessing);
        }

        (AnalysisStatus::Running, Some(stage), AnalysisEvent::Advance) => {
            let following = stage.next().ok_or(TransitionError::NoNextStage { stage })?;
            enter(&mut next, following);
        }

        (AnalysisStatus::Running, Some(stage), AnalysisEvent::Complete) if stage.is_final() => {
            next.status = AnalysisStatus::Completed;
            next.completed_at = Some(now);
        }

        (_, stage, AnalysisEvent::Complete) => {
            return Err(TransitionError::StagesRemaining { stage });
        }

        (_, _, AnalysisEvent::Fail { reason }) => {
            next.status = AnalysisStatus::Failed;
            next.failure_reason = Some(reason.clone());
            next.completed_at = Some(now);
        }

        // A running analysis always carries a stage
        (AnalysisStatus::Running, None, AnalysisEvent::Advance) => {
            return Err(TransitionError::Inconsistent {
                progress: analysis.progress,
                stage: None,
            });
        }

        (AnalysisStatus::Completed | AnalysisStatus::Failed, _, _) => {
            return Err(TransitionError::Terminal {
                status: analysis.status,
                event: event.clone(),
            });
        }
    }

    Ok(next)
}

/// Step function the driver calls repeatedly.
pub fn advance(analysis: &Analysis) -> Result<Analysis, TransitionError> {
    transition(analysis, &AnalysisEvent::Advance, Utc::now())
}

fn enter(analysis: &mut Analysis, stage: Stage) {
    analysis.current_stage = Some(stage);
    analysis.progress = stage.progress();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::NewAnalysis;

    fn queued() -> Analysis {
        Analysis::new(NewAnalysis::new("user-1", "panel")).unwrap()
    }

    #[test]
    fn walks_the_stage_table_in_order() {
        let mut analysis = queued();
        let mut seen = Vec::new();

        for _ in 0..4 {
            analysis = advance(&analysis).unwrap();
            assert_eq!(analysis.status, AnalysisStatus::Running);
            assert!(analysis.progress_matches_stage());
            seen.push((analysis.current_stage.unwrap(), analysis.progress));
        }

        assert_eq!(
            seen,
            vec![
                (Stage::Preprocessing, 25),
                (Stage::MutationAnalysis, 65),
                (Stage::BiomarkerIdentification, 85),
                (Stage::ResultsGeneration, 100),
            ]
        );
        assert!(analysis.started_at.is_some());
    }

    #[test]
    fn cannot_advance_past_final_stage() {
        let mut analysis = queued();
        for _ in 0..4 {
            analysis = advance(&analysis).unwrap();
        }

        assert_eq!(
            advance(&analysis).unwrap_err(),
            TransitionError::NoNextStage {
                stage: Stage::ResultsGeneration
            }
        );
    }

    #[test]
    fn completion_requires_final_stage() {
        let analysis = advance(&queued()).unwrap();
        let err = transition(&analysis, &AnalysisEvent::Complete, Utc::now()).unwrap_err();
        assert_eq!(
            err,
            TransitionError::StagesRemaining {
                stage: Some(Stage::Preprocessing)
            }
        );

        assert!(transition(&queued(), &AnalysisEvent::Complete, Utc::now()).is_err());
    }

    #[test]
    fn terminal_states_reject_everything() {
        let mut analysis = queued();
        for _ in 0..4 {
            analysis = advance(&analysis).unwrap();
        }
        let done = transition(&analysis, &AnalysisEvent::Complete, Utc::now()).unwrap();
        assert_eq!(done.status, AnalysisStatus::Completed);
        assert!(done.completed_at.is_some());

        for event in [
            AnalysisEvent::Advance,
            AnalysisEvent::Complete,
            AnalysisEvent::Fail {
                reason: "late".to_string(),
            },
        ] {
            assert!(matches!(
                transition(&done, &event, Utc::now()),
                Err(TransitionError::Terminal { .. })
            ));
        }
    }

    #[test]
    fn failure_keeps_last_stage() {
        let running = advance(&advance(&queued()).unwrap()).unwrap();
        let failed = transition(
            &running,
            &AnalysisEvent::Fail {
                reason: "disk full".to_string(),
            },
            Utc::now(),
        )
        .unwrap();

        assert_eq!(failed.status, AnalysisStatus::Failed);
        assert_eq!(failed.current_stage, Some(Stage::MutationAnalysis));
        assert_eq!(failed.progress, 65);
        assert_eq!(failed.failure_reason.as_deref(), Some("disk full"));
    }

    #[test]
    fn queued_analysis_can_fail_before_starting() {
        let failed = transition(
            &queued(),
            &AnalysisEvent::Fail {
                reason: "cancelled".to_string(),
            },
            Utc::now(),
        )
        .unwrap();
        assert_eq!(failed.status, AnalysisStatus::Failed);
        assert_eq!(failed.current_stage, None);
    }

    #[test]
    fn inconsistent_progress_is_rejected() {
        let mut analysis = advance(&queued()).unwrap();
        analysis.progress = 50;
        assert!(matches!(
            advance(&analysis),
            Err(TransitionError::Inconsistent { progress: 50, .. })
        ));
    }
}
