use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// Named processing phase with its fixed progress percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Preprocessing,
    MutationAnalysis,
    BiomarkerIdentification,
    ResultsGeneration,
}

impl Stage {
    /// Stage table, in execution order.
    pub const ALL: [Stage; 4] = [
        Stage::Preprocessing,
        Stage::MutationAnalysis,
        Stage::BiomarkerIdentification,
        Stage::ResultsGeneration,
    ];

    pub fn progress(self) -> u8 {
        match self {
            Stage::Preprocessing => 25,
            Stage::MutationAnalysis => 65,
            Stage::BiomarkerIdentification => 85,
            Stage::ResultsGeneration => 100,
        }
    }

    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Preprocessing => Some(Stage::MutationAnalysis),
            Stage::MutationAnalysis => Some(Stage::BiomarkerIdentification),
            Stage::BiomarkerIdentification => Some(Stage::ResultsGeneration),
            Stage::ResultsGeneration => None,
        }
    }

    pub fn is_final(self) -> bool {
        self.next().is_none()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Preprocessing => "preprocessing",
            Stage::MutationAnalysis => "mutation_analysis",
            Stage::BiomarkerIdentification => "biomarker_identification",
            Stage::ResultsGeneration => "results_generation",
        }
    }

    pub fn parse(label: &str) -> Option<Stage> {
        Stage::ALL.into_iter().find(|s| s.as_str() == label)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl AnalysisStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, AnalysisStatus::Completed | AnalysisStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisStatus::Queued => "queued",
            AnalysisStatus::Running => "running",
            AnalysisStatus::Completed => "completed",
            AnalysisStatus::Failed => "failed",
        }
    }

    pub fn parse(label: &str) -> Option<AnalysisStatus> {
        match label {
            "queued" => Some(AnalysisStatus::Queued),
            "running" => Some(AnalysisStatus::Running),
            "completed" => Some(AnalysisStatus::Completed),
            "failed" => Some(AnalysisStatus::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const MAX_DESCRIPTION_LEN: usize = 2000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("analysis name is required")]
    MissingName,

    #[error("owner is required")]
    MissingOwner,

    #[error("description exceeds {max} characters")]
    DescriptionTooLong { max: usize },

    #[error("a genomics file needs a proteomics input to integrate with")]
    GenomicsWithoutInput,
}

/// A request to create an analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAnalysis {
    pub owner: String,
    pub name: String,
    pub description: Option<String>,
    pub input_path: Option<PathBuf>,
    /// Genomics file integrated with `input_path` before evaluation
    #[serde(default)]
    pub genomics_path: Option<PathBuf>,
}

impl NewAnalysis {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            description: None,
            input_path: None,
            genomics_path: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_input(mut self, path: impl Into<PathBuf>) -> Self {
        self.input_path = Some(path.into());
        self
    }

    pub fn with_genomics(mut self, path: impl Into<PathBuf>) -> Self {
        self.genomics_path = Some(path.into());
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.owner.trim().is_empty() {
            return Err(ValidationError::MissingOwner);
        }
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingName);
        }
        if let Some(description) = &self.description {
            if description.chars().count() > MAX_DESCRIPTION_LEN {
                return Err(ValidationError::DescriptionTooLong {
                    max: MAX_DESCRIPTION_LEN,
                });
            }
        }
        if self.genomics_path.is_some() && self.input_path.is_none() {
            return Err(ValidationError::GenomicsWithoutInput);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    pub id: Uuid,
    pub owner: String,
    pub name: String,
    pub description: Option<String>,
    pub input_path: Option<PathBuf>,
    #[serde(default)]
    pub genomics_path: Option<PathBuf>,
    pub status: AnalysisStatus,
    pub progress: u8,
    pub current_stage: Option<Stage>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Analysis {
    /// Validate the request and build a queued analysis.
    pub fn new(request: NewAnalysis) -> Result<Self, ValidationError> {
        request.validate()?;

        Ok(Self {
            id: Uuid::new_v4(),
            owner: request.owner.trim().to_string(),
            name: request.name.trim().to_string(),
            description: request.description.filter(|d| !d.trim().is_empty()),
            input_path: request.input_path,
            genomics_path: request.genomics_path,
            status: AnalysisStatus::Queued,
            progress: 0,
            current_stage: None,
            failure_reason: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        })
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Progress and stage must match one row of the stage table, or be
    /// (0, none) before the first stage.
    pub fn progress_matches_stage(&self) -> bool {
        match self.current_stage {
            Some(stage) => self.progress == stage.progress(),
            None => self.progress == 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Bar,
    Pie,
}

/// Aggregate statistics over one evaluated batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub total_entries: usize,
    pub biomarker_count: usize,
    pub biomarker_percentage: f64,
    pub avg_sequence_length: f64,
    pub min_sequence_length: usize,
    pub max_sequence_length: usize,
    pub avg_distinct_symbols: f64,
    pub motif_percentage: f64,
    pub length_criteria_percentage: f64,
}

/// Sequences whose length falls in `[start, start + bin_width)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LengthBin {
    pub start: usize,
    pub biomarkers: u64,
    pub non_biomarkers: u64,
}

/// One assessed sequence on the length against distinct-residue plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScatterPoint {
    pub sequence_length: usize,
    pub distinct_symbols: usize,
    pub is_biomarker: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArtifactPayload {
    Chart {
        chart: ChartKind,
        counts: BTreeMap<String, u64>,
    },
    Histogram {
        bin_width: usize,
        bins: Vec<LengthBin>,
    },
    Scatter {
        points: Vec<ScatterPoint>,
    },
    Summary(AnalysisSummary),
}

/// Result record attached to an analysis when it reaches its final stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultArtifact {
    pub id: Uuid,
    pub analysis_id: Uuid,
    pub result_type: String,
    pub payload: ArtifactPayload,
    pub created_at: DateTime<Utc>,
}
