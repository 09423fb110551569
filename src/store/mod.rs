// Persistence collaborator
//
// Every read is scoped to the owning user. Writes are keyed by analysis id
// and are visible to the same caller as soon as they return.

pub mod memory;
#[cfg(feature = "database")]
pub mod sqlite;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::analysis::{Analysis, ResultArtifact};
use crate::evaluator::BiomarkerCandidate;

pub use memory::InMemoryStore;
#[cfg(feature = "database")]
pub use sqlite::SqliteStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("analysis {id} not found")]
    NotFound { id: Uuid },

    #[error("analysis {id} already exists")]
    Duplicate { id: Uuid },

    #[error("stored row is corrupt: {reason}")]
    Corrupt { reason: String },

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[cfg(feature = "database")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[cfg(feature = "database")]
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

#[async_trait]
pub trait AnalysisStore: Send + Sync {
    async fn insert_analysis(&self, analysis: &Analysis) -> Result<(), StoreError>;

    async fn get_analysis(&self, owner: &str, id: Uuid) -> Result<Option<Analysis>, StoreError>;

    /// Newest first.
    async fn list_analyses(&self, owner: &str) -> Result<Vec<Analysis>, StoreError>;

    /// Overwrite status, progress, stage and timestamps of an existing analysis.
    async fn update_analysis(&self, analysis: &Analysis) -> Result<(), StoreError>;

    async fn append_biomarker(
        &self,
        analysis_id: Uuid,
        candidate: &BiomarkerCandidate,
    ) -> Result<(), StoreError>;

    async fn append_artifact(&self, artifact: &ResultArtifact) -> Result<(), StoreError>;

    /// Store the terminal analysis together with its children, all or nothing.
    async fn record_results(
        &self,
        analysis: &Analysis,
        candidates: &[BiomarkerCandidate],
        artifacts: &[ResultArtifact],
    ) -> Result<(), StoreError>;

    async fn biomarkers(
        &self,
        owner: &str,
        analysis_id: Uuid,
    ) -> Result<Vec<BiomarkerCandidate>, StoreError>;

    async fn artifacts(&self, owner: &str, analysis_id: Uuid)
        -> Result<Vec<ResultArtifact>, StoreError>;
}
