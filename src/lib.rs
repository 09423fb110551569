// ProteogenomiX Library - biomarker discovery pipeline
// This exposes the core components for testing and integration

pub mod analysis;
pub mod config;
pub mod evaluator;
pub mod input;
pub mod pipeline;
pub mod scheduler;
pub mod shutdown;
pub mod store;
pub mod telemetry;
pub mod upload;

// Re-export key types for easy access
pub use analysis::{
    advance, transition, Analysis, AnalysisEvent, AnalysisStatus, NewAnalysis, ResultArtifact,
    Stage, TransitionError,
};
pub use config::{config, ProteogenomixConfig};
pub use evaluator::{
    evaluate, try_evaluate, BiomarkerCandidate, EvaluationError, EvaluationReport, SequenceRecord,
};
pub use input::{DemoRecords, RecordSource, UploadedFileSource};
pub use pipeline::{AnalysisPipeline, PipelineError};
pub use scheduler::{AnalysisScheduler, SchedulerError};
pub use shutdown::ShutdownCoordinator;
pub use store::{AnalysisStore, InMemoryStore, StoreError};
#[cfg(feature = "database")]
pub use store::SqliteStore;
pub use telemetry::{create_analysis_span, generate_correlation_id, init_telemetry, shutdown_telemetry};
pub use upload::{DataFileKind, UploadPolicy, UploadedFile};
