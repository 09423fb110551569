// Analysis lifecycle: entity, stage table, pure transitions and the
// artifacts produced at the final stage.

pub mod artifacts;
pub mod state_machine;
pub mod types;

pub use state_machine::{advance, transition, AnalysisEvent, TransitionError};
pub use types::{
    Analysis, AnalysisStatus, AnalysisSummary, ArtifactPayload, ChartKind, LengthBin,
    NewAnalysis, ResultArtifact, ScatterPoint, Stage, ValidationError,
};
