use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AnalysisStore, StoreError};
use crate::analysis::{Analysis, ResultArtifact};
use crate::evaluator::BiomarkerCandidate;

#[derive(Debug, Clone)]
struct Entry {
    analysis: Analysis,
    biomarkers: Vec<BiomarkerCandidate>,
    artifacts: Vec<ResultArtifact>,
}

/// Process-local store, used by the CLI without a database and by tests.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: RwLock<HashMap<Uuid, Entry>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn owned_entry<'a>(
    entries: &'a HashMap<Uuid, Entry>,
    owner: &str,
    id: Uuid,
) -> Result<&'a Entry, StoreError> {
    entries
        .get(&id)
        .filter(|e| e.analysis.owner == owner)
        .ok_or(StoreError::NotFound { id })
}

#[async_trait]
impl AnalysisStore for InMemoryStore {
    async fn insert_analysis(&self, analysis: &Analysis) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        if entries.contains_key(&analysis.id) {
            return Err(StoreError::Duplicate { id: analysis.id });
        }
        entries.insert(
            analysis.id,
            Entry {
                analysis: analysis.clone(),
                biomarkers: Vec::new(),
                artifacts: Vec::new(),
            },
        );
        Ok(())
    }

    async fn get_analysis(&self, owner: &str, id: Uuid) -> Result<Option<Analysis>, StoreError> {
        let entries = self.entries.read().await;
        Ok(owned_entry(&entries, owner, id).ok().map(|e| e.analysis.clone()))
    }

    async fn list_analyses(&self, owner: &str) -> Result<Vec<Analysis>, StoreError> {
        let entries = self.entries.read().await;
        let mut analyses: Vec<Analysis> = entries
            .values()
            .filter(|e| e.analysis.owner == owner)
            .map(|e| e.analysis.clone())
            .collect();
        analyses.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(analyses)
    }

    async fn update_analysis(&self, analysis: &Analysis) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(&analysis.id)
            .ok_or(StoreError::NotFound { id: analysis.id })?;
        entry.analysis = analysis.clone();
        Ok(())
    }

    async fn append_biomarker(
        &self,
        analysis_id: Uuid,
        candidate: &BiomarkerCandidate,
    ) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(&analysis_id)
            .ok_or(StoreError::NotFound { id: analysis_id })?;
        entry.biomarkers.push(candidate.clone());
        Ok(())
    }

    async fn append_artifact(&self, artifact: &ResultArtifact) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(&artifact.analysis_id)
            .ok_or(StoreError::NotFound {
                id: artifact.analysis_id,
            })?;
        entry.artifacts.push(artifact.clone());
        Ok(())
    }

    async fn record_results(
        &self,
        analysis: &Analysis,
        candidates: &[BiomarkerCandidate],
        artifacts: &[ResultArtifact],
    ) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(&analysis.id)
            .ok_or(StoreError::NotFound { id: analysis.id })?;
        entry.analysis = analysis.clone();
        entry.biomarkers.extend_from_slice(candidates);
        entry.artifacts.extend_from_slice(artifacts);
        Ok(())
    }

    async fn biomarkers(
        &self,
        owner: &str,
        analysis_id: Uuid,
    ) -> Result<Vec<BiomarkerCandidate>, StoreError> {
        let entries = self.entries.read().await;
        Ok(owned_entry(&entries, owner, analysis_id)?.biomarkers.clone())
    }

    async fn artifacts(
        &self,
        owner: &str,
        analysis_id: Uuid,
    ) -> Result<Vec<ResultArtifact>, StoreError> {
        let entries = self.entries.read().await;
        Ok(owned_entry(&entries, owner, analysis_id)?.artifacts.clone())
    }
}
