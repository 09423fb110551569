use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{migrate::MigrateDatabase, Row, Sqlite, SqliteConnection, SqlitePool};
use std::path::PathBuf;
use tracing::info;
use uuid::Uuid;

use super::{AnalysisStore, StoreError};
use crate::analysis::{Analysis, AnalysisStatus, ResultArtifact, Stage};
use crate::config::DatabaseConfig;
use crate::evaluator::BiomarkerCandidate;

/// SQLite-backed store with embedded migrations.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open the database, creating it and running migrations when asked.
    pub async fn new(config: &DatabaseConfig) -> Result<Self, StoreError> {
        if !Sqlite::database_exists(&config.url).await? {
            info!("Creating database at {}", config.url);
            Sqlite::create_database(&config.url).await?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await?;

        if config.auto_migrate {
            info!("Running database migrations...");
            sqlx::migrate!("./migrations").run(&pool).await?;
            info!("Database migrations completed");
        }

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close database connections gracefully
    pub async fn shutdown(&self) {
        info!("Shutting down database connections...");
        self.pool.close().await;
        info!("Database connections closed");
    }
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn corrupt(reason: impl Into<String>) -> StoreError {
    StoreError::Corrupt {
        reason: reason.into(),
    }
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| corrupt(format!("bad timestamp '{raw}': {e}")))
}

fn parse_uuid(raw: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(raw).map_err(|e| corrupt(format!("bad id '{raw}': {e}")))
}

fn analysis_from_row(row: &SqliteRow) -> Result<Analysis, StoreError> {
    let status: String = row.try_get("status")?;
    let stage: Option<String> = row.try_get("current_stage")?;
    let progress: i64 = row.try_get("progress")?;
    let started_at: Option<String> = row.try_get("started_at")?;
    let completed_at: Option<String> = row.try_get("completed_at")?;
    let input_path: Option<String> = row.try_get("input_path")?;
    let genomics_path: Option<String> = row.try_get("genomics_path")?;

    Ok(Analysis {
        id: parse_uuid(&row.try_get::<String, _>("id")?)?,
        owner: row.try_get("owner")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        input_path: input_path.map(PathBuf::from),
        genomics_path: genomics_path.map(PathBuf::from),
        status: AnalysisStatus::parse(&status)
            .ok_or_else(|| corrupt(format!("unknown status '{status}'")))?,
        progress: u8::try_from(progress)
            .map_err(|_| corrupt(format!("progress {progress} out of range")))?,
        current_stage: stage
            .map(|s| Stage::parse(&s).ok_or_else(|| corrupt(format!("unknown stage '{s}'"))))
            .transpose()?,
        failure_reason: row.try_get("failure_reason")?,
        created_at: parse_time(&row.try_get::<String, _>("created_at")?)?,
        started_at: started_at.as_deref().map(parse_time).transpose()?,
        completed_at: completed_at.as_deref().map(parse_time).transpose()?,
    })
}

fn biomarker_from_row(row: &SqliteRow) -> Result<BiomarkerCandidate, StoreError> {
    let sequence_length: i64 = row.try_get("sequence_length")?;
    let distinct_symbols: i64 = row.try_get("distinct_symbols")?;
    let score: i64 = row.try_get("score")?;

    Ok(BiomarkerCandidate {
        name: row.try_get("name")?,
        gene_name: row.try_get("gene_name")?,
        protein_name: row.try_get("protein_name")?,
        chromosome: row.try_get("chromosome")?,
        sequence_length: sequence_length as usize,
        distinct_symbols: distinct_symbols as usize,
        has_motif: row.try_get("has_motif")?,
        motif_pattern: row.try_get("motif_pattern")?,
        score: u8::try_from(score).map_err(|_| corrupt(format!("score {score} out of range")))?,
        significant: row.try_get("significant")?,
        annotation: row.try_get("annotation")?,
    })
}

fn artifact_from_row(row: &SqliteRow) -> Result<ResultArtifact, StoreError> {
    let payload: String = row.try_get("payload")?;

    Ok(ResultArtifact {
        id: parse_uuid(&row.try_get::<String, _>("id")?)?,
        analysis_id: parse_uuid(&row.try_get::<String, _>("analysis_id")?)?,
        result_type: row.try_get("result_type")?,
        payload: serde_json::from_str(&payload)?,
        created_at: parse_time(&row.try_get::<String, _>("created_at")?)?,
    })
}

async fn write_analysis(conn: &mut SqliteConnection, analysis: &Analysis) -> Result<(), StoreError> {
    let result = sqlx::query(
        r#"
        UPDATE analyses
        SET status = ?2, progress = ?3, current_stage = ?4, failure_reason = ?5,
            started_at = ?6, completed_at = ?7
        WHERE id = ?1
        "#,
    )
    .bind(analysis.id.to_string())
    .bind(analysis.status.as_str())
    .bind(i64::from(analysis.progress))
    .bind(analysis.current_stage.map(|s| s.as_str()))
    .bind(analysis.failure_reason.as_deref())
    .bind(analysis.started_at.as_ref().map(timestamp))
    .bind(analysis.completed_at.as_ref().map(timestamp))
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound { id: analysis.id });
    }
    Ok(())
}

async fn write_biomarker(
    conn: &mut SqliteConnection,
    analysis_id: Uuid,
    candidate: &BiomarkerCandidate,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO biomarkers (
            analysis_id, name, gene_name, protein_name, chromosome, sequence_length,
            distinct_symbols, has_motif, motif_pattern, score, significant, annotation
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(analysis_id.to_string())
    .bind(&candidate.name)
    .bind(candidate.gene_name.as_deref())
    .bind(candidate.protein_name.as_deref())
    .bind(candidate.chromosome.as_deref())
    .bind(candidate.sequence_length as i64)
    .bind(candidate.distinct_symbols as i64)
    .bind(candidate.has_motif)
    .bind(&candidate.motif_pattern)
    .bind(i64::from(candidate.score))
    .bind(candidate.significant)
    .bind(&candidate.annotation)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn write_artifact(
    conn: &mut SqliteConnection,
    artifact: &ResultArtifact,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO result_artifacts (id, analysis_id, result_type, payload, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(artifact.id.to_string())
    .bind(artifact.analysis_id.to_string())
    .bind(&artifact.result_type)
    .bind(serde_json::to_string(&artifact.payload)?)
    .bind(timestamp(&artifact.created_at))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

impl SqliteStore {
    async fn ensure_owned(&self, owner: &str, id: Uuid) -> Result<(), StoreError> {
        let found = sqlx::query("SELECT 1 FROM analyses WHERE id = ?1 AND owner = ?2")
            .bind(id.to_string())
            .bind(owner)
            .fetch_optional(&self.pool)
            .await?;

        found.map(|_| ()).ok_or(StoreError::NotFound { id })
    }
}

#[async_trait]
impl AnalysisStore for SqliteStore {
    async fn insert_analysis(&self, analysis: &Analysis) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO analyses (
                id, owner, name, description, input_path, genomics_path, status,
                progress, current_stage, failure_reason, created_at, started_at,
                completed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(analysis.id.to_string())
        .bind(&analysis.owner)
        .bind(&analysis.name)
        .bind(analysis.description.as_deref())
        .bind(
            analysis
                .input_path
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned()),
        )
        .bind(
            analysis
                .genomics_path
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned()),
        )
        .bind(analysis.status.as_str())
        .bind(i64::from(analysis.progress))
        .bind(analysis.current_stage.map(|s| s.as_str()))
        .bind(analysis.failure_reason.as_deref())
        .bind(timestamp(&analysis.created_at))
        .bind(analysis.started_at.as_ref().map(timestamp))
        .bind(analysis.completed_at.as_ref().map(timestamp))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db) = &e {
                if db.is_unique_violation() {
                    return StoreError::Duplicate { id: analysis.id };
                }
            }
            StoreError::Database(e)
        })?;

        Ok(())
    }

    async fn get_analysis(&self, owner: &str, id: Uuid) -> Result<Option<Analysis>, StoreError> {
        let row = sqlx::query("SELECT * FROM analyses WHERE id = ?1 AND owner = ?2")
            .bind(id.to_string())
            .bind(owner)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(analysis_from_row).transpose()
    }

    async fn list_analyses(&self, owner: &str) -> Result<Vec<Analysis>, StoreError> {
        let rows = sqlx::query("SELECT * FROM analyses WHERE owner = ?1 ORDER BY created_at DESC")
            .bind(owner)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(analysis_from_row).collect()
    }

    async fn update_analysis(&self, analysis: &Analysis) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        write_analysis(&mut conn, analysis).await
    }

    async fn append_biomarker(
        &self,
        analysis_id: Uuid,
        candidate: &BiomarkerCandidate,
    ) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        write_biomarker(&mut conn, analysis_id, candidate).await
    }

    async fn append_artifact(&self, artifact: &ResultArtifact) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        write_artifact(&mut conn, artifact).await
    }

    async fn record_results(
        &self,
        analysis: &Analysis,
        candidates: &[BiomarkerCandidate],
        artifacts: &[ResultArtifact],
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        for candidate in candidates {
            write_biomarker(&mut tx, analysis.id, candidate).await?;
        }
        for artifact in artifacts {
            write_artifact(&mut tx, artifact).await?;
        }
        write_analysis(&mut tx, analysis).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn biomarkers(
        &self,
        owner: &str,
        analysis_id: Uuid,
    ) -> Result<Vec<BiomarkerCandidate>, StoreError> {
        self.ensure_owned(owner, analysis_id).await?;

        let rows = sqlx::query("SELECT * FROM biomarkers WHERE analysis_id = ?1 ORDER BY id ASC")
            .bind(analysis_id.to_string())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(biomarker_from_row).collect()
    }

    async fn artifacts(
        &self,
        owner: &str,
        analysis_id: Uuid,
    ) -> Result<Vec<ResultArtifact>, StoreError> {
        self.ensure_owned(owner, analysis_id).await?;

        let rows = sqlx::query(
            "SELECT * FROM result_artifacts WHERE analysis_id = ?1 ORDER BY rowid ASC",
        )
        .bind(analysis_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(artifact_from_row).collect()
    }
}
