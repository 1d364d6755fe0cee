//! PostgreSQL observation store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::instrument;
use uuid::Uuid;

use super::{ObservationStore, Result, StoreError, newest_version_first};
use crate::analytics::Observation;

/// Row shape of the `prompt_observations` table
#[derive(Debug, FromRow)]
struct ObservationRow {
    id: Uuid,
    prompt_version: String,
    model_id: Option<String>,
    success: bool,
    processing_time_ms: Option<i64>,
    input_tokens: i64,
    output_tokens: i64,
    fields_extracted: i32,
    recorded_at: DateTime<Utc>,
}

impl TryFrom<ObservationRow> for Observation {
    type Error = StoreError;

    fn try_from(row: ObservationRow) -> Result<Self> {
        let id = row.id;
        let invalid = |reason: String| StoreError::InvalidRecord { id: id.to_string(), reason };
        let unsigned = |field: &str, value: i64| u64::try_from(value).map_err(|_| invalid(format!("negative {field}: {value}")));

        Ok(Observation {
            id,
            processing_time_ms: row.processing_time_ms.map(|ms| unsigned("processing_time_ms", ms)).transpose()?,
            input_tokens: unsigned("input_tokens", row.input_tokens)?,
            output_tokens: unsigned("output_tokens", row.output_tokens)?,
            fields_extracted: u32::try_from(row.fields_extracted)
                .map_err(|_| invalid(format!("negative fields_extracted: {}", row.fields_extracted)))?,
            prompt_version: row.prompt_version,
            model_id: row.model_id,
            success: row.success,
            timestamp: row.recorded_at,
        })
    }
}

fn to_i64(id: Uuid, field: &str, value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| StoreError::InvalidRecord {
        id: id.to_string(),
        reason: format!("{field} too large to store: {value}"),
    })
}

#[derive(Clone)]
pub struct PostgresObservationStore {
    pool: PgPool,
}

impl PostgresObservationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run the embedded schema migrations.
    pub async fn migrate(&self) -> Result<()> {
        crate::migrator().run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ObservationStore for PostgresObservationStore {
    #[instrument(skip_all, fields(prompt_version = %observation.prompt_version), err)]
    async fn append(&self, observation: &Observation) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO prompt_observations (
                id, prompt_version, model_id, success, processing_time_ms,
                input_tokens, output_tokens, fields_extracted, recorded_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(observation.id)
        .bind(&observation.prompt_version)
        .bind(&observation.model_id)
        .bind(observation.success)
        .bind(observation.processing_time_ms.map(|ms| to_i64(observation.id, "processing_time_ms", ms)).transpose()?)
        .bind(to_i64(observation.id, "input_tokens", observation.input_tokens)?)
        .bind(to_i64(observation.id, "output_tokens", observation.output_tokens)?)
        .bind(observation.fields_extracted as i32)
        .bind(observation.timestamp)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn query(&self, version: &str, since: DateTime<Utc>) -> Result<Vec<Observation>> {
        let rows: Vec<ObservationRow> = sqlx::query_as(
            r#"
            SELECT id, prompt_version, model_id, success, processing_time_ms,
                   input_tokens, output_tokens, fields_extracted, recorded_at
            FROM prompt_observations
            WHERE prompt_version = $1 AND recorded_at >= $2
            "#,
        )
        .bind(version)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Observation::try_from).collect()
    }

    #[instrument(skip(self), err)]
    async fn versions(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT DISTINCT prompt_version FROM prompt_observations")
            .fetch_all(&self.pool)
            .await?;
        let mut versions: Vec<String> = rows.into_iter().map(|(v,)| v).collect();
        versions.sort_unstable_by(|a, b| newest_version_first(a, b));
        Ok(versions)
    }
}
