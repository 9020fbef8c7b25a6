use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use super::{AnalysisStore, RecordEdit};
use crate::models::analysis::AnalysisRecord;

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS analysis_history (
    position BIGSERIAL PRIMARY KEY,
    id       TEXT NOT NULL UNIQUE,
    document JSONB NOT NULL
)
"#;

/// History stored as one JSONB document per row, ordered by insertion position.
pub struct PgAnalysisStore {
    pool: PgPool,
}

impl PgAnalysisStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        info!("Connecting to PostgreSQL...");
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .context("failed to connect to PostgreSQL")?;
        info!("PostgreSQL connection pool established");

        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(CREATE_TABLE)
            .execute(&self.pool)
            .await
            .context("failed to create analysis_history table")?;
        info!("analysis_history table ready");
        Ok(())
    }
}

#[async_trait]
impl AnalysisStore for PgAnalysisStore {
    async fn load_raw(&self) -> Result<Vec<Value>> {
        Ok(sqlx::query_scalar::<_, Value>(
            "SELECT document FROM analysis_history ORDER BY position ASC",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn append(&self, record: &AnalysisRecord) -> Result<()> {
        sqlx::query("INSERT INTO analysis_history (id, document) VALUES ($1, $2)")
            .bind(&record.id)
            .bind(record.to_document())
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to insert analysis {}", record.id))?;
        info!("Saved analysis {}", record.id);
        Ok(())
    }

    async fn update(&self, id: &str, edit: RecordEdit<'_>) -> Result<Option<AnalysisRecord>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("failed to start transaction")?;
        let document = sqlx::query_scalar::<_, Value>(
            "SELECT document FROM analysis_history WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .with_context(|| format!("failed to lock analysis {id}"))?;

        let Some(document) = document else {
            return Ok(None);
        };
        let Some(record) = edit(&document)? else {
            return Ok(None);
        };

        sqlx::query("UPDATE analysis_history SET document = $2 WHERE id = $1")
            .bind(id)
            .bind(record.to_document())
            .execute(&mut *tx)
            .await
            .with_context(|| format!("failed to update analysis {id}"))?;
        tx.commit()
            .await
            .with_context(|| format!("failed to commit update of analysis {id}"))?;
        Ok(Some(record))
    }

    async fn remove(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM analysis_history WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to delete analysis {id}"))?;
        if result.rows_affected() > 0 {
            info!("Deleted analysis {id}");
        }
        Ok(result.rows_affected() > 0)
    }
}
