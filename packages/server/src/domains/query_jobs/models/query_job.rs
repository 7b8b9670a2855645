use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

/// One keyword-level competitive analysis run.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct QueryJob {
    pub id: Uuid,
    pub keyword: String,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub search_batch_id: Option<String>,
    pub search_batch_consumed: bool,
}

impl QueryJob {
    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }

    pub async fn create<'e>(keyword: &str, executor: impl PgExecutor<'e>) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO query_jobs (id, keyword)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(keyword)
        .fetch_one(executor)
        .await
        .map_err(Into::into)
    }

    pub async fn find_by_id(id: Uuid, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM query_jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    /// All jobs, newest first.
    pub async fn find_all(pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM query_jobs ORDER BY created_at DESC")
            .fetch_all(pool)
            .await
            .map_err(Into::into)
    }

    /// Returns false when no job had this id. Locations, items and links go with it.
    pub async fn delete(id: Uuid, pool: &PgPool) -> Result<bool> {
        let result = sqlx::query("DELETE FROM query_jobs WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Attach the provider batch handle. Only the first handle sticks.
    pub async fn set_search_batch(id: Uuid, batch_id: &str, pool: &PgPool) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE query_jobs
            SET search_batch_id = $2
            WHERE id = $1 AND search_batch_id IS NULL
            "#,
        )
        .bind(id)
        .bind(batch_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Jobs whose batch was submitted but not yet handed to the expander.
    pub async fn find_with_open_batch(pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM query_jobs
            WHERE search_batch_id IS NOT NULL AND search_batch_consumed = FALSE
            ORDER BY created_at
            "#,
        )
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn mark_batch_consumed(id: Uuid, pool: &PgPool) -> Result<()> {
        sqlx::query("UPDATE query_jobs SET search_batch_consumed = TRUE WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Set `completed_at` if, and only if, nothing in the job is left unprocessed.
    ///
    /// The check and the write are one statement, so a concurrent processor
    /// cannot slip an unprocessed item past it. An existing `completed_at` is
    /// never overwritten.
    pub async fn mark_complete_if_drained(id: Uuid, pool: &PgPool) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE query_jobs
            SET completed_at = NOW()
            WHERE id = $1
              AND completed_at IS NULL
              AND NOT EXISTS (
                  SELECT 1 FROM query_items
                  WHERE query_job_id = $1 AND processed_at IS NULL
              )
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
