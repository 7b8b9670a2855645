use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use super::PageLink;

/// One search hit: a URL ranked at `position` for a single location.
///
/// A hit is terminal once `processed_at` is set. `error_processing` tells
/// whether the analysis that made it terminal failed.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct QueryItem {
    pub id: Uuid,
    pub query_job_id: Uuid,
    pub query_location_id: Uuid,
    pub position: i32,
    pub url: String,
    pub title: String,
    pub body: Option<String>,
    pub page_title: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    pub error_processing: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewQueryItem {
    pub query_job_id: Uuid,
    pub query_location_id: Uuid,
    pub position: i32,
    pub url: String,
    pub title: String,
}

/// Outcome of a successful page analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessedPage {
    pub body: String,
    pub title: Option<String>,
    pub links: Vec<PageLink>,
}

impl QueryItem {
    pub fn is_processed(&self) -> bool {
        self.processed_at.is_some()
    }

    /// Insert a hit unless the same (location, position, url) already exists.
    /// Returns the number of rows actually written.
    pub async fn create_if_absent<'e>(
        item: &NewQueryItem,
        executor: impl PgExecutor<'e>,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            INSERT INTO query_items (id, query_job_id, query_location_id, position, url, title)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (query_location_id, position, url) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(item.query_job_id)
        .bind(item.query_location_id)
        .bind(item.position)
        .bind(&item.url)
        .bind(&item.title)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn find_by_url(query_job_id: Uuid, url: &str, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM query_items
            WHERE query_job_id = $1 AND url = $2
            ORDER BY position, created_at
            "#,
        )
        .bind(query_job_id)
        .bind(url)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    /// Best-ranked hit for a URL, preferring ones that already carry a body.
    pub async fn find_first_by_url(
        query_job_id: Uuid,
        url: &str,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM query_items
            WHERE query_job_id = $1 AND url = $2
            ORDER BY (body IS NULL), position, created_at
            LIMIT 1
            "#,
        )
        .bind(query_job_id)
        .bind(url)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    /// Mark every still-open hit for the URL as successfully processed.
    /// Returns the ids that this call moved to terminal.
    pub async fn mark_processed<'e>(
        query_job_id: Uuid,
        url: &str,
        body: &str,
        page_title: Option<&str>,
        executor: impl PgExecutor<'e>,
    ) -> Result<Vec<Uuid>> {
        sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE query_items
            SET body = $3, page_title = $4, processed_at = NOW(), error_processing = FALSE
            WHERE query_job_id = $1 AND url = $2 AND processed_at IS NULL
            RETURNING id
            "#,
        )
        .bind(query_job_id)
        .bind(url)
        .bind(strip_nul(body))
        .bind(page_title.map(strip_nul))
        .fetch_all(executor)
        .await
        .map_err(Into::into)
    }

    /// Mark every still-open hit for the URL as terminal with an error.
    pub async fn mark_failed(query_job_id: Uuid, url: &str, pool: &PgPool) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE query_items
            SET processed_at = NOW(), error_processing = TRUE
            WHERE query_job_id = $1 AND url = $2 AND processed_at IS NULL
            "#,
        )
        .bind(query_job_id)
        .bind(url)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn count_unprocessed(query_job_id: Uuid, pool: &PgPool) -> Result<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM query_items WHERE query_job_id = $1 AND processed_at IS NULL",
        )
        .bind(query_job_id)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }
}

/// Postgres text columns reject NUL.
pub fn strip_nul(text: &str) -> String {
    text.replace('\0', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_nul() {
        assert_eq!(strip_nul("a\0b\0"), "ab");
        assert_eq!(strip_nul("plain"), "plain");
    }
}
