//! Postgres-backed job store.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domains::query_jobs::models::{
    NewQueryItem, NewQueryLocation, PositionHit, ProcessedPage, QueryItem, QueryItemLink,
    QueryJob, QueryLocation,
};
use crate::kernel::BaseQueryJobStore;

pub struct PostgresQueryJobStore {
    pool: PgPool,
}

impl PostgresQueryJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BaseQueryJobStore for PostgresQueryJobStore {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn create_job(&self, keyword: &str, locations: &[NewQueryLocation]) -> Result<QueryJob> {
        let mut tx = self.pool.begin().await?;

        let job = QueryJob::create(keyword, &mut *tx).await?;
        for location in locations {
            QueryLocation::create(job.id, location, &mut *tx)
                .await
                .with_context(|| format!("creating location {}", location.location))?;
        }

        tx.commit().await?;
        Ok(job)
    }

    async fn find_job(&self, id: Uuid) -> Result<Option<QueryJob>> {
        QueryJob::find_by_id(id, &self.pool).await
    }

    async fn list_jobs(&self) -> Result<Vec<QueryJob>> {
        QueryJob::find_all(&self.pool).await
    }

    async fn delete_job(&self, id: Uuid) -> Result<bool> {
        QueryJob::delete(id, &self.pool).await
    }

    async fn list_locations(&self, job_id: Uuid) -> Result<Vec<QueryLocation>> {
        QueryLocation::find_by_job(job_id, &self.pool).await
    }

    async fn set_search_batch(&self, job_id: Uuid, batch_id: &str) -> Result<bool> {
        QueryJob::set_search_batch(job_id, batch_id, &self.pool).await
    }

    async fn list_jobs_with_open_batch(&self) -> Result<Vec<QueryJob>> {
        QueryJob::find_with_open_batch(&self.pool).await
    }

    async fn mark_batch_consumed(&self, job_id: Uuid) -> Result<()> {
        QueryJob::mark_batch_consumed(job_id, &self.pool).await
    }

    async fn create_items(&self, items: &[NewQueryItem]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        let mut inserted = 0;
        for item in items {
            inserted += QueryItem::create_if_absent(item, &mut *tx).await?;
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn list_items_by_url(&self, job_id: Uuid, url: &str) -> Result<Vec<QueryItem>> {
        QueryItem::find_by_url(job_id, url, &self.pool).await
    }

    async fn find_item_by_url(&self, job_id: Uuid, url: &str) -> Result<Option<QueryItem>> {
        QueryItem::find_first_by_url(job_id, url, &self.pool).await
    }

    async fn record_success(&self, job_id: Uuid, url: &str, page: &ProcessedPage) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        let updated = QueryItem::mark_processed(
            job_id,
            url,
            &page.body,
            page.title.as_deref(),
            &mut *tx,
        )
        .await?;

        for item_id in &updated {
            for link in &page.links {
                QueryItemLink::create(*item_id, &link.text, &link.url, &mut *tx).await?;
            }
        }

        tx.commit().await?;
        Ok(updated.len() as u64)
    }

    async fn record_failure(&self, job_id: Uuid, url: &str) -> Result<u64> {
        QueryItem::mark_failed(job_id, url, &self.pool).await
    }

    async fn count_unprocessed(&self, job_id: Uuid) -> Result<i64> {
        QueryItem::count_unprocessed(job_id, &self.pool).await
    }

    async fn mark_complete_if_drained(&self, job_id: Uuid) -> Result<bool> {
        QueryJob::mark_complete_if_drained(job_id, &self.pool).await
    }

    async fn list_links(&self, item_id: Uuid) -> Result<Vec<QueryItemLink>> {
        QueryItemLink::find_by_item(item_id, &self.pool).await
    }

    async fn position_hits(&self, job_id: Uuid, min_locations: i64) -> Result<Vec<PositionHit>> {
        PositionHit::for_job(job_id, min_locations, &self.pool).await
    }
}
