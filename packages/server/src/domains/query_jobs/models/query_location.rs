use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

/// Search parameters for one simulated origin. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct QueryLocation {
    pub id: Uuid,
    pub query_job_id: Uuid,
    pub device: String,
    pub search_engine: String,
    pub num: i32,
    pub country: String,
    pub location: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewQueryLocation {
    pub device: String,
    pub search_engine: String,
    pub num: i32,
    pub country: String,
    pub location: String,
}

impl QueryLocation {
    pub async fn create<'e>(
        query_job_id: Uuid,
        location: &NewQueryLocation,
        executor: impl PgExecutor<'e>,
    ) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO query_locations (id, query_job_id, device, search_engine, num, country, location)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(query_job_id)
        .bind(&location.device)
        .bind(&location.search_engine)
        .bind(location.num)
        .bind(&location.country)
        .bind(&location.location)
        .fetch_one(executor)
        .await
        .map_err(Into::into)
    }

    pub async fn find_by_job(query_job_id: Uuid, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM query_locations WHERE query_job_id = $1 ORDER BY created_at, location",
        )
        .bind(query_job_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }
}
