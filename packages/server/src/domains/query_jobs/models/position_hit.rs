use anyhow::Result;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::PageLink;

/// URLs that show up in fewer locations than this are left out of position hits.
pub const MIN_LOCATION_HITS: i64 = 3;

/// Average rank of one URL across the locations it appeared in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PositionHit {
    pub url: String,
    pub avg_position: f64,
    pub location_hits_count: i64,
}

/// What is known about one analyzed URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlInfo {
    pub title: String,
    pub url: String,
    pub body: Option<String>,
    pub page_title: Option<String>,
    pub links: Vec<PageLink>,
}

impl PositionHit {
    pub async fn for_job(
        query_job_id: Uuid,
        min_locations: i64,
        pool: &PgPool,
    ) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT url,
                   AVG(position)::float8 AS avg_position,
                   COUNT(DISTINCT query_location_id) AS location_hits_count
            FROM query_items
            WHERE query_job_id = $1
            GROUP BY url
            HAVING COUNT(DISTINCT query_location_id) >= $2
            ORDER BY AVG(position) ASC, url ASC
            "#,
        )
        .bind(query_job_id)
        .bind(min_locations)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }
}
