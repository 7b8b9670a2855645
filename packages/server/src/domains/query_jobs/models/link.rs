use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

/// Outbound anchor found on an analyzed page.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct QueryItemLink {
    pub id: Uuid,
    pub query_item_id: Uuid,
    pub text: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

/// Anchor text and absolute target of a link, before it is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLink {
    pub text: String,
    pub url: String,
}

impl From<QueryItemLink> for PageLink {
    fn from(link: QueryItemLink) -> Self {
        Self {
            text: link.text,
            url: link.url,
        }
    }
}

impl QueryItemLink {
    pub async fn create<'e>(
        query_item_id: Uuid,
        text: &str,
        url: &str,
        executor: impl PgExecutor<'e>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO query_item_links (id, query_item_id, text, url)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(query_item_id)
        .bind(text.replace('\0', ""))
        .bind(url)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn find_by_item(query_item_id: Uuid, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM query_item_links WHERE query_item_id = $1 ORDER BY created_at, id",
        )
        .bind(query_item_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }
}
