//! Read-side views over a job's results.

use uuid::Uuid;

use crate::domains::query_jobs::error::QueryJobError;
use crate::domains::query_jobs::models::{PageLink, PositionHit, UrlInfo, MIN_LOCATION_HITS};
use crate::kernel::ServerDeps;

/// Average rank per URL, for URLs ranked in at least `MIN_LOCATION_HITS`
/// locations, best first.
pub async fn get_position_hits(
    query_job_id: Uuid,
    deps: &ServerDeps,
) -> Result<Vec<PositionHit>, QueryJobError> {
    if deps.store.find_job(query_job_id).await?.is_none() {
        return Err(QueryJobError::NotFound(query_job_id));
    }
    Ok(deps
        .store
        .position_hits(query_job_id, MIN_LOCATION_HITS)
        .await?)
}

/// Stored content and links for one URL of a job. `None` when the job has no
/// hit for the URL.
pub async fn get_url_info(
    query_job_id: Uuid,
    url: &str,
    deps: &ServerDeps,
) -> Result<Option<UrlInfo>, QueryJobError> {
    let Some(item) = deps.store.find_item_by_url(query_job_id, url).await? else {
        return Ok(None);
    };

    let links = deps
        .store
        .list_links(item.id)
        .await?
        .into_iter()
        .map(PageLink::from)
        .collect();

    Ok(Some(UrlInfo {
        title: item.title,
        url: item.url,
        body: item.body,
        page_title: item.page_title,
        links,
    }))
}
