//! Publishing pipeline events to NATS.
//!
//! Events implement `IntoNatsPayload` to declare their subject. Everything is
//! published under a per-deployment prefix, so the full subject is
//! `{prefix}.{suffix}`, e.g. `serp.query_job.created`.
//!
//! Unlike fire-and-forget notifications, a failed publish is an error here:
//! the next stage only runs if the event reaches the stream.

use anyhow::{Context, Result};
use bytes::Bytes;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::kernel::nats::NatsPublisher;

/// Trait for pipeline events that can be published to NATS.
pub trait IntoNatsPayload: Serialize + Send + Sync {
    /// The query job this event belongs to. Used for logging only.
    fn query_job_id(&self) -> Uuid;

    /// Subject suffix, e.g. `query_job.created`.
    fn subject_suffix() -> &'static str;

    /// Serialized message body. Flat JSON of the event's fields by default.
    fn into_payload(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).context("serializing event payload")
    }
}

/// Full subject for an event type under the given prefix.
pub fn subject_for<E: IntoNatsPayload>(prefix: &str) -> String {
    subject_with_prefix(prefix, E::subject_suffix())
}

pub fn subject_with_prefix(prefix: &str, suffix: &str) -> String {
    if prefix.is_empty() {
        suffix.to_string()
    } else {
        format!("{}.{}", prefix, suffix)
    }
}

/// Publish an event and wait until the transport accepts it.
pub async fn publish_event<E: IntoNatsPayload>(
    event: &E,
    prefix: &str,
    nats: &dyn NatsPublisher,
) -> Result<()> {
    let subject = subject_for::<E>(prefix);
    let payload = event.into_payload()?;

    info!(
        query_job_id = %event.query_job_id(),
        subject = %subject,
        "publishing NATS event"
    );

    nats.publish(subject.clone(), Bytes::from(payload))
        .await
        .with_context(|| format!("publishing to {}", subject))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_with_prefix() {
        assert_eq!(subject_with_prefix("serp", "query_job.created"), "serp.query_job.created");
        assert_eq!(subject_with_prefix("", "query_job.created"), "query_job.created");
    }
}
