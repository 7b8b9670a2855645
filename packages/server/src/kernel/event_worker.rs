//! JetStream consumers that drive the event-triggered stages.
//!
//! Each stage gets its own durable pull consumer filtered to the one subject
//! it reacts to. Messages are acked only after the stage finishes. A stage
//! error naks the message with a growing delay so JetStream redelivers it
//! once the outage has had time to clear. Payloads that cannot be decoded are
//! terminated straight away.

use anyhow::{Context, Result};
use async_nats::jetstream::{
    self,
    consumer::{pull, AckPolicy},
    stream, AckKind,
};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::common::nats::{subject_with_prefix, IntoNatsPayload};
use crate::domains::query_jobs::activities::{
    check_query_job_completion, dispatch_search_batch, expand_search_results,
    process_query_job_url,
};
use crate::domains::query_jobs::events::{
    QueryJobCreated, QueryJobUrlDiscovered, QueryJobUrlProcessed, SearchBatchCompleted,
};
use crate::kernel::nats::ensure_event_stream;
use crate::kernel::ServerDeps;

const ACK_WAIT: Duration = Duration::from_secs(300);
const MAX_IN_FLIGHT: usize = 8;
const FIRST_RETRY_DELAY: Duration = Duration::from_secs(2);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(300);

/// Delay before redelivering a message that failed on its `delivered`-th
/// attempt. Doubles per attempt, capped at `MAX_RETRY_DELAY`.
pub fn retry_delay(delivered: i64) -> Duration {
    let doublings = (delivered.max(1) - 1).min(16) as u32;
    FIRST_RETRY_DELAY
        .saturating_mul(1u32 << doublings)
        .min(MAX_RETRY_DELAY)
}

/// An event-triggered pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    DispatchSearchBatch,
    ExpandSearchResults,
    ProcessUrl,
    CheckCompletion,
}

/// What to tell JetStream about a message.
#[derive(Debug)]
pub enum HandleOutcome {
    Done,
    /// The stage failed; redeliver.
    Retry(anyhow::Error),
    /// The payload is unreadable; never redeliver.
    Poison(serde_json::Error),
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::DispatchSearchBatch,
        Stage::ExpandSearchResults,
        Stage::ProcessUrl,
        Stage::CheckCompletion,
    ];

    pub fn durable_name(self) -> &'static str {
        match self {
            Stage::DispatchSearchBatch => "dispatch-search-batch",
            Stage::ExpandSearchResults => "expand-search-results",
            Stage::ProcessUrl => "process-query-job-url",
            Stage::CheckCompletion => "check-query-job-completion",
        }
    }

    /// Delivery attempts before JetStream gives up on a message, or -1 for
    /// no limit. URL and completion messages are the only trigger for their
    /// work, so they are retried until they succeed.
    pub fn max_deliver(self) -> i64 {
        match self {
            Stage::DispatchSearchBatch | Stage::ExpandSearchResults => 20,
            Stage::ProcessUrl | Stage::CheckCompletion => -1,
        }
    }

    /// True when a failure on attempt `delivered` will not be redelivered.
    pub fn is_final_delivery(self, delivered: i64) -> bool {
        let max = self.max_deliver();
        max > 0 && delivered >= max
    }

    pub fn subject_suffix(self) -> &'static str {
        match self {
            Stage::DispatchSearchBatch => QueryJobCreated::subject_suffix(),
            Stage::ExpandSearchResults => SearchBatchCompleted::subject_suffix(),
            Stage::ProcessUrl => QueryJobUrlDiscovered::subject_suffix(),
            Stage::CheckCompletion => QueryJobUrlProcessed::subject_suffix(),
        }
    }

    /// Decode `payload` and run the stage on it.
    pub async fn handle(self, payload: &[u8], deps: &ServerDeps) -> HandleOutcome {
        let result = match self {
            Stage::DispatchSearchBatch => match decode::<QueryJobCreated>(payload) {
                Ok(event) => dispatch_search_batch(&event, deps).await.map(|_| ()),
                Err(e) => return HandleOutcome::Poison(e),
            },
            Stage::ExpandSearchResults => match decode::<SearchBatchCompleted>(payload) {
                Ok(event) => expand_search_results(&event, deps).await.map(|_| ()),
                Err(e) => return HandleOutcome::Poison(e),
            },
            Stage::ProcessUrl => match decode::<QueryJobUrlDiscovered>(payload) {
                Ok(event) => process_query_job_url(&event, deps).await.map(|_| ()),
                Err(e) => return HandleOutcome::Poison(e),
            },
            Stage::CheckCompletion => match decode::<QueryJobUrlProcessed>(payload) {
                Ok(event) => check_query_job_completion(event.query_job_id, deps)
                    .await
                    .map(|_| ()),
                Err(e) => return HandleOutcome::Poison(e),
            },
        };

        match result {
            Ok(()) => HandleOutcome::Done,
            Err(e) => HandleOutcome::Retry(e),
        }
    }
}

fn decode<E: DeserializeOwned>(payload: &[u8]) -> std::result::Result<E, serde_json::Error> {
    serde_json::from_slice(payload)
}

pub struct EventWorker {
    jetstream: jetstream::Context,
    stream_name: String,
    deps: ServerDeps,
}

impl EventWorker {
    pub fn new(client: async_nats::Client, stream_name: impl Into<String>, deps: ServerDeps) -> Self {
        Self {
            jetstream: jetstream::new(client),
            stream_name: stream_name.into(),
            deps,
        }
    }

    /// Create the stream holding every subject under the deployment prefix.
    pub async fn ensure_stream(&self) -> Result<stream::Stream> {
        ensure_event_stream(&self.jetstream, &self.stream_name, &self.deps.subject_prefix).await
    }

    /// Run every stage until one of the consumers stops.
    pub async fn run(self) -> Result<()> {
        let stream = self.ensure_stream().await?;

        let mut tasks = JoinSet::new();
        for stage in Stage::ALL {
            let consumer = self.consumer(&stream, stage).await?;
            let deps = self.deps.clone();
            tasks.spawn(async move { consume(stage, consumer, deps).await });
        }

        info!(stream = %self.stream_name, stages = Stage::ALL.len(), "Event worker started");

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(())) => warn!("A stage consumer stopped"),
                Ok(Err(e)) => {
                    tasks.abort_all();
                    return Err(e);
                }
                Err(e) => {
                    tasks.abort_all();
                    return Err(e).context("stage consumer panicked");
                }
            }
        }

        Ok(())
    }

    async fn consumer(
        &self,
        stream: &stream::Stream,
        stage: Stage,
    ) -> Result<jetstream::consumer::Consumer<pull::Config>> {
        let filter_subject = subject_with_prefix(&self.deps.subject_prefix, stage.subject_suffix());
        stream
            .get_or_create_consumer(
                stage.durable_name(),
                pull::Config {
                    durable_name: Some(stage.durable_name().to_string()),
                    filter_subject,
                    ack_policy: AckPolicy::Explicit,
                    ack_wait: ACK_WAIT,
                    max_deliver: stage.max_deliver(),
                    ..Default::default()
                },
            )
            .await
            .with_context(|| format!("creating consumer {}", stage.durable_name()))
    }
}

async fn consume(
    stage: Stage,
    consumer: jetstream::consumer::Consumer<pull::Config>,
    deps: ServerDeps,
) -> Result<()> {
    let messages = consumer
        .messages()
        .await
        .with_context(|| format!("subscribing {}", stage.durable_name()))?;

    messages
        .for_each_concurrent(MAX_IN_FLIGHT, |message| {
            let deps = deps.clone();
            async move {
                let message = match message {
                    Ok(message) => message,
                    Err(e) => {
                        error!(stage = stage.durable_name(), error = %e, "Failed to receive message");
                        return;
                    }
                };

                let ack = match stage.handle(&message.payload, &deps).await {
                    HandleOutcome::Done => {
                        debug!(stage = stage.durable_name(), subject = %message.subject, "Handled message");
                        message.ack().await
                    }
                    HandleOutcome::Retry(e) => {
                        let delivered = message.info().map(|info| info.delivered).unwrap_or(1);
                        if stage.is_final_delivery(delivered) {
                            error!(
                                stage = stage.durable_name(),
                                subject = %message.subject,
                                delivered = delivered,
                                error = %e,
                                "Stage failed on its last delivery, message dropped"
                            );
                            message.ack_with(AckKind::Term).await
                        } else {
                            let delay = retry_delay(delivered);
                            error!(
                                stage = stage.durable_name(),
                                subject = %message.subject,
                                delivered = delivered,
                                retry_in_secs = delay.as_secs(),
                                error = %e,
                                "Stage failed, will be redelivered"
                            );
                            message.ack_with(AckKind::Nak(Some(delay))).await
                        }
                    }
                    HandleOutcome::Poison(e) => {
                        error!(stage = stage.durable_name(), subject = %message.subject, error = %e, "Dropping undecodable message");
                        message.ack_with(AckKind::Term).await
                    }
                };

                if let Err(e) = ack {
                    warn!(stage = stage.durable_name(), error = %e, "Failed to acknowledge message");
                }
            }
        })
        .await;

    Ok(())
}
