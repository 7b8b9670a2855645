//! NATS client abstraction for production and testing.
//!
//! Production publishes through JetStream and waits for the stream's ack, so a
//! successful `publish` means the message is durably stored. Tests swap in
//! `TestNats`, which only records what would have been sent.

use anyhow::{Context, Result};
use async_nats::jetstream::{self, stream};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::RwLock;

/// A published message.
#[derive(Debug, Clone)]
pub struct PublishedMessage {
    pub subject: String,
    pub payload: Bytes,
}

/// Trait for NATS publish operations.
#[async_trait]
pub trait NatsPublisher: Send + Sync {
    /// Publish a message to a subject.
    async fn publish(&self, subject: String, payload: Bytes) -> Result<()>;
}

/// JetStream publisher.
pub struct JetStreamPublisher {
    context: jetstream::Context,
}

impl JetStreamPublisher {
    pub fn new(client: async_nats::Client) -> Self {
        Self {
            context: jetstream::new(client),
        }
    }

    /// Create the stream holding every subject under `subject_prefix`, or
    /// return it if it already exists. Publishes fail until it does.
    pub async fn ensure_stream(
        &self,
        stream_name: &str,
        subject_prefix: &str,
    ) -> Result<stream::Stream> {
        ensure_event_stream(&self.context, stream_name, subject_prefix).await
    }
}

pub async fn ensure_event_stream(
    context: &jetstream::Context,
    stream_name: &str,
    subject_prefix: &str,
) -> Result<stream::Stream> {
    if subject_prefix.is_empty() {
        anyhow::bail!("stream {} needs a non-empty subject prefix", stream_name);
    }
    context
        .get_or_create_stream(stream::Config {
            name: stream_name.to_string(),
            subjects: vec![format!("{}.>", subject_prefix)],
            ..Default::default()
        })
        .await
        .with_context(|| format!("creating stream {}", stream_name))
}

#[async_trait]
impl NatsPublisher for JetStreamPublisher {
    async fn publish(&self, subject: String, payload: Bytes) -> Result<()> {
        self.context
            .publish(subject, payload)
            .await
            .context("sending to JetStream")?
            .await
            .context("waiting for JetStream ack")?;
        Ok(())
    }
}

/// Records published messages instead of sending them.
#[derive(Default)]
pub struct TestNats {
    published: RwLock<Vec<PublishedMessage>>,
    fail_publishes: RwLock<bool>,
}

impl TestNats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following publish return an error.
    pub fn fail_publishes(&self, fail: bool) {
        *self.fail_publishes.write().unwrap_or_else(|e| e.into_inner()) = fail;
    }

    pub fn record_publish(&self, subject: String, payload: Bytes) {
        self.published
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(PublishedMessage { subject, payload });
    }

    /// Get published messages for a specific subject.
    pub fn messages_for_subject(&self, subject: &str) -> Vec<PublishedMessage> {
        self.published
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|m| m.subject == subject)
            .cloned()
            .collect()
    }

    pub fn publish_count(&self) -> usize {
        self.published
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Decode every message sent to `subject`.
    pub fn decode_all<T: serde::de::DeserializeOwned>(
        &self,
        subject: &str,
    ) -> std::result::Result<Vec<T>, serde_json::Error> {
        self.messages_for_subject(subject)
            .iter()
            .map(|m| serde_json::from_slice(&m.payload))
            .collect()
    }
}

#[async_trait]
impl NatsPublisher for TestNats {
    async fn publish(&self, subject: String, payload: Bytes) -> Result<()> {
        if *self.fail_publishes.read().unwrap_or_else(|e| e.into_inner()) {
            anyhow::bail!("NATS unavailable");
        }
        self.record_publish(subject, payload);
        Ok(())
    }
}
