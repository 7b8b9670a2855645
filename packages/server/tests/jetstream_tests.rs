//! JetStream integration tests against a real NATS server.
//!
//! Run with: cargo test --test jetstream_tests

use std::time::Duration;

use bytes::Bytes;
use serp_core::common::nats::{publish_event, subject_for};
use serp_core::domains::query_jobs::events::{QueryJobUrlDiscovered, QueryJobUrlProcessed};
use serp_core::domains::query_jobs::models::NewQueryItem;
use serp_core::kernel::{
    BaseQueryJobStore, EventWorker, JetStreamPublisher, NatsPublisher, TestDependencies,
};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::nats::{Nats, NatsServerCmd};

async fn start_nats() -> (ContainerAsync<Nats>, async_nats::Client) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let container = Nats::default()
        .with_cmd(&NatsServerCmd::default().with_jetstream())
        .start()
        .await
        .expect("Failed to start NATS container");
    let host = container.get_host().await.unwrap();
    let port = container.get_host_port_ipv4(4222).await.unwrap();

    let client = async_nats::connect(format!("nats://{}:{}", host, port))
        .await
        .expect("Failed to connect to NATS");
    (container, client)
}

/// Poll `condition` every 100ms until it holds or `timeout` passes.
async fn wait_for(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    condition()
}

#[tokio::test]
async fn publishing_needs_the_stream_to_exist() {
    let (_container, client) = start_nats().await;
    let nats = JetStreamPublisher::new(client);

    let before = nats
        .publish("orders.query_job.created".to_string(), Bytes::from("{}"))
        .await;
    assert!(before.is_err());

    nats.ensure_stream("ORDERS_EVENTS", "orders").await.unwrap();
    // Creating it again is a no-op
    nats.ensure_stream("ORDERS_EVENTS", "orders").await.unwrap();

    nats.publish("orders.query_job.created".to_string(), Bytes::from("{}"))
        .await
        .unwrap();
}

#[tokio::test]
async fn stream_is_refused_for_an_empty_prefix() {
    let (_container, client) = start_nats().await;
    let nats = JetStreamPublisher::new(client);

    assert!(nats.ensure_stream("BARE_EVENTS", "").await.is_err());
}

#[tokio::test]
async fn failed_url_is_redelivered_after_a_delay_until_the_store_recovers() {
    let (_container, client) = start_nats().await;

    let test_deps = TestDependencies::new();
    let job = test_deps
        .store
        .create_job("desk", &test_deps.query_config.new_locations())
        .await
        .unwrap();
    let location = test_deps.store.list_locations(job.id).await.unwrap()[0].id;
    test_deps
        .store
        .create_items(&[NewQueryItem {
            query_job_id: job.id,
            query_location_id: location,
            position: 1,
            url: "https://desk.example/".to_string(),
            title: "Desk".to_string(),
        }])
        .await
        .unwrap();
    test_deps.store.fail_item_writes(true);

    let deps = test_deps.deps();
    let worker = EventWorker::new(client.clone(), "RETRY_EVENTS", deps.clone());
    worker.ensure_stream().await.unwrap();
    let running = tokio::spawn(worker.run());

    let publisher = JetStreamPublisher::new(client);
    publish_event(
        &QueryJobUrlDiscovered {
            query_job_id: job.id,
            url: "https://desk.example/".to_string(),
        },
        &deps.subject_prefix,
        &publisher,
    )
    .await
    .unwrap();

    let analyzer = test_deps.analyzer.clone();
    assert!(wait_for(Duration::from_secs(10), || analyzer.calls().len() == 1).await);

    // The nak carries a delay, so the message is not handed straight back
    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert_eq!(analyzer.calls().len(), 1);

    test_deps.store.fail_item_writes(false);

    let store = test_deps.store.clone();
    let processed = wait_for(Duration::from_secs(30), || {
        store.items(job.id).iter().all(|i| i.processed_at.is_some())
    })
    .await;
    assert!(processed);
    assert!(analyzer.calls().len() >= 2);

    // The stage announced the processed URL through the deps publisher
    assert_eq!(
        test_deps
            .nats
            .messages_for_subject(&subject_for::<QueryJobUrlProcessed>(&deps.subject_prefix))
            .len(),
        1
    );

    running.abort();
}
