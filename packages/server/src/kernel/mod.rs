//! Kernel module - server infrastructure and dependencies.

pub mod deps;
pub mod event_worker;
pub mod nats;
pub mod query_job_store;
pub mod scheduled_tasks;
pub mod simple_scraper;
pub mod test_dependencies;
pub mod textrazor_analyzer;
pub mod traits;
pub mod zenserp_search;

pub use deps::ServerDeps;
pub use event_worker::EventWorker;
pub use nats::{JetStreamPublisher, NatsPublisher, PublishedMessage, TestNats};
pub use query_job_store::PostgresQueryJobStore;
pub use simple_scraper::SimpleScraper;
pub use test_dependencies::{
    InMemoryQueryJobStore, MockSearchBatchService, MockUrlAnalyzer, TestDependencies,
};
pub use textrazor_analyzer::TextRazorAnalyzer;
pub use traits::*;
pub use zenserp_search::ZenserpSearchService;
