pub mod query_jobs;
