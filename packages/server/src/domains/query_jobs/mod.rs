pub mod activities;
pub mod data;
pub mod error;
pub mod events;
pub mod models;

pub use error::QueryJobError;
pub use models::{QueryItem, QueryJob, QueryLocation};
