// HTTP routes
pub mod errors;
pub mod health;
pub mod query_jobs;

pub use errors::ApiError;
pub use health::*;
