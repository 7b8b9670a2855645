pub mod link;
pub mod position_hit;
pub mod query_item;
pub mod query_job;
pub mod query_location;

pub use link::*;
pub use position_hit::*;
pub use query_item::*;
pub use query_job::*;
pub use query_location::*;
