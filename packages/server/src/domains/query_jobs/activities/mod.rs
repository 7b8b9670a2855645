pub mod completion;
pub mod create;
pub mod dispatch;
pub mod expand;
pub mod poll;
pub mod process_url;
pub mod reports;

pub use completion::{check_query_job_completion, CompletionCheck};
pub use create::create_query_job;
pub use dispatch::{dispatch_search_batch, DispatchOutcome};
pub use expand::{expand_search_results, ExpandSummary};
pub use poll::{poll_search_batches, PollSummary};
pub use process_url::{process_query_job_url, UrlOutcome};
pub use reports::{get_position_hits, get_url_info};
