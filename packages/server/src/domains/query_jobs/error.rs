use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum QueryJobError {
    #[error("keyword must not be empty")]
    EmptyKeyword,

    #[error("query job {0} not found")]
    NotFound(Uuid),

    #[error("{0} is not configured")]
    DependencyUnavailable(&'static str),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}
