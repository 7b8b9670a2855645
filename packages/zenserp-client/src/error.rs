use thiserror::Error;

pub type Result<T> = std::result::Result<T, ZenserpError>;

#[derive(Debug, Error)]
pub enum ZenserpError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Zenserp API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Failed to decode Zenserp response: {0}")]
    Decode(#[from] serde_json::Error),
}
