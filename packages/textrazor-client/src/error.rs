use thiserror::Error;

pub type Result<T> = std::result::Result<T, TextRazorError>;

#[derive(Debug, Error)]
pub enum TextRazorError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TextRazor API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("TextRazor rejected the request: {0}")]
    Rejected(String),

    #[error("Failed to decode TextRazor response: {0}")]
    Decode(#[from] serde_json::Error),
}
