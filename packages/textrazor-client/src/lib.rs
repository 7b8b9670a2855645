//! Pure TextRazor REST API client.
//!
//! Only the analysis endpoint is covered. TextRazor fetches the page itself
//! when given a URL and can hand back the cleaned document text.
//!
//! # Example
//!
//! ```rust,ignore
//! use textrazor_client::{Extractor, TextRazorClient};
//!
//! let client = TextRazorClient::new("your-api-key".into());
//! let analysis = client.analyze_url("https://example.com", &[Extractor::Entities]).await?;
//! println!("{}", analysis.cleaned_text.unwrap_or_default());
//! ```

pub mod error;
pub mod types;

pub use error::{Result, TextRazorError};
pub use types::{Analysis, AnalyzeResponse, Entity, Extractor};

use std::time::Duration;

const BASE_URL: &str = "https://api.textrazor.com";

pub struct TextRazorClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl TextRazorClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: BASE_URL.to_string(),
        }
    }

    /// Client whose requests fail once `timeout` elapses.
    pub fn with_timeout(api_key: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key,
            base_url: BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Ask TextRazor to download and analyze `url`, returning the cleaned text
    /// alongside whatever the requested extractors produced.
    pub async fn analyze_url(&self, url: &str, extractors: &[Extractor]) -> Result<Analysis> {
        let extractors = extractors
            .iter()
            .map(|e| e.as_str())
            .collect::<Vec<_>>()
            .join(",");

        let params = [
            ("url", url),
            ("extractors", extractors.as_str()),
            ("cleanup.mode", "cleanHTML"),
            ("cleanup.returnCleaned", "true"),
        ];

        let resp = self
            .client
            .post(&self.base_url)
            .header("X-TextRazor-Key", &self.api_key)
            .form(&params)
            .send()
            .await?;

        let status = resp.status();
        let bytes = resp.bytes().await?;

        if !status.is_success() {
            tracing::warn!(url = %url, status = status.as_u16(), "TextRazor request failed");
            return Err(TextRazorError::Api {
                status: status.as_u16(),
                message: types::error_message(&bytes),
            });
        }

        let body: AnalyzeResponse = serde_json::from_slice(&bytes)?;
        let analysis = body.into_analysis()?;
        tracing::debug!(
            url = %url,
            cleaned_len = analysis.cleaned_text.as_deref().map_or(0, str::len),
            entities = analysis.entities.len(),
            "Analyzed URL with TextRazor"
        );
        Ok(analysis)
    }
}
