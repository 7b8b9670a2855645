//! URL analysis through TextRazor's cleaned-text extraction.

use anyhow::Result;
use async_trait::async_trait;
use textrazor_client::{Extractor, TextRazorClient};
use tracing::debug;

use super::BaseUrlAnalyzer;
use crate::domains::query_jobs::models::ProcessedPage;

pub struct TextRazorAnalyzer {
    client: TextRazorClient,
}

impl TextRazorAnalyzer {
    pub fn new(client: TextRazorClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BaseUrlAnalyzer for TextRazorAnalyzer {
    fn name(&self) -> &'static str {
        "textrazor"
    }

    async fn analyze(&self, url: &str) -> Result<ProcessedPage> {
        let analysis = self.client.analyze_url(url, &[Extractor::Entities]).await?;

        let body = analysis.cleaned_text.unwrap_or_default();
        debug!(url = %url, chars = body.len(), "TextRazor analysis finished");

        // TextRazor gives no title or links back
        Ok(ProcessedPage {
            body,
            title: None,
            links: Vec::new(),
        })
    }
}
