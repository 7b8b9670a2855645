//! Simple web scraper - local HTTP + HTML parsing
//!
//! - Uses reqwest for HTTP requests
//! - Uses scraper crate for HTML parsing
//! - Uses htmd for HTML to Markdown conversion
//!
//! Limitations:
//! - No JavaScript rendering (use for static HTML sites only)

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::BaseUrlAnalyzer;
use crate::domains::query_jobs::models::{PageLink, ProcessedPage};

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Fetches a page and keeps its title, main content as Markdown and outbound links.
pub struct SimpleScraper {
    client: reqwest::Client,
}

impl SimpleScraper {
    pub fn new(timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    async fn fetch_html(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("HTTP request failed")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("HTTP {} for {}", status, url);
        }

        response
            .text()
            .await
            .context("Failed to read response body")
    }

    fn extract_title(document: &Html) -> Option<String> {
        let title_selector = Selector::parse("title").ok()?;
        document
            .select(&title_selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
    }

    /// Main content HTML, without nav/header/footer/aside.
    fn extract_main_content(document: &Html) -> String {
        let main_selectors = [
            "main",
            "article",
            "[role='main']",
            "#content",
            "#main",
            ".content",
            ".post-content",
            ".entry-content",
        ];

        for selector_str in main_selectors {
            if let Ok(selector) = Selector::parse(selector_str) {
                if let Some(main) = document.select(&selector).next() {
                    return Self::remove_boilerplate(&main.html());
                }
            }
        }

        if let Ok(body_selector) = Selector::parse("body") {
            if let Some(body) = document.select(&body_selector).next() {
                return Self::remove_boilerplate(&body.html());
            }
        }

        document.html()
    }

    fn remove_boilerplate(html: &str) -> String {
        let document = Html::parse_fragment(html);
        let unwanted = [
            "nav", "header", "footer", "aside", ".sidebar", ".menu", ".ads", "script", "style",
            "noscript", "iframe",
        ];

        let mut result = html.to_string();
        for selector_str in unwanted {
            if let Ok(selector) = Selector::parse(selector_str) {
                for element in document.select(&selector) {
                    result = result.replace(&element.html(), "");
                }
            }
        }

        result
    }

    fn html_to_markdown(html: &str) -> String {
        htmd::convert(html).unwrap_or_else(|_| {
            let document = Html::parse_document(html);
            document.root_element().text().collect::<String>()
        })
    }

    /// Every http(s) anchor on the page, resolved against the page URL.
    /// Duplicate (text, url) pairs are kept once.
    fn extract_links(document: &Html, base_url: &Url) -> Vec<PageLink> {
        let link_selector = match Selector::parse("a[href]") {
            Ok(s) => s,
            Err(_) => return vec![],
        };

        let mut seen = HashSet::new();
        document
            .select(&link_selector)
            .filter_map(|el| {
                let href = el.value().attr("href")?;
                let mut url = base_url.join(href).ok()?;
                if url.scheme() != "http" && url.scheme() != "https" {
                    return None;
                }
                url.set_fragment(None);

                let text = el.text().collect::<Vec<_>>().join(" ");
                let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
                Some(PageLink {
                    text,
                    url: url.to_string(),
                })
            })
            .filter(|link| seen.insert((link.text.clone(), link.url.clone())))
            .collect()
    }

    fn parse_page(html: &str, base_url: &Url) -> ProcessedPage {
        let document = Html::parse_document(html);

        let title = Self::extract_title(&document);
        let main_content = Self::extract_main_content(&document);
        let body = Self::html_to_markdown(&main_content);
        let links = Self::extract_links(&document, base_url);

        ProcessedPage { body, title, links }
    }
}

#[async_trait]
impl BaseUrlAnalyzer for SimpleScraper {
    fn name(&self) -> &'static str {
        "scraper"
    }

    async fn analyze(&self, url: &str) -> Result<ProcessedPage> {
        let base_url = Url::parse(url).with_context(|| format!("Invalid URL {}", url))?;
        debug!(url = %url, "Scraping page");

        let html = self.fetch_html(url).await?;
        let page = Self::parse_page(&html, &base_url);

        if page.body.trim().len() < 100 {
            warn!(url = %url, "Page has minimal content");
        }

        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_title() {
        let html = r#"<html><head><title> Test Page </title></head><body></body></html>"#;
        let document = Html::parse_document(html);
        assert_eq!(
            SimpleScraper::extract_title(&document),
            Some("Test Page".to_string())
        );
    }

    #[test]
    fn test_html_to_markdown() {
        let md = SimpleScraper::html_to_markdown("<h1>Hello</h1><p>World</p>");
        assert!(md.contains("Hello"));
        assert!(md.contains("World"));
    }

    #[test]
    fn test_links_are_absolute_and_http_only() {
        let base = Url::parse("https://shop.example/blog/post").unwrap();
        let html = r#"
            <html><body>
                <a href="/about">About   us</a>
                <a href="https://other.example/x#top">Other</a>
                <a href="mailto:hi@shop.example">Mail</a>
                <a href="/about">About us</a>
            </body></html>
        "#;

        let links = SimpleScraper::extract_links(&Html::parse_document(html), &base);

        assert_eq!(
            links,
            vec![
                PageLink {
                    text: "About us".into(),
                    url: "https://shop.example/about".into()
                },
                PageLink {
                    text: "Other".into(),
                    url: "https://other.example/x".into()
                },
            ]
        );
    }

    #[test]
    fn test_parse_page_drops_navigation() {
        let base = Url::parse("https://shop.example/").unwrap();
        let html = r#"
            <html><head><title>Roasters</title></head>
            <body>
                <nav>Home | Shop</nav>
                <main><h1>Best beans</h1><p>Single origin coffee.</p></main>
            </body></html>
        "#;

        let page = SimpleScraper::parse_page(html, &base);

        assert_eq!(page.title.as_deref(), Some("Roasters"));
        assert!(page.body.contains("Best beans"));
        assert!(!page.body.contains("Home | Shop"));
    }
}
