use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

use crate::domains::query_jobs::models::NewQueryLocation;

/// Which `BaseUrlAnalyzer` the URL stage runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlProcessorKind {
    TextRazor,
    Scraper,
}

impl std::str::FromStr for UrlProcessorKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "textrazor" => Ok(Self::TextRazor),
            "scraper" | "webscraper" => Ok(Self::Scraper),
            other => anyhow::bail!("unknown URL_PROCESSOR '{}'", other),
        }
    }
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub nats_url: String,
    pub nats_subject_prefix: String,
    pub nats_stream: String,
    pub port: u16,
    pub zenserp_api_key: Option<String>,
    pub zenserp_batch_webhook_url: Option<String>,
    pub textrazor_api_key: Option<String>,
    pub url_processor: UrlProcessorKind,
    pub batch_poll_schedule: String,
    pub external_call_timeout: Duration,
    pub query: QueryConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let mut query = QueryConfig::default();
        if let Ok(locations) = env::var("QUERY_LOCATIONS") {
            query.locations = parse_locations(&locations);
            if query.locations.is_empty() {
                anyhow::bail!("QUERY_LOCATIONS must name at least one location");
            }
        }

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            nats_url: env::var("NATS_URL").unwrap_or_else(|_| "nats://localhost:4222".to_string()),
            nats_subject_prefix: parse_subject_prefix(
                &env::var("NATS_SUBJECT_PREFIX").unwrap_or_else(|_| "serp".to_string()),
            )?,
            nats_stream: env::var("NATS_STREAM").unwrap_or_else(|_| "SERP_EVENTS".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            zenserp_api_key: non_empty_var("ZENSERP_API_KEY"),
            zenserp_batch_webhook_url: non_empty_var("ZENSERP_BATCH_WEBHOOK_URL"),
            textrazor_api_key: non_empty_var("TEXTRAZOR_API_KEY"),
            url_processor: env::var("URL_PROCESSOR")
                .unwrap_or_else(|_| "textrazor".to_string())
                .parse()
                .context("URL_PROCESSOR must be 'textrazor' or 'scraper'")?,
            batch_poll_schedule: env::var("BATCH_POLL_SCHEDULE")
                .unwrap_or_else(|_| "0 * * * * *".to_string()),
            external_call_timeout: Duration::from_secs(
                env::var("EXTERNAL_CALL_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "60".to_string())
                    .parse()
                    .context("EXTERNAL_CALL_TIMEOUT_SECS must be a valid number")?,
            ),
            query,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// The stream captures `{prefix}.>`, so the prefix must be a plain,
/// non-empty subject.
fn parse_subject_prefix(raw: &str) -> Result<String> {
    let prefix = raw.trim().trim_end_matches('.');
    if prefix.is_empty() {
        anyhow::bail!("NATS_SUBJECT_PREFIX must not be empty");
    }
    let invalid_token = |token: &str| {
        token.is_empty() || token == "*" || token == ">" || token.contains(char::is_whitespace)
    };
    if prefix.split('.').any(invalid_token) {
        anyhow::bail!("NATS_SUBJECT_PREFIX '{}' is not a valid subject", prefix);
    }
    Ok(prefix.to_string())
}

/// Semicolon-separated, since location names contain commas.
fn parse_locations(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}

/// The set of simulated search origins every new job fans out to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryConfig {
    pub country: String,
    pub locations: Vec<String>,
    pub num: i32,
    pub device: String,
    pub search_engine: String,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            country: "US".to_string(),
            locations: vec![
                "Mather,California,United States".to_string(),
                "Melstone,Montana,United States".to_string(),
                "Austin County,Texas,United States".to_string(),
                "Denton,North Carolina,United States".to_string(),
                "Kingfield,Maine,United States".to_string(),
            ],
            num: 100,
            device: "desktop".to_string(),
            search_engine: "google.com".to_string(),
        }
    }
}

impl QueryConfig {
    pub fn new_locations(&self) -> Vec<NewQueryLocation> {
        self.locations
            .iter()
            .map(|location| NewQueryLocation {
                device: self.device.clone(),
                search_engine: self.search_engine.clone(),
                num: self.num,
                country: self.country.clone(),
                location: location.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_query_config_has_five_us_locations() {
        let locations = QueryConfig::default().new_locations();

        assert_eq!(locations.len(), 5);
        assert!(locations.iter().all(|l| l.country == "US" && l.num == 100));
        assert_eq!(locations[4].location, "Kingfield,Maine,United States");
    }

    #[test]
    fn test_parse_locations_keeps_commas() {
        assert_eq!(
            parse_locations(" Austin County,Texas,United States ;; Kingfield,Maine,United States;"),
            vec![
                "Austin County,Texas,United States".to_string(),
                "Kingfield,Maine,United States".to_string()
            ]
        );
    }

    #[test]
    fn test_subject_prefix_must_be_a_plain_subject() {
        assert_eq!(parse_subject_prefix("serp").unwrap(), "serp");
        assert_eq!(parse_subject_prefix(" prod.serp. ").unwrap(), "prod.serp");

        assert!(parse_subject_prefix("").is_err());
        assert!(parse_subject_prefix("   ").is_err());
        assert!(parse_subject_prefix(">").is_err());
        assert!(parse_subject_prefix("serp.*").is_err());
        assert!(parse_subject_prefix("a..b").is_err());
        assert!(parse_subject_prefix("my serp").is_err());
    }

    #[test]
    fn test_url_processor_kind() {
        assert_eq!("TextRazor".parse::<UrlProcessorKind>().unwrap(), UrlProcessorKind::TextRazor);
        assert_eq!("scraper".parse::<UrlProcessorKind>().unwrap(), UrlProcessorKind::Scraper);
        assert!("firecrawl".parse::<UrlProcessorKind>().is_err());
    }
}
