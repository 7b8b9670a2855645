use serde::Deserialize;

use crate::error::{Result, TextRazorError};

/// Analysis stages TextRazor can run over a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extractor {
    Entities,
    Topics,
    Words,
    Phrases,
}

impl Extractor {
    pub fn as_str(self) -> &'static str {
        match self {
            Extractor::Entities => "entities",
            Extractor::Topics => "topics",
            Extractor::Words => "words",
            Extractor::Phrases => "phrases",
        }
    }
}

/// Raw envelope returned by the analysis endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub response: Option<Analysis>,
}

impl AnalyzeResponse {
    pub(crate) fn into_analysis(self) -> Result<Analysis> {
        if !self.ok {
            return Err(TextRazorError::Rejected(
                self.error.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }
        self.response
            .ok_or_else(|| TextRazorError::Rejected("response body missing".to_string()))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    #[serde(default)]
    pub cleaned_text: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub entities: Vec<Entity>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    #[serde(default)]
    pub entity_id: Option<String>,
    #[serde(default)]
    pub matched_text: Option<String>,
    #[serde(default)]
    pub relevance_score: Option<f64>,
}

/// Pull the `error` field out of a failed response, falling back to the raw body.
pub(crate) fn error_message(body: &[u8]) -> String {
    serde_json::from_slice::<AnalyzeResponse>(body)
        .ok()
        .and_then(|r| r.error)
        .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_successful_response_yields_cleaned_text() {
        let json = r#"{
            "response": {
                "cleanedText": "Best coffee in town",
                "language": "eng",
                "entities": [{"entityId": "Coffee", "matchedText": "coffee", "relevanceScore": 0.8}]
            },
            "time": 0.21,
            "ok": true
        }"#;

        let resp: AnalyzeResponse = serde_json::from_str(json).unwrap();
        let analysis = resp.into_analysis().unwrap();

        assert_eq!(analysis.cleaned_text.as_deref(), Some("Best coffee in town"));
        assert_eq!(analysis.entities.len(), 1);
    }

    #[test]
    fn test_not_ok_response_is_rejected() {
        let resp: AnalyzeResponse =
            serde_json::from_str(r#"{"ok": false, "error": "Could not download URL"}"#).unwrap();

        match resp.into_analysis() {
            Err(TextRazorError::Rejected(msg)) => assert_eq!(msg, "Could not download URL"),
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_error_message_falls_back_to_body() {
        assert_eq!(error_message(b"Bad Gateway"), "Bad Gateway");
        assert_eq!(
            error_message(br#"{"ok": false, "error": "quota exceeded"}"#),
            "quota exceeded"
        );
    }

    #[test]
    fn test_extractor_names() {
        assert_eq!(Extractor::Entities.as_str(), "entities");
        assert_eq!(Extractor::Phrases.as_str(), "phrases");
    }
}
