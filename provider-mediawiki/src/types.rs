//! MediaWiki action API response types
//!
//! Shapes for `format=json&formatversion=2` responses.

use serde::Deserialize;
use serde_json::{Map, Value};

/// `error` object present on failed calls
///
/// See: https://www.mediawiki.org/wiki/API:Errors_and_warnings
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub code: String,
    #[serde(default)]
    pub info: String,
}

/// Probe deserialized before the typed body.
#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub error: Option<ApiErrorBody>,
}

/// `action=query` response
#[derive(Debug, Deserialize)]
pub struct QueryResponse<Q> {
    /// Continuation parameters for the next request
    #[serde(rename = "continue")]
    pub continuation: Option<Map<String, Value>>,

    pub query: Option<Q>,
}

#[derive(Debug, Deserialize)]
pub struct TokensQuery {
    pub tokens: Tokens,
}

#[derive(Debug, Deserialize)]
pub struct Tokens {
    pub logintoken: Option<String>,
    pub csrftoken: Option<String>,
}

/// `prop=revisions` / `prop=imageinfo` result
#[derive(Debug, Deserialize)]
pub struct PagesQuery {
    #[serde(default)]
    pub pages: Vec<WikiPage>,
}

#[derive(Debug, Deserialize)]
pub struct WikiPage {
    pub pageid: Option<u64>,
    pub title: String,
    #[serde(default)]
    pub missing: bool,
    #[serde(default)]
    pub invalid: bool,
    #[serde(default)]
    pub revisions: Vec<Revision>,
    #[serde(default)]
    pub imageinfo: Vec<ImageInfo>,
}

#[derive(Debug, Deserialize)]
pub struct Revision {
    pub slots: RevisionSlots,
}

#[derive(Debug, Deserialize)]
pub struct RevisionSlots {
    pub main: Slot,
}

#[derive(Debug, Deserialize)]
pub struct Slot {
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ImageInfo {
    pub url: String,
    pub sha1: String,
    #[serde(default)]
    pub size: u64,
}

/// `list=allpages` result
#[derive(Debug, Deserialize)]
pub struct AllPagesQuery {
    #[serde(default)]
    pub allpages: Vec<PageEntry>,
}

#[derive(Debug, Deserialize)]
pub struct PageEntry {
    pub pageid: u64,
    pub title: String,
}

/// `list=recentchanges` result
#[derive(Debug, Deserialize)]
pub struct RecentChangesQuery {
    #[serde(default)]
    pub recentchanges: Vec<RecentChangeEntry>,
}

#[derive(Debug, Deserialize)]
pub struct RecentChangeEntry {
    pub title: String,
    pub timestamp: String,
    pub user: Option<String>,
    pub comment: Option<String>,
}

/// `action=login` response
#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub login: LoginResult,
}

#[derive(Debug, Deserialize)]
pub struct LoginResult {
    pub result: String,
    pub lgusername: Option<String>,
    /// A string on current releases, an object on some older ones
    pub reason: Option<Value>,
}

/// `action=edit` response
#[derive(Debug, Deserialize)]
pub struct EditResponse {
    pub edit: EditResult,
}

#[derive(Debug, Deserialize)]
pub struct EditResult {
    pub result: String,
    #[serde(default)]
    pub nochange: bool,
    pub newrevid: Option<u64>,
}

/// `action=upload` response
#[derive(Debug, Deserialize)]
pub struct UploadResponse {
    pub upload: UploadBody,
}

#[derive(Debug, Deserialize)]
pub struct UploadBody {
    pub result: String,
    pub filename: Option<String>,
    pub warnings: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_revisions_with_missing_page() {
        let json = r#"{
            "batchcomplete": true,
            "query": {
                "pages": [
                    {"pageid": 12, "ns": 0, "title": "水藻箱",
                     "revisions": [{"slots": {"main": {"contentmodel": "wikitext", "content": "text"}}}]},
                    {"ns": 0, "title": "Nope", "missing": true}
                ]
            }
        }"#;

        let response: QueryResponse<PagesQuery> = serde_json::from_str(json).unwrap();
        let pages = response.query.unwrap().pages;
        assert_eq!(pages.len(), 2);
        assert_eq!(
            pages[0].revisions[0].slots.main.content.as_deref(),
            Some("text")
        );
        assert!(pages[1].missing);
        assert!(response.continuation.is_none());
    }

    #[test]
    fn test_deserialize_allpages_with_continue() {
        let json = r#"{
            "continue": {"apcontinue": "Bravo", "continue": "-||"},
            "query": {"allpages": [{"pageid": 1, "ns": 0, "title": "Alpha"}]}
        }"#;

        let response: QueryResponse<AllPagesQuery> = serde_json::from_str(json).unwrap();
        let continuation = response.continuation.unwrap();
        assert_eq!(continuation.get("apcontinue").and_then(Value::as_str), Some("Bravo"));
        assert_eq!(response.query.unwrap().allpages[0].title, "Alpha");
    }

    #[test]
    fn test_deserialize_error_envelope() {
        let json = r#"{"error": {"code": "badtoken", "info": "Invalid CSRF token.", "*": "docs"}}"#;
        let envelope: ErrorEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.error.unwrap().code, "badtoken");

        let ok: ErrorEnvelope = serde_json::from_str(r#"{"batchcomplete": true}"#).unwrap();
        assert!(ok.error.is_none());
    }

    #[test]
    fn test_deserialize_upload_warning() {
        let json = r#"{"upload": {"result": "Warning", "warnings": {"exists": "Logo.png"}, "filekey": "x"}}"#;
        let response: UploadResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.upload.result, "Warning");
        assert!(response.upload.warnings.is_some());
    }
}
