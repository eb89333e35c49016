//! Remote Site Abstraction
//!
//! The contract the sync core consumes for one authenticated session on a
//! wiki site. Concrete implementations live in provider crates
//! (`provider-mediawiki`); the core only ever sees `dyn SiteClient`.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::BridgeError;

/// Classified failure of a remote site call.
#[derive(Error, Debug)]
pub enum SiteError {
    /// The named entity does not exist on the site.
    #[error("Content missing: {0}")]
    NotFound(String),

    /// Network failure, timeout, rate limiting or a 5xx answer.
    #[error("Transient failure: {0}")]
    Transient(String),

    /// Rejected token, insufficient rights or failed user assertion.
    /// The remote message is kept verbatim.
    #[error("Permission denied: {0}")]
    Permission(String),

    /// Response did not have the expected shape.
    #[error("Malformed response ({context}): {payload}")]
    Malformed { context: String, payload: String },

    /// Any other error object returned by the remote API.
    #[error("API error {code}: {info}")]
    Api { code: String, info: String },

    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

impl SiteError {
    pub fn is_transient(&self) -> bool {
        match self {
            SiteError::Transient(_) => true,
            SiteError::Bridge(e) => e.is_transient(),
            _ => false,
        }
    }
}

pub type SiteResult<T> = std::result::Result<T, SiteError>;

/// One entry of the recent-changes feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentChange {
    pub title: String,
    pub timestamp: DateTime<Utc>,
    pub user: Option<String>,
    pub comment: Option<String>,
}

/// A listed document with its stable numeric id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRef {
    pub id: u64,
    pub title: String,
}

/// Binary media metadata as reported by the site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Direct download URL of the current revision.
    pub url: String,
    /// Hex SHA-1 of the current revision.
    pub sha1: String,
    pub size: u64,
}

/// Everything an upload needs besides the file bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadMetadata {
    /// Initial description page text (license/attribution).
    pub page_text: String,
    pub comment: String,
    /// CSRF write token obtained via [`SiteClient::get_write_token`].
    pub token: String,
    pub ignore_warnings: bool,
}

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    /// Remote result code, e.g. `Success`.
    pub result: String,
    pub filename: String,
}

/// Wiki site session
///
/// One value per authenticated session. Values are created by the caller
/// and passed explicitly into every sync operation.
///
/// Paginated listings return `(items, continuation)`; `None` means the
/// listing is exhausted. Continuation tokens are opaque to the caller.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::site::SiteClient;
///
/// async fn count_pages(site: &dyn SiteClient) -> SiteResult<usize> {
///     let mut cursor = None;
///     let mut total = 0;
///     loop {
///         let (titles, next) = site.list_titles(0, cursor).await?;
///         total += titles.len();
///         cursor = next;
///         if cursor.is_none() {
///             break;
///         }
///     }
///     Ok(total)
/// }
/// ```
#[async_trait]
pub trait SiteClient: Send + Sync {
    /// Human readable site name used in logs.
    fn name(&self) -> &str;

    /// Current text of a document, `None` when the document does not exist.
    async fn read_document(&self, title: &str) -> SiteResult<Option<String>>;

    /// Documents in a namespace with their ids, ascending by title.
    async fn list_pages(
        &self,
        namespace: i32,
        continuation: Option<String>,
    ) -> SiteResult<(Vec<PageRef>, Option<String>)>;

    /// Titles in a namespace, ascending.
    async fn list_titles(
        &self,
        namespace: i32,
        continuation: Option<String>,
    ) -> SiteResult<(Vec<String>, Option<String>)> {
        let (pages, next) = self.list_pages(namespace, continuation).await?;
        Ok((pages.into_iter().map(|page| page.title).collect(), next))
    }

    /// Recent changes between `end` (newest) and `start` (oldest), newest first.
    async fn list_recent_changes(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        continuation: Option<String>,
    ) -> SiteResult<(Vec<RecentChange>, Option<String>)>;

    /// Media metadata, `None` when the file does not exist.
    async fn get_media_info(&self, title: &str) -> SiteResult<Option<MediaInfo>>;

    async fn download_media(&self, url: &str) -> SiteResult<Bytes>;

    /// Create or replace a document.
    async fn write_document(&self, title: &str, content: &str, comment: &str) -> SiteResult<()>;

    /// CSRF token for write operations.
    async fn get_write_token(&self) -> SiteResult<String>;

    async fn upload_media(
        &self,
        filename: &str,
        content: Bytes,
        metadata: UploadMetadata,
    ) -> SiteResult<UploadResult>;
}
