//! MediaWiki Action API connector
//!
//! Implements the `SiteClient` trait for one logged-in session against a
//! MediaWiki `api.php` endpoint.

use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, MultipartForm};
use bridge_traits::site::{
    MediaInfo, PageRef, RecentChange, SiteClient, SiteResult, UploadMetadata, UploadResult,
};
use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use core_runtime::config::SiteConfig;
use core_runtime::logging::redact_if_sensitive;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::{MediaWikiError, Result};
use crate::types::{
    AllPagesQuery, EditResponse, ErrorEnvelope, LoginResponse, PagesQuery, QueryResponse,
    RecentChangesQuery, TokensQuery, UploadResponse,
};

/// Timeout for ordinary API calls
const API_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for file transfers
const TRANSFER_TIMEOUT: Duration = Duration::from_secs(120);

type Params = Vec<(String, String)>;

/// MediaWiki API connector
///
/// Every request carries `format=json` and `formatversion=2`. Once logged
/// in, requests also assert `user` so an expired session fails loudly
/// instead of acting anonymously.
///
/// # Example
///
/// ```ignore
/// use provider_mediawiki::MediaWikiSite;
///
/// let site = MediaWikiSite::connect(http_client, config).await?;
/// let text = site.read_document("水藻箱").await?;
/// ```
pub struct MediaWikiSite {
    http_client: Arc<dyn HttpClient>,
    config: SiteConfig,
}

impl MediaWikiSite {
    /// Create a connector without logging in.
    pub fn new(http_client: Arc<dyn HttpClient>, config: SiteConfig) -> Self {
        Self {
            http_client,
            config,
        }
    }

    /// Create a connector and log in with the configured credentials.
    pub async fn connect(http_client: Arc<dyn HttpClient>, config: SiteConfig) -> Result<Self> {
        let site = Self::new(http_client, config);
        site.login().await?;
        Ok(site)
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    /// Two-step bot login: fetch a login token, then post the credentials.
    ///
    /// The session cookie lives in the HTTP client's jar.
    #[instrument(skip(self), fields(site = %self.config.name))]
    pub async fn login(&self) -> Result<()> {
        let mut params = self.base_params(false);
        push(&mut params, "action", "query");
        push(&mut params, "meta", "tokens");
        push(&mut params, "type", "login");
        let tokens: QueryResponse<TokensQuery> = self.get("login token", params).await?;
        let login_token = tokens
            .query
            .and_then(|q| q.tokens.logintoken)
            .ok_or_else(|| MediaWikiError::LoginFailed {
                site: self.config.name.clone(),
                reason: "no login token returned".to_string(),
            })?;

        let mut params = self.base_params(false);
        push(&mut params, "action", "login");
        push(&mut params, "lgname", &self.config.username);
        push(&mut params, "lgpassword", &self.config.password);
        push(&mut params, "lgtoken", &login_token);
        let response: LoginResponse = self.post_form("login", params).await?;

        if response.login.result != "Success" {
            let reason = match response.login.reason {
                Some(Value::String(text)) => text,
                Some(other) => other.to_string(),
                None => response.login.result.clone(),
            };
            warn!("Login rejected: {}", reason);
            return Err(MediaWikiError::LoginFailed {
                site: self.config.name.clone(),
                reason,
            });
        }

        info!(
            "Logged in as {}",
            response
                .login
                .lgusername
                .as_deref()
                .unwrap_or(&self.config.username)
        );
        Ok(())
    }

    fn base_params(&self, assert_user: bool) -> Params {
        let mut params = vec![
            ("format".to_string(), "json".to_string()),
            ("formatversion".to_string(), "2".to_string()),
        ];
        if assert_user {
            push(&mut params, "assert", "user");
        }
        params
    }

    fn headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert("User-Agent".to_string(), self.config.user_agent.clone());
        if let Some(key) = &self.config.auth_key {
            headers.insert("X-authkey".to_string(), key.clone());
        }
        headers
    }

    fn request(&self, method: HttpMethod, url: String, timeout: Duration) -> HttpRequest {
        let mut request = HttpRequest::new(method, url).timeout(timeout);
        request.headers.extend(self.headers());
        request
    }

    async fn get<T: DeserializeOwned>(&self, context: &str, params: Params) -> Result<T> {
        let query = serde_urlencoded::to_string(&params)
            .map_err(|e| MediaWikiError::Parse {
                context: context.to_string(),
                payload: e.to_string(),
            })?;
        debug!(params = %loggable(&params), "GET {}", context);
        let url = format!("{}?{}", self.config.api_url, query);
        let request = self.request(HttpMethod::Get, url, API_TIMEOUT);
        let response = self.http_client.execute(request).await?;
        decode(context, &response)
    }

    async fn post_form<T: DeserializeOwned>(&self, context: &str, params: Params) -> Result<T> {
        debug!(params = %loggable(&params), "POST {}", context);
        let request = self
            .request(HttpMethod::Post, self.config.api_url.clone(), API_TIMEOUT)
            .form(&params)?;
        let response = self.http_client.execute(request).await?;
        decode(context, &response)
    }

    async fn csrf_token(&self) -> Result<String> {
        let mut params = self.base_params(true);
        push(&mut params, "action", "query");
        push(&mut params, "meta", "tokens");
        let tokens: QueryResponse<TokensQuery> = self.get("csrf token", params).await?;
        tokens
            .query
            .and_then(|q| q.tokens.csrftoken)
            .ok_or_else(|| MediaWikiError::Parse {
                context: "query.tokens.csrftoken".to_string(),
                payload: "missing".to_string(),
            })
    }

    async fn query_pages(&self, context: &str, params: Params) -> Result<PagesQuery> {
        let response: QueryResponse<PagesQuery> = self.get(context, params).await?;
        response.query.ok_or_else(|| MediaWikiError::Parse {
            context: context.to_string(),
            payload: "response without query".to_string(),
        })
    }
}

fn push(params: &mut Params, key: &str, value: &str) {
    params.push((key.to_string(), value.to_string()));
}

/// `key=value` pairs for debug logs, with credentials masked.
fn loggable(params: &Params) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{}={}", key, redact_if_sensitive(key, value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Status check, then error envelope, then the expected shape.
fn decode<T: DeserializeOwned>(context: &str, response: &HttpResponse) -> Result<T> {
    if !response.is_success() {
        return Err(MediaWikiError::Http {
            status: response.status,
            body: String::from_utf8_lossy(&response.body).into_owned(),
        });
    }

    if let Ok(ErrorEnvelope { error: Some(error) }) = serde_json::from_slice(&response.body) {
        return Err(MediaWikiError::Api {
            code: error.code,
            info: error.info,
        });
    }

    serde_json::from_slice(&response.body).map_err(|_| MediaWikiError::parse(context, &response.body))
}

fn encode_continuation(continuation: Option<Map<String, Value>>) -> Result<Option<String>> {
    continuation
        .map(|map| {
            serde_json::to_string(&map)
                .map_err(|e| MediaWikiError::InvalidContinuation(e.to_string()))
        })
        .transpose()
}

fn apply_continuation(params: &mut Params, token: Option<String>) -> Result<()> {
    let Some(token) = token else {
        return Ok(());
    };
    let map: Map<String, Value> = serde_json::from_str(&token)
        .map_err(|_| MediaWikiError::InvalidContinuation(token.clone()))?;
    for (key, value) in map {
        let value = match value {
            Value::String(text) => text,
            other => other.to_string(),
        };
        params.push((key, value));
    }
    Ok(())
}

fn format_timestamp(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[async_trait]
impl SiteClient for MediaWikiSite {
    fn name(&self) -> &str {
        &self.config.name
    }

    #[instrument(skip(self), fields(site = %self.config.name))]
    async fn read_document(&self, title: &str) -> SiteResult<Option<String>> {
        let mut params = self.base_params(true);
        push(&mut params, "action", "query");
        push(&mut params, "prop", "revisions");
        push(&mut params, "rvprop", "content");
        push(&mut params, "rvslots", "main");
        push(&mut params, "titles", title);

        let pages = self.query_pages("revisions", params).await?;
        let Some(page) = pages.pages.into_iter().next() else {
            return Ok(None);
        };
        if page.missing || page.invalid {
            debug!("Document {} does not exist", title);
            return Ok(None);
        }
        Ok(page
            .revisions
            .into_iter()
            .next()
            .and_then(|revision| revision.slots.main.content))
    }

    #[instrument(skip(self), fields(site = %self.config.name))]
    async fn list_pages(
        &self,
        namespace: i32,
        continuation: Option<String>,
    ) -> SiteResult<(Vec<PageRef>, Option<String>)> {
        let mut params = self.base_params(true);
        push(&mut params, "action", "query");
        push(&mut params, "list", "allpages");
        push(&mut params, "apnamespace", &namespace.to_string());
        push(&mut params, "apdir", "ascending");
        push(&mut params, "aplimit", "max");
        apply_continuation(&mut params, continuation)?;

        let response: QueryResponse<AllPagesQuery> = self.get("allpages", params).await?;
        let pages: Vec<PageRef> = response
            .query
            .map(|q| q.allpages)
            .unwrap_or_default()
            .into_iter()
            .map(|entry| PageRef {
                id: entry.pageid,
                title: entry.title,
            })
            .collect();

        debug!("Listed {} pages in namespace {}", pages.len(), namespace);
        Ok((pages, encode_continuation(response.continuation)?))
    }

    #[instrument(skip(self), fields(site = %self.config.name))]
    async fn list_recent_changes(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        continuation: Option<String>,
    ) -> SiteResult<(Vec<RecentChange>, Option<String>)> {
        let mut params = self.base_params(true);
        push(&mut params, "action", "query");
        push(&mut params, "list", "recentchanges");
        push(&mut params, "rcstart", &format_timestamp(end));
        push(&mut params, "rcend", &format_timestamp(start));
        push(&mut params, "rcdir", "older");
        push(&mut params, "rcprop", "title|timestamp|user|comment");
        push(&mut params, "rclimit", "max");
        apply_continuation(&mut params, continuation)?;

        let response: QueryResponse<RecentChangesQuery> =
            self.get("recentchanges", params).await?;
        let mut changes = Vec::new();
        for entry in response.query.map(|q| q.recentchanges).unwrap_or_default() {
            let timestamp = DateTime::parse_from_rfc3339(&entry.timestamp)
                .map_err(|_| MediaWikiError::Parse {
                    context: "recentchanges.timestamp".to_string(),
                    payload: entry.timestamp.clone(),
                })?
                .with_timezone(&Utc);
            changes.push(RecentChange {
                title: entry.title,
                timestamp,
                user: entry.user,
                comment: entry.comment,
            });
        }

        Ok((changes, encode_continuation(response.continuation)?))
    }

    #[instrument(skip(self), fields(site = %self.config.name))]
    async fn get_media_info(&self, title: &str) -> SiteResult<Option<MediaInfo>> {
        let mut params = self.base_params(true);
        push(&mut params, "action", "query");
        push(&mut params, "prop", "imageinfo");
        push(&mut params, "iiprop", "url|sha1|size");
        push(&mut params, "titles", title);

        let pages = self.query_pages("imageinfo", params).await?;
        Ok(pages
            .pages
            .into_iter()
            .next()
            .filter(|page| !page.missing && !page.invalid)
            .and_then(|page| page.imageinfo.into_iter().next())
            .map(|info| MediaInfo {
                url: info.url,
                sha1: info.sha1,
                size: info.size,
            }))
    }

    #[instrument(skip(self), fields(site = %self.config.name))]
    async fn download_media(&self, url: &str) -> SiteResult<Bytes> {
        let request = self.request(HttpMethod::Get, url.to_string(), TRANSFER_TIMEOUT);
        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(MediaWikiError::from)?;

        if !response.is_success() {
            return Err(MediaWikiError::Http {
                status: response.status,
                body: String::from_utf8_lossy(&response.body).into_owned(),
            }
            .into());
        }

        debug!("Downloaded {} bytes", response.body.len());
        Ok(response.body)
    }

    #[instrument(skip(self, content), fields(site = %self.config.name))]
    async fn write_document(&self, title: &str, content: &str, comment: &str) -> SiteResult<()> {
        let token = self.csrf_token().await?;

        let mut params = self.base_params(true);
        push(&mut params, "action", "edit");
        push(&mut params, "title", title);
        push(&mut params, "text", content);
        push(&mut params, "summary", comment);
        push(&mut params, "token", &token);

        let response: EditResponse = self.post_form("edit", params).await?;
        if response.edit.result != "Success" {
            return Err(MediaWikiError::Api {
                code: format!("edit-{}", response.edit.result.to_lowercase()),
                info: format!("edit of {} returned {}", title, response.edit.result),
            }
            .into());
        }

        if response.edit.nochange {
            debug!("Edit of {} was a no-op on the remote side", title);
        } else {
            info!("Wrote {} (revision {:?})", title, response.edit.newrevid);
        }
        Ok(())
    }

    async fn get_write_token(&self) -> SiteResult<String> {
        Ok(self.csrf_token().await?)
    }

    #[instrument(skip(self, content, metadata), fields(site = %self.config.name, size = content.len()))]
    async fn upload_media(
        &self,
        filename: &str,
        content: Bytes,
        metadata: UploadMetadata,
    ) -> SiteResult<UploadResult> {
        let mut form = MultipartForm::new();
        for (key, value) in self.base_params(true) {
            form = form.text(key, value);
        }
        form = form
            .text("action", "upload")
            .text("filename", filename)
            .text("text", metadata.page_text)
            .text("comment", metadata.comment)
            .text("token", metadata.token);
        if metadata.ignore_warnings {
            form = form.text("ignorewarnings", "1");
        }
        form = form.file("file", filename, content);

        let request = self
            .request(HttpMethod::Post, self.config.api_url.clone(), TRANSFER_TIMEOUT)
            .multipart(form);
        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(MediaWikiError::from)?;
        let response: UploadResponse = decode("upload", &response)?;

        match response.upload.result.as_str() {
            "Success" => {
                info!("Uploaded {}", filename);
                Ok(UploadResult {
                    result: response.upload.result,
                    filename: response
                        .upload
                        .filename
                        .unwrap_or_else(|| filename.to_string()),
                })
            }
            "Warning" => Err(MediaWikiError::Api {
                code: "upload-warning".to_string(),
                info: response
                    .upload
                    .warnings
                    .map(|w| w.to_string())
                    .unwrap_or_default(),
            }
            .into()),
            other => Err(MediaWikiError::Api {
                code: format!("upload-{}", other.to_lowercase()),
                info: format!("upload of {} returned {}", filename, other),
            }
            .into()),
        }
    }
}
