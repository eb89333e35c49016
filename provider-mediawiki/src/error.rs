//! Error types for the MediaWiki provider

use bridge_traits::error::BridgeError;
use bridge_traits::site::SiteError;
use thiserror::Error;

/// API error codes that mean the session lacks the right to do something.
const PERMISSION_CODES: &[&str] = &[
    "badtoken",
    "notoken",
    "permissiondenied",
    "assertuserfailed",
    "assertbotfailed",
    "assertnameduserfailed",
    "protectedpage",
    "cascadeprotected",
    "cantcreate",
    "notloggedin",
    "readapidenied",
    "writeapidenied",
    "blocked",
    "mwoauth-invalid-authorization",
];

/// API error codes worth retrying later.
const TRANSIENT_CODES: &[&str] = &["ratelimited", "maxlag", "readonly", "editconflict"];

/// MediaWiki provider errors
#[derive(Error, Debug)]
pub enum MediaWikiError {
    /// Login was rejected by the site
    #[error("Login to {site} failed: {reason}")]
    LoginFailed { site: String, reason: String },

    /// The API answered with an `error` object
    #[error("MediaWiki API error {code}: {info}")]
    Api { code: String, info: String },

    /// Non-success HTTP status
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Response body did not match the expected shape
    #[error("Failed to parse {context}: {payload}")]
    Parse { context: String, payload: String },

    /// Continuation token handed back by the caller could not be decoded
    #[error("Invalid continuation token: {0}")]
    InvalidContinuation(String),

    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

pub type Result<T> = std::result::Result<T, MediaWikiError>;

impl MediaWikiError {
    pub(crate) fn parse(context: impl Into<String>, payload: &[u8]) -> Self {
        MediaWikiError::Parse {
            context: context.into(),
            payload: String::from_utf8_lossy(payload).into_owned(),
        }
    }
}

impl From<MediaWikiError> for SiteError {
    fn from(error: MediaWikiError) -> Self {
        match error {
            MediaWikiError::LoginFailed { site, reason } => {
                SiteError::Permission(format!("login to {} failed: {}", site, reason))
            }
            MediaWikiError::Api { code, info } => {
                if PERMISSION_CODES.contains(&code.as_str()) {
                    SiteError::Permission(info)
                } else if TRANSIENT_CODES.contains(&code.as_str())
                    || code.starts_with("internal_api_error")
                {
                    SiteError::Transient(format!("{}: {}", code, info))
                } else if code == "missingtitle" {
                    SiteError::NotFound(info)
                } else {
                    SiteError::Api { code, info }
                }
            }
            MediaWikiError::Http { status, body } => {
                if status == 429 || status >= 500 {
                    SiteError::Transient(format!("HTTP {}", status))
                } else if status == 401 || status == 403 {
                    SiteError::Permission(format!("HTTP {}: {}", status, body))
                } else {
                    SiteError::Api {
                        code: format!("http-{}", status),
                        info: body,
                    }
                }
            }
            MediaWikiError::Parse { context, payload } => SiteError::Malformed { context, payload },
            MediaWikiError::InvalidContinuation(token) => SiteError::Malformed {
                context: "continuation".to_string(),
                payload: token,
            },
            MediaWikiError::Bridge(e) => SiteError::Bridge(e),
        }
    }
}
