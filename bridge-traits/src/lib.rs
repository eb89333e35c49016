//! # Host Bridge Traits
//!
//! Abstraction traits the sync core depends on, implemented per host.
//!
//! ## Overview
//!
//! This crate defines the contract between the mirror core and the outside
//! world. Each trait represents a capability the core requires but does not
//! implement itself, so the core can be driven by a bot process, a CLI or a
//! test harness with mocks.
//!
//! ## Traits
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - Async HTTP with form and multipart bodies
//! - [`SiteClient`](site::SiteClient) - One authenticated session on a wiki site
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic poll windows
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Implementations
//!
//! | Trait        | Implementation Crate   |
//! |--------------|------------------------|
//! | `HttpClient` | `bridge-desktop`       |
//! | `SiteClient` | `provider-mediawiki`   |
//!
//! ## Error Handling
//!
//! Transport-level failures use [`BridgeError`](error::BridgeError). Site
//! calls classify failures into [`SiteError`](site::SiteError) so callers can
//! tell a missing document from a rejected token or a malformed payload.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so handles can be shared across
//! async tasks behind `Arc`.

pub mod error;
pub mod http;
pub mod site;
pub mod time;

pub use error::BridgeError;

pub use http::{FormPart, HttpClient, HttpMethod, HttpRequest, HttpResponse, MultipartForm};
pub use site::{
    MediaInfo, PageRef, RecentChange, SiteClient, SiteError, SiteResult, UploadMetadata, UploadResult,
};
pub use time::{Clock, FixedClock, LogEntry, LogLevel, LoggerSink, SystemClock};
