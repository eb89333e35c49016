//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for server and desktop hosts.
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest` with a cookie store and multipart support
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::ReqwestHttpClient;
//! use std::time::Duration;
//!
//! let http = ReqwestHttpClient::with_options("OniSyncBot/1.0", Duration::from_secs(30))?;
//! ```

mod http;

pub use http::{ReqwestHttpClient, DEFAULT_USER_AGENT};
