//! # MediaWiki Provider
//!
//! Implements `SiteClient` for the MediaWiki Action API.
//!
//! ## Overview
//!
//! This module provides:
//! - Bot-password login with a cookie session
//! - Document reads and edits with CSRF tokens
//! - Namespace listings and the recent-changes feed with opaque continuation tokens
//! - File metadata lookup, download and multipart upload
//! - Mapping of API error codes onto `SiteError` classes

pub mod connector;
pub mod error;
pub mod types;

pub use connector::MediaWikiSite;
pub use error::{MediaWikiError, Result};
