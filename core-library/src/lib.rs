//! # Title Index Module
//!
//! Owns the local cache of source-site titles and the fuzzy resolver that
//! searches it.
//!
//! ## Overview
//!
//! This module manages:
//! - SQLite pool and schema migrations for the `wikipages` table
//! - Phonetic (pinyin) keys for Chinese titles
//! - The `TitleIndexRepository` data access trait
//! - Exact and fuzzy title resolution with numbered disambiguation

pub mod db;
pub mod error;
pub mod models;
pub mod phonetic;
pub mod repository;
pub mod resolver;

pub use db::{create_pool, create_test_pool, DatabaseConfig};
pub use error::{LibraryError, Result};
pub use models::{CacheEntry, MatchCandidate};
pub use repository::{SqliteTitleIndexRepository, TitleIndexRepository};
pub use resolver::{Choice, Disambiguation, MatchKind, Resolution, TitleResolver};
