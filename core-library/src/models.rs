//! Domain models for the title index
//!
//! One row per source-site page, with the phonetic keys the resolver
//! matches against.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::phonetic;

/// A cached source-site page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct CacheEntry {
    /// Page id on the source site
    pub id: i64,
    pub title: String,
    /// Toneless pinyin of the title, no separators, lowercase
    pub pinyin_full: String,
    /// First letter of each syllable, lowercase
    #[sqlx(rename = "pinyin_first")]
    pub pinyin_initials: String,
}

impl CacheEntry {
    /// Build an entry, deriving both phonetic keys from the title.
    pub fn new(id: i64, title: impl Into<String>) -> Self {
        let title = title.into();
        let keys = phonetic::keys(&title);
        Self {
            id,
            title,
            pinyin_full: keys.full,
            pinyin_initials: keys.initials,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.id < 0 {
            return Err(format!("id must not be negative, got {}", self.id));
        }
        if self.title.trim().is_empty() {
            return Err("title cannot be empty".to_string());
        }
        Ok(())
    }
}

/// A scored fuzzy match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub id: i64,
    pub title: String,
    pub score: u32,
}
