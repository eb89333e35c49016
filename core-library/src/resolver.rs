//! Fuzzy title resolver
//!
//! Maps a free-text query (Chinese title, full pinyin or initials) onto the
//! cached title index. Exact hits short-circuit; everything else is scored
//! and, when several candidates remain, handed back as a [`Disambiguation`]
//! the caller resolves from the user's next reply.

use std::cmp::Reverse;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, instrument};

use crate::error::Result;
use crate::models::{CacheEntry, MatchCandidate};
use crate::phonetic::{self, PhoneticKeys};
use crate::repository::TitleIndexRepository;

/// Candidates offered for disambiguation.
pub const MAX_CANDIDATES: usize = 5;

const SCORE_TITLE_SUBSTRING: u32 = 10;
const SCORE_PINYIN_PREFIX: u32 = 9;
const SCORE_PINYIN_SUBSTRING: u32 = 8;
const SCORE_INITIALS_SUBSTRING: u32 = 6;
const SCORE_RECIPROCAL_PREFIX: u32 = 5;

/// Which key produced an exact hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Title,
    PinyinFull,
    PinyinInitials,
}

#[derive(Debug)]
pub enum Resolution {
    /// Blank query; the caller shows usage help.
    Usage,
    /// The title index has no rows at all.
    CacheEmpty,
    Exact { entry: CacheEntry, kind: MatchKind },
    Ambiguous(Disambiguation),
    NoMatch { query: String },
}

/// Outcome of a disambiguation prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Choice {
    Selected(MatchCandidate),
    /// Reply was not a number in `1..=max`.
    InvalidChoice { reply: String, max: usize },
    /// No reply before the deadline. Callers stay silent.
    TimedOut,
}

/// A pending numbered choice between ranked candidates.
#[derive(Debug, Clone)]
pub struct Disambiguation {
    pub query: String,
    pub candidates: Vec<MatchCandidate>,
    pub deadline: Instant,
}

impl Disambiguation {
    fn new(query: String, candidates: Vec<MatchCandidate>, timeout: Duration) -> Self {
        Self {
            query,
            candidates,
            deadline: Instant::now() + timeout,
        }
    }

    /// `1. title` lines in candidate order.
    pub fn numbered_lines(&self) -> Vec<String> {
        self.candidates
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{}. {}", i + 1, c.title))
            .collect()
    }

    /// Interpret one reply as a 1-based index.
    pub fn choose(&self, reply: &str) -> Choice {
        let max = self.candidates.len();
        match reply.trim().parse::<usize>() {
            Ok(n) if (1..=max).contains(&n) => Choice::Selected(self.candidates[n - 1].clone()),
            _ => Choice::InvalidChoice {
                reply: reply.to_string(),
                max,
            },
        }
    }

    /// Wait for the first reply until the deadline.
    ///
    /// A closed reply channel counts as no reply.
    pub async fn await_choice(&self, replies: &mut mpsc::Receiver<String>) -> Choice {
        match tokio::time::timeout_at(self.deadline, replies.recv()).await {
            Ok(Some(reply)) => self.choose(&reply),
            Ok(None) | Err(_) => Choice::TimedOut,
        }
    }
}

fn normalize(query: &str) -> String {
    query.trim().to_lowercase()
}

fn score(entry: &CacheEntry, key: &str, query: &PhoneticKeys) -> u32 {
    let full = query.full.as_str();
    let mut score = 0;
    if entry.title.contains(key) {
        score += SCORE_TITLE_SUBSTRING;
    }
    if entry.pinyin_full.starts_with(full) {
        score += SCORE_PINYIN_PREFIX;
    }
    if entry.pinyin_full.contains(full) {
        score += SCORE_PINYIN_SUBSTRING;
    }
    if entry.pinyin_initials.contains(query.initials.as_str()) {
        score += SCORE_INITIALS_SUBSTRING;
    }
    // pinyin keys are ASCII, so the byte slice never splits a char
    let prefix_len = entry.pinyin_full.len().min(full.len());
    if let Some(prefix) = entry.pinyin_full.get(..prefix_len) {
        if full.contains(prefix) {
            score += SCORE_RECIPROCAL_PREFIX;
        }
    }
    score
}

/// Score, order, dedup and truncate candidates for a normalized query key.
pub fn rank(key: &str, entries: &[CacheEntry]) -> Vec<MatchCandidate> {
    rank_with_keys(key, &phonetic::keys(key), entries)
}

fn rank_with_keys(key: &str, query: &PhoneticKeys, entries: &[CacheEntry]) -> Vec<MatchCandidate> {
    let mut scored: Vec<MatchCandidate> = entries
        .iter()
        .filter_map(|entry| {
            let score = score(entry, key, query);
            (score > 0).then(|| MatchCandidate {
                id: entry.id,
                title: entry.title.clone(),
                score,
            })
        })
        .collect();

    scored.sort_by_key(|c| (Reverse(c.score), c.title.chars().count()));

    let mut seen = HashSet::new();
    scored.retain(|c| seen.insert(c.title.clone()));
    scored.truncate(MAX_CANDIDATES);
    scored
}

/// Title against the normalized query, then each pinyin key against the
/// query's own key. An empty query key never matches.
fn exact(key: &str, query: &PhoneticKeys, entries: &[CacheEntry]) -> Option<(CacheEntry, MatchKind)> {
    let by = |kind: MatchKind, wanted: &str, field: fn(&CacheEntry) -> &str| {
        if wanted.is_empty() {
            return None;
        }
        entries
            .iter()
            .find(|entry| field(entry) == wanted)
            .map(|entry| (entry.clone(), kind))
    };

    by(MatchKind::Title, key, |e| e.title.as_str())
        .or_else(|| by(MatchKind::PinyinFull, query.full.as_str(), |e| e.pinyin_full.as_str()))
        .or_else(|| {
            by(MatchKind::PinyinInitials, query.initials.as_str(), |e| {
                e.pinyin_initials.as_str()
            })
        })
}

/// Resolve `query` against an in-memory snapshot of the index.
///
/// `entries` should be in id order; ties go to the first entry.
pub fn resolve(query: &str, entries: &[CacheEntry], timeout: Duration) -> Resolution {
    let key = normalize(query);
    if key.is_empty() {
        return Resolution::Usage;
    }
    if entries.is_empty() {
        return Resolution::CacheEmpty;
    }
    let query_keys = phonetic::keys(&key);
    if let Some((entry, kind)) = exact(&key, &query_keys, entries) {
        return Resolution::Exact { entry, kind };
    }

    let candidates = rank_with_keys(&key, &query_keys, entries);
    if candidates.is_empty() {
        Resolution::NoMatch { query: key }
    } else {
        Resolution::Ambiguous(Disambiguation::new(key, candidates, timeout))
    }
}

/// Resolver bound to a title index repository.
pub struct TitleResolver {
    repository: Arc<dyn TitleIndexRepository>,
    timeout: Duration,
}

impl TitleResolver {
    pub fn new(repository: Arc<dyn TitleIndexRepository>, timeout: Duration) -> Self {
        Self {
            repository,
            timeout,
        }
    }

    #[instrument(skip(self))]
    pub async fn resolve(&self, query: &str) -> Result<Resolution> {
        if normalize(query).is_empty() {
            return Ok(Resolution::Usage);
        }
        let entries = self.repository.find_all().await?;
        let resolution = resolve(query, &entries, self.timeout);
        debug!(entries = entries.len(), ?resolution, "Query resolved");
        Ok(resolution)
    }
}
