//! Integration tests for batch and incremental mirroring
//!
//! These tests drive the coordinator against in-memory sites:
//! - Two-pass batch runs with transient failures
//! - Enumeration failures aborting the run
//! - Recent-changes polling with duplicates, ignore lists and media titles
//! - Repeated syncs settling into no-change

use async_trait::async_trait;
use bridge_traits::site::{
    MediaInfo, PageRef, RecentChange, SiteClient, SiteError, SiteResult, UploadMetadata,
    UploadResult,
};
use bytes::Bytes;
use chrono::{DateTime, Duration, TimeZone, Utc};
use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
use core_sync::{EntityKind, SyncConfig, SyncCoordinator, SyncError, SyncStatus, SyncUnit};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;

// ============================================================================
// Fake Site
// ============================================================================

#[derive(Default)]
struct SiteState {
    documents: HashMap<String, String>,
    /// title -> (sha1, content)
    media: HashMap<String, (String, Bytes)>,
    /// title -> remaining transient read failures
    flaky_reads: HashMap<String, u32>,
    recent_changes: Vec<RecentChange>,
    list_fails: bool,
    writes: Vec<(String, String, String)>,
    uploads: Vec<(String, UploadMetadata)>,
    reads: HashMap<String, u32>,
}

/// In-memory wiki serving listings in pages of `page_size`.
struct FakeSite {
    name: String,
    page_size: usize,
    state: AsyncMutex<SiteState>,
}

impl FakeSite {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            page_size: 2,
            state: AsyncMutex::new(SiteState::default()),
        }
    }

    async fn put_document(&self, title: &str, text: &str) {
        self.state
            .lock()
            .await
            .documents
            .insert(title.to_string(), text.to_string());
    }

    async fn put_media(&self, title: &str, sha1: &str, content: &'static [u8]) {
        self.state.lock().await.media.insert(
            title.to_string(),
            (sha1.to_string(), Bytes::from_static(content)),
        );
    }

    async fn fail_reads(&self, title: &str, times: u32) {
        self.state
            .lock()
            .await
            .flaky_reads
            .insert(title.to_string(), times);
    }

    async fn writes(&self) -> Vec<(String, String, String)> {
        self.state.lock().await.writes.clone()
    }

    async fn read_count(&self, title: &str) -> u32 {
        self.state.lock().await.reads.get(title).copied().unwrap_or(0)
    }

    fn sha1_of(content: &[u8]) -> String {
        format!("sha-{}", content.len())
    }
}

fn paginate<T: Clone>(items: &[T], page_size: usize, cursor: Option<String>) -> (Vec<T>, Option<String>) {
    let offset: usize = cursor.and_then(|c| c.parse().ok()).unwrap_or(0);
    let end = (offset + page_size).min(items.len());
    let next = if end < items.len() {
        Some(end.to_string())
    } else {
        None
    };
    (items[offset.min(end)..end].to_vec(), next)
}

fn namespace_of(title: &str) -> i32 {
    match EntityKind::of_title(title) {
        EntityKind::Page => 0,
        EntityKind::Module => 828,
        EntityKind::Media => 6,
    }
}

#[async_trait]
impl SiteClient for FakeSite {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read_document(&self, title: &str) -> SiteResult<Option<String>> {
        let mut state = self.state.lock().await;
        *state.reads.entry(title.to_string()).or_insert(0) += 1;
        if let Some(remaining) = state.flaky_reads.get_mut(title) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(SiteError::Transient("HTTP 503".to_string()));
            }
        }
        Ok(state.documents.get(title).cloned())
    }

    async fn list_pages(
        &self,
        namespace: i32,
        continuation: Option<String>,
    ) -> SiteResult<(Vec<PageRef>, Option<String>)> {
        let state = self.state.lock().await;
        if state.list_fails {
            return Err(SiteError::Transient("HTTP 500".to_string()));
        }
        let mut titles: Vec<String> = state
            .documents
            .keys()
            .chain(state.media.keys())
            .filter(|title| namespace_of(title) == namespace)
            .cloned()
            .collect();
        titles.sort();
        let pages: Vec<PageRef> = titles
            .into_iter()
            .enumerate()
            .map(|(i, title)| PageRef {
                id: i as u64 + 1,
                title,
            })
            .collect();
        Ok(paginate(&pages, self.page_size, continuation))
    }

    async fn list_recent_changes(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        continuation: Option<String>,
    ) -> SiteResult<(Vec<RecentChange>, Option<String>)> {
        let state = self.state.lock().await;
        if state.list_fails {
            return Err(SiteError::Transient("HTTP 500".to_string()));
        }
        let mut changes: Vec<RecentChange> = state
            .recent_changes
            .iter()
            .filter(|c| c.timestamp >= start && c.timestamp <= end)
            .cloned()
            .collect();
        changes.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(paginate(&changes, self.page_size, continuation))
    }

    async fn get_media_info(&self, title: &str) -> SiteResult<Option<MediaInfo>> {
        let state = self.state.lock().await;
        Ok(state.media.get(title).map(|(sha1, content)| MediaInfo {
            url: format!("https://{}/images/{}", self.name, title),
            sha1: sha1.clone(),
            size: content.len() as u64,
        }))
    }

    async fn download_media(&self, url: &str) -> SiteResult<Bytes> {
        let state = self.state.lock().await;
        let title = url.rsplit('/').next().unwrap_or_default();
        state
            .media
            .get(title)
            .map(|(_, content)| content.clone())
            .ok_or_else(|| SiteError::NotFound(url.to_string()))
    }

    async fn write_document(&self, title: &str, content: &str, comment: &str) -> SiteResult<()> {
        let mut state = self.state.lock().await;
        state
            .documents
            .insert(title.to_string(), content.to_string());
        state
            .writes
            .push((title.to_string(), content.to_string(), comment.to_string()));
        Ok(())
    }

    async fn get_write_token(&self) -> SiteResult<String> {
        Ok("token+\\".to_string())
    }

    async fn upload_media(
        &self,
        filename: &str,
        content: Bytes,
        metadata: UploadMetadata,
    ) -> SiteResult<UploadResult> {
        let mut state = self.state.lock().await;
        let sha1 = Self::sha1_of(&content);
        state
            .media
            .insert(format!("File:{}", filename), (sha1, content));
        state.uploads.push((filename.to_string(), metadata));
        Ok(UploadResult {
            result: "Success".to_string(),
            filename: filename.to_string(),
        })
    }
}

fn coordinator() -> SyncCoordinator {
    SyncCoordinator::new(Arc::new(SyncConfig::without_pacing()))
}

fn at(minute: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap() + Duration::minutes(minute)
}

fn change(title: &str, minute: i64) -> RecentChange {
    RecentChange {
        title: title.to_string(),
        timestamp: at(minute),
        user: Some("editor".to_string()),
        comment: None,
    }
}

// ============================================================================
// Batch Runs
// ============================================================================

#[tokio::test]
async fn test_transient_failure_recovers_on_retry_pass() {
    let source = FakeSite::new("source.example");
    source.put_document("Alpha", "a").await;
    source.put_document("Beta", "b [[en:Beta]]").await;
    source.put_document("Gamma", "c").await;
    source.fail_reads("Beta", 1).await;
    let destination = FakeSite::new("mirror.example");

    let report = coordinator()
        .sync_all(&source, &destination, EntityKind::Page)
        .await
        .unwrap();

    assert_eq!(report.total, 3);
    assert_eq!(report.succeeded, 3);
    assert_eq!(report.failed, 0);
    assert!(report.still_failed_titles.is_empty());
    assert_eq!(source.read_count("Beta").await, 2);

    let written: Vec<String> = destination
        .writes()
        .await
        .into_iter()
        .map(|(title, content, _)| format!("{}={}", title, content))
        .collect();
    assert_eq!(written, vec!["Alpha=a", "Gamma=c", "Beta=b"]);
}

#[tokio::test]
async fn test_persistent_failure_is_reported_once() {
    let source = FakeSite::new("source.example");
    source.put_document("Alpha", "a").await;
    source.put_document("Beta", "b").await;
    source.fail_reads("Beta", 5).await;
    let destination = FakeSite::new("mirror.example");

    let report = coordinator()
        .sync_all(&source, &destination, EntityKind::Page)
        .await
        .unwrap();

    assert_eq!(report.total, 2);
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.still_failed_titles, vec!["Beta".to_string()]);
    assert_eq!(source.read_count("Beta").await, 2);
}

#[tokio::test]
async fn test_ignored_and_unchanged_count_as_skipped_successes() {
    let source = FakeSite::new("source.example");
    source.put_document("教程", "tutorial").await;
    source.put_document("氧石", "same").await;
    source.put_document("藻类", "new").await;
    let destination = FakeSite::new("mirror.example");
    destination.put_document("氧石", "same  \n").await;

    let report = coordinator()
        .sync_all(&source, &destination, EntityKind::Page)
        .await
        .unwrap();

    assert_eq!(report.total, 3);
    assert_eq!(report.succeeded, 3);
    assert_eq!(report.skipped_within_succeeded, 2);
    assert_eq!(destination.writes().await.len(), 1);
}

#[tokio::test]
async fn test_enumeration_failure_propagates() {
    let source = FakeSite::new("source.example");
    source.put_document("Alpha", "a").await;
    source.state.lock().await.list_fails = true;
    let destination = FakeSite::new("mirror.example");

    let result = coordinator()
        .sync_all(&source, &destination, EntityKind::Page)
        .await;

    match result {
        Err(SyncError::Enumeration { target, source }) => {
            assert_eq!(target, "page titles");
            assert!(source.is_transient());
        }
        other => panic!("expected enumeration error, got {:?}", other),
    }
    assert!(destination.writes().await.is_empty());
}

#[tokio::test]
async fn test_module_batch_lists_only_module_namespace() {
    let source = FakeSite::new("source.example");
    source.put_document("Module:Util", "return {}").await;
    source.put_document("Module:Data", "return Dev:Data").await;
    source.put_document("氧石", "page").await;
    let destination = FakeSite::new("mirror.example");

    let report = coordinator()
        .sync_all(&source, &destination, EntityKind::Module)
        .await
        .unwrap();

    assert_eq!(report.total, 2);
    let writes = destination.writes().await;
    assert_eq!(writes[0].0, "Module:Data");
    assert_eq!(writes[0].1, "return Module:Dev/Data");
    assert!(writes[0].2.contains("同步坤器人"));
}

#[tokio::test]
async fn test_media_batch_uploads_changed_files() {
    let source = FakeSite::new("source.example");
    source.put_media("File:A.png", "sha-3", b"aaa").await;
    source.put_media("File:B.png", "sha-2", b"bb").await;
    let destination = FakeSite::new("mirror.example");
    destination.put_media("File:A.png", "SHA-3", b"aaa").await;

    let report = coordinator()
        .sync_all(&source, &destination, EntityKind::Media)
        .await
        .unwrap();

    assert_eq!(report.total, 2);
    assert_eq!(report.skipped_within_succeeded, 1);
    let state = destination.state.lock().await;
    assert_eq!(state.uploads.len(), 1);
    assert_eq!(state.uploads[0].0, "B.png");
    assert!(state.uploads[0].1.ignore_warnings);
    assert_eq!(state.uploads[0].1.token, "token+\\");
}

#[tokio::test]
async fn test_batch_events_follow_the_run() {
    let source = FakeSite::new("source.example");
    source.put_document("Alpha", "a").await;
    source.put_document("Beta", "b").await;
    source.fail_reads("Beta", 1).await;
    let destination = FakeSite::new("mirror.example");

    let bus = EventBus::new(32);
    let mut events = bus.subscribe();
    coordinator()
        .with_event_bus(bus)
        .sync_all(&source, &destination, EntityKind::Page)
        .await
        .unwrap();

    let mut received = Vec::new();
    while let Ok(CoreEvent::Sync(event)) = events.try_recv() {
        received.push(event);
    }

    assert!(matches!(received.first(), Some(SyncEvent::Started { total: 2, .. })));
    assert!(received
        .iter()
        .any(|e| matches!(e, SyncEvent::RetryStarted { count: 1, .. })));
    match received.last() {
        Some(SyncEvent::Completed {
            total,
            succeeded,
            failed,
            ..
        }) => {
            assert_eq!((*total, *succeeded, *failed), (2, 2, 0));
        }
        other => panic!("expected completion event, got {:?}", other),
    }
}

// ============================================================================
// Recent Changes Polling
// ============================================================================

#[tokio::test]
async fn test_poll_processes_each_title_once() {
    let source = FakeSite::new("source.example");
    source.put_document("氧石", "v3").await;
    source.put_document("Module:Util", "return 1").await;
    source.put_media("File:Logo.png", "sha-4", b"logo").await;
    {
        let mut state = source.state.lock().await;
        state.recent_changes = vec![
            change("氧石", 5),
            change("氧石", 10),
            change("氧石", 15),
            change("Module:Util", 20),
            change("File:Logo.png", 25),
            change("MediaWiki:Common.css", 30),
            change("Outside", 90),
        ];
    }
    let destination = FakeSite::new("mirror.example");

    let report = coordinator()
        .poll_recent_changes(&source, &destination, at(60), at(0))
        .await
        .unwrap();

    assert_eq!(report.processed, 3);
    assert_eq!(report.skipped, 3);
    assert_eq!(report.failed, 0);
    assert_eq!(source.read_count("氧石").await, 1);
    assert_eq!(source.read_count("Outside").await, 0);

    let state = destination.state.lock().await;
    assert_eq!(state.writes.len(), 2);
    assert!(state.writes.iter().all(|(_, _, comment)| comment.contains("定时同步")));
    assert_eq!(state.uploads.len(), 1);
    assert_eq!(state.uploads[0].0, "Logo.png");
}

#[tokio::test]
async fn test_poll_does_not_retry_failures() {
    let source = FakeSite::new("source.example");
    source.put_document("Alpha", "a").await;
    source.fail_reads("Alpha", 1).await;
    source.state.lock().await.recent_changes = vec![change("Alpha", 1)];
    let destination = FakeSite::new("mirror.example");

    let report = coordinator()
        .poll_recent_changes(&source, &destination, at(60), at(0))
        .await
        .unwrap();

    assert_eq!(report.processed, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(source.read_count("Alpha").await, 1);
    assert!(destination.writes().await.is_empty());
}

// ============================================================================
// Idempotence
// ============================================================================

#[tokio::test]
async fn test_second_sync_is_no_change() {
    let source = FakeSite::new("source.example");
    source
        .put_document("氧石", "text [[ru:Оксилит]] Dev:X \n")
        .await;
    source.put_media("File:Logo.png", "sha-4", b"logo").await;
    let destination = FakeSite::new("mirror.example");
    let coordinator = coordinator();

    for unit in [
        SyncUnit::new("氧石", EntityKind::Page),
        SyncUnit::new("File:Logo.png", EntityKind::Media),
    ] {
        let first = coordinator.sync_one(&source, &destination, &unit).await;
        assert_eq!(first.status, SyncStatus::Synced, "{}", unit.title);
        let second = coordinator.sync_one(&source, &destination, &unit).await;
        assert_eq!(second.status, SyncStatus::NoChange, "{}", unit.title);
    }

    let writes = destination.writes().await;
    assert_eq!(writes.len(), 1);
    assert!(writes[0].2.contains("sync-bot"));
}
