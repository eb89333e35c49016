//! Core service façade and bootstrap helpers.
//!
//! This crate wires two wiki site sessions, the title index and the sync
//! coordinator into a single [`MirrorService`] that front-ends (chat bots,
//! CLIs, schedulers) call into. Hosts that want the stock reqwest HTTP client
//! enable the `desktop-shims` feature and use [`bootstrap`]; others construct
//! [`CoreDependencies`] themselves.

pub mod error;
pub mod jobs;
pub mod links;

pub use error::{CoreError, Result};
pub use jobs::{ActiveJobs, JobGuard};
pub use links::{usage_text, EntryLinks};

use std::sync::Arc;
use std::time::Duration;

use bridge_traits::site::SiteClient;
use bridge_traits::time::{Clock, SystemClock};
use chrono::{DateTime, Utc};
use core_library::{CacheEntry, Resolution, TitleIndexRepository, TitleResolver};
use core_runtime::{CoreConfig, LinkConfig};
use core_runtime::events::{CacheEvent, CoreEvent, EventBus, EventStream};
use core_sync::{
    BatchReport, EntityKind, PollReport, SyncConfig, SyncCoordinator, SyncOutcome, SyncUnit,
    FILE_PREFIX,
};
use tracing::{info, instrument, warn};

/// Edit summary of redirects created on request.
pub const REDIRECT_COMMENT: &str = "来自qq机器人的添加重定向页面请求";

/// Job key of recent-changes polls in the active-job lock.
const POLL_JOB: &str = "recent_changes";

/// Aggregated handle to everything the service drives.
pub struct CoreDependencies {
    /// Authoritative site session
    pub source: Arc<dyn SiteClient>,
    /// Mirror site session
    pub destination: Arc<dyn SiteClient>,
    pub title_index: Arc<dyn TitleIndexRepository>,
    pub clock: Arc<dyn Clock>,
}

impl CoreDependencies {
    /// Construct a dependency bundle using the system clock.
    pub fn new(
        source: Arc<dyn SiteClient>,
        destination: Arc<dyn SiteClient>,
        title_index: Arc<dyn TitleIndexRepository>,
    ) -> Self {
        Self {
            source,
            destination,
            title_index,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

/// Tunables of the service that are not site credentials.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub sync: SyncConfig,
    pub links: LinkConfig,
    pub poll_window: Duration,
    pub disambiguation_timeout: Duration,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            sync: SyncConfig::default(),
            links: LinkConfig::default(),
            poll_window: Duration::from_secs(3 * 60 * 60),
            disambiguation_timeout: Duration::from_secs(10),
        }
    }
}

impl ServiceSettings {
    /// Settings taken from a validated [`CoreConfig`].
    pub fn from_core_config(config: &CoreConfig, sync: SyncConfig) -> Self {
        Self {
            sync,
            links: config.links.clone(),
            poll_window: config.poll_window,
            disambiguation_timeout: config.disambiguation_timeout,
        }
    }
}

/// Primary façade exposed to front-ends.
#[derive(Clone)]
pub struct MirrorService {
    source: Arc<dyn SiteClient>,
    destination: Arc<dyn SiteClient>,
    title_index: Arc<dyn TitleIndexRepository>,
    resolver: Arc<TitleResolver>,
    coordinator: SyncCoordinator,
    clock: Arc<dyn Clock>,
    links: LinkConfig,
    poll_window: Duration,
    event_bus: EventBus,
    jobs: ActiveJobs,
}

impl MirrorService {
    /// Create a new service from the provided dependencies.
    pub fn new(deps: CoreDependencies, settings: ServiceSettings) -> Result<Self> {
        settings.sync.validate()?;

        let event_bus = EventBus::default();
        let coordinator =
            SyncCoordinator::new(Arc::new(settings.sync)).with_event_bus(event_bus.clone());
        let resolver = TitleResolver::new(
            Arc::clone(&deps.title_index),
            settings.disambiguation_timeout,
        );

        Ok(Self {
            source: deps.source,
            destination: deps.destination,
            title_index: deps.title_index,
            resolver: Arc::new(resolver),
            coordinator,
            clock: deps.clock,
            links: settings.links,
            poll_window: settings.poll_window,
            event_bus,
            jobs: ActiveJobs::new(),
        })
    }

    /// Progress events of batch runs, polls and cache refreshes.
    pub fn subscribe_events(&self) -> EventStream {
        EventStream::new(self.event_bus.subscribe())
    }

    pub fn sync_config(&self) -> &SyncConfig {
        self.coordinator.config()
    }

    // ------------------------------------------------------------------
    // Sync operations
    // ------------------------------------------------------------------

    pub async fn sync_page(&self, title: &str) -> Result<SyncOutcome> {
        self.sync_single(title, EntityKind::Page).await
    }

    pub async fn sync_module(&self, title: &str) -> Result<SyncOutcome> {
        self.sync_single(title, EntityKind::Module).await
    }

    /// Sync one media file; `File:` is prepended when missing.
    pub async fn sync_media(&self, title: &str) -> Result<SyncOutcome> {
        let title = title.trim();
        if title.starts_with(FILE_PREFIX) {
            self.sync_single(title, EntityKind::Media).await
        } else {
            self.sync_single(&format!("{}{}", FILE_PREFIX, title), EntityKind::Media)
                .await
        }
    }

    async fn sync_single(&self, title: &str, kind: EntityKind) -> Result<SyncOutcome> {
        let title = title.trim();
        if title.is_empty() {
            return Err(CoreError::InvalidInput("title cannot be empty".to_string()));
        }
        let unit = SyncUnit::new(title, kind);
        Ok(self
            .coordinator
            .sync_one(&*self.source, &*self.destination, &unit)
            .await)
    }

    /// Two-pass batch run over every entity of `kind`.
    ///
    /// Fails with `SyncInProgress` while another run of the same kind
    /// targets this destination.
    #[instrument(skip(self))]
    pub async fn sync_all(&self, kind: EntityKind) -> Result<BatchReport> {
        let _guard = self.jobs.acquire(kind.as_str(), self.destination.name())?;
        let report = self
            .coordinator
            .sync_all(&*self.source, &*self.destination, kind)
            .await?;
        Ok(report)
    }

    /// Poll the recent-changes window ending now.
    #[instrument(skip(self))]
    pub async fn poll_recent(&self) -> Result<PollReport> {
        let _guard = self.jobs.acquire(POLL_JOB, self.destination.name())?;
        let (window_end, window_start) = self.current_window()?;
        let report = self
            .coordinator
            .poll_recent_changes(&*self.source, &*self.destination, window_end, window_start)
            .await?;
        Ok(report)
    }

    fn current_window(&self) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        let window_end = self.clock.now();
        let window = chrono::Duration::from_std(self.poll_window).map_err(|e| {
            CoreError::InvalidInput(format!("poll window out of range: {}", e))
        })?;
        Ok((window_end, window_end - window))
    }

    // ------------------------------------------------------------------
    // Title index
    // ------------------------------------------------------------------

    /// Resolve a free-text query against the title index.
    pub async fn resolve(&self, query: &str) -> Result<Resolution> {
        Ok(self.resolver.resolve(query).await?)
    }

    /// Links for a cached page id.
    pub async fn links_for(&self, id: i64) -> Result<EntryLinks> {
        let entry = self
            .title_index
            .find_by_id(id)
            .await?
            .ok_or(CoreError::UnknownId(id))?;
        Ok(EntryLinks::new(&self.links, entry.id, &entry.title))
    }

    pub fn usage(&self) -> String {
        usage_text(&self.links)
    }

    /// Rebuild index rows from every main-namespace page on the source.
    ///
    /// Existing rows are upserted by id; rows for deleted pages are kept.
    #[instrument(skip(self))]
    pub async fn refresh_index(&self) -> Result<u64> {
        let mut entries = Vec::new();
        let mut cursor = None;
        loop {
            let (pages, next) = self
                .source
                .list_pages(EntityKind::Page.namespace(), cursor)
                .await?;
            for page in pages {
                match i64::try_from(page.id) {
                    Ok(id) => entries.push(CacheEntry::new(id, page.title)),
                    Err(_) => warn!(id = page.id, "Skipping page with out-of-range id"),
                }
            }
            match next {
                Some(token) => cursor = Some(token),
                None => break,
            }
        }

        let written = self.title_index.insert_many(&entries).await?;
        info!("Refreshed title index with {} pages", written);
        let _ = self
            .event_bus
            .emit(CoreEvent::Cache(CacheEvent::Refreshed { entries: written }));
        Ok(written)
    }

    pub async fn cache_size(&self) -> Result<i64> {
        Ok(self.title_index.count().await?)
    }

    /// Drop every index row.
    pub async fn clear_index(&self) -> Result<u64> {
        let removed = self.title_index.delete_all().await?;
        info!("Removed {} cached pages", removed);
        let _ = self
            .event_bus
            .emit(CoreEvent::Cache(CacheEvent::Cleared { removed }));
        Ok(removed)
    }

    /// Create `from` on the source site as a redirect to `to`.
    #[instrument(skip(self))]
    pub async fn create_redirect(&self, from: &str, to: &str) -> Result<()> {
        let (from, to) = (from.trim(), to.trim());
        if from.is_empty() || to.is_empty() {
            return Err(CoreError::InvalidInput(
                "redirect needs both a page name and a target".to_string(),
            ));
        }
        self.source
            .write_document(from, &format!("#REDIRECT [[{}]]", to), REDIRECT_COMMENT)
            .await?;
        info!("Redirected {} to {}", from, to);
        Ok(())
    }
}

/// Log in to both sites and open the title index described by `config`.
///
/// Each site gets its own HTTP client (and cookie jar) unless one was
/// injected into the config.
///
/// ```ignore
/// use core_runtime::{CoreConfig, SiteConfig};
/// use core_service::bootstrap;
/// use core_sync::SyncConfig;
///
/// let config = CoreConfig::builder()
///     .source(SiteConfig::from_env("SOURCE")?)
///     .destination(SiteConfig::from_env("MIRROR")?)
///     .database_path("wikipages.db")
///     .build()?;
/// let service = bootstrap(&config, SyncConfig::default()).await?;
/// let report = service.poll_recent().await?;
/// ```
#[cfg(feature = "desktop-shims")]
pub async fn bootstrap(config: &CoreConfig, sync: SyncConfig) -> Result<MirrorService> {
    use core_library::{create_pool, DatabaseConfig, SqliteTitleIndexRepository};
    use provider_mediawiki::MediaWikiSite;

    let source =
        MediaWikiSite::connect(config.http_client_or_default()?, config.source.clone()).await?;
    let destination =
        MediaWikiSite::connect(config.http_client_or_default()?, config.destination.clone())
            .await?;

    let pool = create_pool(DatabaseConfig::new(config.database_path.clone()))
        .await
        .map_err(|e| CoreError::InitializationFailed(e.to_string()))?;

    let mut deps = CoreDependencies::new(
        Arc::new(source),
        Arc::new(destination),
        Arc::new(SqliteTitleIndexRepository::new(pool)),
    );
    if let Some(clock) = &config.clock {
        deps = deps.with_clock(Arc::clone(clock));
    }

    MirrorService::new(deps, ServiceSettings::from_core_config(config, sync))
}
