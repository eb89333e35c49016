//! # Sync Coordinator
//!
//! Drives the [`SyncEngine`] over many units.
//!
//! ## Workflow
//!
//! ### Batch run (`sync_all`)
//! 1. List every title in the kind's namespace, following continuation tokens
//! 2. First pass: sync each title in order, pacing between units
//! 3. Second pass: retry every title that failed the first pass
//! 4. Reduce both passes into a [`BatchReport`](crate::report::BatchReport)
//!
//! ### Incremental run (`poll_recent_changes`)
//! 1. Walk the recent-changes feed of a time window, newest first
//! 2. Sync each changed title once, routing `File:` titles to the media path
//! 3. Count processed, skipped and failed titles
//!
//! Units are processed strictly one at a time. Callers must not run two
//! coordinators against the same destination and kind at once.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_sync::{EntityKind, SyncConfig, SyncCoordinator};
//!
//! let coordinator = SyncCoordinator::new(Arc::new(SyncConfig::default()))
//!     .with_event_bus(event_bus);
//! let report = coordinator.sync_all(&*source, &*destination, EntityKind::Page).await?;
//! println!("{} of {} synced", report.succeeded, report.total);
//! ```

use std::sync::Arc;
use std::time::Duration;

use bridge_traits::site::SiteClient;
use core_runtime::events::{CoreEvent, EventBus, SyncEvent};

use crate::config::SyncConfig;
use crate::engine::SyncEngine;
use crate::report::{SyncOutcome, SyncUnit};

/// Batch and incremental sync driver.
#[derive(Debug, Clone)]
pub struct SyncCoordinator {
    pub(crate) engine: SyncEngine,
    pub(crate) event_bus: Option<EventBus>,
}

impl SyncCoordinator {
    pub fn new(config: Arc<SyncConfig>) -> Self {
        Self {
            engine: SyncEngine::new(config),
            event_bus: None,
        }
    }

    /// Publish progress on `event_bus`.
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn config(&self) -> &SyncConfig {
        self.engine.config()
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    /// Sync a single unit on request, attributed to the manual actor.
    pub async fn sync_one(
        &self,
        source: &dyn SiteClient,
        destination: &dyn SiteClient,
        unit: &SyncUnit,
    ) -> SyncOutcome {
        let actor = self.config().manual_actor.clone();
        self.engine.sync_unit(source, destination, unit, &actor).await
    }

    /// Emission without subscribers is not an error.
    pub(crate) fn emit(&self, event: SyncEvent) {
        if let Some(bus) = &self.event_bus {
            let _ = bus.emit(CoreEvent::Sync(event));
        }
    }
}

pub(crate) async fn pause(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}
