//! Two-pass batch synchronization of a whole namespace.

use std::time::Instant;

use bridge_traits::site::SiteClient;
use core_runtime::events::SyncEvent;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::EntityKind;
use crate::coordinator::{pause, SyncCoordinator};
use crate::error::{Result, SyncError};
use crate::report::{BatchReport, PassResults, SyncUnit};

/// Which pass of a batch run a unit belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    First,
    Retry,
}

impl SyncCoordinator {
    /// List every title of `kind` on `site`, ascending.
    #[instrument(skip(self, site))]
    pub async fn enumerate(&self, site: &dyn SiteClient, kind: EntityKind) -> Result<Vec<String>> {
        let mut titles = Vec::new();
        let mut cursor = None;

        loop {
            let (page, next) = site
                .list_titles(kind.namespace(), cursor)
                .await
                .map_err(|source| SyncError::Enumeration {
                    target: format!("{} titles", kind),
                    source,
                })?;
            titles.extend(page);
            info!("Listed {} {} titles so far", titles.len(), kind);

            match next {
                Some(token) => cursor = Some(token),
                None => break,
            }
        }

        Ok(titles)
    }

    /// Mirror every entity of `kind` from `source` to `destination`.
    ///
    /// Titles failing the first pass are retried once. Only enumeration
    /// errors abort the run.
    #[instrument(skip(self, source, destination))]
    pub async fn sync_all(
        &self,
        source: &dyn SiteClient,
        destination: &dyn SiteClient,
        kind: EntityKind,
    ) -> Result<BatchReport> {
        let run_id = Uuid::new_v4().to_string();
        let started = Instant::now();

        let titles = match self.enumerate(source, kind).await {
            Ok(titles) => titles,
            Err(e) => {
                self.emit(SyncEvent::Failed {
                    run_id,
                    kind: kind.to_string(),
                    message: e.to_string(),
                });
                return Err(e);
            }
        };

        let total = titles.len() as u64;
        info!("Starting {} sync of {} titles", kind, total);
        self.emit(SyncEvent::Started {
            run_id: run_id.clone(),
            kind: kind.to_string(),
            total,
        });

        let first = self
            .run_pass(source, destination, kind, &titles, Pass::First, &run_id)
            .await;

        let failed: Vec<String> = first
            .iter()
            .filter(|(_, outcome)| outcome.is_failed())
            .map(|(title, _)| title.clone())
            .collect();

        let retry = if failed.is_empty() {
            Vec::new()
        } else {
            info!("Retrying {} failed titles", failed.len());
            self.emit(SyncEvent::RetryStarted {
                run_id: run_id.clone(),
                kind: kind.to_string(),
                count: failed.len() as u64,
            });
            self.run_pass(source, destination, kind, &failed, Pass::Retry, &run_id)
                .await
        };

        let report = BatchReport::from_passes(&first, &retry);
        for title in &report.still_failed_titles {
            warn!("Still failing after retry: {}", title);
        }
        info!(
            total = report.total,
            succeeded = report.succeeded,
            failed = report.failed,
            skipped = report.skipped_within_succeeded,
            "{} sync finished",
            kind
        );

        self.emit(SyncEvent::Completed {
            run_id,
            kind: kind.to_string(),
            total: report.total,
            succeeded: report.succeeded,
            failed: report.failed,
            skipped: report.skipped_within_succeeded,
            duration_secs: started.elapsed().as_secs(),
        });

        Ok(report)
    }

    async fn run_pass(
        &self,
        source: &dyn SiteClient,
        destination: &dyn SiteClient,
        kind: EntityKind,
        titles: &[String],
        pass: Pass,
        run_id: &str,
    ) -> PassResults {
        let pacing = self.config().pacing(kind);
        let actor = self.config().batch_actor.clone();
        let total = titles.len() as u64;
        let mut results = Vec::with_capacity(titles.len());

        for (index, title) in titles.iter().enumerate() {
            let unit = SyncUnit::new(title.clone(), kind);
            let outcome = self.engine.sync_unit(source, destination, &unit, &actor).await;

            if pass == Pass::Retry {
                if outcome.is_failed() {
                    warn!("Retry of {} failed again", title);
                } else {
                    info!("Retry of {} succeeded", title);
                }
            }

            self.emit(SyncEvent::Progress {
                run_id: run_id.to_string(),
                kind: kind.to_string(),
                current: index as u64 + 1,
                total,
                title: title.clone(),
                status: outcome.status.to_string(),
            });

            let delay = if outcome.is_failed() {
                pacing.failure
            } else {
                pacing.success
            };
            results.push((title.clone(), outcome));
            pause(delay).await;
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Pacing, SyncConfig};
    use crate::engine::tests::MockSite;
    use bridge_traits::site::SiteError;
    use core_runtime::events::{CoreEvent, EventBus};
    use std::sync::Arc;
    use std::time::Duration;

    fn coordinator(config: SyncConfig) -> SyncCoordinator {
        SyncCoordinator::new(Arc::new(config))
    }

    #[tokio::test]
    async fn test_enumerate_follows_continuation() {
        let mut source = MockSite::new();
        source
            .expect_list_titles()
            .withf(|ns, cursor| *ns == 828 && cursor.is_none())
            .times(1)
            .returning(|_, _| Ok((vec!["Module:A".into()], Some("c1".into()))));
        source
            .expect_list_titles()
            .withf(|ns, cursor| *ns == 828 && cursor.as_deref() == Some("c1"))
            .times(1)
            .returning(|_, _| Ok((vec!["Module:B".into()], None)));

        let titles = coordinator(SyncConfig::without_pacing())
            .enumerate(&source, EntityKind::Module)
            .await
            .unwrap();
        assert_eq!(titles, vec!["Module:A".to_string(), "Module:B".to_string()]);
    }

    #[tokio::test]
    async fn test_enumeration_failure_aborts_without_report() {
        let mut source = MockSite::new();
        source
            .expect_list_titles()
            .returning(|_, _| Err(SiteError::Transient("HTTP 503".into())));
        let destination = MockSite::new();

        let bus = EventBus::new(8);
        let mut events = bus.subscribe();
        let result = coordinator(SyncConfig::without_pacing())
            .with_event_bus(bus)
            .sync_all(&source, &destination, EntityKind::Page)
            .await;

        assert!(matches!(result, Err(SyncError::Enumeration { .. })));
        assert!(matches!(
            events.try_recv(),
            Ok(CoreEvent::Sync(SyncEvent::Failed { .. }))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacing_applies_success_and_failure_delays() {
        let mut config = SyncConfig::without_pacing();
        config.pages.pacing = Pacing::from_millis(500, 1000);

        let mut source = MockSite::new();
        source
            .expect_list_titles()
            .returning(|_, _| Ok((vec!["Ok".into(), "Broken".into()], None)));
        source.expect_read_document().returning(|title| {
            if title == "Broken" {
                Err(SiteError::Transient("HTTP 502".into()))
            } else {
                Ok(Some("same".into()))
            }
        });
        let mut destination = MockSite::new();
        destination
            .expect_read_document()
            .returning(|_| Ok(Some("same".into())));

        let start = tokio::time::Instant::now();
        let report = coordinator(config)
            .sync_all(&source, &destination, EntityKind::Page)
            .await
            .unwrap();

        // first pass: 500 + 1000, retry pass: 1000
        assert_eq!(start.elapsed(), Duration::from_millis(2500));
        assert_eq!(report.total, 2);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.still_failed_titles, vec!["Broken".to_string()]);
    }
}
