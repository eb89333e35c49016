//! # Diff-Sync Engine
//!
//! Brings one entity on the destination site in line with the source site.
//!
//! Documents (pages and modules) are compared after [`transform`] on both
//! sides and written only when they differ. Media files are compared by the
//! SHA-1 both sites report and re-uploaded only when they differ.
//!
//! Every remote failure is folded into a `Failed` outcome; `sync_unit`
//! never returns an error.

use std::sync::Arc;

use bridge_traits::site::{SiteClient, SiteError, SiteResult, UploadMetadata};
use tracing::{debug, info, instrument, warn};

use crate::config::{EntityKind, SyncConfig, FILE_PREFIX};
use crate::report::{SyncOutcome, SyncStatus, SyncUnit};
use crate::transform::{remap_title, transform};

/// Per-unit sync logic shared by batch runs, polls and manual syncs.
#[derive(Debug, Clone)]
pub struct SyncEngine {
    config: Arc<SyncConfig>,
}

impl SyncEngine {
    pub fn new(config: Arc<SyncConfig>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Sync one unit from `source` to `destination`.
    #[instrument(skip(self, source, destination), fields(title = %unit.title, kind = %unit.kind))]
    pub async fn sync_unit(
        &self,
        source: &dyn SiteClient,
        destination: &dyn SiteClient,
        unit: &SyncUnit,
        actor: &str,
    ) -> SyncOutcome {
        if self.config.is_ignored(unit.kind, &unit.title) {
            debug!("Title is in the ignore list");
            return SyncOutcome::ignored();
        }

        let result = match unit.kind {
            EntityKind::Page | EntityKind::Module => {
                self.sync_document(source, destination, &unit.title, actor).await
            }
            EntityKind::Media => self.sync_media(source, destination, &unit.title).await,
        };

        match result {
            Ok(SyncStatus::Synced) => {
                info!("Synced");
                SyncOutcome::synced()
            }
            Ok(SyncStatus::NoChange) => {
                debug!("Content unchanged");
                SyncOutcome::no_change()
            }
            Ok(status) => SyncOutcome {
                status,
                detail: None,
            },
            Err(e) => {
                warn!("Sync failed: {}", e);
                SyncOutcome::failed(e.to_string())
            }
        }
    }

    async fn sync_document(
        &self,
        source: &dyn SiteClient,
        destination: &dyn SiteClient,
        title: &str,
        actor: &str,
    ) -> SiteResult<SyncStatus> {
        let destination_title = if self.config.remap_destination_titles {
            remap_title(title)
        } else {
            title.to_string()
        };

        let (source_text, destination_text) = tokio::join!(
            source.read_document(title),
            destination.read_document(&destination_title)
        );

        let source_text = source_text?
            .map(|text| transform(&text))
            .ok_or_else(|| SiteError::NotFound(title.to_string()))?;
        let destination_text = transform(&destination_text?.unwrap_or_default());

        if source_text == destination_text {
            return Ok(SyncStatus::NoChange);
        }

        let comment = self.config.edit_comment(title, actor);
        destination
            .write_document(&destination_title, &source_text, &comment)
            .await?;
        Ok(SyncStatus::Synced)
    }

    async fn sync_media(
        &self,
        source: &dyn SiteClient,
        destination: &dyn SiteClient,
        title: &str,
    ) -> SiteResult<SyncStatus> {
        let filename = title.strip_prefix(FILE_PREFIX).unwrap_or(title);
        let media_title = format!("{}{}", FILE_PREFIX, filename);

        let (source_info, destination_info) = tokio::join!(
            source.get_media_info(&media_title),
            destination.get_media_info(&media_title)
        );
        let source_info = source_info?.ok_or_else(|| SiteError::NotFound(media_title.clone()))?;

        if let Some(existing) = destination_info? {
            if existing.sha1.eq_ignore_ascii_case(&source_info.sha1) {
                return Ok(SyncStatus::NoChange);
            }
        }

        let content = source.download_media(&source_info.url).await?;
        let token = destination.get_write_token().await?;
        let metadata = UploadMetadata {
            page_text: self.config.media_page_text.clone(),
            comment: self.config.media_comment.clone(),
            token,
            ignore_warnings: true,
        };
        let upload = destination.upload_media(filename, content, metadata).await?;
        debug!(result = %upload.result, "Upload accepted");
        Ok(SyncStatus::Synced)
    }
}
