use bridge_traits::site::SiteError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    /// Listing titles or recent changes failed; no partial report is produced.
    #[error("Failed to enumerate {target}: {source}")]
    Enumeration {
        target: String,
        #[source]
        source: SiteError,
    },

    #[error("Sync already in progress for {kind}")]
    SyncInProgress { kind: String },

    #[error("Invalid sync configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;
