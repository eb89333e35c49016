use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Core initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Configuration error: {0}")]
    Runtime(#[from] core_runtime::Error),

    #[error("Site error: {0}")]
    Site(#[from] bridge_traits::site::SiteError),

    #[error("Login error: {0}")]
    Provider(#[from] provider_mediawiki::MediaWikiError),

    #[error("Sync error: {0}")]
    Sync(#[from] core_sync::SyncError),

    #[error("Library error: {0}")]
    Library(#[from] core_library::LibraryError),

    /// No cached entry carries the requested id.
    #[error("No cached page with id {0}")]
    UnknownId(i64),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
