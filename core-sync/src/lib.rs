//! # Mirror Sync
//!
//! One-way synchronization of wiki content from a source site to a
//! destination site.
//!
//! ## Overview
//!
//! - Normalizing document bodies before comparison (`transform`)
//! - Bringing one page, module or media file in line with the source (`engine`)
//! - Two-pass batch runs over a whole namespace with pacing (`batch`)
//! - Single-attempt polling of the recent-changes feed (`poller`)
//!
//! ## Components
//!
//! - **Sync Config** (`config`): entity kinds, pacing, ignore lists and edit texts
//! - **Sync Engine** (`engine`): per-unit diff and write, never fails outright
//! - **Sync Coordinator** (`coordinator`): drives the engine and publishes progress events
//! - **Reports** (`report`): unit outcomes and run summaries

pub mod batch;
pub mod config;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod poller;
pub mod report;
pub mod transform;

pub use config::{
    EntityKind, KindSettings, Pacing, SyncConfig, DEFAULT_ACTOR, FILE_PREFIX, INCREMENTAL_ACTOR,
    MANUAL_ACTOR, MODULE_PREFIX,
};
pub use coordinator::SyncCoordinator;
pub use engine::SyncEngine;
pub use error::{Result, SyncError};
pub use report::{BatchReport, PassResults, PollReport, SyncOutcome, SyncStatus, SyncUnit};
pub use transform::{remap_title, transform};
