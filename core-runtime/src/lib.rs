//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the wiki mirror core:
//! - Logging and tracing infrastructure
//! - Configuration management (site credentials, link layout, poll window)
//! - Event bus for run progress
//!
//! ## Overview
//!
//! This crate contains the runtime utilities the other crates depend on. It
//! establishes the logging conventions and event broadcasting used
//! throughout the system.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{CoreConfig, LinkConfig, SiteConfig};
pub use error::{Error, Result};
pub use events::{CoreEvent, EventBus, SyncEvent};
