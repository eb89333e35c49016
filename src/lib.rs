//! Workspace facade crate.
//!
//! Re-exports the `core-service` crate so host applications can depend on
//! `wiki-mirror-workspace` and enable the documented features without wiring
//! each workspace crate individually.

#[cfg(feature = "desktop-shims")]
pub use core_service::*;
