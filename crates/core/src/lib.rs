//! Core utilities for the PlugKit build toolchain
//!
//! This crate provides the shared plumbing the build and device crates
//! sit on:
//!
//! - **Error handling**: coded errors with context and recovery suggestions
//! - **Process execution**: capture/checked invocation of external tools
//! - **Configuration**: the `plugkit.toml` project manifest
//! - **Artifact cache**: version-keyed host APK/jar storage
//! - **Downloads**: atomic, retried, progress-reporting HTTP fetches
//!
//! # Example
//!
//! ```rust,no_run
//! use plugkit_core::{cache::ArtifactCache, config::Config};
//!
//! let config = Config::load(None).expect("no plugkit.toml here");
//! let cache = ArtifactCache::new().expect("no cache dir");
//! println!(
//!     "building {} against host {}",
//!     config.schema.plugin.name, config.schema.host.version
//! );
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod cache;
pub mod config;
pub mod digest;
pub mod download;
pub mod error;
pub mod process;
pub mod retry;

pub use error::{Error, ErrorCode, Result, ResultExt};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::cache::ArtifactCache;
    pub use crate::config::{Config, ProjectType};
    pub use crate::error::{exit_codes, Error, ErrorCode, Result, ResultExt};
    pub use crate::process::{run_command, run_command_checked, CommandResult};
    pub use crate::retry::{retry, RetryConfig};
}
