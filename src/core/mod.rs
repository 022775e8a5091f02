//! Core infrastructure for Stepwright.
//!
//! Configuration loading and the file-system capability the workflow
//! engine runs against.

mod config;
pub mod fs;

pub use config::{Config, LoggingConfig, WorkflowConfig, CONFIG_ENV, LOCAL_CONFIG_FILE};
pub use fs::{FileSystem, MemoryFileSystem, OsFileSystem};
