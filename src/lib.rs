//! # Stepwright
//!
//! Drive a change-request document through a fixed, resumable implementation
//! workflow.
//!
//! Each invocation inspects the document's persisted progress, executes
//! exactly the next pending step and records it, so work can be interrupted
//! and resumed and many documents can progress independently.
//!
//! ## Features
//!
//! - **Eight-step workflow**: foundation, minimal implementation, extension
//!   and final iteration, each followed by a test step
//! - **Prompt templates**: `${change_request_file_path}` style variables with
//!   diagnostics for missing and malformed references
//! - **Side-car progress**: one marker per document, corrupt markers recover
//!   to the first step with a warning
//!
//! ## Quick Start
//!
//! ```bash
//! # Run the next step for a change request
//! stepwright docs/search.blueprint.md
//!
//! # Start over
//! stepwright docs/search.blueprint.md --reset
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// Allow common patterns that are intentional in this codebase
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::missing_panics_doc)]

pub mod core;
pub mod workflow;

// Re-export commonly used types
pub use core::{Config, FileSystem, MemoryFileSystem, OsFileSystem};
pub use workflow::{
    Catalogue, Progress, RunOutcome, RunRequest, Workflow, WorkflowError, WorkflowStep,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "stepwright";

/// Short alias
pub const APP_ALIAS: &str = "sw";
