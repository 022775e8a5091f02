//! Workflow step execution engine.
//!
//! Drives a change-request document through a fixed eight-step workflow,
//! one step per invocation.
//!
//! ## Steps
//!
//! Four phases, each a build step followed by its test step:
//!
//! - `01-laying-the-foundation` / `01-laying-the-foundation-test`
//! - `02-minimal-viable-implementation` / `02-minimal-viable-implementation-test`
//! - `03-extending-functionality` / `03-extending-functionality-test`
//! - `04-final-iteration` / `04-final-iteration-test`
//!
//! ## Files
//!
//! - `<document>.progress` - index of the next pending step
//! - `<document>.<step-id>.md` - artifact written by each step

mod catalogue;
mod content;
mod engine;
mod error;
mod executor;
pub mod interpolate;
mod state;

pub use catalogue::{Catalogue, Phase, WorkflowStep, STEP_COUNT};
pub use content::{
    numbered_instructions, split_sentences, ContentGenerator, ContentMode, NO_INSTRUCTIONS,
};
pub use engine::{ArtifactStatus, RunOutcome, RunRequest, StepRun, Workflow, WorkflowStatus};
pub use error::{WorkflowError, WorkflowResult};
pub use executor::{ExecutionReport, ExecutionStage, ExecutionWarning, RenderedStep, StepExecutor};
pub use interpolate::{
    interpolate, interpolate_with_diagnostics, validate, InterpolationContext, InterpolationError,
    CHANGE_REQUEST_FILE_PATH,
};
pub use state::{document_base, NextStep, Progress, StateTracker, StateWarning, COMPLETE_TOKEN};
