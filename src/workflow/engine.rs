//! Workflow entry point.
//!
//! Ties the catalogue, state tracker and executor together: one `run` call
//! executes at most one step for one document and records it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use super::catalogue::{Catalogue, WorkflowStep};
use super::content::ContentGenerator;
use super::error::{WorkflowError, WorkflowResult};
use super::executor::{ExecutionReport, RenderedStep, StepExecutor};
use super::state::{Progress, StateTracker, StateWarning};
use crate::core::WorkflowConfig;
use crate::core::fs::FileSystem;

/// A single invocation of the workflow for a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    /// Change-request document
    pub document: PathBuf,

    /// Restart from the first step before running
    pub reset: bool,
}

impl RunRequest {
    pub fn new(document: impl Into<PathBuf>) -> Self {
        Self { document: document.into(), reset: false }
    }

    pub fn with_reset(mut self, reset: bool) -> Self {
        self.reset = reset;
        self
    }
}

/// A step that ran and was recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRun {
    /// Catalogue index of the step
    pub index: usize,

    /// Execution details
    pub report: ExecutionReport,

    /// Marker problem recovered from before running
    pub marker_warning: Option<StateWarning>,

    /// Progress after recording the step
    pub next: Progress,
}

/// What a run did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum RunOutcome {
    /// The next pending step ran
    Executed(Box<StepRun>),

    /// Nothing left to run; no files were written
    AlreadyComplete { document: PathBuf, steps: usize },
}

/// Per-step artifact presence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactStatus {
    pub step: &'static str,
    pub path: PathBuf,
    pub exists: bool,
}

/// Read-only view of a document's progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowStatus {
    pub document: PathBuf,
    pub marker: PathBuf,
    pub progress: Progress,
    pub completed: usize,
    pub total: usize,
    pub next_step: Option<WorkflowStep>,
    pub warning: Option<StateWarning>,
    pub artifacts: Vec<ArtifactStatus>,
}

/// The workflow engine.
#[derive(Clone)]
pub struct Workflow {
    fs: Arc<dyn FileSystem>,
    catalogue: Arc<Catalogue>,
    tracker: StateTracker,
    executor: StepExecutor,
}

impl std::fmt::Debug for Workflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workflow")
            .field("steps", &self.catalogue.len())
            .field("executor", &self.executor)
            .finish_non_exhaustive()
    }
}

impl Workflow {
    /// Create an engine over the built-in catalogue.
    ///
    /// Fails if a built-in prompt template is malformed.
    pub fn new(fs: Arc<dyn FileSystem>, config: &WorkflowConfig) -> WorkflowResult<Self> {
        Ok(Self::with_catalogue(fs, Catalogue::builtin()?, config))
    }

    /// Create an engine over an already validated catalogue.
    pub fn with_catalogue(
        fs: Arc<dyn FileSystem>,
        catalogue: Catalogue,
        config: &WorkflowConfig,
    ) -> Self {
        let catalogue = Arc::new(catalogue);
        let tracker = StateTracker::new(fs.clone(), catalogue.clone())
            .with_output_dir(config.resolved_output_dir());
        let generator = ContentGenerator::new(catalogue.clone()).with_mode(config.content_mode);
        let executor = StepExecutor::new(fs.clone(), tracker.clone(), generator);

        Self { fs, catalogue, tracker, executor }
    }

    pub fn catalogue(&self) -> &Catalogue {
        &self.catalogue
    }

    pub fn tracker(&self) -> &StateTracker {
        &self.tracker
    }

    /// Execute the next pending step for a document and record it.
    pub fn run(&self, request: &RunRequest) -> WorkflowResult<RunOutcome> {
        let document = request.document.as_path();
        self.require_document(document)?;

        if request.reset {
            self.tracker.reset_workflow(document)?;
        }

        let next = self.tracker.determine_next_step(document);
        let Some(index) = next.progress.pending_index() else {
            tracing::info!(document = %document.display(), "All steps already completed");
            return Ok(RunOutcome::AlreadyComplete {
                document: document.to_path_buf(),
                steps: self.catalogue.len(),
            });
        };

        let step = self
            .catalogue
            .get(index)
            .ok_or(WorkflowError::InvalidStepIndex { index, max: self.catalogue.len() })?;
        let report = self.executor.execute(document, step)?;

        self.tracker.update_state(document, index + 1)?;
        let next_progress = if index + 1 < self.catalogue.len() {
            Progress::Pending(index + 1)
        } else {
            Progress::Complete
        };

        Ok(RunOutcome::Executed(Box::new(StepRun {
            index,
            report,
            marker_warning: next.warning,
            next: next_progress,
        })))
    }

    /// Progress of a document without changing anything.
    pub fn status(&self, document: &Path) -> WorkflowResult<WorkflowStatus> {
        self.require_document(document)?;

        let next = self.tracker.determine_next_step(document);
        let completed = next.progress.pending_index().unwrap_or(self.catalogue.len());
        let next_step = next.progress.pending_index().and_then(|i| self.catalogue.get(i)).copied();
        let artifacts = self
            .catalogue
            .iter()
            .map(|step| {
                let path = self.tracker.generate_output_filename(document, step);
                let exists = self.fs.exists(&path);
                ArtifactStatus { step: step.id, path, exists }
            })
            .collect();

        Ok(WorkflowStatus {
            document: document.to_path_buf(),
            marker: StateTracker::marker_path(document),
            progress: next.progress,
            completed,
            total: self.catalogue.len(),
            next_step,
            warning: next.warning,
            artifacts,
        })
    }

    /// Render a step for a document without writing.
    ///
    /// With no step id, renders the next pending step; returns `None` when
    /// the workflow is complete.
    pub fn preview(
        &self,
        document: &Path,
        step_id: Option<&str>,
    ) -> WorkflowResult<Option<RenderedStep>> {
        self.require_document(document)?;

        let step = match step_id {
            Some(id) => self.catalogue.require(id)?,
            None => {
                let next = self.tracker.determine_next_step(document);
                match next.progress.pending_index().and_then(|i| self.catalogue.get(i)) {
                    Some(step) => step,
                    None => return Ok(None),
                }
            }
        };

        self.executor.render(document, step).map(Some)
    }

    fn require_document(&self, document: &Path) -> WorkflowResult<()> {
        if self.fs.exists(document) {
            Ok(())
        } else {
            Err(WorkflowError::DocumentNotFound(document.to_path_buf()))
        }
    }
}
