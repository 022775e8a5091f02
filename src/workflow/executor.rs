//! Step execution engine.
//!
//! Runs one step for one document: validate the document, render the prompt,
//! generate the artifact body and write it. Recording progress is left to the
//! caller so that "did the work" and "recorded the work" stay separate.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use super::catalogue::WorkflowStep;
use super::content::ContentGenerator;
use super::error::{WorkflowError, WorkflowResult};
use super::interpolate::{interpolate_with_diagnostics, InterpolationContext};
use super::state::StateTracker;
use crate::core::fs::{parent_dir, FileSystem};

/// Stages of a single execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionStage {
    Start,
    InputValidated,
    PromptRendered,
    ContentGenerated,
    Written,
    Done,
}

/// Non-fatal problems found while executing a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "variables", rename_all = "kebab-case")]
pub enum ExecutionWarning {
    /// Prompt referenced variables with no value; rendered as empty
    MissingVariables(Vec<String>),

    /// Prompt contained malformed references; left verbatim
    MalformedVariables(Vec<String>),
}

impl fmt::Display for ExecutionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingVariables(names) => {
                write!(f, "prompt references undefined variables: {}", names.join(", "))
            }
            Self::MalformedVariables(refs) => {
                write!(f, "prompt contains malformed variable references: {}", refs.join(", "))
            }
        }
    }
}

/// A step rendered for a document, not yet written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedStep {
    /// Step that was rendered
    pub step: WorkflowStep,

    /// Where the artifact goes
    pub artifact: PathBuf,

    /// Prompt after interpolation
    pub rendered_prompt: String,

    /// Artifact body
    pub content: String,

    /// Interpolation warnings
    pub warnings: Vec<ExecutionWarning>,
}

/// Outcome of a successful execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionReport {
    #[serde(flatten)]
    pub rendered: RenderedStep,

    /// Final stage reached
    pub stage: ExecutionStage,
}

impl ExecutionReport {
    pub fn step(&self) -> &WorkflowStep {
        &self.rendered.step
    }

    pub fn artifact(&self) -> &Path {
        &self.rendered.artifact
    }

    pub fn warnings(&self) -> &[ExecutionWarning] {
        &self.rendered.warnings
    }
}

/// Executes single workflow steps.
#[derive(Clone)]
pub struct StepExecutor {
    fs: Arc<dyn FileSystem>,
    tracker: StateTracker,
    generator: ContentGenerator,
}

impl fmt::Debug for StepExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepExecutor")
            .field("tracker", &self.tracker)
            .field("generator", &self.generator)
            .finish_non_exhaustive()
    }
}

impl StepExecutor {
    pub fn new(fs: Arc<dyn FileSystem>, tracker: StateTracker, generator: ContentGenerator) -> Self {
        Self { fs, tracker, generator }
    }

    /// Execute a step for a document and write its artifact.
    pub fn execute(&self, document: &Path, step: &WorkflowStep) -> WorkflowResult<ExecutionReport> {
        let mut stage = ExecutionStage::Start;
        tracing::info!(document = %document.display(), step = step.id, "Executing step");

        self.validate_input(document)?;
        advance(&mut stage, ExecutionStage::InputValidated, step);

        let (rendered_prompt, warnings) = render_prompt(document, step);
        advance(&mut stage, ExecutionStage::PromptRendered, step);

        let content = self.generator.generate(step.id, &rendered_prompt, document)?;
        advance(&mut stage, ExecutionStage::ContentGenerated, step);

        let artifact = self.tracker.generate_output_filename(document, step);
        self.write_artifact(step, &artifact, &content)?;
        advance(&mut stage, ExecutionStage::Written, step);

        tracing::info!(step = step.id, artifact = %artifact.display(), "Step artifact written");
        advance(&mut stage, ExecutionStage::Done, step);

        let rendered = RenderedStep { step: *step, artifact, rendered_prompt, content, warnings };
        Ok(ExecutionReport { rendered, stage })
    }

    /// Render a step without writing anything.
    pub fn render(&self, document: &Path, step: &WorkflowStep) -> WorkflowResult<RenderedStep> {
        let (rendered_prompt, warnings) = render_prompt(document, step);
        let content = self.generator.generate(step.id, &rendered_prompt, document)?;
        let artifact = self.tracker.generate_output_filename(document, step);

        Ok(RenderedStep { step: *step, artifact, rendered_prompt, content, warnings })
    }

    fn validate_input(&self, document: &Path) -> WorkflowResult<()> {
        self.fs
            .read_file(document)
            .map(|_| ())
            .map_err(|source| WorkflowError::DocumentUnreadable { path: document.to_path_buf(), source })
    }

    fn write_artifact(&self, step: &WorkflowStep, path: &Path, content: &str) -> WorkflowResult<()> {
        let write_failed = |source| WorkflowError::WriteFailed {
            step: step.id.to_string(),
            path: path.to_path_buf(),
            source,
        };

        if let Some(dir) = parent_dir(path) {
            if !self.fs.exists(dir) {
                tracing::debug!(dir = %dir.display(), "Creating artifact directory");
                self.fs.create_dir_all(dir).map_err(write_failed)?;
            }
        }
        self.fs.write_file(path, content.as_bytes()).map_err(write_failed)
    }
}

/// Interpolate a step prompt for a document, collecting warnings.
fn render_prompt(document: &Path, step: &WorkflowStep) -> (String, Vec<ExecutionWarning>) {
    let context = InterpolationContext::for_document(document);
    let (rendered_prompt, diagnostics) = interpolate_with_diagnostics(step.prompt, &context);

    let mut warnings = Vec::new();
    if let Some(diagnostics) = diagnostics {
        if diagnostics.has_malformed() {
            warnings.push(ExecutionWarning::MalformedVariables(diagnostics.malformed_variables.clone()));
        }
        if diagnostics.has_missing() {
            warnings.push(ExecutionWarning::MissingVariables(diagnostics.missing_variables));
        }
    }
    for warning in &warnings {
        tracing::warn!(step = step.id, "{warning}");
    }

    (rendered_prompt, warnings)
}

fn advance(stage: &mut ExecutionStage, next: ExecutionStage, step: &WorkflowStep) {
    tracing::debug!(step = step.id, from = ?stage, to = ?next, "Stage reached");
    *stage = next;
}
