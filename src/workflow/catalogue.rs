//! The fixed step catalogue.
//!
//! Eight steps in four phases, each phase a build step followed by the step
//! that writes its tests. Order is significant: the progress marker stores an
//! index into this list.

use serde::Serialize;

use super::error::{WorkflowError, WorkflowResult};
use super::interpolate;

/// Number of steps in the built-in workflow.
pub const STEP_COUNT: usize = 8;

/// Workflow phase a step belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Foundation,
    MinimalImplementation,
    Extension,
    FinalIteration,
}

impl Phase {
    /// All phases in workflow order.
    pub const ALL: [Self; 4] =
        [Self::Foundation, Self::MinimalImplementation, Self::Extension, Self::FinalIteration];

    /// Human label for display.
    pub fn label(self) -> &'static str {
        match self {
            Self::Foundation => "Laying the foundation",
            Self::MinimalImplementation => "Minimal viable implementation",
            Self::Extension => "Extending functionality",
            Self::FinalIteration => "Final iteration",
        }
    }
}

/// A single workflow step definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WorkflowStep {
    /// Unique slug, also used in artifact names
    pub id: &'static str,

    /// Human description
    pub description: &'static str,

    /// Prompt template (may reference `${change_request_file_path}`)
    pub prompt: &'static str,

    /// Artifact file name pattern; `{base}` is the document base name
    pub output_file_pattern: &'static str,

    /// Whether this step writes tests for the preceding build step
    pub is_test: bool,

    /// Phase tag
    pub phase: Phase,
}

impl WorkflowStep {
    /// Artifact file name for a document base name.
    pub fn output_file_name(&self, base: &str) -> String {
        self.output_file_pattern.replace("{base}", base)
    }
}

const BUILTIN_STEPS: [WorkflowStep; STEP_COUNT] = [
    WorkflowStep {
        id: "01-laying-the-foundation",
        description: "Lay the foundation",
        prompt: "Read the change request at ${change_request_file_path}. \
                 Identify the modules, types and interfaces the change touches. \
                 Create the skeleton of every new module with signatures but no behaviour. \
                 Keep the existing build green.",
        output_file_pattern: "{base}.01-laying-the-foundation.md",
        is_test: false,
        phase: Phase::Foundation,
    },
    WorkflowStep {
        id: "01-laying-the-foundation-test",
        description: "Test the foundation",
        prompt: "Write tests for the skeleton introduced for ${change_request_file_path}. \
                 Cover construction of every new type and the shape of every new interface. \
                 Make sure the tests compile and fail only where behaviour is still missing.",
        output_file_pattern: "{base}.01-laying-the-foundation-test.md",
        is_test: true,
        phase: Phase::Foundation,
    },
    WorkflowStep {
        id: "02-minimal-viable-implementation",
        description: "Build the minimal viable implementation",
        prompt: "Implement the smallest version of ${change_request_file_path} that delivers its core behaviour. \
                 Handle the main success path end to end. \
                 Defer edge cases and configuration to later steps.",
        output_file_pattern: "{base}.02-minimal-viable-implementation.md",
        is_test: false,
        phase: Phase::MinimalImplementation,
    },
    WorkflowStep {
        id: "02-minimal-viable-implementation-test",
        description: "Test the minimal viable implementation",
        prompt: "Write tests for the main success path of ${change_request_file_path}. \
                 Exercise the behaviour through its public interface. \
                 Run the full test suite and fix any regressions.",
        output_file_pattern: "{base}.02-minimal-viable-implementation-test.md",
        is_test: true,
        phase: Phase::MinimalImplementation,
    },
    WorkflowStep {
        id: "03-extending-functionality",
        description: "Extend the functionality",
        prompt: "Extend the implementation to cover the remaining requirements in ${change_request_file_path}. \
                 Handle edge cases, invalid input and error reporting. \
                 Keep each change small and reviewable.",
        output_file_pattern: "{base}.03-extending-functionality.md",
        is_test: false,
        phase: Phase::Extension,
    },
    WorkflowStep {
        id: "03-extending-functionality-test",
        description: "Test the extended functionality",
        prompt: "Write tests for every edge case and error path added for ${change_request_file_path}. \
                 Include at least one test per requirement in the change request. \
                 Run the full test suite and fix any regressions.",
        output_file_pattern: "{base}.03-extending-functionality-test.md",
        is_test: true,
        phase: Phase::Extension,
    },
    WorkflowStep {
        id: "04-final-iteration",
        description: "Final iteration",
        prompt: "Review the complete change for ${change_request_file_path} against the change request. \
                 Remove dead code and tighten naming. \
                 Update documentation for anything a user or maintainer will notice.",
        output_file_pattern: "{base}.04-final-iteration.md",
        is_test: false,
        phase: Phase::FinalIteration,
    },
    WorkflowStep {
        id: "04-final-iteration-test",
        description: "Test the final iteration",
        prompt: "Run the full test suite for ${change_request_file_path} one last time. \
                 Add tests for anything changed during the final review. \
                 Confirm every requirement in the change request is covered by a passing test.",
        output_file_pattern: "{base}.04-final-iteration-test.md",
        is_test: true,
        phase: Phase::FinalIteration,
    },
];

/// Ordered, validated collection of workflow steps.
#[derive(Debug, Clone)]
pub struct Catalogue {
    steps: Vec<WorkflowStep>,
}

impl Catalogue {
    /// Build a catalogue, validating every prompt template.
    pub fn new(steps: Vec<WorkflowStep>) -> WorkflowResult<Self> {
        for step in &steps {
            if let Some(source) = interpolate::validate(step.prompt) {
                return Err(WorkflowError::InvalidCatalogue { step: step.id.to_string(), source });
            }
        }

        tracing::debug!(steps = steps.len(), "Step catalogue validated");
        Ok(Self { steps })
    }

    /// The built-in eight-step workflow.
    pub fn builtin() -> WorkflowResult<Self> {
        Self::new(BUILTIN_STEPS.to_vec())
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Step at an index.
    pub fn get(&self, index: usize) -> Option<&WorkflowStep> {
        self.steps.get(index)
    }

    /// Step by identifier.
    pub fn find(&self, id: &str) -> Option<&WorkflowStep> {
        self.steps.iter().find(|step| step.id == id)
    }

    /// Index of a step identifier.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.steps.iter().position(|step| step.id == id)
    }

    /// Step by identifier, failing for ids outside the catalogue.
    pub fn require(&self, id: &str) -> WorkflowResult<&WorkflowStep> {
        self.find(id).ok_or_else(|| WorkflowError::UnknownStep(id.to_string()))
    }

    /// Iterate steps in order.
    pub fn iter(&self) -> impl Iterator<Item = &WorkflowStep> {
        self.steps.iter()
    }

    /// Steps belonging to one phase.
    pub fn phase_steps(&self, phase: Phase) -> Vec<&WorkflowStep> {
        self.steps.iter().filter(|step| step.phase == phase).collect()
    }
}
