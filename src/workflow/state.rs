//! Per-document progress tracking.
//!
//! Progress lives in a side-car marker next to the change-request document
//! (`<document file name>.progress`) holding the index of the next pending
//! step. An absent marker means nothing has run yet. A marker that cannot be
//! read or understood is reported as a warning and treated as absent, so a
//! damaged marker never blocks the workflow.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use super::catalogue::{Catalogue, WorkflowStep};
use super::error::{WorkflowError, WorkflowResult};
use crate::core::fs::{parent_dir, FileSystem};

/// File extension appended to the document file name for its marker.
pub const MARKER_EXTENSION: &str = "progress";

/// Marker token accepted as "all steps done".
pub const COMPLETE_TOKEN: &str = "complete";

const PREVIEW_LEN: usize = 64;

/// Where a document stands in the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "index", rename_all = "lowercase")]
pub enum Progress {
    /// Step at this index runs next
    Pending(usize),

    /// Every step has run
    Complete,
}

impl Progress {
    /// Index of the next step, if any.
    pub fn pending_index(self) -> Option<usize> {
        match self {
            Self::Pending(index) => Some(index),
            Self::Complete => None,
        }
    }

    pub fn is_complete(self) -> bool {
        matches!(self, Self::Complete)
    }
}

/// Recoverable marker problems.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum StateWarning {
    /// Marker content is not a step index, step id or completion token
    UnrecognizedMarker { path: PathBuf, content: String },

    /// Marker exists but could not be read
    UnreadableMarker { path: PathBuf, reason: String },
}

impl fmt::Display for StateWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnrecognizedMarker { path, content } => write!(
                f,
                "unrecognized step in marker {}: {:?}; restarting from the first step",
                path.display(),
                content
            ),
            Self::UnreadableMarker { path, reason } => write!(
                f,
                "could not read marker {}: {}; restarting from the first step",
                path.display(),
                reason
            ),
        }
    }
}

/// Result of reading a document's marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextStep {
    pub progress: Progress,
    pub warning: Option<StateWarning>,
}

/// Reads and writes progress markers.
#[derive(Clone)]
pub struct StateTracker {
    fs: Arc<dyn FileSystem>,
    catalogue: Arc<Catalogue>,
    output_dir: Option<PathBuf>,
}

impl fmt::Debug for StateTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateTracker")
            .field("steps", &self.catalogue.len())
            .field("output_dir", &self.output_dir)
            .finish()
    }
}

impl StateTracker {
    pub fn new(fs: Arc<dyn FileSystem>, catalogue: Arc<Catalogue>) -> Self {
        Self { fs, catalogue, output_dir: None }
    }

    /// Write artifacts into `dir` instead of next to the document.
    ///
    /// Relative directories are resolved against the document's directory.
    pub fn with_output_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.output_dir = dir;
        self
    }

    /// Side-car marker path for a document.
    pub fn marker_path(document: &Path) -> PathBuf {
        let mut name =
            document.file_name().map_or_else(|| OsString::from("document"), |n| n.to_os_string());
        name.push(".");
        name.push(MARKER_EXTENSION);
        document.with_file_name(name)
    }

    /// Decide which step runs next for a document.
    pub fn determine_next_step(&self, document: &Path) -> NextStep {
        let (index, warning) = self.stored_index(document);
        let progress = if index < self.catalogue.len() {
            Progress::Pending(index)
        } else {
            Progress::Complete
        };

        tracing::debug!(document = %document.display(), ?progress, "Determined next step");
        NextStep { progress, warning }
    }

    /// Whether every step has run for a document.
    pub fn is_complete(&self, document: &Path) -> bool {
        self.stored_index(document).0 >= self.catalogue.len()
    }

    /// Persist the next-step index for a document.
    ///
    /// The marker is replaced atomically; on failure the previous marker
    /// stands.
    pub fn update_state(&self, document: &Path, new_index: usize) -> WorkflowResult<()> {
        let max = self.catalogue.len();
        if new_index > max {
            return Err(WorkflowError::InvalidStepIndex { index: new_index, max });
        }

        let path = Self::marker_path(document);
        self.fs
            .replace_file(&path, format!("{new_index}\n").as_bytes())
            .map_err(|source| WorkflowError::MarkerWriteFailed { path: path.clone(), source })?;

        tracing::info!(document = %document.display(), index = new_index, "Progress updated");
        Ok(())
    }

    /// Restart a document's workflow from the first step.
    pub fn reset_workflow(&self, document: &Path) -> WorkflowResult<()> {
        tracing::info!(document = %document.display(), "Resetting workflow");
        self.update_state(document, 0)
    }

    /// Artifact path for a document and step.
    pub fn generate_output_filename(&self, document: &Path, step: &WorkflowStep) -> PathBuf {
        let document_dir = parent_dir(document).map(Path::to_path_buf).unwrap_or_default();
        let dir = match &self.output_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => document_dir.join(dir),
            None => document_dir,
        };
        dir.join(step.output_file_name(&document_base(document)))
    }

    /// Parse marker content into a next-step index.
    ///
    /// Accepts a decimal index (values past the end clamp to the step count,
    /// including ones too large for `usize`), a step id, or the completion
    /// token.
    pub fn parse_marker(&self, content: &str) -> Option<usize> {
        let token = content.trim();
        if token.is_empty() {
            return None;
        }
        if token.bytes().all(|b| b.is_ascii_digit()) {
            // Overflowing indices are still past the end.
            let index = token.parse::<usize>().unwrap_or(usize::MAX);
            return Some(index.min(self.catalogue.len()));
        }
        if token.eq_ignore_ascii_case(COMPLETE_TOKEN) {
            return Some(self.catalogue.len());
        }
        self.catalogue.position(token)
    }

    fn stored_index(&self, document: &Path) -> (usize, Option<StateWarning>) {
        let path = Self::marker_path(document);
        if !self.fs.exists(&path) {
            return (0, None);
        }

        let warning = match self.fs.read_file(&path) {
            Ok(bytes) => {
                let content = String::from_utf8_lossy(&bytes);
                if let Some(index) = self.parse_marker(&content) {
                    return (index, None);
                }
                StateWarning::UnrecognizedMarker { path, content: preview(&content) }
            }
            Err(err) => StateWarning::UnreadableMarker { path, reason: err.to_string() },
        };

        tracing::warn!(document = %document.display(), "{warning}");
        (0, Some(warning))
    }
}

/// Document file name used as the artifact prefix.
///
/// The extension is kept so `x.md` and `x.txt` never share artifacts.
pub fn document_base(document: &Path) -> String {
    document
        .file_name()
        .map_or_else(|| "document".to_string(), |name| name.to_string_lossy().into_owned())
}

fn preview(content: &str) -> String {
    let trimmed = content.trim();
    if trimmed.chars().count() <= PREVIEW_LEN {
        return trimmed.to_string();
    }
    let mut cut: String = trimmed.chars().take(PREVIEW_LEN).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fs::MemoryFileSystem;
    use crate::workflow::catalogue::STEP_COUNT;

    const DOC: &str = "docs/x.blueprint.md";
    const MARKER: &str = "docs/x.blueprint.md.progress";

    fn tracker(fs: &Arc<MemoryFileSystem>) -> StateTracker {
        StateTracker::new(fs.clone(), Arc::new(Catalogue::builtin().unwrap()))
    }

    fn seeded() -> Arc<MemoryFileSystem> {
        Arc::new(MemoryFileSystem::new().with_file(DOC, "# Change request\n"))
    }

    #[test]
    fn test_marker_path_is_colocated() {
        assert_eq!(StateTracker::marker_path(Path::new(DOC)), PathBuf::from(MARKER));
        assert_eq!(StateTracker::marker_path(Path::new("x.md")), PathBuf::from("x.md.progress"));
    }

    #[test]
    fn test_absent_marker_starts_at_zero() {
        let fs = seeded();
        let next = tracker(&fs).determine_next_step(Path::new(DOC));
        assert_eq!(next, NextStep { progress: Progress::Pending(0), warning: None });
    }

    #[test]
    fn test_update_then_read() {
        let fs = seeded();
        let tracker = tracker(&fs);

        tracker.update_state(Path::new(DOC), 3).unwrap();
        assert_eq!(fs.read_to_string(MARKER).as_deref(), Some("3\n"));
        assert_eq!(tracker.determine_next_step(Path::new(DOC)).progress, Progress::Pending(3));
        assert!(!tracker.is_complete(Path::new(DOC)));
    }

    #[test]
    fn test_terminal_index_is_complete() {
        let fs = seeded();
        let tracker = tracker(&fs);

        for stored in ["8", "9", "42", "complete", "COMPLETE"] {
            fs.insert_file(MARKER, stored);
            assert!(tracker.is_complete(Path::new(DOC)), "marker {stored}");
            assert_eq!(tracker.determine_next_step(Path::new(DOC)).progress, Progress::Complete);
        }
    }

    #[test]
    fn test_step_id_marker_recognized() {
        let fs = seeded();
        fs.insert_file(MARKER, "02-minimal-viable-implementation\n");
        let next = tracker(&fs).determine_next_step(Path::new(DOC));
        assert_eq!(next.progress, Progress::Pending(2));
        assert!(next.warning.is_none());
    }

    #[test]
    fn test_corrupt_marker_warns_and_restarts() {
        let fs = seeded();
        fs.insert_file(MARKER, "banana");

        let next = tracker(&fs).determine_next_step(Path::new(DOC));
        assert_eq!(next.progress, Progress::Pending(0));
        match next.warning {
            Some(StateWarning::UnrecognizedMarker { content, .. }) => assert_eq!(content, "banana"),
            other => panic!("unexpected warning: {other:?}"),
        }
    }

    #[test]
    fn test_negative_and_empty_markers_unrecognized() {
        let fs = seeded();
        let tracker = tracker(&fs);
        for stored in ["-1", "", "  \n", "3.5"] {
            fs.insert_file(MARKER, stored);
            let next = tracker.determine_next_step(Path::new(DOC));
            assert_eq!(next.progress, Progress::Pending(0), "marker {stored:?}");
            assert!(next.warning.is_some(), "marker {stored:?}");
        }
    }

    #[test]
    fn test_unreadable_marker_warns() {
        let fs = seeded();
        fs.insert_file(MARKER, "4");
        fs.deny_reads(MARKER);

        let next = tracker(&fs).determine_next_step(Path::new(DOC));
        assert_eq!(next.progress, Progress::Pending(0));
        assert!(matches!(next.warning, Some(StateWarning::UnreadableMarker { .. })));
    }

    #[test]
    fn test_update_rejects_out_of_range() {
        let fs = seeded();
        let err = tracker(&fs).update_state(Path::new(DOC), STEP_COUNT + 1).unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidStepIndex { index: 9, max: 8 }));
        assert_eq!(fs.write_count(), 0);
    }

    #[test]
    fn test_failed_update_keeps_previous_marker() {
        let fs = seeded();
        let tracker = tracker(&fs);
        tracker.update_state(Path::new(DOC), 2).unwrap();

        fs.deny_writes("docs");
        let err = tracker.update_state(Path::new(DOC), 3).unwrap_err();
        assert!(matches!(err, WorkflowError::MarkerWriteFailed { .. }));
        assert_eq!(tracker.determine_next_step(Path::new(DOC)).progress, Progress::Pending(2));
    }

    #[test]
    fn test_reset_overwrites_progress() {
        let fs = seeded();
        let tracker = tracker(&fs);
        tracker.update_state(Path::new(DOC), STEP_COUNT).unwrap();
        assert!(tracker.is_complete(Path::new(DOC)));

        tracker.reset_workflow(Path::new(DOC)).unwrap();
        assert_eq!(tracker.determine_next_step(Path::new(DOC)).progress, Progress::Pending(0));
    }

    #[test]
    fn test_documents_do_not_share_markers() {
        let fs = seeded();
        fs.insert_file("docs/y.blueprint.md", "# Other\n");
        let tracker = tracker(&fs);

        tracker.update_state(Path::new(DOC), STEP_COUNT).unwrap();
        let other = tracker.determine_next_step(Path::new("docs/y.blueprint.md"));
        assert_eq!(other.progress, Progress::Pending(0));
    }

    #[test]
    fn test_output_filename_is_deterministic() {
        let fs = seeded();
        let tracker = tracker(&fs);
        let catalogue = Catalogue::builtin().unwrap();
        let step = catalogue.get(0).unwrap();

        let first = tracker.generate_output_filename(Path::new(DOC), step);
        let second = tracker.generate_output_filename(Path::new(DOC), step);
        assert_eq!(first, second);
        assert_eq!(first, PathBuf::from("docs/x.blueprint.md.01-laying-the-foundation.md"));
    }

    #[test]
    fn test_output_filename_with_output_dir() {
        let fs = seeded();
        let catalogue = Catalogue::builtin().unwrap();
        let step = catalogue.get(1).unwrap();

        let relative = tracker(&fs).with_output_dir(Some(PathBuf::from("steps")));
        assert_eq!(
            relative.generate_output_filename(Path::new(DOC), step),
            PathBuf::from("docs/steps/x.blueprint.md.01-laying-the-foundation-test.md")
        );

        let bare = tracker(&fs);
        assert_eq!(
            bare.generate_output_filename(Path::new("x.md"), step),
            PathBuf::from("x.md.01-laying-the-foundation-test.md")
        );
    }

    #[test]
    fn test_overflowing_index_marker_is_complete() {
        let fs = seeded();
        fs.insert_file(MARKER, "18446744073709551616\n");

        let next = tracker(&fs).determine_next_step(Path::new(DOC));
        assert_eq!(next.progress, Progress::Complete);
        assert!(next.warning.is_none());
    }

    #[test]
    fn test_same_stem_documents_get_distinct_artifacts() {
        let fs = seeded();
        let tracker = tracker(&fs);
        let catalogue = Catalogue::builtin().unwrap();
        let step = catalogue.get(0).unwrap();

        let md = tracker.generate_output_filename(Path::new("docs/x.md"), step);
        let txt = tracker.generate_output_filename(Path::new("docs/x.txt"), step);
        assert_ne!(md, txt);
        assert_eq!(txt, PathBuf::from("docs/x.txt.01-laying-the-foundation.md"));
    }

    #[test]
    fn test_long_marker_content_is_truncated_in_warning() {
        let fs = seeded();
        fs.insert_file(MARKER, "z".repeat(500));

        let next = tracker(&fs).determine_next_step(Path::new(DOC));
        match next.warning {
            Some(StateWarning::UnrecognizedMarker { content, .. }) => {
                assert_eq!(content.chars().count(), PREVIEW_LEN + 1);
            }
            other => panic!("unexpected warning: {other:?}"),
        }
    }
}
