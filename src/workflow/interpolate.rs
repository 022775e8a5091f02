//! Prompt template interpolation.
//!
//! Step prompts reference document-specific values with `${name}`. Rendering
//! never aborts: missing names become empty segments and malformed references
//! are left verbatim, while the diagnostics variants report both so callers
//! can surface them as warnings.

use std::collections::BTreeMap;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

/// Variable holding the change-request document path.
pub const CHANGE_REQUEST_FILE_PATH: &str = "change_request_file_path";

/// Allowed variable name alphabet.
static VARIABLE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("variable name pattern is valid"));

const OPEN: &str = "${";
const CLOSE: char = '}';

/// Named values available to a prompt template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterpolationContext {
    values: BTreeMap<String, String>,
}

impl InterpolationContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the context for a change-request document.
    pub fn for_document(document: &Path) -> Self {
        Self::new().with(CHANGE_REQUEST_FILE_PATH, document.display().to_string())
    }

    /// Add a value, returning the context.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Add or replace a value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    /// Look up a value.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}

/// Diagnostics collected while rendering a template.
///
/// This is a value, not a failure: the render that produced it is still
/// usable. Malformed entries carry the raw reference text (`${bad name}`, or
/// `${fragment` up to the next `${` or the end for an unclosed reference);
/// missing entries carry the name.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{message}")]
pub struct InterpolationError {
    /// Human readable summary
    pub message: String,

    /// References with invalid syntax
    pub malformed_variables: Vec<String>,

    /// Well-formed references with no value in the context
    pub missing_variables: Vec<String>,
}

impl InterpolationError {
    fn from_parts(malformed: Vec<String>, missing: Vec<String>) -> Option<Self> {
        if malformed.is_empty() && missing.is_empty() {
            return None;
        }

        let mut parts = Vec::new();
        if !malformed.is_empty() {
            parts.push(format!("malformed variable references: {}", malformed.join(", ")));
        }
        if !missing.is_empty() {
            parts.push(format!("missing variables: {}", missing.join(", ")));
        }

        Some(Self {
            message: parts.join("; "),
            malformed_variables: malformed,
            missing_variables: missing,
        })
    }

    pub fn has_malformed(&self) -> bool {
        !self.malformed_variables.is_empty()
    }

    pub fn has_missing(&self) -> bool {
        !self.missing_variables.is_empty()
    }
}

/// Render a template, substituting every well-formed `${name}`.
///
/// Names absent from the context render as empty segments.
pub fn interpolate(template: &str, context: &InterpolationContext) -> String {
    scan(template, Some(context)).rendered
}

/// Render a template and report malformed or missing references.
pub fn interpolate_with_diagnostics(
    template: &str,
    context: &InterpolationContext,
) -> (String, Option<InterpolationError>) {
    let scan = scan(template, Some(context));
    let diagnostics = InterpolationError::from_parts(scan.malformed, scan.missing);
    (scan.rendered, diagnostics)
}

/// Check a template for syntax defects without any context.
///
/// Only malformed references are reported; without a context every
/// reference would trivially be missing.
pub fn validate(template: &str) -> Option<InterpolationError> {
    let scan = scan(template, None);
    InterpolationError::from_parts(scan.malformed, Vec::new())
}

/// Well-formed variable names referenced by a template, in order of first use.
pub fn referenced_variables(template: &str) -> Vec<String> {
    scan(template, None).referenced
}

fn is_valid_name(name: &str) -> bool {
    VARIABLE_NAME.is_match(name)
}

#[derive(Debug, Default)]
struct Scan {
    rendered: String,
    malformed: Vec<String>,
    missing: Vec<String>,
    referenced: Vec<String>,
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|existing| existing == value) {
        list.push(value.to_string());
    }
}

/// Single pass over the template.
///
/// With no context nothing is substituted and no names count as missing.
fn scan(template: &str, context: Option<&InterpolationContext>) -> Scan {
    let mut result = Scan { rendered: String::with_capacity(template.len()), ..Scan::default() };
    let mut rest = template;

    while let Some(start) = rest.find(OPEN) {
        result.rendered.push_str(&rest[..start]);
        let body = &rest[start + OPEN.len()..];

        let next_open = body.find(OPEN);
        let end = match body.find(CLOSE) {
            Some(end) if next_open.is_none_or(|open| end < open) => end,
            _ => {
                // Unclosed reference: verbatim up to the next `${` or the end.
                let cut = next_open.unwrap_or(body.len());
                let fragment = &rest[start..start + OPEN.len() + cut];
                push_unique(&mut result.malformed, fragment);
                result.rendered.push_str(fragment);
                rest = &body[cut..];
                continue;
            }
        };

        let name = &body[..end];
        let reference = &rest[start..start + OPEN.len() + end + 1];

        if is_valid_name(name) {
            push_unique(&mut result.referenced, name);
            if let Some(context) = context {
                match context.get(name) {
                    Some(value) => result.rendered.push_str(value),
                    None => push_unique(&mut result.missing, name),
                }
            } else {
                result.rendered.push_str(reference);
            }
        } else {
            push_unique(&mut result.malformed, reference);
            result.rendered.push_str(reference);
        }

        rest = &body[end + 1..];
    }

    result.rendered.push_str(rest);
    result
}
