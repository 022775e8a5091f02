//! Step artifact content.
//!
//! Turns a rendered prompt into the text written to a step's artifact. The
//! default mode restates the prompt as a numbered instruction list; the
//! placeholder mode writes a fixed stub and ignores the prompt.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::catalogue::Catalogue;
use super::error::WorkflowResult;

/// Line written when a step has no instructions.
pub const NO_INSTRUCTIONS: &str = "No specific instructions provided.";

/// How artifact content is produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentMode {
    /// Numbered instructions derived from the rendered prompt
    #[default]
    Instructions,

    /// Fixed stub naming the step and document
    Placeholder,
}

/// Generates artifact bodies for catalogue steps.
#[derive(Debug, Clone)]
pub struct ContentGenerator {
    catalogue: Arc<Catalogue>,
    mode: ContentMode,
}

impl ContentGenerator {
    pub fn new(catalogue: Arc<Catalogue>) -> Self {
        Self { catalogue, mode: ContentMode::default() }
    }

    /// Set the content mode.
    pub fn with_mode(mut self, mode: ContentMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> ContentMode {
        self.mode
    }

    /// Produce the artifact body for a step.
    ///
    /// Fails for step ids outside the catalogue.
    pub fn generate(
        &self,
        step_id: &str,
        rendered_prompt: &str,
        document: &Path,
    ) -> WorkflowResult<String> {
        let step = self.catalogue.require(step_id)?;

        let content = match self.mode {
            ContentMode::Instructions => numbered_instructions(rendered_prompt),
            ContentMode::Placeholder => format!(
                "# {}\n\nPlaceholder for step `{}` of {}.\n",
                step.description,
                step.id,
                document.display()
            ),
        };

        tracing::debug!(step = step.id, mode = ?self.mode, bytes = content.len(), "Generated content");
        Ok(content)
    }
}

/// Render a prompt as `"{n}. {sentence}"` lines.
pub fn numbered_instructions(prompt: &str) -> String {
    let sentences = split_sentences(prompt);
    if sentences.is_empty() {
        return format!("{NO_INSTRUCTIONS}\n");
    }

    let mut out = String::new();
    for (index, sentence) in sentences.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", index + 1, sentence));
    }
    out
}

/// Split text into sentences.
///
/// A `.`, `!` or `?` ends a sentence only when followed by whitespace or the
/// end of input, so file paths and version numbers stay intact. Whitespace
/// inside a sentence is collapsed to single spaces.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') && chars.peek().is_none_or(|next| next.is_whitespace()) {
            push_sentence(&mut sentences, &current);
            current.clear();
        }
    }
    push_sentence(&mut sentences, &current);

    sentences
}

fn push_sentence(sentences: &mut Vec<String>, raw: &str) {
    let sentence = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    // Drop fragments that are only punctuation.
    if sentence.chars().any(char::is_alphanumeric) {
        sentences.push(sentence);
    }
}
