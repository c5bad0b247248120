//! Answer assembly: context blocks and prompt templating.

use thiserror::Error;

use crate::models::RetrievedChunk;

/// Returned instead of calling the model when retrieval finds nothing.
pub const REFUSAL_MESSAGE: &str =
    "I apologize, I cannot find that specific information in the provided knowledge base.";

/// Returned when the retrieval infrastructure itself failed.
pub const RETRIEVAL_UNAVAILABLE_MESSAGE: &str =
    "I'm sorry, the knowledge base is currently unavailable, so I cannot answer right now. Please try again later.";

/// Source label for chunks stored without one.
pub const UNKNOWN_SOURCE: &str = "unknown_source.txt";

const CONTEXT_PLACEHOLDER: &str = "{context}";
const QUESTION_PLACEHOLDER: &str = "{question}";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("prompt template is empty")]
    Empty,
    #[error("prompt template is missing the {0} placeholder")]
    MissingPlaceholder(&'static str),
}

/// Format retrieved chunks as source-labelled blocks separated by a blank line.
pub fn build_context(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .map(|c| {
            format!(
                "--- Document Source: {} ---\n{}",
                c.source().unwrap_or(UNKNOWN_SOURCE),
                c.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// A prompt with `{context}` and `{question}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Result<Self, TemplateError> {
        let template = template.into();
        if template.trim().is_empty() {
            return Err(TemplateError::Empty);
        }
        for placeholder in [CONTEXT_PLACEHOLDER, QUESTION_PLACEHOLDER] {
            if !template.contains(placeholder) {
                return Err(TemplateError::MissingPlaceholder(placeholder));
            }
        }
        Ok(Self { template })
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Fill in both placeholders.
    ///
    /// Substitution is single-pass: placeholder-like text inside the context
    /// or the question is left as is.
    pub fn render(&self, context: &str, question: &str) -> String {
        let mut out = String::with_capacity(self.template.len() + context.len() + question.len());
        for (i, segment) in self.template.split(CONTEXT_PLACEHOLDER).enumerate() {
            if i > 0 {
                out.push_str(context);
            }
            out.push_str(&segment.replace(QUESTION_PLACEHOLDER, question));
        }
        out
    }
}
