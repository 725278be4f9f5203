//! Error types for function-call extraction.

use thiserror::Error;

/// Errors that can occur while translating, splitting, or streaming model output.
#[derive(Error, Debug)]
pub enum ToolCallError {
    /// The tokenizer or parser rejected the input. Any lexical or grammatical
    /// defect fails the whole parse; `offset` is the byte offset where the
    /// defect was detected.
    #[error("Syntax error at byte {offset}: {message}")]
    Syntax { offset: usize, message: String },

    /// A map would receive two entries with the same key (call arguments,
    /// dict literal keys, object fields, or JSON object members).
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// A literal's text could not be converted to its target representation.
    #[error("Malformed literal `{literal}`: {reason}")]
    MalformedLiteral { literal: String, reason: String },

    /// The input is syntactically valid but does not have the shape of a
    /// function call (e.g. a JSON call object without `arguments`).
    #[error("Structural error: {0}")]
    Structural(String),

    /// A caller-supplied pattern is not a valid regular expression.
    #[error("Invalid pattern `{pattern}`: {source}")]
    InvalidConfiguration {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// `serde_json` failed while rendering JSON output.
    #[error("JSON render error: {0}")]
    JsonRender(#[from] serde_json::Error),

    /// A streaming session was used after a translation failure under the
    /// poisoning failure policy.
    #[error("Stream is poisoned by an earlier translation failure")]
    StreamPoisoned,
}

impl ToolCallError {
    pub(crate) fn syntax(offset: usize, message: impl Into<String>) -> Self {
        ToolCallError::Syntax {
            offset,
            message: message.into(),
        }
    }

    pub(crate) fn malformed(literal: &str, reason: impl Into<String>) -> Self {
        ToolCallError::MalformedLiteral {
            literal: literal.to_string(),
            reason: reason.into(),
        }
    }
}

/// Convenience alias used throughout fncall-core.
pub type Result<T> = std::result::Result<T, ToolCallError>;
