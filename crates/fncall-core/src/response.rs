//! Response assembly: a complete model response into text and invocation parts.
//!
//! [`parse_response`] is the complete-string pipeline: split at the fence,
//! keep the text before it, optionally narrow the payload line by line, and
//! translate the payload with the configured [`Syntax`]. Text after the end
//! fence is not part of the response.

use crate::call_expr::parse_call_expression;
use crate::error::Result;
use crate::fence::{compile_pattern, filter_tool_code, split_fenced};
use crate::json::parse_json_expression;
use crate::types::Invocation;
use serde::{Deserialize, Serialize};

/// Which translator reads the fenced payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Syntax {
    /// `name(k=v, ...)` or `[call, ...]`.
    #[serde(rename = "call")]
    CallExpression,
    /// `{"name": ..., "arguments": {...}}` or an array of them.
    #[serde(rename = "json")]
    Json,
}

impl Syntax {
    /// Translate a complete payload with this syntax.
    pub fn parse(self, text: &str) -> Result<Vec<Invocation>> {
        match self {
            Syntax::CallExpression => parse_call_expression(text),
            Syntax::Json => parse_json_expression(text),
        }
    }
}

/// How a model marks up its tool calls.
///
/// Deserializes from configuration, e.g. TOML:
///
/// ```toml
/// syntax = "json"
/// fence_start = "<tool_call>"
/// fence_end = "</tool_call>"
/// role = "assistant"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseFormat {
    pub syntax: Syntax,
    pub fence_start: String,
    pub fence_end: String,
    /// Role recorded on the parsed response.
    #[serde(default = "default_role")]
    pub role: String,
    /// Match fences as literal text; `false` treats them as regular expressions.
    #[serde(default = "default_escape_fences")]
    pub escape_fences: bool,
    /// Optional per-line filter applied to the payload (see [`filter_tool_code`]).
    #[serde(default)]
    pub tool_code_regex: Option<String>,
}

fn default_role() -> String {
    "model".to_string()
}

fn default_escape_fences() -> bool {
    true
}

impl ResponseFormat {
    /// A literal-fence format with the default role and no line filter.
    pub fn new(syntax: Syntax, fence_start: impl Into<String>, fence_end: impl Into<String>) -> Self {
        Self {
            syntax,
            fence_start: fence_start.into(),
            fence_end: fence_end.into(),
            role: default_role(),
            escape_fences: default_escape_fences(),
            tool_code_regex: None,
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = role.into();
        self
    }

    /// Treat the fences as regular expressions instead of literal text.
    pub fn with_pattern_fences(mut self) -> Self {
        self.escape_fences = false;
        self
    }

    pub fn with_tool_code_regex(mut self, pattern: impl Into<String>) -> Self {
        self.tool_code_regex = Some(pattern.into());
        self
    }
}

/// One segment of a parsed response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Part {
    Text(String),
    Invocation(Invocation),
}

/// A parsed model response: its role and its parts in order of appearance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelResponse {
    pub role: String,
    pub parts: Vec<Part>,
}

impl ModelResponse {
    pub fn new(role: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            parts: Vec::new(),
        }
    }

    /// Invocation parts, in order.
    pub fn invocations(&self) -> impl Iterator<Item = &Invocation> {
        self.parts.iter().filter_map(|part| match part {
            Part::Invocation(invocation) => Some(invocation),
            Part::Text(_) => None,
        })
    }

    pub fn into_invocations(self) -> Vec<Invocation> {
        self.parts
            .into_iter()
            .filter_map(|part| match part {
                Part::Invocation(invocation) => Some(invocation),
                Part::Text(_) => None,
            })
            .collect()
    }

    /// All text parts joined together.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                Part::Text(text) => Some(text.as_str()),
                Part::Invocation(_) => None,
            })
            .collect()
    }

    pub(crate) fn push_text(&mut self, text: &str) {
        if !text.is_empty() {
            self.parts.push(Part::Text(text.to_string()));
        }
    }

    pub(crate) fn push_invocations(&mut self, invocations: Vec<Invocation>) {
        self.parts
            .extend(invocations.into_iter().map(Part::Invocation));
    }
}

/// Parse a complete response according to `format`.
///
/// # Examples
///
/// ```
/// use fncall_core::{parse_response, Part, ResponseFormat, Syntax};
///
/// let format = ResponseFormat::new(Syntax::CallExpression, "```tool_code\n", "\n```");
/// let response = parse_response("Checking.\n```tool_code\nget_time()\n```", &format).unwrap();
/// assert_eq!(response.role, "model");
/// assert_eq!(response.parts[0], Part::Text("Checking.\n".to_string()));
/// assert_eq!(response.invocations().next().map(|c| c.name.as_str()), Some("get_time"));
/// ```
pub fn parse_response(response: &str, format: &ResponseFormat) -> Result<ModelResponse> {
    let span = split_fenced(
        response,
        &format.fence_start,
        &format.fence_end,
        format.escape_fences,
    )?;

    let mut parsed = ModelResponse::new(format.role.clone());
    parsed.push_text(span.text_before);
    if span.payload.is_empty() {
        return Ok(parsed);
    }

    let payload = match &format.tool_code_regex {
        Some(pattern) => {
            let regex = compile_pattern(pattern, pattern)?;
            filter_tool_code(span.payload, &regex)
        }
        None => span.payload.to_string(),
    };
    if payload.is_empty() {
        return Ok(parsed);
    }

    parsed.push_invocations(format.syntax.parse(&payload)?);
    Ok(parsed)
}
