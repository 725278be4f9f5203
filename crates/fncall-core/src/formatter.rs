//! Model formatters: per-model fence conventions and response parsing.
//!
//! A [`ModelFormatter`] is all the streaming session needs from a model: its
//! two fence strings and a way to parse one complete response. The streaming
//! session hands it a payload *including* both fences, so each implementation
//! must accept that as a complete response.
//!
//! | Formatter            | Syntax | Fences                          | Role        |
//! |----------------------|--------|---------------------------------|-------------|
//! | [`GemmaFormatter`]   | call   | ```` ```tool_code\n ```` / ```` \n``` ```` | `model`     |
//! | [`HammerFormatter`]  | JSON   | ```` ``` ```` / ```` ``` ````   | configurable, `assistant` |
//! | [`LlamaFormatter`]   | call   | `[` / `]`                       | `assistant` |
//! | [`FencedFormatter`]  | any    | from [`ResponseFormat`]         | from config |

use crate::error::Result;
use crate::fence::{compile_pattern, FencePatterns};
use crate::response::{parse_response, ModelResponse, ResponseFormat, Syntax};
use regex::Regex;
use std::sync::LazyLock;

/// The per-model collaborator consumed by [`ToolCallStream`](crate::ToolCallStream).
pub trait ModelFormatter {
    /// Literal text that opens a tool-call payload.
    fn code_fence_start(&self) -> &str;

    /// Literal text that closes a tool-call payload.
    fn code_fence_end(&self) -> &str;

    /// Parse one complete response into text and invocation parts.
    fn parse_response(&self, response: &str) -> Result<ModelResponse>;
}

impl<F: ModelFormatter + ?Sized> ModelFormatter for Box<F> {
    fn code_fence_start(&self) -> &str {
        (**self).code_fence_start()
    }

    fn code_fence_end(&self) -> &str {
        (**self).code_fence_end()
    }

    fn parse_response(&self, response: &str) -> Result<ModelResponse> {
        (**self).parse_response(response)
    }
}

// ============================================================================
// Configurable
// ============================================================================

/// A formatter configured entirely by a [`ResponseFormat`].
///
/// When the format's fences are patterns (`escape_fences == false`) the
/// streaming session still searches for them as literal text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FencedFormatter {
    format: ResponseFormat,
}

impl FencedFormatter {
    pub fn new(format: ResponseFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> &ResponseFormat {
        &self.format
    }
}

impl ModelFormatter for FencedFormatter {
    fn code_fence_start(&self) -> &str {
        &self.format.fence_start
    }

    fn code_fence_end(&self) -> &str {
        &self.format.fence_end
    }

    fn parse_response(&self, response: &str) -> Result<ModelResponse> {
        parse_response(response, &self.format)
    }
}

// ============================================================================
// Gemma
// ============================================================================

/// Gemma: call syntax inside a ```` ```tool_code ```` block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GemmaFormatter;

impl GemmaFormatter {
    pub const FENCE_START: &'static str = "```tool_code\n";
    pub const FENCE_END: &'static str = "\n```";
    pub const ROLE: &'static str = "model";
}

impl ModelFormatter for GemmaFormatter {
    fn code_fence_start(&self) -> &str {
        Self::FENCE_START
    }

    fn code_fence_end(&self) -> &str {
        Self::FENCE_END
    }

    fn parse_response(&self, response: &str) -> Result<ModelResponse> {
        let format = ResponseFormat::new(Syntax::CallExpression, Self::FENCE_START, Self::FENCE_END)
            .with_role(Self::ROLE);
        parse_response(response, &format)
    }
}

// ============================================================================
// Hammer
// ============================================================================

const IM_START: &str = "<|im_start|>";
const IM_END: &str = "<|im_end|>";
const END_OF_TEXT: &str = "<|endoftext|>";

/// Turn pattern for the default `assistant` role.
static ASSISTANT_TURN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&turn_pattern(HammerFormatter::DEFAULT_ROLE)).expect("assistant turn pattern")
});

fn turn_pattern(agent_role: &str) -> String {
    format!(
        r"(?s){}\s*{}\s*(.*?)(?:{}|{})",
        regex::escape(IM_START),
        regex::escape(agent_role),
        regex::escape(END_OF_TEXT),
        regex::escape(IM_END),
    )
}

/// Hammer: a JSON list inside a plain ```` ``` ```` block, wrapped in chat
/// markers (`<|im_start|>ROLE ... <|im_end|>`).
///
/// The turn pattern for the agent role is compiled once, on construction.
#[derive(Debug, Clone)]
pub struct HammerFormatter {
    agent_role: String,
    turn: Regex,
}

impl Default for HammerFormatter {
    fn default() -> Self {
        Self {
            agent_role: Self::DEFAULT_ROLE.to_string(),
            turn: ASSISTANT_TURN.clone(),
        }
    }
}

impl HammerFormatter {
    pub const FENCE: &'static str = "```";
    pub const DEFAULT_ROLE: &'static str = "assistant";

    /// A formatter for `agent_role`. Fails only if the role makes the turn
    /// pattern exceed the regex size limit.
    pub fn new(agent_role: impl Into<String>) -> Result<Self> {
        let agent_role = agent_role.into();
        let pattern = turn_pattern(&agent_role);
        let turn = compile_pattern(&pattern, &pattern)?;
        Ok(Self { agent_role, turn })
    }

    pub fn agent_role(&self) -> &str {
        &self.agent_role
    }

    /// Narrow the response to the agent turn's content, or trim the chat
    /// markers when the full turn is not present.
    fn strip_response<'a>(&self, response: &'a str) -> &'a str {
        if let Some(content) = self.turn.captures(response).and_then(|caps| caps.get(1)) {
            return content.as_str();
        }

        let trimmed = response.strip_prefix(IM_START).unwrap_or(response);
        let trimmed = trimmed.strip_prefix(self.agent_role.as_str()).unwrap_or(trimmed);
        let trimmed = trimmed.strip_suffix(END_OF_TEXT).unwrap_or(trimmed);
        trimmed.strip_suffix(IM_END).unwrap_or(trimmed)
    }
}

impl ModelFormatter for HammerFormatter {
    fn code_fence_start(&self) -> &str {
        Self::FENCE
    }

    fn code_fence_end(&self) -> &str {
        Self::FENCE
    }

    fn parse_response(&self, response: &str) -> Result<ModelResponse> {
        let format = ResponseFormat::new(Syntax::Json, Self::FENCE, Self::FENCE)
            .with_role(self.agent_role.clone());
        parse_response(self.strip_response(response), &format)
    }
}

// ============================================================================
// Llama
// ============================================================================

/// Llama fences: `[` at the start of a line, up to the next `]`.
static LLAMA_FENCES: LazyLock<FencePatterns> =
    LazyLock::new(|| FencePatterns::compile(r"^\[", r"\]").expect("llama fence patterns"));

/// Llama: a bracketed call list, `[f(x=1), g()]`, starting at a line start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LlamaFormatter;

impl LlamaFormatter {
    pub const FENCE_START: &'static str = "[";
    pub const FENCE_END: &'static str = "]";
    pub const ROLE: &'static str = "assistant";
    pub const END_TURN: &'static str = "<|eot_id|>";
}

impl ModelFormatter for LlamaFormatter {
    fn code_fence_start(&self) -> &str {
        Self::FENCE_START
    }

    fn code_fence_end(&self) -> &str {
        Self::FENCE_END
    }

    fn parse_response(&self, response: &str) -> Result<ModelResponse> {
        let response = response
            .strip_suffix(Self::END_TURN)
            .unwrap_or(response)
            .trim();
        let span = LLAMA_FENCES.split(response);

        let mut parsed = ModelResponse::new(Self::ROLE);
        parsed.push_text(span.text_before);
        if !span.payload.is_empty() {
            // The split drops the brackets; the call list needs them back.
            let calls = Syntax::CallExpression.parse(&format!("[{}]", span.payload))?;
            parsed.push_invocations(calls);
        }
        Ok(parsed)
    }
}
