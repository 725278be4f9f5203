//! Fence splitting: locate the tool-call payload inside model output.
//!
//! A fence is a pair of delimiters (e.g. ```` ```tool_code\n ```` and
//! ```` \n``` ````) around the payload. [`split_fenced`] cuts a complete
//! response into the text before the start fence and the payload:
//!
//! 1. Start and end fence both found: payload is the shortest text between them.
//! 2. Start fence found, end fence missing: payload is everything after the
//!    start fence (best effort, `found_end == false`).
//! 3. No start fence: everything is text, payload is empty.
//!
//! Fences are either literal text or, with `escape_literal == false`, regular
//! expressions compiled in multi-line, dot-matches-newline mode (so `^\[`
//! matches a bracket at the start of any line).

use crate::error::{Result, ToolCallError};
use regex::Regex;
use serde::Serialize;
use tracing::warn;

/// Result of splitting a response at its fence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExtractedSpan<'a> {
    /// Everything before the start fence (the whole text if there is none).
    pub text_before: &'a str,
    /// Everything strictly between the fences, or after the start fence when
    /// the end fence is missing.
    pub payload: &'a str,
    /// Whether the end fence was located.
    pub found_end: bool,
}

impl<'a> ExtractedSpan<'a> {
    fn text_only(text: &'a str) -> Self {
        Self {
            text_before: text,
            payload: "",
            found_end: false,
        }
    }
}

/// Split `text` at the fence delimited by `start_delim` / `end_delim`.
///
/// With `escape_literal` the delimiters are matched as plain text and this
/// cannot fail. Otherwise they are regular expressions and an invalid one is
/// reported as [`ToolCallError::InvalidConfiguration`].
///
/// # Examples
///
/// ```
/// use fncall_core::split_fenced;
///
/// let span = split_fenced("before```mid```after", "```", "```", true).unwrap();
/// assert_eq!((span.text_before, span.payload, span.found_end), ("before", "mid", true));
///
/// let span = split_fenced("before```mid", "```", "```", true).unwrap();
/// assert_eq!((span.text_before, span.payload, span.found_end), ("before", "mid", false));
/// ```
pub fn split_fenced<'a>(
    text: &'a str,
    start_delim: &str,
    end_delim: &str,
    escape_literal: bool,
) -> Result<ExtractedSpan<'a>> {
    if escape_literal {
        Ok(split_literal(text, start_delim, end_delim))
    } else {
        split_pattern(text, start_delim, end_delim)
    }
}

fn split_literal<'a>(text: &'a str, start_delim: &str, end_delim: &str) -> ExtractedSpan<'a> {
    let Some(start_pos) = text.find(start_delim) else {
        return ExtractedSpan::text_only(text);
    };
    let payload_start = start_pos + start_delim.len();
    match text[payload_start..].find(end_delim) {
        Some(len) => ExtractedSpan {
            text_before: &text[..start_pos],
            payload: &text[payload_start..payload_start + len],
            found_end: true,
        },
        None => {
            warn!("Code fence start found, but end fence did not match");
            ExtractedSpan {
                text_before: &text[..start_pos],
                payload: &text[payload_start..],
                found_end: false,
            }
        }
    }
}

fn split_pattern<'a>(text: &'a str, start_pattern: &str, end_pattern: &str) -> Result<ExtractedSpan<'a>> {
    Ok(FencePatterns::compile(start_pattern, end_pattern)?.split(text))
}

/// A compiled pair of pattern fences, reusable across responses.
#[derive(Debug, Clone)]
pub(crate) struct FencePatterns {
    start: Regex,
    full: Regex,
}

impl FencePatterns {
    pub(crate) fn compile(start_pattern: &str, end_pattern: &str) -> Result<Self> {
        let start = compile_pattern(&format!("(?ms){start_pattern}"), start_pattern)?;
        compile_pattern(end_pattern, end_pattern)?;
        let full = compile_pattern(
            &format!("(?ms)(?P<before>.*?)(?:{start_pattern})(?P<payload>.*?)(?:{end_pattern})"),
            start_pattern,
        )?;
        Ok(Self { start, full })
    }

    pub(crate) fn split<'a>(&self, text: &'a str) -> ExtractedSpan<'a> {
        if let Some(caps) = self.full.captures(text) {
            if let (Some(before), Some(payload)) = (caps.name("before"), caps.name("payload")) {
                return ExtractedSpan {
                    text_before: before.as_str(),
                    payload: payload.as_str(),
                    found_end: true,
                };
            }
        }

        match self.start.find(text) {
            Some(m) => {
                warn!("Code fence start found, but end fence pattern did not match");
                ExtractedSpan {
                    text_before: &text[..m.start()],
                    payload: &text[m.end()..],
                    found_end: false,
                }
            }
            None => ExtractedSpan::text_only(text),
        }
    }
}

/// Compile `regex`, attributing failures to the caller-supplied `pattern`.
pub(crate) fn compile_pattern(regex: &str, pattern: &str) -> Result<Regex> {
    Regex::new(regex).map_err(|source| ToolCallError::InvalidConfiguration {
        pattern: pattern.to_string(),
        source,
    })
}

/// Narrow each payload line to the regex's first capture group.
///
/// Lines where `pattern` matches with group 1 are replaced by the captured
/// text; all other lines are kept as they are. Useful when a model decorates
/// each call line (e.g. `print(f(x=1))` → `f(x=1)`).
///
/// # Examples
///
/// ```
/// use fncall_core::filter_tool_code;
/// use regex::Regex;
///
/// let re = Regex::new(r"^print\((.*)\)$").unwrap();
/// assert_eq!(filter_tool_code("print(f(x=1))\ng()", &re), "f(x=1)\ng()");
/// ```
pub fn filter_tool_code(payload: &str, pattern: &Regex) -> String {
    payload
        .split('\n')
        .map(|line| {
            pattern
                .captures(line)
                .and_then(|caps| caps.get(1))
                .map_or(line, |m| m.as_str())
        })
        .collect::<Vec<_>>()
        .join("\n")
}
