//! # fncall-core
//!
//! Extracts function calls that a language model writes into its free-form
//! output, from complete responses or incrementally as tokens stream in.
//!
//! Two payload syntaxes are supported:
//!
//! - **Call expressions**: `get_weather(city="Paris", days=3)` or a bracketed
//!   list `[a(x=1), b]`, with Python-style literals (`True`, `None`, lists,
//!   dicts, nested `Object(k=v)`).
//! - **JSON**: `{"name": "get_weather", "arguments": {"city": "Paris"}}` or an
//!   array of such objects.
//!
//! Both translate into the same [`Value`] model and a list of [`Invocation`]s.
//!
//! ## Quick start
//!
//! ```rust
//! use fncall_core::{parse_call_expression, parse_json_expression, format_json_list};
//!
//! let calls = parse_call_expression(r#"[find(query="rust"), now]"#).unwrap();
//! assert_eq!(calls.len(), 2);
//!
//! // Call syntax → JSON → the same invocations
//! let json = format_json_list(&calls).unwrap();
//! assert_eq!(parse_json_expression(&json).unwrap(), calls);
//! ```
//!
//! ## Modules
//!
//! - [`call_expr`] — call-expression text → invocations
//! - [`json`] — JSON text → invocations
//! - [`fence`] — split a response at its code fence; per-line payload filter
//! - [`response`] — fence split + translation into a [`ModelResponse`]
//! - [`formatter`] — [`ModelFormatter`] and the Gemma / Hammer / Llama conventions
//! - [`streaming`] — [`ToolCallStream`], chunk-by-chunk extraction
//! - [`render`] — invocations and values back into either syntax
//! - [`ast`], [`lexer`] — syntax trees and `logos` tokenizers
//! - [`types`] — [`Value`], [`Map`], [`Invocation`]
//! - [`error`] — [`ToolCallError`]

pub mod ast;
pub mod call_expr;
pub mod error;
pub mod fence;
pub mod formatter;
pub mod json;
pub mod lexer;
pub mod render;
pub mod response;
pub mod streaming;
pub mod types;

pub use call_expr::{parse_call_ast, parse_call_expression, translate_call_expr, TYPE_KEY};
pub use error::{Result, ToolCallError};
pub use fence::{filter_tool_code, split_fenced, ExtractedSpan};
pub use formatter::{
    FencedFormatter, GemmaFormatter, HammerFormatter, LlamaFormatter, ModelFormatter,
};
pub use json::{parse_json_ast, parse_json_expression, translate_json};
pub use render::{
    format_call_expression, format_call_list, format_json_call, format_json_list,
    render_value_call, render_value_json,
};
pub use response::{parse_response, ModelResponse, Part, ResponseFormat, Syntax};
pub use streaming::{
    suffix_matches_prefix, FailurePolicy, StreamEvent, StreamOptions, StreamState,
    ToolCallStream,
};
pub use types::{Invocation, Map, Value};
