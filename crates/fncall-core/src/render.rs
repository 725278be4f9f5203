//! Renderers: invocations and values back into either syntax.
//!
//! Prompt formatters use these to replay earlier tool calls to a model, and they
//! are the inverse of the translators: parsing rendered output yields the same
//! invocations (map order aside).
//!
//! - **Call syntax**: `name(k=v, ...)`; lists `[a, b]`; maps `{"k": v}`; a map
//!   with a string `__type__` entry renders as the object literal `Name(k=v)`.
//! - **JSON**: `{"name": "f", "arguments": {...}}`, written by `serde_json`
//!   with spaced separators.
//! - **Numbers**: integral values below 2^53 print without a fraction, others
//!   use the shortest round-trip form (`.0` appended when needed so the call
//!   syntax still reads a float). Non-finite numbers print as the null token.
//!
//! Call-syntax strings are not escaped (the translator does not unescape), so a
//! string is double-quoted unless only single quotes can hold it as written.

use crate::call_expr::TYPE_KEY;
use crate::error::Result;
use crate::types::{Invocation, Map, Value};
use serde::Serialize;
use serde_json::ser::{Formatter, Serializer};
use std::io;

/// Largest magnitude printed as an integer (2^53, exact in `f64`).
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

/// Render a value in call-expression syntax.
pub fn render_value_call(value: &Value) -> String {
    let mut out = String::new();
    write_call_value(value, &mut out);
    out
}

/// Render a value as JSON.
pub fn render_value_json(value: &Value) -> Result<String> {
    to_json(value)
}

/// Render one invocation as `name(k=v, ...)`.
///
/// # Examples
///
/// ```
/// use fncall_core::{format_call_expression, Invocation, Map, Value};
///
/// let args = Map::from_entries([("city", Value::from("Paris")), ("days", Value::from(3.0))]).unwrap();
/// let call = Invocation::new("get_weather", args);
/// assert_eq!(format_call_expression(&call), r#"get_weather(city="Paris", days=3)"#);
/// ```
pub fn format_call_expression(invocation: &Invocation) -> String {
    let mut out = String::new();
    write_call_invocation(&invocation.name, &invocation.arguments, &mut out);
    out
}

/// Render invocations as a bracketed call list, `[a(x=1), b()]`.
pub fn format_call_list(invocations: &[Invocation]) -> String {
    let mut out = String::from("[");
    for (i, invocation) in invocations.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_call_invocation(&invocation.name, &invocation.arguments, &mut out);
    }
    out.push(']');
    out
}

/// Render one invocation as a JSON call object.
///
/// # Examples
///
/// ```
/// use fncall_core::{format_json_call, Invocation, Map, Value};
///
/// let args = Map::from_entries([("x", Value::Bool(true))]).unwrap();
/// assert_eq!(
///     format_json_call(&Invocation::new("f", args)).unwrap(),
///     r#"{"name": "f", "arguments": {"x": true}}"#
/// );
/// ```
pub fn format_json_call(invocation: &Invocation) -> Result<String> {
    to_json(invocation)
}

/// Render invocations as a JSON array of call objects.
pub fn format_json_list(invocations: &[Invocation]) -> Result<String> {
    to_json(invocations)
}

// ============================================================================
// Call syntax
// ============================================================================

fn write_call_invocation(name: &str, arguments: &Map, out: &mut String) {
    out.push_str(name);
    out.push('(');
    let mut first = true;
    for (key, value) in arguments.iter() {
        if !first {
            out.push_str(", ");
        }
        first = false;
        out.push_str(key);
        out.push('=');
        write_call_value(value, out);
    }
    out.push(')');
}

fn write_call_value(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("None"),
        Value::Bool(true) => out.push_str("True"),
        Value::Bool(false) => out.push_str("False"),
        Value::Number(n) => write_number(*n, "None", out),
        Value::String(s) => write_call_string(s, out),
        Value::List(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_call_value(item, out);
            }
            out.push(']');
        }
        Value::Map(map) => match object_type(map) {
            Some(type_name) => {
                out.push_str(type_name);
                out.push('(');
                let mut first = true;
                for (key, value) in map.iter().filter(|(k, _)| *k != TYPE_KEY) {
                    if !first {
                        out.push_str(", ");
                    }
                    first = false;
                    out.push_str(key);
                    out.push('=');
                    write_call_value(value, out);
                }
                out.push(')');
            }
            None => {
                out.push('{');
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    write_call_string(key, out);
                    out.push_str(": ");
                    write_call_value(value, out);
                }
                out.push('}');
            }
        },
    }
}

/// The object-literal name of a map, if it can be written as `Name(k=v)`.
fn object_type(map: &Map) -> Option<&str> {
    let type_name = map.get(TYPE_KEY)?.as_str()?;
    let all_names = is_identifier(type_name)
        && map
            .keys()
            .filter(|k| *k != TYPE_KEY)
            .all(is_identifier);
    all_names.then_some(type_name)
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !matches!(s, "True" | "False" | "None")
}

fn write_call_string(s: &str, out: &mut String) {
    let quote = if !quotable(s, '"') && quotable(s, '\'') {
        '\''
    } else {
        '"'
    };
    out.push(quote);
    out.push_str(s);
    out.push(quote);
}

/// Whether `s` lexes back unchanged between `quote` characters: every `quote`
/// must be backslash-escaped and no lone backslash may end the string.
fn quotable(s: &str, quote: char) -> bool {
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if chars.next().is_none() {
                return false;
            }
        } else if c == quote {
            return false;
        }
    }
    true
}

// ============================================================================
// JSON
// ============================================================================

/// `serde_json` output with `", "` / `": "` separators and the renderer's
/// number form.
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }

    fn write_f64<W>(&mut self, writer: &mut W, value: f64) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut out = String::new();
        write_number(value, "null", &mut out);
        writer.write_all(out.as_bytes())
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let mut buf = Vec::new();
    value.serialize(&mut Serializer::with_formatter(&mut buf, SpacedFormatter))?;
    String::from_utf8(buf)
        .map_err(|e| serde_json::Error::io(io::Error::new(io::ErrorKind::InvalidData, e)).into())
}

// ============================================================================
// Numbers
// ============================================================================

fn write_number(n: f64, null_token: &str, out: &mut String) {
    if !n.is_finite() {
        out.push_str(null_token);
        return;
    }
    // Normalize -0 to 0
    let n = if n == 0.0 { 0.0 } else { n };
    if n.fract() == 0.0 && n.abs() < MAX_EXACT_INT {
        out.push_str(&(n as i64).to_string());
        return;
    }
    let s = n.to_string();
    out.push_str(&s);
    if !s.contains('.') {
        out.push_str(".0");
    }
}
