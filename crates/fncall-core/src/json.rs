//! JSON syntax → invocations.
//!
//! The root is either one call object or an array of them:
//!
//! ```text
//! {"name": "get_weather", "arguments": {"city": "Paris"}}
//! [{"name": "a", "arguments": {}}, {"name": "b", "arguments": {"x": [1, 2]}}]
//! []
//! ```
//!
//! Each call object holds exactly a string `name` and an object `arguments`, in
//! either order. The empty object `{}` in call position is an empty call and
//! contributes nothing, so `[]` and `[{}]` both yield no invocations.
//!
//! Values follow standard JSON: strings are unescaped, numbers become `f64`.
//! A numeral that does not convert to a finite `f64` is a malformed literal,
//! distinct from a syntax error.

use crate::ast::JsonNode;
use crate::error::{Result, ToolCallError};
use crate::lexer::{tokenize, JsonToken, TokenStream};
use crate::types::{Invocation, Map, Value};

const MAX_DEPTH: usize = 128;

/// Parse JSON text into invocations, in source order.
///
/// # Examples
///
/// ```
/// use fncall_core::parse_json_expression;
///
/// let calls = parse_json_expression(r#"[{"name":"f","arguments":{"x":true}}]"#).unwrap();
/// assert_eq!(calls.len(), 1);
/// assert_eq!(calls[0].arguments.get("x").and_then(|v| v.as_bool()), Some(true));
///
/// assert!(parse_json_expression("[]").unwrap().is_empty());
/// ```
pub fn parse_json_expression(text: &str) -> Result<Vec<Invocation>> {
    let root = parse_json_ast(text)?;
    translate_json(&root)
}

/// Parse JSON text into its syntax tree without converting literals.
pub fn parse_json_ast(text: &str) -> Result<JsonNode> {
    let lexemes = tokenize::<JsonToken>(text)?;
    let mut stream = TokenStream::new(&lexemes, text.len());
    let node = parse_node(&mut stream, 0)?;
    if !stream.at_end() {
        return Err(stream.unexpected("expected end of input"));
    }
    Ok(node)
}

type Stream<'a, 'src> = TokenStream<'a, 'src, JsonToken>;

fn parse_node(stream: &mut Stream<'_, '_>, depth: usize) -> Result<JsonNode> {
    if depth >= MAX_DEPTH {
        return Err(ToolCallError::syntax(stream.offset(), "nesting too deep"));
    }
    let Some(token) = stream.peek() else {
        return Err(stream.unexpected("expected a JSON value"));
    };

    match token {
        JsonToken::LBrace => {
            stream.advance();
            let mut members = Vec::new();
            if !stream.eat(JsonToken::RBrace) {
                loop {
                    let key = stream.expect(JsonToken::Str)?.text.to_string();
                    stream.expect(JsonToken::Colon)?;
                    members.push((key, parse_node(stream, depth + 1)?));
                    if stream.eat(JsonToken::Comma) {
                        continue;
                    }
                    stream.expect(JsonToken::RBrace)?;
                    break;
                }
            }
            Ok(JsonNode::Object(members))
        }
        JsonToken::LBracket => {
            stream.advance();
            let mut items = Vec::new();
            if !stream.eat(JsonToken::RBracket) {
                loop {
                    items.push(parse_node(stream, depth + 1)?);
                    if stream.eat(JsonToken::Comma) {
                        continue;
                    }
                    stream.expect(JsonToken::RBracket)?;
                    break;
                }
            }
            Ok(JsonNode::Array(items))
        }
        JsonToken::Str | JsonToken::Number => {
            let text = stream.advance().map(|l| l.text.to_string()).unwrap_or_default();
            Ok(if token == JsonToken::Str {
                JsonNode::Str(text)
            } else {
                JsonNode::Number(text)
            })
        }
        JsonToken::True | JsonToken::False => {
            stream.advance();
            Ok(JsonNode::Bool(token == JsonToken::True))
        }
        JsonToken::Null => {
            stream.advance();
            Ok(JsonNode::Null)
        }
        _ => Err(stream.unexpected("expected a JSON value")),
    }
}

/// Translate a parsed JSON tree into invocations.
pub fn translate_json(root: &JsonNode) -> Result<Vec<Invocation>> {
    match root {
        JsonNode::Array(items) => {
            let mut invocations = Vec::with_capacity(items.len());
            for item in items {
                if let Some(invocation) = translate_call(item)? {
                    invocations.push(invocation);
                }
            }
            Ok(invocations)
        }
        JsonNode::Object(_) => Ok(translate_call(root)?.into_iter().collect()),
        _ => Err(ToolCallError::Structural(
            "expected a function call object or an array of them".to_string(),
        )),
    }
}

/// Translate one call object. `Ok(None)` is the empty call `{}`.
fn translate_call(node: &JsonNode) -> Result<Option<Invocation>> {
    let JsonNode::Object(members) = node else {
        return Err(ToolCallError::Structural(
            "function call must be a JSON object".to_string(),
        ));
    };
    if members.is_empty() {
        return Ok(None);
    }

    let mut name: Option<String> = None;
    let mut arguments: Option<Map> = None;
    for (raw_key, value) in members {
        let key = unescape(raw_key)?;
        match key.as_str() {
            "name" => {
                if name.is_some() {
                    return Err(ToolCallError::DuplicateKey(key));
                }
                let JsonNode::Str(raw) = value else {
                    return Err(ToolCallError::Structural(
                        "function call `name` must be a string".to_string(),
                    ));
                };
                name = Some(unescape(raw)?);
            }
            "arguments" => {
                if arguments.is_some() {
                    return Err(ToolCallError::DuplicateKey(key));
                }
                let JsonNode::Object(fields) = value else {
                    return Err(ToolCallError::Structural(
                        "function call `arguments` must be an object".to_string(),
                    ));
                };
                arguments = Some(translate_object(fields)?);
            }
            other => {
                return Err(ToolCallError::Structural(format!(
                    "unexpected member `{other}` in function call"
                )))
            }
        }
    }

    let name = name.ok_or_else(|| {
        ToolCallError::Structural("function call is missing `name`".to_string())
    })?;
    if name.is_empty() {
        return Err(ToolCallError::Structural(
            "function call `name` is empty".to_string(),
        ));
    }
    let arguments = arguments.ok_or_else(|| {
        ToolCallError::Structural(format!("function call `{name}` is missing `arguments`"))
    })?;
    Ok(Some(Invocation::new(name, arguments)))
}

fn translate_object(members: &[(String, JsonNode)]) -> Result<Map> {
    let mut map = Map::with_capacity(members.len());
    for (raw_key, value) in members {
        let key = unescape(raw_key)?;
        if key.is_empty() {
            return Err(ToolCallError::Structural(
                "JSON object key cannot be empty".to_string(),
            ));
        }
        if map.contains_key(&key) {
            return Err(ToolCallError::DuplicateKey(key));
        }
        let value = translate_value(value)?;
        map.try_insert(key, value)?;
    }
    Ok(map)
}

fn translate_value(node: &JsonNode) -> Result<Value> {
    match node {
        JsonNode::Object(members) => translate_object(members).map(Value::Map),
        JsonNode::Array(items) => items
            .iter()
            .map(translate_value)
            .collect::<Result<Vec<_>>>()
            .map(Value::List),
        JsonNode::Str(raw) => unescape(raw).map(Value::String),
        JsonNode::Number(text) => parse_number(text).map(Value::Number),
        JsonNode::Bool(b) => Ok(Value::Bool(*b)),
        JsonNode::Null => Ok(Value::Null),
    }
}

fn parse_number(text: &str) -> Result<f64> {
    let n: f64 = text
        .parse()
        .map_err(|_| ToolCallError::malformed(text, "Failed to parse number"))?;
    if !n.is_finite() {
        return Err(ToolCallError::malformed(text, "number out of range"));
    }
    Ok(n)
}

/// Decode a quoted JSON string literal, processing escapes.
fn unescape(raw: &str) -> Result<String> {
    if !raw.contains('\\') {
        if let Some(inner) = raw.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
            return Ok(inner.to_string());
        }
    }
    serde_json::from_str::<String>(raw).map_err(|e| ToolCallError::malformed(raw, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_commas() {
        assert!(matches!(
            parse_json_ast("[1,]"),
            Err(ToolCallError::Syntax { .. })
        ));
        assert!(matches!(
            parse_json_ast(r#"{"a":1,}"#),
            Err(ToolCallError::Syntax { .. })
        ));
    }

    #[test]
    fn keeps_raw_literals() {
        assert_eq!(
            parse_json_ast(r#"{"k\n": 1.50}"#).unwrap(),
            JsonNode::Object(vec![(
                r#""k\n""#.to_string(),
                JsonNode::Number("1.50".to_string())
            )])
        );
    }

    #[test]
    fn unescape_handles_surrogate_pairs() {
        assert_eq!(unescape(r#""\ud83d\ude00""#).unwrap(), "\u{1F600}");
        assert_eq!(unescape(r#""a\tb""#).unwrap(), "a\tb");
    }

    #[test]
    fn unescape_rejects_bad_escapes() {
        assert!(matches!(
            unescape(r#""\q""#),
            Err(ToolCallError::MalformedLiteral { .. })
        ));
    }

    #[test]
    fn out_of_range_number_is_malformed() {
        assert!(matches!(
            parse_number("1e999"),
            Err(ToolCallError::MalformedLiteral { .. })
        ));
    }
}
