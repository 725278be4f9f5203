//! Call-expression syntax → invocations.
//!
//! Accepts a single call or a bracketed list of calls:
//!
//! ```text
//! get_weather(city="Paris", days=3)
//! [find(query='rust', limit=10), now]
//! ```
//!
//! Values may be integers, floats, quoted strings (single or double quotes,
//! quotes stripped, escapes left as written), `True`/`False`, `None`, lists,
//! dicts with quoted keys, and nested objects `Name(arg=value)`. An object becomes
//! a map whose `__type__` entry holds its name.
//!
//! # Key design decisions
//!
//! - **Two passes**: [`parse_call_ast`] builds a [`CallExprRoot`] and
//!   [`translate_call_expr`] turns it into invocations. Other front ends can
//!   produce the AST and reuse the translator.
//! - **All-or-nothing**: a syntax error, a duplicate key, or a malformed literal
//!   anywhere fails the whole input; no partial invocation list is returned.
//! - **Numbers are `f64`**: integer and float literals both parse straight to
//!   `f64`; only a literal too large to be finite is malformed.

use crate::ast::{ArgNode, CallExprRoot, CallNode, ValueNode};
use crate::error::{Result, ToolCallError};
use crate::lexer::{tokenize, CallToken, TokenStream};
use crate::types::{Invocation, Map, Value};

/// Reserved map key holding the name of a nested object literal.
pub const TYPE_KEY: &str = "__type__";

/// Maximum nesting of lists, dicts and objects accepted by the parser.
const MAX_DEPTH: usize = 128;

/// Parse call-expression text into invocations, in source order.
///
/// # Examples
///
/// ```
/// use fncall_core::parse_call_expression;
///
/// let calls = parse_call_expression(r#"foo(a=1, b="x")"#).unwrap();
/// assert_eq!(calls[0].name, "foo");
/// assert_eq!(calls[0].arguments.get("a").and_then(|v| v.as_f64()), Some(1.0));
/// assert_eq!(calls[0].arguments.get("b").and_then(|v| v.as_str()), Some("x"));
/// ```
pub fn parse_call_expression(text: &str) -> Result<Vec<Invocation>> {
    let root = parse_call_ast(text)?;
    translate_call_expr(&root)
}

/// Parse call-expression text into its syntax tree without translating literals.
pub fn parse_call_ast(text: &str) -> Result<CallExprRoot> {
    let lexemes = tokenize::<CallToken>(text)?;
    let mut stream = TokenStream::new(&lexemes, text.len());

    let root = if stream.check(CallToken::LBracket) {
        CallExprRoot::List(parse_call_list(&mut stream)?)
    } else {
        CallExprRoot::Single(parse_call(&mut stream)?)
    };

    if !stream.at_end() {
        return Err(stream.unexpected("expected end of input"));
    }
    Ok(root)
}

type Stream<'a, 'src> = TokenStream<'a, 'src, CallToken>;

fn parse_call_list(stream: &mut Stream<'_, '_>) -> Result<Vec<CallNode>> {
    stream.expect(CallToken::LBracket)?;
    let mut calls = Vec::new();
    while !stream.check(CallToken::RBracket) {
        calls.push(parse_call(stream)?);
        if !stream.eat(CallToken::Comma) {
            break;
        }
    }
    stream.expect(CallToken::RBracket)?;
    Ok(calls)
}

fn parse_call(stream: &mut Stream<'_, '_>) -> Result<CallNode> {
    let name = stream.expect(CallToken::Name)?.text.to_string();
    if !stream.eat(CallToken::LParen) {
        return Ok(CallNode::Bare { name });
    }
    let args = parse_args(stream, 0)?;
    stream.expect(CallToken::RParen)?;
    Ok(CallNode::Full { name, args })
}

/// Parse `name=value` pairs up to (not including) the closing paren.
fn parse_args(stream: &mut Stream<'_, '_>, depth: usize) -> Result<Vec<ArgNode>> {
    let mut args = Vec::new();
    while !stream.check(CallToken::RParen) {
        let name = stream.expect(CallToken::Name)?.text.to_string();
        stream.expect(CallToken::Equals)?;
        let value = parse_value(stream, depth)?;
        args.push(ArgNode { name, value });
        if !stream.eat(CallToken::Comma) {
            break;
        }
    }
    Ok(args)
}

fn parse_value(stream: &mut Stream<'_, '_>, depth: usize) -> Result<ValueNode> {
    if depth >= MAX_DEPTH {
        return Err(ToolCallError::syntax(stream.offset(), "nesting too deep"));
    }
    let Some(token) = stream.peek() else {
        return Err(stream.unexpected("expected a value"));
    };

    match token {
        CallToken::Int | CallToken::Float | CallToken::Str => {
            let text = stream.advance().map(|l| l.text.to_string()).unwrap_or_default();
            Ok(match token {
                CallToken::Int => ValueNode::Int(text),
                CallToken::Float => ValueNode::Float(text),
                _ => ValueNode::Str(text),
            })
        }
        CallToken::TrueKw | CallToken::FalseKw => {
            stream.advance();
            Ok(ValueNode::Bool(token == CallToken::TrueKw))
        }
        CallToken::NoneKw => {
            stream.advance();
            Ok(ValueNode::None)
        }
        CallToken::LBracket => {
            stream.advance();
            let mut items = Vec::new();
            while !stream.check(CallToken::RBracket) {
                items.push(parse_value(stream, depth + 1)?);
                if !stream.eat(CallToken::Comma) {
                    break;
                }
            }
            stream.expect(CallToken::RBracket)?;
            Ok(ValueNode::List(items))
        }
        CallToken::LBrace => {
            stream.advance();
            let mut pairs = Vec::new();
            while !stream.check(CallToken::RBrace) {
                let key = stream.expect(CallToken::Str)?.text.to_string();
                stream.expect(CallToken::Colon)?;
                pairs.push((key, parse_value(stream, depth + 1)?));
                if !stream.eat(CallToken::Comma) {
                    break;
                }
            }
            stream.expect(CallToken::RBrace)?;
            Ok(ValueNode::Dict(pairs))
        }
        CallToken::Name => {
            let name = stream.expect(CallToken::Name)?.text.to_string();
            stream.expect(CallToken::LParen)?;
            let args = parse_args(stream, depth + 1)?;
            stream.expect(CallToken::RParen)?;
            Ok(ValueNode::Object { name, args })
        }
        _ => Err(stream.unexpected("expected a value")),
    }
}

/// Translate a parsed call-expression tree into invocations.
pub fn translate_call_expr(root: &CallExprRoot) -> Result<Vec<Invocation>> {
    let calls = match root {
        CallExprRoot::Single(call) => std::slice::from_ref(call),
        CallExprRoot::List(calls) => calls.as_slice(),
    };
    calls
        .iter()
        .map(translate_call)
        .collect::<Result<Vec<_>>>()
}

fn translate_call(call: &CallNode) -> Result<Invocation> {
    match call {
        CallNode::Bare { name } => {
            require_name(name)?;
            Ok(Invocation::empty(name.clone()))
        }
        CallNode::Full { name, args } => {
            require_name(name)?;
            let arguments = translate_args(args, Map::new())?;
            Ok(Invocation::new(name.clone(), arguments))
        }
    }
}

fn require_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(ToolCallError::Structural(
            "function call without a name".to_string(),
        ));
    }
    Ok(())
}

/// Add each `name=value` pair to `map`; a repeated name is a duplicate key.
fn translate_args(args: &[ArgNode], mut map: Map) -> Result<Map> {
    for arg in args {
        if arg.name.is_empty() {
            return Err(ToolCallError::Structural(
                "argument without a name".to_string(),
            ));
        }
        if map.contains_key(&arg.name) {
            return Err(ToolCallError::DuplicateKey(arg.name.clone()));
        }
        map.try_insert(arg.name.clone(), translate_value(&arg.value)?)?;
    }
    Ok(map)
}

fn translate_value(node: &ValueNode) -> Result<Value> {
    match node {
        ValueNode::Int(text) | ValueNode::Float(text) => parse_number(text).map(Value::Number),
        ValueNode::Str(raw) => Ok(Value::String(strip_quotes(raw).to_string())),
        ValueNode::Bool(b) => Ok(Value::Bool(*b)),
        ValueNode::None => Ok(Value::Null),
        ValueNode::List(items) => items
            .iter()
            .map(translate_value)
            .collect::<Result<Vec<_>>>()
            .map(Value::List),
        ValueNode::Dict(pairs) => {
            let mut map = Map::new();
            for (key, value) in pairs {
                map.try_insert(strip_quotes(key), translate_value(value)?)?;
            }
            Ok(Value::Map(map))
        }
        ValueNode::Object { name, args } => {
            let mut map = Map::new();
            map.try_insert(TYPE_KEY, Value::String(name.clone()))?;
            translate_args(args, map).map(Value::Map)
        }
    }
}

fn parse_number(text: &str) -> Result<f64> {
    let n: f64 = text
        .parse()
        .map_err(|e| ToolCallError::malformed(text, format!("invalid number: {e}")))?;
    if !n.is_finite() {
        return Err(ToolCallError::malformed(text, "number out of range"));
    }
    Ok(n)
}

/// Remove one pair of matching surrounding quotes, if present.
fn strip_quotes(text: &str) -> &str {
    let bytes = text.as_bytes();
    if bytes.len() >= 2
        && (bytes[0] == b'"' || bytes[0] == b'\'')
        && bytes[bytes.len() - 1] == bytes[0]
    {
        &text[1..text.len() - 1]
    } else {
        text
    }
}
