//! Abstract syntax for both input syntaxes.
//!
//! The parsers produce these trees; the translators walk them. Literal text is
//! kept exactly as written (quotes included) so that every literal conversion,
//! and every conversion failure, happens during translation.

/// Root of a call-expression input: one call, or a bracketed list of calls.
#[derive(Debug, Clone, PartialEq)]
pub enum CallExprRoot {
    Single(CallNode),
    List(Vec<CallNode>),
}

/// A single top-level call.
#[derive(Debug, Clone, PartialEq)]
pub enum CallNode {
    /// `name`, with no parentheses.
    Bare { name: String },
    /// `name(arg=value, ...)`, possibly with no arguments.
    Full { name: String, args: Vec<ArgNode> },
}

/// `name = value` inside a call or object literal.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgNode {
    pub name: String,
    pub value: ValueNode,
}

/// A literal in value position.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueNode {
    Int(String),
    Float(String),
    /// Raw quoted text, e.g. `'abc'`.
    Str(String),
    Bool(bool),
    None,
    List(Vec<ValueNode>),
    /// Raw quoted key text paired with its value.
    Dict(Vec<(String, ValueNode)>),
    /// `Name(arg=value, ...)` nested in value position.
    Object { name: String, args: Vec<ArgNode> },
}

/// A JSON value.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonNode {
    /// Members in source order; keys are raw quoted text.
    Object(Vec<(String, JsonNode)>),
    Array(Vec<JsonNode>),
    /// Raw quoted text, escapes not yet processed.
    Str(String),
    /// Raw numeral text.
    Number(String),
    Bool(bool),
    Null,
}
