use fncall_core::{parse_call_expression, Invocation, Map, ToolCallError, Value, TYPE_KEY};

/// Parse and return the only invocation.
fn single(text: &str) -> Invocation {
    let calls = parse_call_expression(text).expect("parse failed");
    assert_eq!(calls.len(), 1, "expected one call in {text}");
    calls.into_iter().next().unwrap()
}

fn arg(call: &Invocation, key: &str) -> Value {
    call.arguments
        .get(key)
        .cloned()
        .unwrap_or_else(|| panic!("missing argument {key} in {call:?}"))
}

// ============================================================================
// Call shapes
// ============================================================================

#[test]
fn keyword_arguments() {
    let call = single(r#"foo(a=1, b="x")"#);
    assert_eq!(call.name, "foo");
    assert_eq!(call.arguments.len(), 2);
    assert_eq!(arg(&call, "a"), Value::Number(1.0));
    assert_eq!(arg(&call, "b"), Value::from("x"));
}

#[test]
fn arguments_keep_source_order() {
    let call = single("f(z=1, a=2, m=3)");
    let keys: Vec<&str> = call.arguments.keys().collect();
    assert_eq!(keys, vec!["z", "a", "m"]);
}

#[test]
fn empty_call() {
    assert_eq!(single("get_time()"), Invocation::empty("get_time"));
}

#[test]
fn bare_call() {
    assert_eq!(single("get_time"), Invocation::empty("get_time"));
}

#[test]
fn call_list_in_source_order() {
    let calls = parse_call_expression("[a(x=1), b, c()]").unwrap();
    let names: Vec<&str> = calls.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
}

#[test]
fn trailing_commas_are_accepted() {
    let calls = parse_call_expression("[f(a=[1, 2,], b={'k': 1,},), g,]").unwrap();
    assert_eq!(calls.len(), 2);
    assert_eq!(
        arg(&calls[0], "a"),
        Value::List(vec![Value::Number(1.0), Value::Number(2.0)])
    );
}

#[test]
fn whitespace_and_newlines_between_tokens() {
    let call = single("f(\n    a = 1,\n    b = 'two'\n)\n");
    assert_eq!(arg(&call, "b"), Value::from("two"));
}

// ============================================================================
// Literals
// ============================================================================

#[test]
fn integer_and_float_are_indistinguishable() {
    let call = single("f(a=3, b=3.0, c=-2, d=1e2, e=.5)");
    assert_eq!(arg(&call, "a"), arg(&call, "b"));
    assert_eq!(arg(&call, "c"), Value::Number(-2.0));
    assert_eq!(arg(&call, "d"), Value::Number(100.0));
    assert_eq!(arg(&call, "e"), Value::Number(0.5));
}

#[test]
fn booleans_and_none() {
    let call = single("f(t=True, f=False, n=None)");
    assert_eq!(arg(&call, "t"), Value::Bool(true));
    assert_eq!(arg(&call, "f"), Value::Bool(false));
    assert!(arg(&call, "n").is_null());
}

#[test]
fn lowercase_keywords_are_not_literals() {
    assert!(matches!(
        parse_call_expression("f(a=true)"),
        Err(ToolCallError::Syntax { .. })
    ));
}

#[test]
fn strings_have_quotes_stripped_only() {
    let call = single(r#"f(a='single', b="double", c='it\'s', d="line\nbreak")"#);
    assert_eq!(arg(&call, "a"), Value::from("single"));
    assert_eq!(arg(&call, "b"), Value::from("double"));
    assert_eq!(arg(&call, "c"), Value::from(r"it\'s"));
    assert_eq!(arg(&call, "d"), Value::from(r"line\nbreak"));
}

#[test]
fn nested_lists_and_dicts() {
    let call = single(r#"f(items=[1, [2, "x"], {"k": None}])"#);
    let inner = Map::from_entries([("k", Value::Null)]).unwrap();
    assert_eq!(
        arg(&call, "items"),
        Value::List(vec![
            Value::Number(1.0),
            Value::List(vec![Value::Number(2.0), Value::from("x")]),
            Value::Map(inner),
        ])
    );
}

#[test]
fn object_literal_carries_type_name() {
    let call = single("f(p=Point(x=1, y=2), q=Empty())");
    let point = arg(&call, "p");
    let point = point.as_map().unwrap();
    assert_eq!(point.get(TYPE_KEY), Some(&Value::from("Point")));
    assert_eq!(point.get("x"), Some(&Value::Number(1.0)));
    assert_eq!(point.len(), 3);

    let empty = arg(&call, "q");
    assert_eq!(empty.as_map().map(|m| m.len()), Some(1));
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn duplicate_argument() {
    let err = parse_call_expression("foo(a=1, a=2)").unwrap_err();
    assert!(matches!(err, ToolCallError::DuplicateKey(ref k) if k == "a"), "{err}");
}

#[test]
fn duplicate_dict_key() {
    assert!(matches!(
        parse_call_expression(r#"f(d={"k": 1, 'k': 2})"#),
        Err(ToolCallError::DuplicateKey(_))
    ));
}

#[test]
fn object_argument_named_type_key_collides() {
    assert!(matches!(
        parse_call_expression("f(p=Point(__type__=1))"),
        Err(ToolCallError::DuplicateKey(_))
    ));
}

#[test]
fn duplicate_in_second_call_fails_everything() {
    assert!(matches!(
        parse_call_expression("[ok(a=1), bad(b=1, b=2)]"),
        Err(ToolCallError::DuplicateKey(_))
    ));
}

#[test]
fn integer_beyond_i64_widens_to_float() {
    let calls = parse_call_expression("f(a=10000000000000000000, b=-99999999999999999999)").unwrap();
    assert_eq!(calls[0].arguments.get("a"), Some(&Value::Number(1e19)));
    assert_eq!(calls[0].arguments.get("b"), Some(&Value::Number(-1e20)));
}

#[test]
fn integer_overflow_is_malformed_literal() {
    let digits = format!("1{}", "0".repeat(400));
    let err = parse_call_expression(&format!("f(a={digits})")).unwrap_err();
    assert!(
        matches!(err, ToolCallError::MalformedLiteral { ref literal, .. } if *literal == digits),
        "{err}"
    );
}

#[test]
fn float_overflow_is_malformed_literal() {
    assert!(matches!(
        parse_call_expression("f(a=1e999)"),
        Err(ToolCallError::MalformedLiteral { .. })
    ));
}

#[test]
fn missing_value_is_syntax_error() {
    for text in ["f(a=)", "f(a)", "f(=1)", "f(a=1", "f(a=1 b=2)"] {
        assert!(
            matches!(parse_call_expression(text), Err(ToolCallError::Syntax { .. })),
            "expected syntax error for {text}"
        );
    }
}

#[test]
fn empty_input_is_syntax_error() {
    assert!(matches!(
        parse_call_expression(""),
        Err(ToolCallError::Syntax { offset: 0, .. })
    ));
}

#[test]
fn empty_call_list_yields_no_invocations() {
    assert_eq!(parse_call_expression("[]").unwrap(), Vec::<Invocation>::new());
    assert!(parse_call_expression("[ ]").unwrap().is_empty());
}

#[test]
fn unrecognized_character_reports_offset() {
    let err = parse_call_expression("f(a=1, b=@)").unwrap_err();
    assert!(matches!(err, ToolCallError::Syntax { offset: 9, .. }), "{err}");
}

#[test]
fn positional_arguments_are_rejected() {
    assert!(matches!(
        parse_call_expression("f(1, 2)"),
        Err(ToolCallError::Syntax { .. })
    ));
}
