use super::*;

fn lex(input: &str) -> Vec<Token> {
    tokenize(input, "test.sql").unwrap()
}

fn kinds(tokens: &[Token]) -> Vec<TokenKind> {
    tokens.iter().map(|t| t.kind).collect()
}

#[test]
fn test_plain_text() {
    let tokens = lex("SELECT * FROM users");
    assert_eq!(tokens.len(), 2);
    assert_eq!(tokens[0].kind, TokenKind::Text);
    assert_eq!(tokens[0].value, "SELECT * FROM users");
    assert_eq!(tokens[1].kind, TokenKind::Eof);
}

#[test]
fn test_simple_expression() {
    let tokens = lex("SELECT {{ column }} FROM users");
    let expected = [
        (TokenKind::Text, "SELECT "),
        (TokenKind::Expr, "column"),
        (TokenKind::Text, " FROM users"),
        (TokenKind::Eof, ""),
    ];
    assert_eq!(tokens.len(), expected.len());
    for (token, (kind, value)) in tokens.iter().zip(expected) {
        assert_eq!(token.kind, kind);
        assert_eq!(token.value, value);
    }
}

#[test]
fn test_multiple_expressions() {
    let tokens = lex("{{ a }} + {{ b }}");
    assert_eq!(
        kinds(&tokens),
        vec![TokenKind::Expr, TokenKind::Text, TokenKind::Expr, TokenKind::Eof]
    );
    assert_eq!(tokens[0].value, "a");
    assert_eq!(tokens[2].value, "b");
}

#[test]
fn test_statement() {
    let tokens = lex("{* for x in items: *}");
    assert_eq!(tokens.len(), 2);
    assert_eq!(tokens[0].kind, TokenKind::Stmt);
    assert_eq!(tokens[0].value, "for x in items:");
}

#[test]
fn test_for_loop_token_stream() {
    let input = "SELECT\n{* for col in columns: *}\n    {{ col }},\n{* endfor *}\nFROM users";
    let tokens = lex(input);
    assert_eq!(
        kinds(&tokens),
        vec![
            TokenKind::Text,
            TokenKind::Stmt,
            TokenKind::Text,
            TokenKind::Expr,
            TokenKind::Text,
            TokenKind::Stmt,
            TokenKind::Text,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_if_else_token_stream() {
    let input = "{* if condition: *}\nyes\n{* else: *}\nno\n{* endif *}";
    let tokens = lex(input);
    assert_eq!(
        kinds(&tokens),
        vec![
            TokenKind::Stmt,
            TokenKind::Text,
            TokenKind::Stmt,
            TokenKind::Text,
            TokenKind::Stmt,
            TokenKind::Eof,
        ]
    );
    assert_eq!(tokens[0].value, "if condition:");
    assert_eq!(tokens[2].value, "else:");
    assert_eq!(tokens[4].value, "endif");
}

#[test]
fn test_unclosed_expression() {
    let err = tokenize("SELECT {{ column FROM users", "test.sql").unwrap_err();
    match err {
        TemplateError::Unclosed { line, column, kind, .. } => {
            assert_eq!(line, 1);
            assert_eq!(column, 8);
            assert_eq!(kind, UnclosedKind::Expr);
        }
        other => panic!("expected Unclosed, got {:?}", other),
    }
}

#[test]
fn test_unclosed_statement() {
    let err = tokenize("{* for x in items: SELECT", "test.sql").unwrap_err();
    assert!(matches!(
        err,
        TemplateError::Unclosed { kind: UnclosedKind::Stmt, .. }
    ));
}

#[test]
fn test_nested_braces_dict_literal() {
    let tokens = lex(r#"{{ {"key": "value"} }}"#);
    assert_eq!(tokens.len(), 2);
    assert_eq!(tokens[0].kind, TokenKind::Expr);
    assert_eq!(tokens[0].value, r#"{"key": "value"}"#);
}

#[test]
fn test_deeply_nested_braces() {
    let tokens = lex(r#"{{ {"a": {"b": 1}} }}"#);
    assert_eq!(tokens[0].value, r#"{"a": {"b": 1}}"#);
}

#[test]
fn test_position_tracking() {
    let tokens = lex("line1\nline2\n{{ expr }}");
    let expr = &tokens[1];
    assert_eq!(expr.kind, TokenKind::Expr);
    assert_eq!(expr.pos.line, 3);
    assert_eq!(expr.pos.column, 1);
}

#[test]
fn test_mid_line_position() {
    let tokens = lex("SELECT {{ a }}");
    assert_eq!(tokens[1].pos.line, 1);
    assert_eq!(tokens[1].pos.column, 8);
}

#[test]
fn test_whitespace_trimming() {
    let cases = [
        ("{{  x  }}", "x"),
        ("{{x}}", "x"),
        ("{{  x + y  }}", "x + y"),
        ("{*  for x in y:  *}", "for x in y:"),
    ];
    for (input, expected) in cases {
        let tokens = lex(input);
        assert_eq!(tokens[0].value, expected, "input: {input}");
    }
}

#[test]
fn test_empty_expression() {
    let tokens = lex("{{ }}");
    assert_eq!(tokens[0].kind, TokenKind::Expr);
    assert_eq!(tokens[0].value, "");
}

#[test]
fn test_delimiters_inside_sql_comment_are_processed() {
    let tokens = lex("-- {{ a }}\nSELECT 1");
    assert_eq!(
        kinds(&tokens),
        vec![TokenKind::Text, TokenKind::Expr, TokenKind::Text, TokenKind::Eof]
    );
}

#[test]
fn test_complex_template_counts() {
    let input = r#"/*---
name: test
---*/

SELECT
{* for col in ["id", "name", "email"]: *}
    {{ col }},
{* endfor *}
{* if env == "prod": *}
    created_at
{* else: *}
    *
{* endif *}
FROM {{ target.schema }}.users"#;

    let tokens = lex(input);
    let exprs = tokens.iter().filter(|t| t.kind == TokenKind::Expr).count();
    let stmts = tokens.iter().filter(|t| t.kind == TokenKind::Stmt).count();
    assert_eq!(exprs, 2);
    assert_eq!(stmts, 5);
}

#[test]
fn test_roundtrip_with_delimiters_reattached() {
    let input = "SELECT {{a}} FROM {* if x *}t{* endif *}";
    let tokens = lex(input);
    let rebuilt: String = tokens
        .iter()
        .map(|t| match t.kind {
            TokenKind::Text => t.value.clone(),
            TokenKind::Expr => format!("{{{{{}}}}}", t.value),
            TokenKind::Stmt => format!("{{* {} *}}", t.value),
            TokenKind::Eof => String::new(),
        })
        .collect();
    assert_eq!(rebuilt, "SELECT {{a}} FROM {* if x *}t{* endif *}");
}
