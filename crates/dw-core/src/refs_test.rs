use super::*;

fn harvest(body: &str) -> Vec<String> {
    harvest_refs(body).into_iter().collect()
}

#[test]
fn test_double_quoted_ref() {
    assert_eq!(harvest(r#"SELECT * FROM {{ ref("stg_orders") }}"#), vec!["stg_orders"]);
}

#[test]
fn test_single_quoted_ref() {
    assert_eq!(harvest("SELECT * FROM {{ ref('stg_orders') }}"), vec!["stg_orders"]);
}

#[test]
fn test_qualified_ref() {
    assert_eq!(
        harvest(r#"{{ ref("staging.stg_orders") }}"#),
        vec!["staging.stg_orders"]
    );
}

#[test]
fn test_multiple_refs_deduped() {
    let body = r#"
SELECT * FROM {{ ref("a") }}
JOIN {{ ref("b") }} USING (id)
JOIN {{ ref("a") }} other USING (id)
"#;
    assert_eq!(harvest(body), vec!["a", "b"]);
}

#[test]
fn test_ref_in_line_comment_ignored() {
    let body = "-- uses ref(\"old_model\")\nSELECT * FROM {{ ref(\"current\") }}";
    assert_eq!(harvest(body), vec!["current"]);
}

#[test]
fn test_ref_in_block_comment_ignored() {
    let body = "/* ref(\"old\") was here */ SELECT * FROM {{ ref(\"live\") }}";
    assert_eq!(harvest(body), vec!["live"]);
}

#[test]
fn test_ref_in_string_literal_ignored() {
    let body = "SELECT 'call ref(\"nope\") later' AS note FROM {{ ref(\"yes\") }}";
    assert_eq!(harvest(body), vec!["yes"]);
}

#[test]
fn test_escaped_quote_in_string() {
    let body = "SELECT 'it''s ref(\"nope\")' FROM {{ ref(\"yes\") }}";
    assert_eq!(harvest(body), vec!["yes"]);
}

#[test]
fn test_ref_with_spaces() {
    assert_eq!(harvest(r#"{{ ref( "orders" ) }}"#), vec!["orders"]);
}

#[test]
fn test_not_a_ref_identifier() {
    assert!(harvest(r#"SELECT prefref("x"), xref("y") FROM t"#).is_empty());
}

#[test]
fn test_dynamic_ref_not_harvested() {
    // computed arguments are invisible to the fast pass (and rejected at render)
    assert!(harvest(r#"{{ ref("stg_" + suffix) }}"#).is_empty());
    assert!(harvest(r#"{{ ref(name) }}"#).is_empty());
}

#[test]
fn test_invalid_name_grammar_rejected() {
    assert!(harvest(r#"{{ ref("9starts_with_digit") }}"#).is_empty());
    assert!(harvest(r#"{{ ref("has space") }}"#).is_empty());
}

#[test]
fn test_empty_body() {
    assert!(harvest("").is_empty());
}
