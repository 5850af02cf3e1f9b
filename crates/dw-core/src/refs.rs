//! Textual `ref()` harvester (fast pass).
//!
//! Recovers reference edges from a model body by recognizing `ref("name")` /
//! `ref('name')` invocations with static string-literal arguments.
//! Occurrences inside SQL line comments, block comments, and string literals
//! are ignored. Full template evaluation is deferred to the build pass; the
//! render-time `ref` rejects any name this pass did not see.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

static REF_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_.]*$").expect("ref name regex"));

/// Harvest the deduped set of referenced names from a raw model body.
pub fn harvest_refs(body: &str) -> BTreeSet<String> {
    let bytes = body.as_bytes();
    let mut refs = BTreeSet::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                // line comment
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                // block comment
                i += 2;
                while i < bytes.len() && !(bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/')) {
                    i += 1;
                }
                i = (i + 2).min(bytes.len());
            }
            b'\'' => {
                // string literal, '' escapes a quote
                i += 1;
                while i < bytes.len() {
                    if bytes[i] == b'\'' {
                        if bytes.get(i + 1) == Some(&b'\'') {
                            i += 2;
                            continue;
                        }
                        i += 1;
                        break;
                    }
                    i += 1;
                }
            }
            b'r' if is_ref_keyword(bytes, i) => {
                if let Some((name, next)) = match_ref_call(body, i + 3) {
                    refs.insert(name);
                    i = next;
                } else {
                    i += 3;
                }
            }
            _ => i += 1,
        }
    }

    refs
}

/// `ref` at position `i`, not embedded in a longer identifier.
fn is_ref_keyword(bytes: &[u8], i: usize) -> bool {
    if !bytes[i..].starts_with(b"ref") {
        return false;
    }
    let before_ok = i == 0 || !is_ident_byte(bytes[i - 1]);
    let after = bytes.get(i + 3).copied();
    let after_ok = !after.is_some_and(is_ident_byte);
    before_ok && after_ok
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Try to match `( "<name>" )` starting at byte offset `pos` (just past `ref`).
///
/// Returns the captured name and the offset just past the closing paren.
fn match_ref_call(body: &str, pos: usize) -> Option<(String, usize)> {
    let bytes = body.as_bytes();
    let mut i = skip_spaces(bytes, pos);
    if bytes.get(i) != Some(&b'(') {
        return None;
    }
    i = skip_spaces(bytes, i + 1);
    let quote = *bytes.get(i)?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }
    i += 1;
    let start = i;
    while i < bytes.len() && bytes[i] != quote {
        i += 1;
    }
    if i >= bytes.len() {
        return None;
    }
    let name = &body[start..i];
    i = skip_spaces(bytes, i + 1);
    if bytes.get(i) != Some(&b')') {
        return None;
    }
    if !REF_NAME.is_match(name) {
        return None;
    }
    Some((name.to_string(), i + 1))
}

fn skip_spaces(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && (bytes[i] == b' ' || bytes[i] == b'\t') {
        i += 1;
    }
    i
}

#[cfg(test)]
#[path = "refs_test.rs"]
mod tests;
