//! Fast-pass frontmatter scanner.
//!
//! Extracts the `/*--- … ---*/` header from a model file without touching the
//! SQL body. The header body is YAML; the scan stops at the closing delimiter
//! and everything after it is retained verbatim as the raw template body.

use crate::error::{truncate_for_error, CoreError, CoreResult};
use crate::model::ModelConfig;

const OPEN: &str = "/*---";
const CLOSE: &str = "---*/";

/// Result of scanning one model file's head.
#[derive(Debug, Clone)]
pub struct HeaderScan {
    /// Parsed frontmatter; default when the file has no header.
    pub config: ModelConfig,
    /// Everything after the closing delimiter (the whole file when no header).
    pub body: String,
    /// Lines consumed by the header, for downstream error positions.
    pub body_line_offset: usize,
}

/// Scan a model source for a frontmatter header.
///
/// The header must be the first non-whitespace content of the file. A file
/// without a header yields a default config and the unmodified source.
pub fn scan_header(file: &str, source: &str) -> CoreResult<HeaderScan> {
    let lead_len = source.len() - source.trim_start().len();
    let trimmed = &source[lead_len..];

    if !trimmed.starts_with(OPEN) {
        return Ok(HeaderScan {
            config: ModelConfig::default(),
            body: source.to_string(),
            body_line_offset: 0,
        });
    }

    let open_line = 1 + line_count(&source[..lead_len]);
    let yaml_start = lead_len + OPEN.len();
    let close_rel = source[yaml_start..].find(CLOSE).ok_or_else(|| CoreError::BadHeader {
        file: file.to_string(),
        line: open_line,
        message: format!("missing closing '{CLOSE}' delimiter"),
    })?;

    let yaml_body = &source[yaml_start..yaml_start + close_rel];
    let body_start = yaml_start + close_rel + CLOSE.len();

    if yaml_body.trim().is_empty() {
        return Ok(HeaderScan {
            config: ModelConfig::default(),
            body: source[body_start..].to_string(),
            body_line_offset: line_count(&source[..body_start]),
        });
    }

    let config: ModelConfig = serde_yaml::from_str(yaml_body).map_err(|e| {
        let yaml_line = e.location().map(|l| l.line()).unwrap_or(0);
        CoreError::BadHeader {
            file: file.to_string(),
            line: open_line + yaml_line,
            message: truncate_for_error(&e.to_string()),
        }
    })?;

    Ok(HeaderScan {
        config,
        body: source[body_start..].to_string(),
        body_line_offset: line_count(&source[..body_start]),
    })
}

fn line_count(s: &str) -> usize {
    s.bytes().filter(|b| *b == b'\n').count()
}

#[cfg(test)]
#[path = "header_test.rs"]
mod tests;
