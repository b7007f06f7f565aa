//! Line-level lexing of the commented header block.
//!
//! The lexer knows nothing about grammar variants: it classifies each line
//! up to and including the `[DATA]` marker and reports where the data
//! section begins. Section ordering and attribute semantics are checked by
//! the builder.

use crate::constants::{COMMENT_MARKER, FORMAT_BANNER_TOKENS, KEY_VALUE_SEPARATOR, sections};
use crate::error::{NeadError, Result};
use tracing::debug;

/// Classification of one header line
#[derive(Debug, Clone, PartialEq)]
pub enum LexedLine {
    FormatDeclaration(String),
    SectionMarker(String),
    BlankLine,
    KeyValue { key: String, value: String },
    CommentNoise,
}

/// A lexed line with its 1-based line number
#[derive(Debug, Clone, PartialEq)]
pub struct LexedItem {
    pub line: usize,
    pub kind: LexedLine,
}

/// Output of [`lex_header`]
#[derive(Debug, Clone)]
pub struct HeaderScan {
    pub items: Vec<LexedItem>,
    /// Index into the input lines of the first line after `[DATA]`
    pub data_start: usize,
}

impl HeaderScan {
    /// Key/value items in file order
    pub fn key_values(&self) -> impl Iterator<Item = (usize, &str, &str)> {
        self.items.iter().filter_map(|item| match &item.kind {
            LexedLine::KeyValue { key, value } => Some((item.line, key.as_str(), value.as_str())),
            _ => None,
        })
    }
}

/// Lex header lines up to the data marker
pub fn lex_header(lines: &[&str]) -> Result<HeaderScan> {
    let first = lines
        .first()
        .ok_or_else(|| NeadError::malformed_header(1, "file is empty"))?;
    let banner = lex_banner(first)?;

    let mut items = vec![LexedItem {
        line: 1,
        kind: LexedLine::FormatDeclaration(banner),
    }];

    for (offset, raw) in lines.iter().enumerate().skip(1) {
        let line = offset + 1;
        let kind = lex_line(line, raw)?;

        if matches!(&kind, LexedLine::SectionMarker(name) if name == sections::DATA) {
            items.push(LexedItem { line, kind });
            debug!("Header lexed: {} lines, data starts at line {}", line, line + 1);
            return Ok(HeaderScan {
                items,
                data_start: offset + 1,
            });
        }

        items.push(LexedItem { line, kind });
    }

    Err(NeadError::malformed_header(
        lines.len(),
        format!("no [{}] marker found", sections::DATA),
    ))
}

/// Check line 1 against the banner, token by token
fn lex_banner(raw: &str) -> Result<String> {
    let content = raw
        .trim_end()
        .strip_prefix(COMMENT_MARKER)
        .ok_or_else(|| NeadError::malformed_header(1, "first line is not a comment"))?;

    let tokens: Vec<&str> = content.split_whitespace().collect();
    if tokens != FORMAT_BANNER_TOKENS {
        return Err(NeadError::malformed_header(
            1,
            format!(
                "expected format banner '{}', found '{}'",
                FORMAT_BANNER_TOKENS.join(" "),
                content.trim()
            ),
        ));
    }
    Ok(tokens.join(" "))
}

fn lex_line(line: usize, raw: &str) -> Result<LexedLine> {
    if raw.trim().is_empty() {
        return Ok(LexedLine::BlankLine);
    }

    let content = raw
        .trim_start()
        .strip_prefix(COMMENT_MARKER)
        .ok_or_else(|| {
            NeadError::malformed_header(line, "header line does not start with a comment marker")
        })?
        .trim();

    // `#`, `# #`, `##`, `## free text`
    if content.is_empty() || content.starts_with(COMMENT_MARKER) {
        return Ok(LexedLine::CommentNoise);
    }

    if let Some(name) = content
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
    {
        return Ok(LexedLine::SectionMarker(name.trim().to_string()));
    }

    let (key, value) = content.split_once(KEY_VALUE_SEPARATOR).ok_or_else(|| {
        NeadError::malformed_header(line, format!("expected 'key = value', found '{}'", content))
    })?;

    let key = key.trim();
    if key.is_empty() {
        return Err(NeadError::malformed_header(line, "attribute has an empty key"));
    }

    Ok(LexedLine::KeyValue {
        key: key.to_string(),
        value: value.trim().to_string(),
    })
}
