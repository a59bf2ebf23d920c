//! Directive tokenizer for elastix parameter text.
//!
//! Parameter files are line-oriented collections of `(Key value ...)`
//! directives interleaved with `//` comments. The tokenizer walks the text once
//! and reports every directive with its byte span, so edits can be applied
//! without the prefix collisions of a plain substring search.

use std::ops::Range;

/// Whether a directive is live or sits behind a `//` comment marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveState {
    /// A directive the external tool will read.
    Active,
    /// A directive written as `// (Key value)`.
    Commented,
}

/// A single directive located in a parameter text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive<'a> {
    /// The directive key, e.g. `Metric`.
    pub key: &'a str,
    /// Byte span of the whole directive. For commented directives this starts
    /// at the `//` marker.
    pub span: Range<usize>,
    /// Byte span of the value part, between the key and the closing `)`.
    pub value_span: Range<usize>,
    /// Active or commented.
    pub state: DirectiveState,
}

impl<'a> Directive<'a> {
    /// Returns the raw value text with surrounding whitespace trimmed.
    pub fn raw_value(&self, text: &'a str) -> &'a str {
        text[self.value_span.clone()].trim()
    }

    /// Returns the value tokens with quotes removed.
    pub fn values(&self, text: &str) -> Vec<String> {
        split_values(&text[self.value_span.clone()])
    }
}

/// Scans `text` and returns every directive in order of appearance.
pub fn scan(text: &str) -> Vec<Directive<'_>> {
    let bytes = text.as_bytes();
    let mut directives = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                let line_end = line_end(bytes, i);
                let mut j = i + 2;
                while j < line_end && matches!(bytes[j], b' ' | b'\t') {
                    j += 1;
                }
                if j < line_end && bytes[j] == b'(' {
                    if let Some(parsed) = parse_directive(text, j, line_end) {
                        directives.push(Directive {
                            key: &text[parsed.key],
                            span: i..parsed.end,
                            value_span: parsed.value,
                            state: DirectiveState::Commented,
                        });
                    }
                }
                i = line_end;
            }
            b'(' => match parse_directive(text, i, bytes.len()) {
                Some(parsed) => {
                    directives.push(Directive {
                        key: &text[parsed.key],
                        span: i..parsed.end,
                        value_span: parsed.value,
                        state: DirectiveState::Active,
                    });
                    i = parsed.end;
                }
                None => i += 1,
            },
            _ => i += 1,
        }
    }

    directives
}

/// Returns the first directive for `key` in the given state.
pub fn find<'a>(text: &'a str, key: &str, state: DirectiveState) -> Option<Directive<'a>> {
    scan(text)
        .into_iter()
        .find(|d| d.key == key && d.state == state)
}

/// Splits a directive value into tokens. Double-quoted tokens keep their inner
/// whitespace and lose the quotes.
pub fn split_values(raw: &str) -> Vec<String> {
    let mut values = Vec::new();
    let mut chars = raw.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        let mut token = String::new();
        if c == '"' {
            chars.next();
            for c in chars.by_ref() {
                if c == '"' {
                    break;
                }
                token.push(c);
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                token.push(c);
                chars.next();
            }
        }
        values.push(token);
    }

    values
}

struct Parsed {
    key: Range<usize>,
    value: Range<usize>,
    end: usize,
}

fn line_end(bytes: &[u8], from: usize) -> usize {
    bytes[from..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(bytes.len(), |p| from + p)
}

/// Parses a directive starting at the `(` at `start`. The closing `)` must lie
/// before `limit` and outside double quotes.
fn parse_directive(text: &str, start: usize, limit: usize) -> Option<Parsed> {
    let bytes = text.as_bytes();
    let key_start = start + 1;
    let mut j = key_start;

    match bytes.get(j) {
        Some(b) if b.is_ascii_alphabetic() || *b == b'_' => {}
        _ => return None,
    }
    while j < limit && (bytes[j].is_ascii_alphanumeric() || bytes[j] == b'_') {
        j += 1;
    }
    let key_end = j;

    // The key must be followed by whitespace or `)`, otherwise `(Key` would
    // match a longer identifier.
    match bytes.get(j) {
        Some(b) if b.is_ascii_whitespace() || *b == b')' => {}
        _ => return None,
    }

    let mut in_quotes = false;
    while j < limit {
        match bytes[j] {
            b'"' => in_quotes = !in_quotes,
            b')' if !in_quotes => {
                return Some(Parsed {
                    key: key_start..key_end,
                    value: key_end..j,
                    end: j + 1,
                });
            }
            _ => {}
        }
        j += 1;
    }

    None
}
