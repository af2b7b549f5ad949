//! Pattern compiler
//!
//! Turns a format string into an immutable sequence of literal and directive
//! tokens, once, so rendering a record is a single pass over the tokens.
//!
//! Grammar of a directive: `%`, then optionally a `{...}` parameter (closed by
//! the first `}`, no line breaks) or a single `>` modifier, then exactly one
//! ASCII letter or `%`. A `%` that does not start a directive is literal
//! text. Compilation never fails.
//!
//! ```
//! use accesslog_format::{CompiledPattern, Token};
//!
//! let pattern = CompiledPattern::compile("Sent %>s to %h");
//! assert_eq!(pattern.tokens().len(), 4);
//! assert!(matches!(&pattern.tokens()[0], Token::Literal(text) if text == "Sent "));
//! ```

use std::sync::Arc;

use crate::directive::Directive;

/// Apache httpd "combined" log format
pub const COMBINED: &str = r#"%h %l %u %t "%r" %>s %b "%{Referer}i" "%{User-agent}i""#;

/// Named shorthands and their expansions
const SHORTHANDS: &[(&str, &str)] = &[("combined", COMBINED)];

/// Expand a shorthand name; anything else is returned unchanged
pub fn resolve_shorthand(format: &str) -> &str {
    SHORTHANDS
        .iter()
        .find(|(name, _)| *name == format)
        .map_or(format, |&(_, expansion)| expansion)
}

/// One segment of a compiled pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Text copied verbatim
    Literal(String),
    /// A matched directive code and its rule
    Directive { code: String, directive: Directive },
}

/// An immutable, cheaply clonable compiled pattern
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    /// Format string after shorthand expansion
    source: Arc<str>,
    tokens: Arc<[Token]>,
}

impl CompiledPattern {
    /// Compile a format string or shorthand name
    pub fn compile(format: &str) -> Self {
        let source = resolve_shorthand(format);
        Self {
            source: source.into(),
            tokens: tokenize(source).into(),
        }
    }

    /// Format string after shorthand expansion
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Directive codes the table has no rule for
    pub fn unknown_codes(&self) -> Vec<&str> {
        self.tokens
            .iter()
            .filter_map(|token| match token {
                Token::Directive { code, directive } if !directive.is_known() => {
                    Some(code.as_str())
                }
                _ => None,
            })
            .collect()
    }
}

impl Default for CompiledPattern {
    fn default() -> Self {
        Self::compile(COMBINED)
    }
}

fn tokenize(format: &str) -> Vec<Token> {
    let bytes = format.as_bytes();
    let mut tokens = Vec::new();
    let mut literal_start = 0;
    let mut pos = 0;

    while pos < bytes.len() {
        if bytes[pos] == b'%'
            && let Some(end) = match_directive(bytes, pos)
        {
            if literal_start < pos {
                tokens.push(Token::Literal(format[literal_start..pos].to_string()));
            }
            let code = &format[pos..end];
            tokens.push(Token::Directive {
                code: code.to_string(),
                directive: Directive::from_code(code),
            });
            pos = end;
            literal_start = end;
            continue;
        }
        pos += 1;
    }

    if literal_start < bytes.len() {
        tokens.push(Token::Literal(format[literal_start..].to_string()));
    }

    tokens
}

/// End offset of the directive starting at `start`, if one matches there
///
/// Every delimiter is ASCII, so returned offsets are char boundaries.
fn match_directive(bytes: &[u8], start: usize) -> Option<usize> {
    let mut pos = start + 1;

    match bytes.get(pos)? {
        b'{' => {
            let offset = bytes[pos + 1..]
                .iter()
                .position(|&b| matches!(b, b'}' | b'\n' | b'\r'))?;
            let close = pos + 1 + offset;
            if bytes[close] != b'}' {
                return None;
            }
            pos = close + 1;
        }
        b'>' => pos += 1,
        _ => {}
    }

    let terminator = *bytes.get(pos)?;
    (terminator.is_ascii_alphabetic() || terminator == b'%').then_some(pos + 1)
}

#[cfg(test)]
#[path = "pattern_test.rs"]
mod pattern_test;
