//! Record renderer
//!
//! Renders one [`EventRecord`] through a [`CompiledPattern`] into one line
//! plus the configured separator. Rendering is total: a directive without a
//! value renders as `-` and is reported back to the caller, never as an
//! error.

use crate::directive::Directive;
use crate::pattern::{CompiledPattern, Token};
use crate::record::EventRecord;

/// Default line terminator
pub const DEFAULT_SEPARATOR: &str = "\n";

/// Text substituted for a directive without a value
pub const FALLBACK: &str = "-";

/// Why a directive fell back to `-`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnresolvedReason {
    /// The code has no rule in the directive table
    UnknownDirective,
    /// The rule produced no value for this record
    MissingValue,
}

/// A directive that rendered as the fallback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unresolved<'p> {
    pub code: &'p str,
    pub reason: UnresolvedReason,
}

/// Renders records through a compiled pattern
#[derive(Debug, Clone)]
pub struct Renderer {
    pattern: CompiledPattern,
    separator: String,
}

impl Renderer {
    /// Create a renderer with the default `"\n"` separator
    pub fn new(pattern: CompiledPattern) -> Self {
        Self {
            pattern,
            separator: DEFAULT_SEPARATOR.to_string(),
        }
    }

    #[must_use]
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn pattern(&self) -> &CompiledPattern {
        &self.pattern
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Render `record` into `buf`, replacing its contents
    ///
    /// Directives that fell back to `-` are appended to `unresolved`.
    pub fn render_into<'p>(
        &'p self,
        record: &EventRecord,
        buf: &mut String,
        unresolved: &mut Vec<Unresolved<'p>>,
    ) {
        buf.clear();

        for token in self.pattern.tokens() {
            match token {
                Token::Literal(text) => buf.push_str(text),
                Token::Directive { code, directive } => {
                    match directive.render(record) {
                        Some(value) if !value.is_empty() => buf.push_str(&value),
                        _ => {
                            buf.push_str(FALLBACK);
                            unresolved.push(Unresolved {
                                code: code.as_str(),
                                reason: reason_for(directive),
                            });
                        }
                    }
                }
            }
        }

        buf.push_str(&self.separator);
    }

    /// Render `record` into a new string, discarding diagnostics
    pub fn render(&self, record: &EventRecord) -> String {
        let mut buf = String::with_capacity(256);
        let mut unresolved = Vec::new();
        self.render_into(record, &mut buf, &mut unresolved);
        buf
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(CompiledPattern::default())
    }
}

fn reason_for(directive: &Directive) -> UnresolvedReason {
    if directive.is_known() {
        UnresolvedReason::MissingValue
    } else {
        UnresolvedReason::UnknownDirective
    }
}

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;
