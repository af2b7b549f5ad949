use super::*;
use crate::directive::Header;

fn literal(text: &str) -> Token {
    Token::Literal(text.to_string())
}

fn directive(code: &str) -> Token {
    Token::Directive {
        code: code.to_string(),
        directive: Directive::from_code(code),
    }
}

// =============================================================================
// Shorthands
// =============================================================================

#[test]
fn test_combined_shorthand_expands() {
    let pattern = CompiledPattern::compile("combined");
    assert_eq!(pattern.source(), COMBINED);
    assert_eq!(
        pattern.tokens(),
        &[
            directive("%h"),
            literal(" "),
            directive("%l"),
            literal(" "),
            directive("%u"),
            literal(" "),
            directive("%t"),
            literal(" \""),
            directive("%r"),
            literal("\" "),
            directive("%>s"),
            literal(" "),
            directive("%b"),
            literal(" \""),
            directive("%{Referer}i"),
            literal("\" \""),
            directive("%{User-agent}i"),
            literal("\""),
        ]
    );
    assert!(pattern.unknown_codes().is_empty());
}

#[test]
fn test_unknown_shorthand_is_literal_pattern() {
    for name in ["common", "referer", "Combined", "combined "] {
        let pattern = CompiledPattern::compile(name);
        assert_eq!(pattern.source(), name);
        assert_eq!(pattern.tokens(), &[literal(name)]);
    }
}

#[test]
fn test_default_is_combined() {
    assert_eq!(CompiledPattern::default().source(), COMBINED);
}

// =============================================================================
// Tokenizer
// =============================================================================

#[test]
fn test_no_directives_is_single_literal() {
    let pattern = CompiledPattern::compile("just text, \"quoted\"  ");
    assert_eq!(pattern.tokens(), &[literal("just text, \"quoted\"  ")]);
}

#[test]
fn test_empty_pattern_has_no_tokens() {
    assert!(CompiledPattern::compile("").tokens().is_empty());
}

#[test]
fn test_custom_pattern() {
    let pattern = CompiledPattern::compile("Sent %s to %h");
    assert_eq!(
        pattern.tokens(),
        &[
            literal("Sent "),
            directive("%s"),
            literal(" to "),
            directive("%h"),
        ]
    );
}

#[test]
fn test_adjacent_directives() {
    let pattern = CompiledPattern::compile("%h%%%s");
    assert_eq!(
        pattern.tokens(),
        &[directive("%h"), directive("%%"), directive("%s")]
    );
}

#[test]
fn test_unmatched_percent_is_literal() {
    // '%' followed by a non-letter, a dangling brace, a bare '>' and a trailing '%'
    let pattern = CompiledPattern::compile("100% 5%1 %{open %> %");
    assert_eq!(pattern.tokens(), &[literal("100% 5%1 %{open %> %")]);
}

#[test]
fn test_brace_parameter_stops_at_first_close() {
    let pattern = CompiledPattern::compile("%{a}b}i");
    assert_eq!(pattern.tokens(), &[directive("%{a}b"), literal("}i")]);
}

#[test]
fn test_brace_parameter_cannot_span_lines() {
    let pattern = CompiledPattern::compile("%{Ref\nerer}i");
    assert_eq!(pattern.tokens(), &[literal("%{Ref\nerer}i")]);
}

#[test]
fn test_brace_parameter_keeps_any_characters() {
    let pattern = CompiledPattern::compile("[%{X-Forwarded-For: a b}i]");
    assert_eq!(
        pattern.tokens(),
        &[
            literal("["),
            directive("%{X-Forwarded-For: a b}i"),
            literal("]"),
        ]
    );
}

#[test]
fn test_unknown_codes_are_compiled_not_rejected() {
    let pattern = CompiledPattern::compile("%h %U %{Host}i %>s");
    assert_eq!(pattern.unknown_codes(), vec!["%U", "%{Host}i"]);
}

#[test]
fn test_multibyte_literals_preserved() {
    let pattern = CompiledPattern::compile("→ %h ✓");
    assert_eq!(
        pattern.tokens(),
        &[literal("→ "), directive("%h"), literal(" ✓")]
    );
}

#[test]
fn test_header_directive_resolved_at_compile() {
    let pattern = CompiledPattern::compile("%{referer}i");
    assert_eq!(
        pattern.tokens(),
        &[Token::Directive {
            code: "%{referer}i".into(),
            directive: Directive::RequestHeader(Header::Referer),
        }]
    );
}

#[test]
fn test_compiling_twice_is_identical() {
    let a = CompiledPattern::compile("combined");
    let b = CompiledPattern::compile("combined");
    assert_eq!(a.tokens(), b.tokens());
}
