use super::*;
use crate::record::{Payload, SubEvent};
use chrono::{DateTime, FixedOffset};

fn sample_time() -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339("2025-01-15T10:30:45+00:00").unwrap()
}

fn renderer(format: &str) -> Renderer {
    Renderer::new(CompiledPattern::compile(format))
}

// =============================================================================
// Literal patterns
// =============================================================================

#[test]
fn test_literal_pattern_ignores_record_content() {
    let renderer = renderer("x");
    let records = [
        EventRecord::response(),
        EventRecord::response()
            .with_status(500)
            .with_remote_address("10.0.0.1")
            .with_payload(Payload::Text("body".into())),
        EventRecord::new("tail"),
    ];
    for record in &records {
        assert_eq!(renderer.render(record), "x\n");
    }
}

#[test]
fn test_separator_is_configurable() {
    let renderer = renderer("x").with_separator("\r\n");
    assert_eq!(renderer.separator(), "\r\n");
    assert_eq!(renderer.render(&EventRecord::response()), "x\r\n");
}

#[test]
fn test_empty_separator() {
    let renderer = renderer("%s").with_separator("");
    assert_eq!(renderer.render(&EventRecord::response().with_status(204)), "204");
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn test_combined_scenario() {
    let record = EventRecord::response()
        .with_remote_address("1.1.1.1")
        .with_method("GET")
        .with_path("/x")
        .with_status(200)
        .with_timestamp(sample_time());

    assert_eq!(
        Renderer::default().render(&record),
        "1.1.1.1 - - [15/Jan/2025:10:30:45 +0000] \"GET /x HTTP/1.1\" 200 - \"-\" \"-\"\n"
    );
}

#[test]
fn test_combined_full_record() {
    let record = EventRecord::response()
        .with_remote_address("192.168.1.100")
        .with_method("post")
        .with_path("/api/items")
        .with_sub_event(SubEvent::received("/api/items?draft=1"))
        .with_status(201)
        .with_payload(Payload::Structured(serde_json::json!({"id": 7})))
        .with_referer("http://example.com/new")
        .with_user_agent("curl/8.5.0")
        .with_timestamp(sample_time());

    assert_eq!(
        Renderer::default().render(&record),
        "192.168.1.100 - - [15/Jan/2025:10:30:45 +0000] \"POST /api/items?draft=1 HTTP/1.1\" 201 8 \"http://example.com/new\" \"curl/8.5.0\"\n"
    );
}

#[test]
fn test_custom_pattern_scenario() {
    let renderer = renderer("Sent %s to %h").with_separator("\r\n");
    let first = EventRecord::response()
        .with_status(201)
        .with_remote_address("1.1.1.1");
    let second = EventRecord::response()
        .with_status(202)
        .with_remote_address("2.2.2.2");

    let output = renderer.render(&first) + &renderer.render(&second);
    assert_eq!(output, "Sent 201 to 1.1.1.1\r\nSent 202 to 2.2.2.2\r\n");
}

#[test]
fn test_referer_arrow_pattern() {
    let renderer = renderer("%{Referer}i -> %h");
    let without = EventRecord::response().with_remote_address("a");
    let with = EventRecord::response()
        .with_remote_address("b")
        .with_referer("http://localhost/2");
    assert_eq!(renderer.render(&without), "- -> a\n");
    assert_eq!(renderer.render(&with), "http://localhost/2 -> b\n");
}

// =============================================================================
// Fallbacks and diagnostics
// =============================================================================

#[test]
fn test_missing_fields_fall_back_without_blocking_line() {
    let renderer = renderer("[%h|%t|%r|%s|%b|%{Referer}i|%{User-agent}i] end");
    assert_eq!(
        renderer.render(&EventRecord::response()),
        "[-|-|-|-|-|-|-] end\n"
    );
}

#[test]
fn test_empty_values_fall_back() {
    let renderer = renderer("%{Referer}i %h");
    let record = EventRecord::response()
        .with_referer("")
        .with_remote_address("");
    assert_eq!(renderer.render(&record), "- -\n");
}

#[test]
fn test_unresolved_reported_with_reason() {
    let renderer = renderer("%h %U %s %{Host}i");
    let record = EventRecord::response().with_status(200);
    let mut buf = String::new();
    let mut unresolved = Vec::new();

    renderer.render_into(&record, &mut buf, &mut unresolved);

    assert_eq!(buf, "- - 200 -\n");
    assert_eq!(
        unresolved,
        vec![
            Unresolved {
                code: "%h",
                reason: UnresolvedReason::MissingValue
            },
            Unresolved {
                code: "%U",
                reason: UnresolvedReason::UnknownDirective
            },
            Unresolved {
                code: "%{Host}i",
                reason: UnresolvedReason::UnknownDirective
            },
        ]
    );
}

#[test]
fn test_render_into_reuses_buffer() {
    let renderer = renderer("%s");
    let mut buf = String::from("stale content");
    let mut unresolved = Vec::new();

    renderer.render_into(&EventRecord::response().with_status(404), &mut buf, &mut unresolved);
    assert_eq!(buf, "404\n");
    assert!(unresolved.is_empty());
}

#[test]
fn test_constant_directives_are_not_reported() {
    let renderer = renderer("%l %u %%");
    let mut buf = String::new();
    let mut unresolved = Vec::new();
    renderer.render_into(&EventRecord::response(), &mut buf, &mut unresolved);
    assert_eq!(buf, "- - %\n");
    assert!(unresolved.is_empty());
}
