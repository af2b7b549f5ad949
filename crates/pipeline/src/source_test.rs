//! Tests for the JSON-lines source

use super::*;

async fn collect(input: &'static [u8]) -> (SourceStats, Vec<EventRecord>) {
    let (tx, mut rx) = mpsc::channel(16);
    let stats = JsonLinesSource::new(input)
        .run(tx, CancellationToken::new())
        .await
        .unwrap();

    let mut records = Vec::new();
    while let Some(record) = rx.recv().await {
        records.push(record);
    }
    (stats, records)
}

#[tokio::test]
async fn test_reads_records_in_order() {
    let input = br#"{"event":"response","statusCode":200}
{"event":"response","statusCode":404,"source":{"remoteAddress":"1.1.1.1"}}
"#;
    let (stats, records) = collect(input).await;

    assert_eq!(stats.records_sent, 2);
    assert_eq!(records[0].status_code, Some(200));
    assert_eq!(records[1].status_code, Some(404));
    assert_eq!(records[1].source.remote_address.as_deref(), Some("1.1.1.1"));
}

#[tokio::test]
async fn test_last_line_without_newline() {
    let (stats, records) = collect(br#"{"event":"response"}"#).await;
    assert_eq!(stats.lines_read, 1);
    assert_eq!(records.len(), 1);
}

#[tokio::test]
async fn test_blank_and_malformed_lines_are_skipped() {
    let input = b"\n   \n{not json}\n{\"event\":\"response\"}\n\xff\xfe\n";
    let (stats, records) = collect(input).await;

    assert_eq!(stats.lines_read, 5);
    assert_eq!(stats.blank_lines, 2);
    assert_eq!(stats.malformed_lines, 2);
    assert_eq!(stats.records_sent, 1);
    assert_eq!(records.len(), 1);
}

#[tokio::test]
async fn test_mistyped_fields_do_not_drop_records() {
    let input = br#"{"event":"response","timestamp":"yesterday","statusCode":200}
{"event":"response","statusCode":"201"}
{"event":"response","timestamp":1736937045123.0}
["response",200]
"#;
    let (stats, records) = collect(input).await;

    assert_eq!(stats.records_sent, 3);
    assert_eq!(stats.malformed_lines, 1);
    assert!(records[0].timestamp.is_none());
    assert_eq!(records[0].status_code, Some(200));
    assert_eq!(records[1].status_code, Some(201));
    assert_eq!(
        records[2].timestamp.map(|t| t.timestamp_millis()),
        Some(1_736_937_045_123)
    );
}

#[tokio::test]
async fn test_stops_when_pipeline_closes() {
    let (tx, rx) = mpsc::channel(1);
    drop(rx);

    let stats = JsonLinesSource::new(&b"{\"event\":\"response\"}\n{\"event\":\"response\"}\n"[..])
        .run(tx, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(stats.records_sent, 0);
    assert_eq!(stats.lines_read, 1);
}

#[tokio::test]
async fn test_cancellation_stops_reading() {
    let (tx, _rx) = mpsc::channel(1);
    let cancel = CancellationToken::new();
    cancel.cancel();

    // A reader that never yields data
    let (_writer, reader) = tokio::io::duplex(64);
    let stats = JsonLinesSource::new(reader).run(tx, cancel).await.unwrap();
    assert_eq!(stats, SourceStats::default());
}
