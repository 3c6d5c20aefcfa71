// tests/output_lines.rs
mod common;
use crate::common::init_tracing;

use proptest::prelude::*;
use tokio::sync::mpsc;

use winedeck::exec::{LineSplitter, OutputEvent, pump_lines};

fn split_all(input: &[u8]) -> Vec<String> {
    let mut splitter = LineSplitter::new();
    let mut lines = splitter.push(input);
    lines.extend(splitter.finish());
    lines
}

#[test]
fn carriage_return_progress_yields_one_line_per_update() {
    init_tracing();

    assert_eq!(split_all(b"50% \r60% \r70%\n"), vec!["50%", "60%", "70%"]);
}

#[test]
fn blank_lines_and_crlf_pairs_are_suppressed() {
    assert_eq!(
        split_all(b"first\r\n\r\n   \nsecond\r\n"),
        vec!["first", "second"]
    );
}

#[test]
fn trailing_line_without_terminator_is_flushed_on_finish() {
    let mut splitter = LineSplitter::new();
    assert!(splitter.push(b"no newline yet").is_empty());
    assert_eq!(splitter.finish().as_deref(), Some("no newline yet"));
    assert_eq!(splitter.finish(), None);
}

#[test]
fn invalid_utf8_is_skipped_without_dropping_the_line() {
    init_tracing();

    assert_eq!(split_all(b"ok \xff\xfebytes\n"), vec!["ok bytes"]);
}

#[test]
fn multibyte_character_split_across_chunks_survives() {
    let mut splitter = LineSplitter::new();
    let text = "caf\u{e9} 100%\n".as_bytes();
    // Cut in the middle of the two-byte `é`.
    let (a, b) = text.split_at(4);
    assert!(splitter.push(a).is_empty());
    assert_eq!(splitter.push(b), vec!["caf\u{e9} 100%"]);
}

#[tokio::test]
async fn pump_tags_lines_with_their_channel() {
    let (tx, mut rx) = mpsc::channel(16);
    let forwarded = pump_lines(&b"warn: a\rwarn: b\n"[..], true, tx).await;
    assert_eq!(forwarded, 2);

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    assert_eq!(
        events,
        vec![
            OutputEvent::Line {
                text: "warn: a".to_string(),
                is_error: true
            },
            OutputEvent::Line {
                text: "warn: b".to_string(),
                is_error: true
            },
        ]
    );
}

proptest! {
    /// However the stream is chunked, the same lines come out.
    #[test]
    fn chunking_does_not_change_lines(
        parts in proptest::collection::vec("[a-z0-9% ]{0,6}", 1..12),
        seps in proptest::collection::vec(prop_oneof![Just("\r"), Just("\n"), Just("\r\n")], 12),
        cuts in proptest::collection::vec(1usize..8, 1..20),
    ) {
        let mut input = Vec::new();
        for (i, part) in parts.iter().enumerate() {
            input.extend_from_slice(part.as_bytes());
            input.extend_from_slice(seps[i % seps.len()].as_bytes());
        }

        let expected = split_all(&input);

        let mut splitter = LineSplitter::new();
        let mut got = Vec::new();
        let mut rest = &input[..];
        let mut i = 0;
        while !rest.is_empty() {
            let n = cuts[i % cuts.len()].min(rest.len());
            got.extend(splitter.push(&rest[..n]));
            rest = &rest[n..];
            i += 1;
        }
        got.extend(splitter.finish());

        prop_assert_eq!(got, expected);
    }
}
