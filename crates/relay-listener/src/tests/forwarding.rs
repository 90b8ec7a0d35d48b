//! Filter dispatch and forwarding behavior.
//!
//! Covers:
//! - accepted message: exactly one forward, then the cursor write
//! - rejected message: zero forwards, cursor still written
//! - the forwarded payload carries the full header and body

use super::harness::{frame, frame_with_extra, FilterOutcome, TestHarness};
use std::collections::BTreeMap;
use std::time::Duration;

#[tokio::test]
async fn accepted_message_forwards_once_then_persists_cursor() {
    let harness = TestHarness::start().await;
    harness.connect().await;

    harness.filter.queue(FilterOutcome::Accept);
    harness.server.send_binary(frame("#commit", 1, 42));

    // forward:start, forward:end, cursor
    assert!(harness.wait_for_events(3, Duration::from_secs(2)).await);

    assert_eq!(
        harness.events(),
        vec!["forward:start:42", "forward:end:42", "cursor:42"]
    );
    assert_eq!(harness.sink.sent_count(), 1);
    assert_eq!(harness.store.value("seq"), Some("42".to_string()));
}

#[tokio::test]
async fn rejected_message_skips_forward_but_persists_cursor() {
    let harness = TestHarness::start().await;
    harness.connect().await;

    harness.filter.queue(FilterOutcome::Reject);
    harness.server.send_binary(frame("#commit", 1, 43));

    assert!(harness.wait_for_events(1, Duration::from_secs(2)).await);

    assert_eq!(harness.events(), vec!["cursor:43"]);
    assert_eq!(harness.sink.sent_count(), 0);
    assert_eq!(harness.store.value("seq"), Some("43".to_string()));
}

#[tokio::test]
async fn forwarded_payload_carries_header_and_full_body() {
    let harness = TestHarness::start().await;
    harness.connect().await;

    let mut extra = BTreeMap::new();
    extra.insert(
        "repo".to_string(),
        ciborium::value::Value::Text("did:plc:abc".into()),
    );
    harness
        .server
        .send_binary(frame_with_extra("#commit", 1, 9, extra));

    assert!(harness.wait_for_events(3, Duration::from_secs(2)).await);

    let sent = harness.sink.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["header"]["t"], "#commit");
    assert_eq!(sent[0]["header"]["op"], 1);
    assert_eq!(sent[0]["body"]["seq"], 9);
    assert_eq!(sent[0]["body"]["repo"], "did:plc:abc");
}

#[tokio::test]
async fn mixed_outcomes_keep_cursor_current() {
    let harness = TestHarness::start().await;
    harness.connect().await;

    harness.filter.queue(FilterOutcome::Accept);
    harness.filter.queue(FilterOutcome::Reject);
    harness.filter.queue(FilterOutcome::Accept);

    harness.server.send_binary(frame("#commit", 1, 10));
    harness.server.send_binary(frame("#identity", 1, 11));
    harness.server.send_binary(frame("#commit", 1, 12));

    // 3 + 1 + 3 log entries
    assert!(harness.wait_for_events(7, Duration::from_secs(2)).await);

    assert_eq!(harness.sink.sent_count(), 2);
    assert_eq!(harness.store.value("seq"), Some("12".to_string()));
}
