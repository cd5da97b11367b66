// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn exit_class_code() {
    assert_eq!(ExitClass::Exited(0).code(), Some(0));
    assert_eq!(ExitClass::Exited(137).code(), Some(137));
    assert_eq!(ExitClass::Timeout.code(), None);
    assert_eq!(ExitClass::Cancelled.code(), None);
}

#[test]
fn exit_class_success() {
    assert!(ExitClass::Exited(0).is_success());
    assert!(!ExitClass::Exited(1).is_success());
    assert!(!ExitClass::Timeout.is_success());
}

#[test]
fn exit_class_display() {
    assert_eq!(ExitClass::Exited(2).to_string(), "exited(2)");
    assert_eq!(ExitClass::Timeout.to_string(), "timeout");
    assert_eq!(ExitClass::Cancelled.to_string(), "cancelled");
    assert_eq!(ExitClass::Error("oops".to_string()).to_string(), "error: oops");
}

#[test]
fn tail_keeps_everything_under_limit() {
    let mut tail = OutputTail::new(32);
    tail.push(&ExecChunk::Stdout("hello ".to_string()));
    tail.push(&ExecChunk::Stderr("world".to_string()));
    assert_eq!(tail.as_str(), "hello world");
    assert!(!tail.is_truncated());
}

#[test]
fn tail_drops_from_the_front() {
    let mut tail = OutputTail::new(8);
    tail.push(&ExecChunk::Stdout("0123456789".to_string()));
    assert_eq!(tail.as_str(), "23456789");
    assert!(tail.is_truncated());

    tail.push(&ExecChunk::Stdout("ab".to_string()));
    assert_eq!(tail.as_str(), "456789ab");
}

#[test]
fn tail_respects_char_boundaries() {
    let mut tail = OutputTail::new(4);
    // Multi-byte chars force the cut point forward to a boundary
    tail.push(&ExecChunk::Stdout("ééé".to_string()));
    assert!(tail.as_str().chars().all(|c| c == 'é'));
}

#[test]
fn result_serde_round_trip() {
    let mut tail = OutputTail::new(64);
    tail.push(&ExecChunk::Stdout("ok\n".to_string()));
    let result =
        ExecutionResult { class: ExitClass::Exited(0), tail, duration_ms: 42 };
    let json = serde_json::to_string(&result).unwrap();
    let parsed: ExecutionResult = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, result);
    assert!(parsed.is_success());
}
