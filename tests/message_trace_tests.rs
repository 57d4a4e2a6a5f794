//! Integration tests for message trace derivation

mod utils;

use flowtrace::config::ReconstructionConfig;
use flowtrace::message_trace::{Message, MessageTrace};
use flowtrace::reconstruction::{TraceOutcome, TraceReconstructor};
use utils::{balanced_chain, siblings, TraceBuilder};

fn messages(outcome: &TraceOutcome) -> &MessageTrace {
    outcome.message_trace().expect("message trace")
}

fn describe(message: &Message) -> String {
    format!(
        "{} {}->{}",
        if message.is_call() { "call" } else { "reply" },
        message.sender().operation.signature.name,
        message.receiver().operation.signature.name
    )
}

#[test]
fn test_chain_has_two_calls_in_pre_order() {
    let reconstructor = TraceReconstructor::new(ReconstructionConfig::default());
    let outcome = reconstructor.reconstruct(balanced_chain(1));
    let trace = messages(&outcome);

    let calls: Vec<String> = trace.call_messages().map(describe).collect();
    assert_eq!(calls, vec!["call $->b", "call b->c"]);

    let root = trace.call_messages().next().unwrap().sender();
    assert!(root.is_root());
    assert_eq!(root.eoi, -1);
    assert_eq!(root.ess, -1);
}

#[test]
fn test_replies_follow_calls() {
    let reconstructor = TraceReconstructor::new(ReconstructionConfig::default());
    let outcome = reconstructor.reconstruct(siblings(2));
    let all: Vec<String> = messages(&outcome).messages().iter().map(describe).collect();
    assert_eq!(
        all,
        vec![
            "call $->a",
            "call a->b",
            "reply b->a",
            "call a->c",
            "reply c->a",
            "reply a->$",
        ]
    );
}

#[test]
fn test_message_timestamps_are_entry_and_exit_times() {
    let reconstructor = TraceReconstructor::new(ReconstructionConfig::default());
    let outcome = reconstructor.reconstruct(balanced_chain(3));
    let trace = messages(&outcome);

    for message in trace.messages() {
        match message {
            Message::Call {
                timestamp,
                receiver,
                ..
            } => assert_eq!(*timestamp, receiver.entry_time),
            Message::Reply {
                timestamp, sender, ..
            } => assert_eq!(*timestamp, sender.exit_time),
        }
    }
    assert_eq!(trace.trace_id(), 3);
    assert_eq!(trace.session_id(), "session-1");
}

#[test]
fn test_every_execution_called_once() {
    let reconstructor = TraceReconstructor::new(ReconstructionConfig::default());
    let outcome = reconstructor.reconstruct(siblings(4));
    let executions = outcome.execution_trace().unwrap();
    let trace = messages(&outcome);

    assert_eq!(trace.len(), executions.len() * 2);
    let receivers: Vec<i32> = trace.call_messages().map(|m| m.receiver().eoi).collect();
    let eois: Vec<i32> = executions.iter().map(|e| e.eoi).collect();
    assert_eq!(receivers, eois);
}

#[test]
fn test_inconsistent_nesting_is_partial_success() {
    // `b` opens below a call marker that never resolves
    let records = TraceBuilder::new(5)
        .call(("app.A", "a"), ("ext.Remote", "invoke"))
        .before("app.B", "b")
        .after("app.B", "b")
        .build();
    let reconstructor = TraceReconstructor::new(ReconstructionConfig::default());
    let outcome = reconstructor.reconstruct(records);

    match &outcome {
        TraceOutcome::PartialSuccess {
            execution_trace,
            error,
            ..
        } => {
            assert_eq!(execution_trace.len(), 1);
            assert_eq!(error.trace_id, 5);
        }
        other => panic!("expected partial success, got {:?}", other),
    }
    assert_eq!(reconstructor.stats().snapshot().partial, 1);
}
