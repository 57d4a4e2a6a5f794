//! Plain-text rendering of reconstruction outcomes
//!
//! ```text
//! trace 1: success (2 executions, 4 messages)
//!   [0] srv::b.B  void b()  2..6
//!     [1] srv::c.C  void c()  4..5
//!   call $.$ -> b.B.b @ 2
//!   ...
//! ```

use crate::reconstruction::{StatsSnapshot, TraceOutcome};
use std::fmt::Write as _;

/// Render one outcome, executions indented by their nesting depth
pub fn format_outcome(outcome: &TraceOutcome, show_messages: bool) -> String {
    let mut out = String::new();
    let trace_id = outcome.trace_id();

    match outcome {
        TraceOutcome::Skipped { .. } => {
            let _ = writeln!(out, "trace {}: skipped", trace_id);
            return out;
        }
        TraceOutcome::Failed { error, .. } => {
            let _ = writeln!(out, "trace {}: failed: {}", trace_id, error.reason);
            return out;
        }
        _ => {}
    }

    if let Some(execution_trace) = outcome.execution_trace() {
        let messages = outcome.message_trace().map_or(0, |m| m.len());
        let _ = writeln!(
            out,
            "trace {}: {} ({} executions, {} messages)",
            trace_id,
            outcome.label(),
            execution_trace.len(),
            messages
        );
        if let Some(error) = outcome.error() {
            let _ = writeln!(out, "  conversion failed: {}", error.reason);
        }

        for entry in execution_trace {
            let indent = "  ".repeat(entry.ess.max(0) as usize + 1);
            let _ = writeln!(
                out,
                "{}[{}] {}::{}  {}  {}..{}{}",
                indent,
                entry.eoi,
                entry.host(),
                entry.component(),
                entry.operation_signature(),
                entry.entry_time,
                entry.exit_time,
                if entry.assumed { "  (assumed)" } else { "" }
            );
        }

        let gaps = execution_trace.eoi_gaps();
        if !gaps.is_empty() {
            let _ = writeln!(out, "  unresolved calls at eoi {:?}", gaps);
        }
    }

    if show_messages {
        if let Some(message_trace) = outcome.message_trace() {
            for message in message_trace.messages() {
                let _ = writeln!(out, "  {}", message);
            }
        }
    }
    out
}

/// Render the run's tallies
pub fn format_summary(stats: &StatsSnapshot) -> String {
    format!(
        "{} traces: {} succeeded, {} partial, {} failed, {} skipped ({} events dropped)",
        stats.total(),
        stats.succeeded,
        stats.partial,
        stats.failed,
        stats.skipped,
        stats.dropped_events
    )
}
