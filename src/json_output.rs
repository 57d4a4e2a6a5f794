//! JSON output format for reconstructed traces
//!
//! `--format json` implementation

use crate::execution_trace::ExecutionEntry;
use crate::message_trace::Message;
use crate::reconstruction::{StatsSnapshot, TraceOutcome};
use serde::{Deserialize, Serialize};

/// A single reconstructed execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonExecution {
    pub eoi: i32,
    pub ess: i32,
    /// Host the execution ran on
    pub host: String,
    /// Fully-qualified class name
    pub class: String,
    /// Normalised operation signature (e.g., "public void add(int)")
    pub operation: String,
    pub entry_time: i64,
    pub exit_time: i64,
    /// True if entry or exit was inferred
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub assumed: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub constructor: bool,
}

impl From<&ExecutionEntry> for JsonExecution {
    fn from(entry: &ExecutionEntry) -> Self {
        Self {
            eoi: entry.eoi,
            ess: entry.ess,
            host: entry.host().to_string(),
            class: entry.class_name(),
            operation: entry.operation_signature(),
            entry_time: entry.entry_time,
            exit_time: entry.exit_time,
            assumed: entry.assumed,
            constructor: entry.is_constructor,
        }
    }
}

/// A call or reply between two executions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonMessage {
    /// "call" or "reply"
    pub kind: String,
    pub timestamp: i64,
    /// eoi of the sender (-1 for the root execution)
    pub sender: i32,
    /// eoi of the receiver (-1 for the root execution)
    pub receiver: i32,
}

impl From<&Message> for JsonMessage {
    fn from(message: &Message) -> Self {
        Self {
            kind: if message.is_call() { "call" } else { "reply" }.to_string(),
            timestamp: message.timestamp(),
            sender: message.sender().eoi,
            receiver: message.receiver().eoi,
        }
    }
}

/// Outcome of one trace
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonTrace {
    pub trace_id: i64,
    /// "success", "partial", "failed" or "skipped"
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub executions: Vec<JsonExecution>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub messages: Vec<JsonMessage>,
    /// eoi values consumed by calls that never resolved
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub eoi_gaps: Vec<i32>,
}

impl From<&TraceOutcome> for JsonTrace {
    fn from(outcome: &TraceOutcome) -> Self {
        let execution_trace = outcome.execution_trace();
        Self {
            trace_id: outcome.trace_id(),
            outcome: outcome.label().to_string(),
            error: outcome.error().map(|e| e.reason.clone()),
            executions: execution_trace
                .map(|t| t.iter().map(JsonExecution::from).collect())
                .unwrap_or_default(),
            messages: outcome
                .message_trace()
                .map(|t| t.messages().iter().map(JsonMessage::from).collect())
                .unwrap_or_default(),
            eoi_gaps: execution_trace.map(|t| t.eoi_gaps()).unwrap_or_default(),
        }
    }
}

/// Summary statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JsonSummary {
    pub total_traces: u64,
    pub succeeded: u64,
    pub partial: u64,
    pub failed: u64,
    pub skipped: u64,
    pub dropped_events: u64,
}

impl From<StatsSnapshot> for JsonSummary {
    fn from(stats: StatsSnapshot) -> Self {
        Self {
            total_traces: stats.total(),
            succeeded: stats.succeeded,
            partial: stats.partial,
            failed: stats.failed,
            skipped: stats.skipped,
            dropped_events: stats.dropped_events,
        }
    }
}

/// Root JSON output structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonOutput {
    /// Format version identifier
    pub version: String,
    /// Format name
    pub format: String,
    pub traces: Vec<JsonTrace>,
    pub summary: JsonSummary,
}

impl JsonOutput {
    /// Create a new JSON output structure
    pub fn new() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            format: "flowtrace-json-v1".to_string(),
            traces: Vec::new(),
            summary: JsonSummary::default(),
        }
    }

    pub fn add_outcome(&mut self, outcome: &TraceOutcome) {
        self.traces.push(JsonTrace::from(outcome));
    }

    pub fn set_summary(&mut self, stats: StatsSnapshot) {
        self.summary = JsonSummary::from(stats);
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Default for JsonOutput {
    fn default() -> Self {
        Self::new()
    }
}
