//! Execution traces: the flat, ordered list of reconstructed invocations
//!
//! An [`ExecutionTrace`] collects the [`ExecutionEntry`]s of one trace, keyed
//! by execution order index (eoi). Entries arrive in the order invocations
//! *finish* (inner calls first), so insertion order is arbitrary; iteration is
//! always ascending by eoi.
//!
//! # Invariants
//!
//! - eoi values are unique within a trace
//! - every entry carries the trace's own id
//! - `entry_time <= exit_time` for every entry
//!
//! Violations are rejected by [`ExecutionTrace::add`] with [`InvalidTrace`].
//!
//! eoi values are not required to be contiguous: a call marker that never
//! resolves consumes an eoi without producing an entry. [`ExecutionTrace::eoi_gaps`]
//! reports such holes.

use crate::error::{InvalidTrace, Result};
use crate::system_model::{
    root_allocation, root_operation, AllocationComponent, Operation, ROOT_NAME,
};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// One reconstructed method or constructor invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionEntry {
    pub allocation: Arc<AllocationComponent>,
    pub operation: Arc<Operation>,
    pub trace_id: i64,
    pub session_id: String,
    /// Execution order index: rank among the trace's invocations in opening order
    pub eoi: i32,
    /// Execution stack size: nesting depth when the invocation opened
    pub ess: i32,
    pub entry_time: i64,
    pub exit_time: i64,
    /// Entry or exit boundary was inferred rather than observed
    pub assumed: bool,
    pub is_constructor: bool,
}

impl ExecutionEntry {
    /// The synthetic caller of every root-level execution
    pub fn root(trace_id: i64, session_id: &str) -> Self {
        Self {
            allocation: root_allocation(),
            operation: root_operation(),
            trace_id,
            session_id: session_id.to_string(),
            eoi: -1,
            ess: -1,
            entry_time: -1,
            exit_time: -1,
            assumed: false,
            is_constructor: false,
        }
    }

    pub fn is_root(&self) -> bool {
        self.eoi == -1 && self.operation.signature.name == ROOT_NAME
    }

    pub fn host(&self) -> &str {
        &self.allocation.container.name
    }

    /// Execution context the invocation ran in
    pub fn component(&self) -> &str {
        &self.allocation.assembly.name
    }

    pub fn class_name(&self) -> String {
        self.operation.component_type.full_name()
    }

    pub fn operation_signature(&self) -> String {
        self.operation.signature.to_string()
    }

    pub fn duration(&self) -> i64 {
        self.exit_time - self.entry_time
    }
}

impl fmt::Display for ExecutionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<{}::{}.{}> eoi={} ess={} [{}, {}]{}",
            self.host(),
            self.component(),
            self.operation.signature.name,
            self.eoi,
            self.ess,
            self.entry_time,
            self.exit_time,
            if self.assumed { " (assumed)" } else { "" }
        )
    }
}

/// Ordered, validated container of one trace's executions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionTrace {
    trace_id: i64,
    session_id: String,
    entries: BTreeMap<i32, ExecutionEntry>,
}

impl ExecutionTrace {
    pub fn new(trace_id: i64, session_id: &str) -> Self {
        Self {
            trace_id,
            session_id: session_id.to_string(),
            entries: BTreeMap::new(),
        }
    }

    /// Insert an execution at its eoi position
    ///
    /// # Errors
    ///
    /// Fails if the eoi is already taken, the entry belongs to another trace,
    /// or its exit precedes its entry.
    pub fn add(&mut self, entry: ExecutionEntry) -> Result<()> {
        if entry.trace_id != self.trace_id {
            return Err(InvalidTrace::new(
                self.trace_id,
                format!(
                    "execution {} belongs to trace {}",
                    entry, entry.trace_id
                ),
            ));
        }
        if entry.exit_time < entry.entry_time {
            return Err(InvalidTrace::new(
                self.trace_id,
                format!("execution {} exits before it enters", entry),
            ));
        }
        if self.entries.contains_key(&entry.eoi) {
            return Err(InvalidTrace::new(
                self.trace_id,
                format!("trace already contains an execution with eoi {}", entry.eoi),
            ));
        }
        self.entries.insert(entry.eoi, entry);
        Ok(())
    }

    pub fn trace_id(&self) -> i64 {
        self.trace_id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Executions in ascending eoi order
    pub fn iter(&self) -> impl Iterator<Item = &ExecutionEntry> {
        self.entries.values()
    }

    pub fn get(&self, eoi: i32) -> Option<&ExecutionEntry> {
        self.entries.get(&eoi)
    }

    /// Deepest nesting level in the trace
    pub fn max_ess(&self) -> Option<i32> {
        self.iter().map(|e| e.ess).max()
    }

    pub fn min_entry_time(&self) -> Option<i64> {
        self.iter().map(|e| e.entry_time).min()
    }

    pub fn max_exit_time(&self) -> Option<i64> {
        self.iter().map(|e| e.exit_time).max()
    }

    /// Time between the earliest entry and the latest exit
    pub fn duration(&self) -> i64 {
        match (self.min_entry_time(), self.max_exit_time()) {
            (Some(start), Some(end)) => end - start,
            _ => 0,
        }
    }

    /// eoi values between 0 and the highest eoi that have no execution
    pub fn eoi_gaps(&self) -> Vec<i32> {
        let Some(&max) = self.entries.keys().next_back() else {
            return Vec::new();
        };
        (0..max).filter(|eoi| !self.entries.contains_key(eoi)).collect()
    }
}

impl<'a> IntoIterator for &'a ExecutionTrace {
    type Item = &'a ExecutionEntry;
    type IntoIter = std::collections::btree_map::Values<'a, i32, ExecutionEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.values()
    }
}
