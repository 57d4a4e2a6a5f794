//! Trace ingestion orchestrator
//!
//! [`TraceReconstructor`] drives one [`TraceEventHandler`] per trace:
//!
//! ```text
//! TraceEventRecords ──► selection ──► sequencing ──► handler ──► converter
//!                         │              │             │            │
//!                      Skipped      drop + log      Failed    PartialSuccess
//!                                                                   │
//!                                                                Success
//! ```
//!
//! Sequencing validates every event against an expected order index that
//! starts at 0 and advances once per examined event. A mismatching event is
//! dropped and the counter is *not* resynchronised, so one missing event
//! causes every following event of the trace to be dropped as well.
//!
//! Traces are independent. [`TraceReconstructor::reconstruct_all`] spreads
//! them over `workers` threads fed by a crossbeam channel; only the
//! [`SystemModelRepository`] is shared.
//!
//! # Example
//!
//! ```
//! use flowtrace::config::ReconstructionConfig;
//! use flowtrace::flow_event::{FlowEvent, TraceEventRecords, TraceMetadata};
//! use flowtrace::reconstruction::{TraceOutcome, TraceReconstructor};
//!
//! let reconstructor = TraceReconstructor::new(ReconstructionConfig::default());
//! let records = TraceEventRecords::new(
//!     TraceMetadata::new(1, "s", "srv"),
//!     vec![
//!         FlowEvent::before_operation(1, 1, 0, "void a.A.run()", "a.A"),
//!         FlowEvent::after_operation(2, 1, 1, "void a.A.run()", "a.A"),
//!     ],
//! );
//!
//! match reconstructor.reconstruct(records) {
//!     TraceOutcome::Success { message_trace, .. } => assert_eq!(message_trace.len(), 2),
//!     other => panic!("unexpected outcome: {:?}", other),
//! }
//! assert_eq!(reconstructor.stats().snapshot().succeeded, 1);
//! ```

use crate::config::ReconstructionConfig;
use crate::error::{InvalidTrace, SequencingError};
use crate::event_handler::TraceEventHandler;
use crate::execution_trace::ExecutionTrace;
use crate::filter::TraceIdFilter;
use crate::flow_event::{FlowEvent, TraceEventRecords};
use crate::message_trace::MessageTrace;
use crate::system_model::SystemModelRepository;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{debug, error, warn};

/// Result of reconstructing one trace
#[derive(Debug, Clone)]
pub enum TraceOutcome {
    /// Both the execution trace and the message trace were built
    Success {
        trace_id: i64,
        execution_trace: ExecutionTrace,
        message_trace: MessageTrace,
    },
    /// The execution trace was built but could not be converted to messages
    PartialSuccess {
        trace_id: i64,
        execution_trace: ExecutionTrace,
        error: InvalidTrace,
    },
    /// The events did not form a valid trace
    Failed { trace_id: i64, error: InvalidTrace },
    /// Not selected by the trace filter
    Skipped { trace_id: i64 },
}

impl TraceOutcome {
    pub fn trace_id(&self) -> i64 {
        match self {
            Self::Success { trace_id, .. }
            | Self::PartialSuccess { trace_id, .. }
            | Self::Failed { trace_id, .. }
            | Self::Skipped { trace_id } => *trace_id,
        }
    }

    pub fn execution_trace(&self) -> Option<&ExecutionTrace> {
        match self {
            Self::Success {
                execution_trace, ..
            }
            | Self::PartialSuccess {
                execution_trace, ..
            } => Some(execution_trace),
            _ => None,
        }
    }

    pub fn message_trace(&self) -> Option<&MessageTrace> {
        match self {
            Self::Success { message_trace, .. } => Some(message_trace),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&InvalidTrace> {
        match self {
            Self::PartialSuccess { error, .. } | Self::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::PartialSuccess { .. } => "partial",
            Self::Failed { .. } => "failed",
            Self::Skipped { .. } => "skipped",
        }
    }
}

/// Running tallies, safe to update from several workers
#[derive(Debug, Default)]
pub struct ReconstructionStats {
    succeeded: AtomicU64,
    partial: AtomicU64,
    failed: AtomicU64,
    skipped: AtomicU64,
    dropped_events: AtomicU64,
}

/// Point-in-time copy of [`ReconstructionStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub succeeded: u64,
    pub partial: u64,
    pub failed: u64,
    pub skipped: u64,
    pub dropped_events: u64,
}

impl StatsSnapshot {
    pub fn total(&self) -> u64 {
        self.succeeded + self.partial + self.failed + self.skipped
    }
}

impl ReconstructionStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            succeeded: self.succeeded.load(Ordering::Relaxed),
            partial: self.partial.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            dropped_events: self.dropped_events.load(Ordering::Relaxed),
        }
    }

    fn record(&self, outcome: &TraceOutcome) {
        let counter = match outcome {
            TraceOutcome::Success { .. } => &self.succeeded,
            TraceOutcome::PartialSuccess { .. } => &self.partial,
            TraceOutcome::Failed { .. } => &self.failed,
            TraceOutcome::Skipped { .. } => &self.skipped,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Check an event's position and trace membership
///
/// `expected` is the order index this event must carry.
pub fn check_sequence(
    event: &FlowEvent,
    trace_id: i64,
    expected: i32,
) -> Result<(), SequencingError> {
    if event.order_index() != expected {
        return Err(SequencingError::WrongOrderIndex {
            trace_id,
            found: event.order_index(),
            expected,
        });
    }
    if event.trace_id() != trace_id {
        return Err(SequencingError::WrongTraceId {
            found: event.trace_id(),
            expected: trace_id,
        });
    }
    Ok(())
}

/// Reconstructs execution and message traces from batches of flow events
#[derive(Debug)]
pub struct TraceReconstructor {
    config: ReconstructionConfig,
    repository: Arc<SystemModelRepository>,
    filter: TraceIdFilter,
    stats: ReconstructionStats,
}

impl TraceReconstructor {
    pub fn new(config: ReconstructionConfig) -> Self {
        Self::with_repository(config, Arc::new(SystemModelRepository::new()))
    }

    /// Share an existing repository, e.g. across several runs
    pub fn with_repository(
        config: ReconstructionConfig,
        repository: Arc<SystemModelRepository>,
    ) -> Self {
        Self {
            config,
            repository,
            filter: TraceIdFilter::all(),
            stats: ReconstructionStats::default(),
        }
    }

    pub fn with_filter(mut self, filter: TraceIdFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn config(&self) -> &ReconstructionConfig {
        &self.config
    }

    pub fn repository(&self) -> &Arc<SystemModelRepository> {
        &self.repository
    }

    pub fn stats(&self) -> &ReconstructionStats {
        &self.stats
    }

    /// Reconstruct a single trace
    pub fn reconstruct(&self, records: TraceEventRecords) -> TraceOutcome {
        let outcome = self.reconstruct_inner(records);
        self.stats.record(&outcome);
        outcome
    }

    fn reconstruct_inner(&self, records: TraceEventRecords) -> TraceOutcome {
        let TraceEventRecords { trace, events } = records;
        let trace_id = trace.trace_id;

        if !self.filter.should_process(trace_id) {
            debug!(trace_id, "trace not selected");
            return TraceOutcome::Skipped { trace_id };
        }

        let mut handler =
            TraceEventHandler::new(trace, Arc::clone(&self.repository), &self.config);

        let mut expected: i32 = 0;
        for event in events {
            let sequenced = check_sequence(&event, trace_id, expected);
            expected += 1;
            if let Err(err) = sequenced {
                error!(trace_id, order_index = event.order_index(), "{}", err);
                self.stats.dropped_events.fetch_add(1, Ordering::Relaxed);
                continue;
            }

            if let Err(err) = handler.process(event) {
                error!(trace_id, reason = %err.reason, "failed to reconstruct trace");
                return TraceOutcome::Failed {
                    trace_id,
                    error: err,
                };
            }
        }

        let execution_trace = handler.finish();
        match execution_trace.to_message_trace() {
            Ok(message_trace) => TraceOutcome::Success {
                trace_id,
                execution_trace,
                message_trace,
            },
            Err(err) => {
                warn!(trace_id, reason = %err.reason, "failed to convert to message trace");
                TraceOutcome::PartialSuccess {
                    trace_id,
                    execution_trace,
                    error: err,
                }
            }
        }
    }

    /// Reconstruct many traces on `config.workers` threads
    ///
    /// Outcomes are returned in input order regardless of which worker
    /// finished first.
    pub fn reconstruct_all(&self, batches: Vec<TraceEventRecords>) -> Vec<TraceOutcome> {
        let workers = self.config.workers.max(1).min(batches.len().max(1));
        if workers == 1 {
            return batches.into_iter().map(|r| self.reconstruct(r)).collect();
        }

        let total = batches.len();
        let (job_tx, job_rx) = crossbeam::channel::unbounded::<(usize, TraceEventRecords)>();
        let (result_tx, result_rx) = crossbeam::channel::unbounded::<(usize, TraceOutcome)>();

        for job in batches.into_iter().enumerate() {
            // Receivers outlive this loop
            let _ = job_tx.send(job);
        }
        drop(job_tx);

        thread::scope(|scope| {
            for _ in 0..workers {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                scope.spawn(move || {
                    for (position, records) in job_rx.iter() {
                        let outcome = self.reconstruct(records);
                        if result_tx.send((position, outcome)).is_err() {
                            break;
                        }
                    }
                });
            }
        });
        drop(result_tx);

        let mut slots: Vec<Option<TraceOutcome>> = (0..total).map(|_| None).collect();
        for (position, outcome) in result_rx.iter() {
            slots[position] = Some(outcome);
        }
        slots.into_iter().flatten().collect()
    }
}
