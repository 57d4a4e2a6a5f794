//! Trace event handler: the reconstruction state machine
//!
//! One [`TraceEventHandler`] consumes the flow events of exactly one trace, in
//! order-index order, and turns them into [`ExecutionEntry`]s.
//!
//! # State
//!
//! The machine has no enumerable states; its state is the content of two
//! stacks owned by the handler:
//!
//! - `event_stack`: events not yet resolved (call markers and before-events),
//!   most recent on top
//! - `execution_stack`: `(eoi, ess)` slots, one per opened invocation
//!
//! A before-event that directly follows its own call marker shares the
//! marker's slot, so it is pushed on `event_stack` only.
//!
//! ```text
//!  Call(A→B)@0   Before(B)@1   Call(B→C)@2   Before(C)@3   After(C)@4   After(B)@5
//!  ┌────────┐    ┌─────────┐   ┌─────────┐   ┌─────────┐
//!  │Call A→B│    │Before B │   │Call B→C │   │Before C │   C: eoi=1     B: eoi=0
//!  └────────┘    │Call A→B │   │Before B │   │Call B→C │      ess=1        ess=0
//!   (0, 0)       └─────────┘   │Call A→B │   │Before B │
//!                              └─────────┘   │Call A→B │
//!                               (1, 1)       └─────────┘
//! ```
//!
//! # Recovery policies
//!
//! - Call markers whose callee never reports a before-event (an
//!   uninstrumented callee) are closed as *assumed* executions of the callee
//!   once the caller reports its next event (see `close_open_calls`).
//! - A before-event without a matching call marker opens an execution of its
//!   own; its execution is marked assumed unless it is the trace root.
//! - Call markers still open when the trace ends are dropped silently.
//!
//! # Example
//!
//! ```
//! use flowtrace::config::ReconstructionConfig;
//! use flowtrace::event_handler::TraceEventHandler;
//! use flowtrace::flow_event::{FlowEvent, TraceMetadata};
//! use flowtrace::system_model::SystemModelRepository;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), flowtrace::error::InvalidTrace> {
//! let repository = Arc::new(SystemModelRepository::new());
//! let trace = TraceMetadata::new(1, "session", "srv-1");
//! let mut handler = TraceEventHandler::new(trace, repository, &ReconstructionConfig::default());
//!
//! handler.process(FlowEvent::before_operation(10, 1, 0, "void shop.Cart.add()", "shop.Cart"))?;
//! handler.process(FlowEvent::after_operation(20, 1, 1, "void shop.Cart.add()", "shop.Cart"))?;
//!
//! let execution_trace = handler.finish();
//! assert_eq!(execution_trace.len(), 1);
//! assert!(!execution_trace.get(0).unwrap().assumed);
//! # Ok(())
//! # }
//! ```

use crate::config::ReconstructionConfig;
use crate::error::{InvalidTrace, Result};
use crate::execution_trace::{ExecutionEntry, ExecutionTrace};
use crate::flow_event::{FlowEvent, OperationEvent, OperationKind, TraceMetadata};
use crate::signature::{signatures_match, ClassOperationSignaturePair};
use crate::system_model::SystemModelRepository;
use std::sync::Arc;
use tracing::{debug, warn};

/// Policy flags for matching a before-event to the preceding call marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallMatching {
    pub enhance_call_detection: bool,
    pub enhance_java_constructors: bool,
}

impl From<&ReconstructionConfig> for CallMatching {
    fn from(config: &ReconstructionConfig) -> Self {
        Self {
            enhance_call_detection: config.enhance_call_detection,
            enhance_java_constructors: config.enhance_java_constructors,
        }
    }
}

/// Does `prev` announce the operation entered by `before`?
///
/// `prev` must be a call marker of the same kind as `before` that immediately
/// precedes it (`order_index` one less), and either reference the operation
/// and class of `before` exactly or, with heuristic call detection enabled,
/// name a callee whose signature normalises to the same [`crate::signature::Signature`]
/// on the same class.
pub fn is_matching_call(
    prev: &FlowEvent,
    before: &OperationEvent,
    before_kind: OperationKind,
    matching: CallMatching,
) -> bool {
    let call = match (before_kind, prev) {
        (OperationKind::Operation, FlowEvent::CallOperation(call))
        | (OperationKind::Constructor, FlowEvent::CallConstructor(call)) => call,
        _ => return false,
    };
    if call.order_index.checked_add(1) != Some(before.order_index) {
        return false;
    }
    if call.calls_referenced_operation_of(&before.operation_signature, &before.class_signature) {
        return true;
    }
    if matching.enhance_call_detection {
        let java_constructor =
            before_kind == OperationKind::Constructor && matching.enhance_java_constructors;
        if signatures_match(
            &call.callee_operation_signature,
            &call.callee_class_signature,
            &before.operation_signature,
            &before.class_signature,
            java_constructor,
        ) {
            debug!(
                trace_id = before.trace_id,
                call = %call.callee_operation_signature,
                before = %before.operation_signature,
                "guessed call"
            );
            return true;
        }
    }
    false
}

/// Position of an open invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ExecutionInformation {
    eoi: i32,
    ess: i32,
}

/// Per-trace reconstruction state machine
#[derive(Debug)]
pub struct TraceEventHandler {
    trace: TraceMetadata,
    repository: Arc<SystemModelRepository>,
    execution_trace: ExecutionTrace,
    event_stack: Vec<FlowEvent>,
    execution_stack: Vec<ExecutionInformation>,
    next_eoi: i32,
    matching: CallMatching,
}

impl TraceEventHandler {
    pub fn new(
        trace: TraceMetadata,
        repository: Arc<SystemModelRepository>,
        config: &ReconstructionConfig,
    ) -> Self {
        let execution_trace = ExecutionTrace::new(trace.trace_id, &trace.session_id);
        Self {
            trace,
            repository,
            execution_trace,
            event_stack: Vec::new(),
            execution_stack: Vec::new(),
            next_eoi: 0,
            matching: CallMatching::from(config),
        }
    }

    /// Feed the next event of the trace
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTrace`] if the event cannot be reconciled with the
    /// events seen so far. The handler must not be used afterwards.
    pub fn process(&mut self, event: FlowEvent) -> Result<()> {
        match event {
            FlowEvent::CallOperation(_) | FlowEvent::CallConstructor(_) => self.handle_call(event),
            FlowEvent::BeforeOperation(before) => {
                self.handle_before(before, OperationKind::Operation)
            }
            FlowEvent::BeforeConstructor(before) => {
                self.handle_before(before, OperationKind::Constructor)
            }
            FlowEvent::AfterOperation(after) => self.handle_after(
                OperationKind::Operation,
                after.timestamp,
                &after.operation_signature,
                &after.class_signature,
            ),
            FlowEvent::AfterConstructor(after) => self.handle_after(
                OperationKind::Constructor,
                after.timestamp,
                &after.operation_signature,
                &after.class_signature,
            ),
            FlowEvent::AfterOperationFailed(after) => self.handle_after(
                OperationKind::Operation,
                after.timestamp,
                &after.operation_signature,
                &after.class_signature,
            ),
            FlowEvent::AfterConstructorFailed(after) => self.handle_after(
                OperationKind::Constructor,
                after.timestamp,
                &after.operation_signature,
                &after.class_signature,
            ),
            FlowEvent::Split(split) => {
                warn!(
                    trace_id = split.trace_id,
                    order_index = split.order_index,
                    "events of type 'Split' are currently not handled and ignored"
                );
                Ok(())
            }
            FlowEvent::Unknown(unknown) => {
                warn!(
                    trace_id = unknown.trace_id,
                    order_index = unknown.order_index,
                    "events of type '{}' are currently not handled and ignored",
                    unknown.type_name
                );
                Ok(())
            }
        }
    }

    /// Number of events still waiting for resolution
    pub fn open_events(&self) -> usize {
        self.event_stack.len()
    }

    /// Complete the trace and hand out the reconstructed executions
    ///
    /// Call markers that never resolved are dropped without an execution.
    pub fn finish(self) -> ExecutionTrace {
        if !self.event_stack.is_empty() {
            debug!(
                trace_id = self.trace.trace_id,
                open_events = self.event_stack.len(),
                "trace ended with unresolved events"
            );
        }
        self.execution_trace
    }

    fn register_execution(&mut self, cause: FlowEvent) {
        self.event_stack.push(cause);
        let ess = self.execution_stack.len() as i32;
        self.execution_stack.push(ExecutionInformation {
            eoi: self.next_eoi,
            ess,
        });
        self.next_eoi += 1;
    }

    #[allow(clippy::too_many_arguments)]
    fn finish_execution(
        &mut self,
        operation_signature: &str,
        class_signature: &str,
        info: ExecutionInformation,
        entry_time: i64,
        exit_time: i64,
        assumed: bool,
        is_constructor: bool,
    ) -> Result<()> {
        let pair = ClassOperationSignaturePair::split(
            operation_signature,
            is_constructor && self.matching.enhance_java_constructors,
        );
        let context = if class_signature.is_empty() {
            pair.fq_class_name.as_str()
        } else {
            class_signature
        };
        let (allocation, operation) =
            self.repository
                .resolve_execution(&self.trace.hostname, context, &pair);

        let entry = ExecutionEntry {
            allocation,
            operation,
            trace_id: self.trace.trace_id,
            session_id: self.trace.session_id.clone(),
            eoi: info.eoi,
            ess: info.ess,
            entry_time,
            exit_time,
            assumed,
            is_constructor,
        };
        self.execution_trace.add(entry).map_err(|err| {
            InvalidTrace::new(
                self.trace.trace_id,
                format!("failed to add execution to trace: {}", err.reason),
            )
        })
    }

    fn pop_execution(&mut self) -> Result<ExecutionInformation> {
        self.execution_stack.pop().ok_or_else(|| {
            InvalidTrace::new(self.trace.trace_id, "execution stack is out of sync")
        })
    }

    /// Close call markers on top of the stack whose callee was never entered
    ///
    /// `operation_signature` is the operation of the event being processed.
    /// Call markers are popped while they are on top. As soon as one was
    /// issued by that operation, every popped marker becomes an assumed
    /// execution of its callee ending at `timestamp`, oldest first. If none
    /// was, the stack is restored untouched.
    fn close_open_calls(&mut self, operation_signature: &str, timestamp: i64) -> Result<()> {
        let mut popped: Vec<(FlowEvent, ExecutionInformation)> = Vec::new();

        while self.event_stack.last().is_some_and(FlowEvent::is_call) {
            let Some(event) = self.event_stack.pop() else {
                break;
            };
            let info = self.pop_execution()?;
            let matches = event
                .as_call()
                .is_some_and(|call| call.operation_signature == operation_signature);
            popped.push((event, info));

            if matches {
                // Oldest (deepest) marker first
                for (event, info) in popped.into_iter().rev() {
                    let is_constructor = matches!(event, FlowEvent::CallConstructor(_));
                    if let Some(call) = event.as_call() {
                        self.finish_execution(
                            &call.callee_operation_signature,
                            &call.callee_class_signature,
                            info,
                            call.timestamp,
                            timestamp,
                            true,
                            is_constructor,
                        )?;
                    }
                }
                return Ok(());
            }
        }

        for (event, info) in popped.into_iter().rev() {
            self.event_stack.push(event);
            self.execution_stack.push(info);
        }
        Ok(())
    }

    fn handle_call(&mut self, call: FlowEvent) -> Result<()> {
        let (operation_signature, timestamp) = match call.as_call() {
            Some(payload) => (payload.operation_signature.clone(), payload.timestamp),
            None => return Ok(()),
        };
        self.close_open_calls(&operation_signature, timestamp)?;
        self.register_execution(call);
        Ok(())
    }

    fn handle_before(&mut self, before: OperationEvent, kind: OperationKind) -> Result<()> {
        let matched = self
            .event_stack
            .last()
            .is_some_and(|prev| is_matching_call(prev, &before, kind, self.matching));

        if !matched {
            self.close_open_calls(&before.operation_signature, before.timestamp)?;
        }
        let event = match kind {
            OperationKind::Operation => FlowEvent::BeforeOperation(before),
            OperationKind::Constructor => FlowEvent::BeforeConstructor(before),
        };
        if matched {
            self.event_stack.push(event);
        } else {
            self.register_execution(event);
        }
        Ok(())
    }

    fn handle_after(
        &mut self,
        kind: OperationKind,
        timestamp: i64,
        operation_signature: &str,
        class_signature: &str,
    ) -> Result<()> {
        self.close_open_calls(operation_signature, timestamp)?;

        let trace_id = self.trace.trace_id;
        let before = match self.event_stack.last() {
            Some(FlowEvent::BeforeOperation(before)) if kind == OperationKind::Operation => before,
            Some(FlowEvent::BeforeConstructor(before)) if kind == OperationKind::Constructor => {
                before
            }
            found => {
                return Err(InvalidTrace::new(
                    trace_id,
                    format!(
                        "missing matching before-event for after-event of {:?} '{}' (found: {})",
                        kind,
                        operation_signature,
                        found.map_or("nothing", FlowEvent::type_name)
                    ),
                ));
            }
        };
        if before.operation_signature != operation_signature
            || before.class_signature != class_signature
        {
            return Err(InvalidTrace::new(
                trace_id,
                format!(
                    "components of before ('{}' in '{}') and after ('{}' in '{}') events do not match",
                    before.operation_signature,
                    before.class_signature,
                    operation_signature,
                    class_signature
                ),
            ));
        }
        let before = before.clone();
        self.event_stack.pop();

        let definite_call = match self.event_stack.last() {
            None => true,
            Some(prev) => is_matching_call(prev, &before, kind, self.matching),
        };
        if definite_call && !self.event_stack.is_empty() {
            self.event_stack.pop();
        }
        let info = self.pop_execution()?;

        self.finish_execution(
            &before.operation_signature,
            &before.class_signature,
            info,
            before.timestamp,
            timestamp,
            !definite_call,
            kind == OperationKind::Constructor,
        )
    }
}
