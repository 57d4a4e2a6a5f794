// Integration test utilities
//
// Builders for flow event sequences shared by the integration tests

#![allow(dead_code)]

use flowtrace::flow_event::{FlowEvent, TraceEventRecords, TraceMetadata};

/// Appends events with consecutive order indices and timestamps
pub struct TraceBuilder {
    trace_id: i64,
    hostname: String,
    events: Vec<FlowEvent>,
}

impl TraceBuilder {
    pub fn new(trace_id: i64) -> Self {
        Self {
            trace_id,
            hostname: "srv".to_string(),
            events: Vec::new(),
        }
    }

    pub fn host(mut self, hostname: &str) -> Self {
        self.hostname = hostname.to_string();
        self
    }

    fn next(&self) -> (i64, i64, i32) {
        let idx = self.events.len() as i32;
        (100 + i64::from(idx) * 10, self.trace_id, idx)
    }

    /// `class` is the operation's class, `op` its simple name: `void {class}.{op}()`
    pub fn before(mut self, class: &str, op: &str) -> Self {
        let (ts, trace, idx) = self.next();
        self.events.push(FlowEvent::before_operation(
            ts,
            trace,
            idx,
            &signature(class, op),
            class,
        ));
        self
    }

    pub fn after(mut self, class: &str, op: &str) -> Self {
        let (ts, trace, idx) = self.next();
        self.events.push(FlowEvent::after_operation(
            ts,
            trace,
            idx,
            &signature(class, op),
            class,
        ));
        self
    }

    pub fn after_failed(mut self, class: &str, op: &str) -> Self {
        let (ts, trace, idx) = self.next();
        self.events.push(FlowEvent::after_operation_failed(
            ts,
            trace,
            idx,
            &signature(class, op),
            class,
            "java.lang.IllegalStateException",
        ));
        self
    }

    pub fn call(mut self, caller: (&str, &str), callee: (&str, &str)) -> Self {
        let (ts, trace, idx) = self.next();
        self.events.push(FlowEvent::call_operation(
            ts,
            trace,
            idx,
            &signature(caller.0, caller.1),
            caller.0,
            &signature(callee.0, callee.1),
            callee.0,
        ));
        self
    }

    /// Raw event, appended as is
    pub fn event(mut self, event: FlowEvent) -> Self {
        self.events.push(event);
        self
    }

    pub fn next_order_index(&self) -> i32 {
        self.events.len() as i32
    }

    pub fn build(self) -> TraceEventRecords {
        TraceEventRecords::new(
            TraceMetadata::new(self.trace_id, "session-1", &self.hostname),
            self.events,
        )
    }
}

pub fn signature(class: &str, op: &str) -> String {
    format!("void {}.{}()", class, op)
}

/// `Call(A→B)@0, Before(B)@1, Call(B→C)@2, Before(C)@3, After(C)@4, After(B)@5`
pub fn balanced_chain(trace_id: i64) -> TraceEventRecords {
    TraceBuilder::new(trace_id)
        .call(("app.A", "a"), ("app.B", "b"))
        .before("app.B", "b")
        .call(("app.B", "b"), ("app.C", "c"))
        .before("app.C", "c")
        .after("app.C", "c")
        .after("app.B", "b")
        .build()
}

/// Root `a` calling `b` and `c` one after the other
pub fn siblings(trace_id: i64) -> TraceEventRecords {
    TraceBuilder::new(trace_id)
        .before("app.A", "a")
        .call(("app.A", "a"), ("app.B", "b"))
        .before("app.B", "b")
        .after("app.B", "b")
        .call(("app.A", "a"), ("app.C", "c"))
        .before("app.C", "c")
        .after("app.C", "c")
        .after("app.A", "a")
        .build()
}
