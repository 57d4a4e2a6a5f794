//! Flow event model
//!
//! Probes emit one [`FlowEvent`] per instrumented occurrence: entering or
//! leaving an operation or constructor, calling another operation, or
//! splitting into a concurrent continuation. Every event carries the id of the
//! trace it belongs to and its position (`order_index`) inside that trace.
//!
//! # Wire shape
//!
//! Events are internally tagged so a batch reads naturally as JSON:
//!
//! ```text
//! {"type":"BeforeOperation","timestamp":10,"trace_id":1,"order_index":0,
//!  "operation_signature":"public void shop.Cart.add(int)","class_signature":"shop.Cart"}
//! ```
//!
//! # Example
//!
//! ```
//! use flowtrace::flow_event::{FlowEvent, OperationKind};
//!
//! let before = FlowEvent::before_operation(10, 1, 0, "void shop.Cart.add()", "shop.Cart");
//! assert_eq!(before.order_index(), 0);
//! assert_eq!(before.operation_kind(), Some(OperationKind::Operation));
//! assert!(before.is_before());
//! ```

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

/// `type` tags of all events this crate understands
const KNOWN_TYPES: &[&str] = &[
    "BeforeOperation",
    "BeforeConstructor",
    "AfterOperation",
    "AfterConstructor",
    "AfterOperationFailed",
    "AfterConstructorFailed",
    "CallOperation",
    "CallConstructor",
    "Split",
];

/// Payload shared by before/after events of operations and constructors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationEvent {
    pub timestamp: i64,
    pub trace_id: i64,
    pub order_index: i32,
    pub operation_signature: String,
    #[serde(default)]
    pub class_signature: String,
}

/// After-event of an operation that terminated with an exception
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationFailedEvent {
    pub timestamp: i64,
    pub trace_id: i64,
    pub order_index: i32,
    pub operation_signature: String,
    #[serde(default)]
    pub class_signature: String,
    #[serde(default)]
    pub cause: String,
}

/// Call marker emitted by the caller right before control transfers
///
/// `operation_signature`/`class_signature` describe the caller,
/// `callee_*` the operation being called.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallEvent {
    pub timestamp: i64,
    pub trace_id: i64,
    pub order_index: i32,
    pub operation_signature: String,
    #[serde(default)]
    pub class_signature: String,
    pub callee_operation_signature: String,
    #[serde(default)]
    pub callee_class_signature: String,
}

impl CallEvent {
    /// True if this call names exactly the given operation and class
    pub fn calls_referenced_operation_of(
        &self,
        operation_signature: &str,
        class_signature: &str,
    ) -> bool {
        self.callee_operation_signature == operation_signature
            && self.callee_class_signature == class_signature
    }
}

/// Concurrency split marker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitEvent {
    pub timestamp: i64,
    pub trace_id: i64,
    pub order_index: i32,
}

/// An event of a type this crate does not know
///
/// Only the fields common to all events are kept so the event still takes
/// part in order-index validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnknownEvent {
    #[serde(rename = "type")]
    pub type_name: String,
    pub timestamp: i64,
    pub trace_id: i64,
    pub order_index: i32,
}

/// Whether an event concerns a regular operation or a constructor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Operation,
    Constructor,
}

/// A single monitored flow event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FlowEvent {
    BeforeOperation(OperationEvent),
    BeforeConstructor(OperationEvent),
    AfterOperation(OperationEvent),
    AfterConstructor(OperationEvent),
    AfterOperationFailed(OperationFailedEvent),
    AfterConstructorFailed(OperationFailedEvent),
    CallOperation(CallEvent),
    CallConstructor(CallEvent),
    Split(SplitEvent),
    /// Built by [`FlowEvent::from_value`] for unrecognised `type` tags
    #[serde(skip)]
    Unknown(UnknownEvent),
}

impl FlowEvent {
    /// Decode an event, keeping events with an unrecognised `type` tag
    ///
    /// Known event types must be well-formed. Unknown types only need the
    /// common fields and become [`FlowEvent::Unknown`].
    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        let is_known = value
            .get("type")
            .and_then(|t| t.as_str())
            .map_or(true, |t| KNOWN_TYPES.contains(&t));
        if is_known {
            serde_json::from_value(value)
        } else {
            serde_json::from_value(value).map(Self::Unknown)
        }
    }

    pub fn before_operation(
        timestamp: i64,
        trace_id: i64,
        order_index: i32,
        operation_signature: &str,
        class_signature: &str,
    ) -> Self {
        Self::BeforeOperation(OperationEvent::new(
            timestamp,
            trace_id,
            order_index,
            operation_signature,
            class_signature,
        ))
    }

    pub fn before_constructor(
        timestamp: i64,
        trace_id: i64,
        order_index: i32,
        operation_signature: &str,
        class_signature: &str,
    ) -> Self {
        Self::BeforeConstructor(OperationEvent::new(
            timestamp,
            trace_id,
            order_index,
            operation_signature,
            class_signature,
        ))
    }

    pub fn after_operation(
        timestamp: i64,
        trace_id: i64,
        order_index: i32,
        operation_signature: &str,
        class_signature: &str,
    ) -> Self {
        Self::AfterOperation(OperationEvent::new(
            timestamp,
            trace_id,
            order_index,
            operation_signature,
            class_signature,
        ))
    }

    pub fn after_constructor(
        timestamp: i64,
        trace_id: i64,
        order_index: i32,
        operation_signature: &str,
        class_signature: &str,
    ) -> Self {
        Self::AfterConstructor(OperationEvent::new(
            timestamp,
            trace_id,
            order_index,
            operation_signature,
            class_signature,
        ))
    }

    pub fn after_operation_failed(
        timestamp: i64,
        trace_id: i64,
        order_index: i32,
        operation_signature: &str,
        class_signature: &str,
        cause: &str,
    ) -> Self {
        Self::AfterOperationFailed(OperationFailedEvent {
            timestamp,
            trace_id,
            order_index,
            operation_signature: operation_signature.to_string(),
            class_signature: class_signature.to_string(),
            cause: cause.to_string(),
        })
    }

    pub fn after_constructor_failed(
        timestamp: i64,
        trace_id: i64,
        order_index: i32,
        operation_signature: &str,
        class_signature: &str,
        cause: &str,
    ) -> Self {
        Self::AfterConstructorFailed(OperationFailedEvent {
            timestamp,
            trace_id,
            order_index,
            operation_signature: operation_signature.to_string(),
            class_signature: class_signature.to_string(),
            cause: cause.to_string(),
        })
    }

    /// Call marker; `caller_*` describe the calling operation
    pub fn call_operation(
        timestamp: i64,
        trace_id: i64,
        order_index: i32,
        caller_operation: &str,
        caller_class: &str,
        callee_operation: &str,
        callee_class: &str,
    ) -> Self {
        Self::CallOperation(CallEvent {
            timestamp,
            trace_id,
            order_index,
            operation_signature: caller_operation.to_string(),
            class_signature: caller_class.to_string(),
            callee_operation_signature: callee_operation.to_string(),
            callee_class_signature: callee_class.to_string(),
        })
    }

    pub fn call_constructor(
        timestamp: i64,
        trace_id: i64,
        order_index: i32,
        caller_operation: &str,
        caller_class: &str,
        callee_operation: &str,
        callee_class: &str,
    ) -> Self {
        Self::CallConstructor(CallEvent {
            timestamp,
            trace_id,
            order_index,
            operation_signature: caller_operation.to_string(),
            class_signature: caller_class.to_string(),
            callee_operation_signature: callee_operation.to_string(),
            callee_class_signature: callee_class.to_string(),
        })
    }

    pub fn split(timestamp: i64, trace_id: i64, order_index: i32) -> Self {
        Self::Split(SplitEvent {
            timestamp,
            trace_id,
            order_index,
        })
    }

    pub fn timestamp(&self) -> i64 {
        match self {
            Self::BeforeOperation(e)
            | Self::BeforeConstructor(e)
            | Self::AfterOperation(e)
            | Self::AfterConstructor(e) => e.timestamp,
            Self::AfterOperationFailed(e) | Self::AfterConstructorFailed(e) => e.timestamp,
            Self::CallOperation(e) | Self::CallConstructor(e) => e.timestamp,
            Self::Split(e) => e.timestamp,
            Self::Unknown(e) => e.timestamp,
        }
    }

    pub fn trace_id(&self) -> i64 {
        match self {
            Self::BeforeOperation(e)
            | Self::BeforeConstructor(e)
            | Self::AfterOperation(e)
            | Self::AfterConstructor(e) => e.trace_id,
            Self::AfterOperationFailed(e) | Self::AfterConstructorFailed(e) => e.trace_id,
            Self::CallOperation(e) | Self::CallConstructor(e) => e.trace_id,
            Self::Split(e) => e.trace_id,
            Self::Unknown(e) => e.trace_id,
        }
    }

    pub fn order_index(&self) -> i32 {
        match self {
            Self::BeforeOperation(e)
            | Self::BeforeConstructor(e)
            | Self::AfterOperation(e)
            | Self::AfterConstructor(e) => e.order_index,
            Self::AfterOperationFailed(e) | Self::AfterConstructorFailed(e) => e.order_index,
            Self::CallOperation(e) | Self::CallConstructor(e) => e.order_index,
            Self::Split(e) => e.order_index,
            Self::Unknown(e) => e.order_index,
        }
    }

    /// Operation signature of the event's own operation (the caller for calls)
    pub fn operation_signature(&self) -> Option<&str> {
        match self {
            Self::BeforeOperation(e)
            | Self::BeforeConstructor(e)
            | Self::AfterOperation(e)
            | Self::AfterConstructor(e) => Some(&e.operation_signature),
            Self::AfterOperationFailed(e) | Self::AfterConstructorFailed(e) => {
                Some(&e.operation_signature)
            }
            Self::CallOperation(e) | Self::CallConstructor(e) => Some(&e.operation_signature),
            Self::Split(_) | Self::Unknown(_) => None,
        }
    }

    pub fn class_signature(&self) -> Option<&str> {
        match self {
            Self::BeforeOperation(e)
            | Self::BeforeConstructor(e)
            | Self::AfterOperation(e)
            | Self::AfterConstructor(e) => Some(&e.class_signature),
            Self::AfterOperationFailed(e) | Self::AfterConstructorFailed(e) => {
                Some(&e.class_signature)
            }
            Self::CallOperation(e) | Self::CallConstructor(e) => Some(&e.class_signature),
            Self::Split(_) | Self::Unknown(_) => None,
        }
    }

    /// Operation or constructor; `None` for split events
    pub fn operation_kind(&self) -> Option<OperationKind> {
        match self {
            Self::BeforeOperation(_)
            | Self::AfterOperation(_)
            | Self::AfterOperationFailed(_)
            | Self::CallOperation(_) => Some(OperationKind::Operation),
            Self::BeforeConstructor(_)
            | Self::AfterConstructor(_)
            | Self::AfterConstructorFailed(_)
            | Self::CallConstructor(_) => Some(OperationKind::Constructor),
            Self::Split(_) | Self::Unknown(_) => None,
        }
    }

    /// The call payload, if this is a call marker
    pub fn as_call(&self) -> Option<&CallEvent> {
        match self {
            Self::CallOperation(e) | Self::CallConstructor(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_call(&self) -> bool {
        self.as_call().is_some()
    }

    pub fn is_before(&self) -> bool {
        matches!(self, Self::BeforeOperation(_) | Self::BeforeConstructor(_))
    }

    /// Failure cause carried by `*Failed` after-events
    pub fn cause(&self) -> Option<&str> {
        match self {
            Self::AfterOperationFailed(e) | Self::AfterConstructorFailed(e) => Some(&e.cause),
            _ => None,
        }
    }

    /// Variant name, used in log messages
    pub fn type_name(&self) -> &str {
        match self {
            Self::BeforeOperation(_) => "BeforeOperation",
            Self::BeforeConstructor(_) => "BeforeConstructor",
            Self::AfterOperation(_) => "AfterOperation",
            Self::AfterConstructor(_) => "AfterConstructor",
            Self::AfterOperationFailed(_) => "AfterOperationFailed",
            Self::AfterConstructorFailed(_) => "AfterConstructorFailed",
            Self::CallOperation(_) => "CallOperation",
            Self::CallConstructor(_) => "CallConstructor",
            Self::Split(_) => "Split",
            Self::Unknown(e) => &e.type_name,
        }
    }
}

impl OperationEvent {
    pub fn new(
        timestamp: i64,
        trace_id: i64,
        order_index: i32,
        operation_signature: &str,
        class_signature: &str,
    ) -> Self {
        Self {
            timestamp,
            trace_id,
            order_index,
            operation_signature: operation_signature.to_string(),
            class_signature: class_signature.to_string(),
        }
    }
}

/// Metadata shared by all events of one trace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceMetadata {
    pub trace_id: i64,
    #[serde(default)]
    pub thread_id: i64,
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub hostname: String,
    /// Trace that spawned this one, if it was forked off another trace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_trace_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_order_id: Option<i32>,
}

impl TraceMetadata {
    pub fn new(trace_id: i64, session_id: &str, hostname: &str) -> Self {
        Self {
            trace_id,
            thread_id: 0,
            session_id: session_id.to_string(),
            hostname: hostname.to_string(),
            parent_trace_id: None,
            parent_order_id: None,
        }
    }
}

/// One complete trace as delivered by the deserialization layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEventRecords {
    pub trace: TraceMetadata,
    #[serde(default, deserialize_with = "deserialize_events")]
    pub events: Vec<FlowEvent>,
}

fn deserialize_events<'de, D>(deserializer: D) -> Result<Vec<FlowEvent>, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::<serde_json::Value>::deserialize(deserializer)?
        .into_iter()
        .map(|value| FlowEvent::from_value(value).map_err(D::Error::custom))
        .collect()
}

impl TraceEventRecords {
    pub fn new(trace: TraceMetadata, events: Vec<FlowEvent>) -> Self {
        Self { trace, events }
    }

    pub fn trace_id(&self) -> i64 {
        self.trace.trace_id
    }
}
