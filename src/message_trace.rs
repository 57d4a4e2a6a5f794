//! Message traces: executions turned into call and reply messages
//!
//! Walking an [`ExecutionTrace`] in eoi order with a stack of open executions
//! yields the synchronous message exchange between them. Every root-level
//! execution is called by the synthetic root execution (`$`).
//!
//! ```text
//!   executions (eoi, ess)        messages
//!   ───────────────────────      ─────────────────────────
//!   A (0, 0)                     Call   $ → A   @ A.entry
//!   B (1, 1)                     Call   A → B   @ B.entry
//!   C (2, 1)                     Reply  B → A   @ B.exit
//!                                Call   A → C   @ C.entry
//!                                Reply  C → A   @ C.exit
//!                                Reply  A → $   @ A.exit
//! ```
//!
//! # Example
//!
//! ```
//! use flowtrace::execution_trace::{ExecutionEntry, ExecutionTrace};
//! use flowtrace::message_trace::Message;
//! use flowtrace::signature::ClassOperationSignaturePair;
//! use flowtrace::system_model::SystemModelRepository;
//!
//! # fn main() -> Result<(), flowtrace::error::InvalidTrace> {
//! let repository = SystemModelRepository::new();
//! let pair = ClassOperationSignaturePair::split("void shop.Cart.add()", false);
//! let (allocation, operation) = repository.resolve_execution("srv", "shop.Cart", &pair);
//!
//! let mut trace = ExecutionTrace::new(7, "s");
//! trace.add(ExecutionEntry {
//!     allocation,
//!     operation,
//!     trace_id: 7,
//!     session_id: "s".to_string(),
//!     eoi: 0,
//!     ess: 0,
//!     entry_time: 1,
//!     exit_time: 2,
//!     assumed: false,
//!     is_constructor: false,
//! })?;
//!
//! let messages = trace.to_message_trace()?;
//! assert_eq!(messages.len(), 2);
//! assert!(messages.messages()[0].is_call());
//! assert!(messages.messages()[0].sender().is_root());
//! # Ok(())
//! # }
//! ```

use crate::error::{InvalidTrace, Result};
use crate::execution_trace::{ExecutionEntry, ExecutionTrace};
use std::fmt;

/// A synchronous call or its reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Call {
        timestamp: i64,
        sender: ExecutionEntry,
        receiver: ExecutionEntry,
    },
    Reply {
        timestamp: i64,
        sender: ExecutionEntry,
        receiver: ExecutionEntry,
    },
}

impl Message {
    pub fn timestamp(&self) -> i64 {
        match self {
            Self::Call { timestamp, .. } | Self::Reply { timestamp, .. } => *timestamp,
        }
    }

    pub fn sender(&self) -> &ExecutionEntry {
        match self {
            Self::Call { sender, .. } | Self::Reply { sender, .. } => sender,
        }
    }

    pub fn receiver(&self) -> &ExecutionEntry {
        match self {
            Self::Call { receiver, .. } | Self::Reply { receiver, .. } => receiver,
        }
    }

    pub fn is_call(&self) -> bool {
        matches!(self, Self::Call { .. })
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_call() { "call" } else { "reply" };
        write!(
            f,
            "{} {}.{} -> {}.{} @ {}",
            kind,
            self.sender().component(),
            self.sender().operation.signature.name,
            self.receiver().component(),
            self.receiver().operation.signature.name,
            self.timestamp()
        )
    }
}

/// Message sequence derived from one execution trace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTrace {
    trace_id: i64,
    session_id: String,
    messages: Vec<Message>,
}

impl MessageTrace {
    pub fn trace_id(&self) -> i64 {
        self.trace_id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Call messages only, in emission order
    pub fn call_messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| m.is_call())
    }
}

impl ExecutionTrace {
    /// Derive the call/reply message sequence
    ///
    /// # Errors
    ///
    /// Fails with [`InvalidTrace`] if an execution's ess does not directly
    /// follow its caller's (a root-level execution must have ess 0, every
    /// other execution exactly one more than the execution calling it).
    pub fn to_message_trace(&self) -> Result<MessageTrace> {
        let root = ExecutionEntry::root(self.trace_id(), self.session_id());
        let mut messages = Vec::with_capacity(self.len() * 2);
        let mut open: Vec<&ExecutionEntry> = Vec::new();

        for entry in self {
            while let Some(top) = open.last().copied() {
                if top.ess < entry.ess {
                    break;
                }
                open.pop();
                messages.push(Message::Reply {
                    timestamp: top.exit_time,
                    sender: top.clone(),
                    receiver: open.last().map_or_else(|| root.clone(), |&p| p.clone()),
                });
            }

            let caller = match open.last() {
                None if entry.ess == 0 => &root,
                Some(parent) if parent.ess == entry.ess - 1 => *parent,
                parent => {
                    return Err(InvalidTrace::new(
                        self.trace_id(),
                        format!(
                            "execution {} has ess {} but its caller has ess {}",
                            entry,
                            entry.ess,
                            parent.map_or(root.ess, |p| p.ess)
                        ),
                    ));
                }
            };
            messages.push(Message::Call {
                timestamp: entry.entry_time,
                sender: caller.clone(),
                receiver: entry.clone(),
            });
            open.push(entry);
        }

        while let Some(top) = open.pop() {
            messages.push(Message::Reply {
                timestamp: top.exit_time,
                sender: top.clone(),
                receiver: open.last().map_or_else(|| root.clone(), |&p| p.clone()),
            });
        }

        Ok(MessageTrace {
            trace_id: self.trace_id(),
            session_id: self.session_id().to_string(),
            messages,
        })
    }
}
