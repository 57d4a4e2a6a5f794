//! flowtrace - Reconstruct execution and message traces from flow events
//!
//! Monitoring probes emit a flat stream of flow events per trace (before,
//! after, call markers). This library rebuilds the nested invocations behind
//! them and derives the synchronous call/reply messages between executions.
//!
//! # Architecture
//!
//! ```text
//! TraceEventRecords ─► reconstruction ─► event_handler ─► execution_trace ─► message_trace
//!                           │                  │
//!                        filter          system_model (shared, interned)
//! ```
//!
//! # Example
//!
//! ```
//! use flowtrace::config::ReconstructionConfig;
//! use flowtrace::flow_event::{FlowEvent, TraceEventRecords, TraceMetadata};
//! use flowtrace::reconstruction::TraceReconstructor;
//!
//! let reconstructor = TraceReconstructor::new(ReconstructionConfig::default());
//! let outcome = reconstructor.reconstruct(TraceEventRecords::new(
//!     TraceMetadata::new(42, "session", "srv"),
//!     vec![
//!         FlowEvent::call_operation(1, 42, 0, "void a.A.main()", "a.A", "void b.B.run()", "b.B"),
//!         FlowEvent::before_operation(2, 42, 1, "void b.B.run()", "b.B"),
//!         FlowEvent::after_operation(3, 42, 2, "void b.B.run()", "b.B"),
//!     ],
//! ));
//!
//! let executions = outcome.execution_trace().unwrap();
//! assert_eq!(executions.len(), 1);
//! assert_eq!(outcome.message_trace().unwrap().call_messages().count(), 1);
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod event_handler;
pub mod execution_trace;
pub mod filter;
pub mod flow_event;
pub mod input;
pub mod json_output;
pub mod message_trace;
pub mod reconstruction;
pub mod signature;
pub mod system_model;
pub mod text_output;
