// CLASSIFICATION: COMMUNITY
// Filename: lib.rs v0.9
// Author: Lukas Bower
// Date Modified: 2026-07-19

//! hwmirror: caching and synchronization core for hardware management
//! backends.
//!
//! A single process talks to managed equipment over slow, narrow
//! management links and presents one consistent, protocol-agnostic view
//! of resources, their records, and the hardware event log. This crate
//! is the state-keeping middle of that process: the entity cache, the
//! discovery reconciler, the event-log mirror, the per-handle event
//! queue, and the handle lifecycle that makes them safe to share.
//!
//! Wire codecs (SNMP, IPMI, SOAP) live behind the [`backend::Backend`]
//! trait and are injected per handler; this crate performs no protocol
//! I/O of its own.

/// Common cross-module types.
pub mod types;

/// Error taxonomy shared by every component.
pub mod error;

/// Handler configuration and process-wide defaults.
pub mod config;

/// Protocol boundary traits.
pub mod backend;

/// Authoritative entity/record cache.
pub mod cache;

/// Per-handle event FIFO.
pub mod queue;

/// Discovery diff/apply.
pub mod reconcile;

/// Event-log mirror and sync state machine.
pub mod elog;

/// Process-wide handle registry and lifecycle.
pub mod registry;

/// Scripted in-memory backend for tests and simulated handlers.
pub mod sim;

pub use backend::Backend;
pub use cache::EntityCache;
pub use config::{HandlerConfig, OverflowPolicy};
pub use elog::{EventLogCache, LogInfo, LogPosition, SyncOutcome};
pub use error::{MirrorError, MirrorResult};
pub use queue::{Event, EventQueue};
pub use registry::{acquire, register, unregister, HandleGuard, TestRegistryGuard};
pub use types::{
    Capabilities, Entity, EntityAttrs, EntityId, EntityKind, EntityPath, HandleId, LogEntry,
    LogRecordId, LogTimestamp, PathSegment, Record, RecordData, RecordId, RecordType, Severity,
};
