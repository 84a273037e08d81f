// CLASSIFICATION: COMMUNITY
// Filename: queue.rs v0.6
// Author: Lukas Bower
// Date Modified: 2026-06-28

//! Per-handle FIFO of pending change notifications.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::types::{Entity, EntityId, EntityPath, LogEntry, LogRecordId, Record, RecordId};

/// A change notification queued for the layer above.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    EntityAdded(Entity),
    EntityChanged(Entity),
    EntityRemoved {
        id: EntityId,
        path: EntityPath,
    },
    RecordAdded {
        entity_id: EntityId,
        record: Record,
    },
    RecordRemoved {
        record_id: RecordId,
        entity_path: EntityPath,
    },
    LogEntryAdded {
        record_id: LogRecordId,
        entry: LogEntry,
    },
}

/// Unbounded FIFO. Producers are the reconciler and the log sync;
/// the sole consumer is the upper layer via `pop`. Nothing here
/// reorders or drops; bounding is the upper layer's policy.
#[derive(Debug, Default)]
pub struct EventQueue {
    buffer: VecDeque<Event>,
}

impl EventQueue {
    pub fn new() -> Self {
        EventQueue::default()
    }

    pub fn push(&mut self, event: Event) {
        self.buffer.push_back(event);
    }

    /// Append a reconciliation batch in order.
    pub fn push_batch(&mut self, events: Vec<Event>) {
        self.buffer.extend(events);
    }

    /// Oldest pending event, or `None` when the queue is drained.
    pub fn pop(&mut self) -> Option<Event> {
        self.buffer.pop_front()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
