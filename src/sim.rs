// CLASSIFICATION: COMMUNITY
// Filename: sim.rs v0.6
// Author: Lukas Bower
// Date Modified: 2026-07-19

//! Scripted in-memory backend.
//!
//! Stands in for real management hardware in tests and for handlers
//! registered with `HandlerConfig::simulated`. The script is plain
//! data: a snapshot the next probe returns, a log the fetch calls read,
//! and optional injected failures.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use crate::backend::Backend;
use crate::cache::EntityCache;
use crate::error::{MirrorError, MirrorResult};
use crate::types::{LogEntry, LogTimestamp, Severity};

struct SimState {
    snapshot: EntityCache,
    /// Oldest first, the order hardware wrote them.
    log: Vec<LogEntry>,
    fail_next_probe: Option<MirrorError>,
    poisoned_index: Option<u32>,
}

/// In-memory [`Backend`] driven entirely by the test or caller.
pub struct SimBackend {
    inner: Mutex<SimState>,
    fetches: AtomicU32,
}

impl Default for SimBackend {
    fn default() -> Self {
        SimBackend::new()
    }
}

impl SimBackend {
    pub fn new() -> Self {
        SimBackend {
            inner: Mutex::new(SimState {
                snapshot: EntityCache::new(),
                log: Vec::new(),
                fail_next_probe: None,
                poisoned_index: None,
            }),
            fetches: AtomicU32::new(0),
        }
    }

    fn state(&self) -> MirrorResult<std::sync::MutexGuard<'_, SimState>> {
        self.inner.lock().map_err(|_| MirrorError::LockPoisoned)
    }

    /// Replace what the next probe will observe.
    pub fn set_snapshot(&self, snapshot: EntityCache) {
        if let Ok(mut st) = self.state() {
            st.snapshot = snapshot;
        }
    }

    /// Append one entry to the scripted hardware log.
    pub fn push_log_entry(&self, entry: LogEntry) {
        if let Ok(mut st) = self.state() {
            st.log.push(entry);
        }
    }

    /// Wipe the scripted log without leaving a marker entry, as if the
    /// hardware lost it outright.
    pub fn truncate_log(&self) {
        if let Ok(mut st) = self.state() {
            st.log.clear();
        }
    }

    /// Make the next probe fail with `err` instead of returning a
    /// snapshot.
    pub fn fail_next_probe(&self, err: MirrorError) {
        if let Ok(mut st) = self.state() {
            st.fail_next_probe = Some(err);
        }
    }

    /// Make one hardware log index unreadable.
    pub fn poison_index(&self, index: u32) {
        if let Ok(mut st) = self.state() {
            st.poisoned_index = Some(index);
        }
    }

    /// Log fetches performed since the last [`SimBackend::reset_counters`].
    pub fn fetch_count(&self) -> u32 {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn reset_counters(&self) {
        self.fetches.store(0, Ordering::SeqCst);
    }
}

impl Backend for SimBackend {
    fn probe_snapshot(&self) -> MirrorResult<EntityCache> {
        let mut st = self.state()?;
        if let Some(err) = st.fail_next_probe.take() {
            return Err(err);
        }
        Ok(st.snapshot.clone())
    }

    fn log_size(&self) -> MirrorResult<u32> {
        Ok(self.state()?.log.len() as u32)
    }

    fn fetch_entry(&self, index: u32) -> MirrorResult<LogEntry> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let st = self.state()?;
        if st.poisoned_index == Some(index) {
            return Err(MirrorError::Protocol(format!(
                "unreadable log entry at index {index}"
            )));
        }
        if index == 0 {
            return Err(MirrorError::InvalidParams("log indices start at 1"));
        }
        let len = st.log.len() as u32;
        if index > len {
            return Err(MirrorError::NotPresent);
        }
        // Index 1 is the newest entry, the way management logs count.
        Ok(st.log[(len - index) as usize].clone())
    }

    fn hardware_clear(&self) -> MirrorResult<()> {
        let mut st = self.state()?;
        let next_ts: LogTimestamp = st.log.last().map(|e| e.timestamp + 1).unwrap_or(1);
        st.log.clear();
        // Real management modules drop a marker entry into the freshly
        // cleared log.
        st.log.push(LogEntry {
            timestamp: next_ts,
            severity: Severity::Informational,
            source: "SERVPROC".into(),
            message: "Event log has been cleared".into(),
            entity_path: None,
            overflow_marker: false,
        });
        Ok(())
    }
}
