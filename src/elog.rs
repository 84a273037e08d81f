// CLASSIFICATION: COMMUNITY
// Filename: elog.rs v1.1
// Author: Lukas Bower
// Date Modified: 2026-07-12

//! Local mirror of a remote, append-mostly hardware event log.
//!
//! The mirror never re-reads the whole hardware log on a routine poll.
//! `check_sync` probes the newest hardware entry and either no-ops,
//! fetches exactly the gap, or declares the cache stale and rebuilds it
//! from scratch. Entries keep the relative order the remote log had at
//! the last successful sync.

use log::{debug, info, warn};
use std::collections::VecDeque;

use crate::backend::Backend;
use crate::config::OverflowPolicy;
use crate::error::{MirrorError, MirrorResult};
use crate::queue::{Event, EventQueue};
use crate::types::{LogEntry, LogRecordId, LogTimestamp};

/// A mirrored entry plus its mirror-local sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedLogEntry {
    pub record_id: LogRecordId,
    pub entry: LogEntry,
}

/// Cursor into the mirror for entry retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogPosition {
    Oldest,
    Newest,
    Id(LogRecordId),
}

/// Summary of the mirror's state for the upper layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogInfo {
    pub entries: u32,
    pub capacity: u32,
    pub last_update: Option<LogTimestamp>,
    pub overflow: bool,
    pub overflow_policy: OverflowPolicy,
}

/// What a `check_sync` call ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Newest hardware entry matched the cache; nothing fetched beyond
    /// the one probe.
    AlreadySynced,
    /// The gap was found and exactly this many entries were appended.
    Appended(u32),
    /// Cache was (re)built from scratch with this many entries.
    Rebuilt(u32),
    /// Hardware log is empty; the mirror was emptied to match.
    Cleared,
}

/// The local mirror. Entries are held oldest to newest.
#[derive(Debug)]
pub struct EventLogCache {
    entries: VecDeque<CachedLogEntry>,
    next_id: u32,
    capacity: u32,
    overflow: bool,
    synced_once: bool,
    last_update: Option<LogTimestamp>,
}

impl EventLogCache {
    pub fn new(capacity: u32) -> Self {
        EventLogCache {
            entries: VecDeque::new(),
            next_id: 1,
            capacity,
            overflow: false,
            synced_once: false,
            last_update: None,
        }
    }

    /// Append one decoded entry, wrapping out the oldest entry at
    /// capacity (overwrite-oldest is the only policy the hardware
    /// implements). Seeing a backend overflow sentinel latches the
    /// overflow flag.
    pub fn append(&mut self, entry: LogEntry) -> LogRecordId {
        if self.capacity > 0 && self.entries.len() as u32 == self.capacity {
            self.entries.pop_front();
        }
        if entry.overflow_marker {
            self.overflow = true;
        }
        let id = LogRecordId(self.next_id);
        self.next_id += 1;
        self.last_update = Some(entry.timestamp);
        self.entries.push_back(CachedLogEntry { record_id: id, entry });
        id
    }

    /// Drop every entry and reset overflow. The next `check_sync` will
    /// rebuild, picking up any "log cleared" marker the hardware
    /// appends after its own clear.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.next_id = 1;
        self.overflow = false;
        self.synced_once = false;
        self.last_update = None;
    }

    pub fn newest(&self) -> Option<&CachedLogEntry> {
        self.entries.back()
    }

    pub fn oldest(&self) -> Option<&CachedLogEntry> {
        self.entries.front()
    }

    /// Retrieve an entry with the ids of its neighbours, for sequential
    /// reads by the upper layer.
    pub fn get(
        &self,
        pos: LogPosition,
    ) -> MirrorResult<(&CachedLogEntry, Option<LogRecordId>, Option<LogRecordId>)> {
        if self.entries.is_empty() {
            return Err(MirrorError::NotPresent);
        }
        let idx = match pos {
            LogPosition::Oldest => 0,
            LogPosition::Newest => self.entries.len() - 1,
            LogPosition::Id(id) => self
                .entries
                .iter()
                .position(|c| c.record_id == id)
                .ok_or(MirrorError::NotPresent)?,
        };
        let prev = if idx > 0 {
            Some(self.entries[idx - 1].record_id)
        } else {
            None
        };
        let next = if idx + 1 < self.entries.len() {
            Some(self.entries[idx + 1].record_id)
        } else {
            None
        };
        Ok((&self.entries[idx], prev, next))
    }

    pub fn info(&self) -> LogInfo {
        LogInfo {
            entries: self.entries.len() as u32,
            capacity: self.capacity,
            last_update: self.last_update,
            overflow: self.overflow,
            overflow_policy: OverflowPolicy::OverwriteOldest,
        }
    }

    pub fn overflow(&self) -> bool {
        self.overflow
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iterate(&self) -> impl Iterator<Item = &CachedLogEntry> {
        self.entries.iter()
    }
}

/// Synchronize the mirror with the hardware log.
///
/// Serialization against other pollers of the same handle is the
/// caller's handle lock; the hardware cursor does not tolerate
/// interleaved readers.
pub fn check_sync(
    backend: &dyn Backend,
    cache: &mut EventLogCache,
    queue: &mut EventQueue,
    simulated: bool,
) -> MirrorResult<SyncOutcome> {
    if !cache.synced_once || (cache.is_empty() && !simulated) {
        return rebuild(backend, cache, queue);
    }
    if cache.is_empty() {
        // A simulated backend's empty log is genuinely empty.
        return Ok(SyncOutcome::AlreadySynced);
    }
    sync_incremental(backend, cache, queue)
}

/// Full rebuild: size probe, then fetch newest-to-oldest so the mirror
/// fills oldest-first.
fn rebuild(
    backend: &dyn Backend,
    cache: &mut EventLogCache,
    queue: &mut EventQueue,
) -> MirrorResult<SyncOutcome> {
    let size = backend.log_size()?;
    let mut appended = 0u32;
    for index in (1..=size).rev() {
        match backend.fetch_entry(index) {
            Ok(entry) => {
                let id = cache.append(entry.clone());
                queue.push(Event::LogEntryAdded { record_id: id, entry });
                appended += 1;
            }
            Err(err) if err.aborts_batch() => {
                warn!("log rebuild aborted at index {index}: {err}");
                cache.synced_once = true;
                return Err(err);
            }
            Err(err) => {
                // One corrupt record must not block the rest of the log.
                warn!("skipping unreadable log entry at index {index}: {err}");
            }
        }
    }
    cache.synced_once = true;
    info!("log mirror rebuilt with {appended} of {size} hardware entries");
    Ok(SyncOutcome::Rebuilt(appended))
}

/// Incremental catch-up: walk hardware indices until the cache's newest
/// timestamp is found, then append the gap in hardware order. Walked
/// entries are retained so each new entry is fetched exactly once.
fn sync_incremental(
    backend: &dyn Backend,
    cache: &mut EventLogCache,
    queue: &mut EventQueue,
) -> MirrorResult<SyncOutcome> {
    let cache_ts = match cache.newest() {
        Some(newest) => newest.entry.timestamp,
        None => return rebuild(backend, cache, queue),
    };

    let newest_hw = match backend.fetch_newest() {
        Ok(entry) => entry,
        Err(MirrorError::NotPresent) => {
            // Hardware log came back empty underneath us.
            debug!("hardware log is empty, emptying mirror to match");
            cache.clear();
            cache.synced_once = true;
            return Ok(SyncOutcome::Cleared);
        }
        Err(err) => return Err(err),
    };

    if newest_hw.timestamp == cache_ts {
        return Ok(SyncOutcome::AlreadySynced);
    }

    // Newest-first gap buffer; index 1 is already in hand.
    let mut walked: Vec<LogEntry> = vec![newest_hw];
    let mut index = 2u32;
    loop {
        match backend.fetch_entry(index) {
            Ok(entry) => {
                if entry.timestamp == cache_ts {
                    break;
                }
                walked.push(entry);
                index += 1;
            }
            Err(MirrorError::NotPresent) => {
                // Walked off the end without finding our newest entry:
                // stale beyond recovery.
                info!("log mirror stale beyond recovery after {index} probes, rebuilding");
                cache.clear();
                return rebuild(backend, cache, queue);
            }
            Err(err) => {
                // Transient failure mid-walk. Previously read entries in
                // the mirror stay valid; report and leave it as-is.
                return Err(err);
            }
        }
    }

    let gap = walked.len() as u32;
    for entry in walked.into_iter().rev() {
        let id = cache.append(entry.clone());
        queue.push(Event::LogEntryAdded { record_id: id, entry });
    }
    debug!("log mirror caught up by {gap} entries");
    Ok(SyncOutcome::Appended(gap))
}
