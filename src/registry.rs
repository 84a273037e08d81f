// CLASSIFICATION: COMMUNITY
// Filename: registry.rs v1.2
// Author: Lukas Bower
// Date Modified: 2026-07-19

//! Process-wide handle registry and per-handle lifecycle.
//!
//! Every cache, queue, and log mirror is reached through a registry
//! lookup that produces a [`HandleGuard`]. The guard holds the handle's
//! re-entrant lock for its lifetime: the same thread may nest
//! acquisitions freely, a second thread blocks until the first has fully
//! released. The registry's own table lock is independent of every
//! per-handle lock, so acquiring one handle never delays acquisition of
//! another.

use log::{debug, info};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, ThreadId};

use crate::backend::Backend;
use crate::cache::EntityCache;
use crate::config::HandlerConfig;
use crate::elog::{self, CachedLogEntry, EventLogCache, LogInfo, LogPosition, SyncOutcome};
use crate::error::{MirrorError, MirrorResult};
use crate::queue::{Event, EventQueue};
use crate::reconcile::{self, ReconcileStats};
use crate::types::{
    Entity, EntityId, EntityPath, HandleId, Record, RecordId, RecordType, Severity,
};

/// State owned exclusively by one handle, mutated only under its lock.
#[derive(Debug)]
pub struct HandleState {
    pub entities: EntityCache,
    pub events: EventQueue,
    pub log: EventLogCache,
}

struct LockMonitor {
    owner: Option<ThreadId>,
    depth: u32,
    refs: u32,
}

/// One registered handler instance: its backend, config, re-entrant
/// lock, and guarded state.
pub struct HandleSlot {
    id: HandleId,
    backend: Arc<dyn Backend>,
    config: HandlerConfig,
    monitor: Mutex<LockMonitor>,
    available: Condvar,
    state: Mutex<HandleState>,
}

impl Drop for HandleSlot {
    fn drop(&mut self) {
        debug!("handle {:?} destroyed", self.id);
    }
}

static HANDLES: Lazy<Mutex<HashMap<HandleId, Arc<HandleSlot>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

fn table() -> MirrorResult<MutexGuard<'static, HashMap<HandleId, Arc<HandleSlot>>>> {
    HANDLES.lock().map_err(|_| MirrorError::LockPoisoned)
}

/// Register a handler instance. Called once at handler activation.
pub fn register(
    id: HandleId,
    backend: Arc<dyn Backend>,
    config: HandlerConfig,
) -> MirrorResult<()> {
    let mut handles = table()?;
    if handles.contains_key(&id) {
        return Err(MirrorError::InvalidParams("handle id already registered"));
    }
    let slot = Arc::new(HandleSlot {
        id,
        backend,
        state: Mutex::new(HandleState {
            entities: EntityCache::new(),
            events: EventQueue::new(),
            log: EventLogCache::new(config.log_capacity),
        }),
        config,
        monitor: Mutex::new(LockMonitor { owner: None, depth: 0, refs: 0 }),
        available: Condvar::new(),
    });
    handles.insert(id, slot);
    info!("handle {id:?} registered");
    Ok(())
}

/// Remove a handle from the registry. Owned state is destroyed once the
/// last outstanding guard is released; callers still inside the handle
/// finish normally.
pub fn unregister(id: HandleId) -> MirrorResult<()> {
    let removed = table()?.remove(&id);
    match removed {
        Some(_) => {
            info!("handle {id:?} unregistered");
            Ok(())
        }
        None => Err(MirrorError::NotPresent),
    }
}

/// Look a handle up and take its re-entrant lock, blocking while a
/// different thread holds it. Nested acquisition by the holding thread
/// returns immediately.
pub fn acquire(id: HandleId) -> MirrorResult<HandleGuard> {
    let slot = table()?.get(&id).cloned().ok_or(MirrorError::NotPresent)?;

    let me = thread::current().id();
    {
        let mut mon = slot
            .monitor
            .lock()
            .map_err(|_| MirrorError::LockPoisoned)?;
        mon.refs += 1;
        while !(mon.owner.is_none() || mon.owner == Some(me)) {
            mon = slot
                .available
                .wait(mon)
                .map_err(|_| MirrorError::LockPoisoned)?;
        }
        mon.owner = Some(me);
        mon.depth += 1;
    }

    Ok(HandleGuard { slot, _not_send: PhantomData })
}

/// Outstanding references on a handle, for diagnostics and tests.
pub fn ref_count(id: HandleId) -> MirrorResult<u32> {
    let slot = table()?.get(&id).cloned().ok_or(MirrorError::NotPresent)?;
    let mon = slot.monitor.lock().map_err(|_| MirrorError::LockPoisoned)?;
    Ok(mon.refs)
}

/// Drop every registered handle. Test support, mirroring process
/// teardown.
pub fn reset() -> MirrorResult<()> {
    table()?.clear();
    Ok(())
}

/// Registered handle ids, unordered.
pub fn list() -> MirrorResult<Vec<HandleId>> {
    Ok(table()?.keys().copied().collect())
}

/// Clears the registry on construction and drop.
pub struct TestRegistryGuard;

impl TestRegistryGuard {
    pub fn new() -> Self {
        let _ = reset();
        TestRegistryGuard
    }
}

impl Default for TestRegistryGuard {
    fn default() -> Self {
        TestRegistryGuard::new()
    }
}

impl Drop for TestRegistryGuard {
    fn drop(&mut self) {
        let _ = reset();
    }
}

/// Scoped acquisition of one handle. All mirror operations run through
/// a guard; dropping it releases one lock level and one reference.
///
/// Deliberately `!Send`: re-entrancy is tracked per thread, so a guard
/// must be released on the thread that acquired it.
pub struct HandleGuard {
    slot: Arc<HandleSlot>,
    _not_send: PhantomData<*const ()>,
}

impl Drop for HandleGuard {
    fn drop(&mut self) {
        if let Ok(mut mon) = self.slot.monitor.lock() {
            mon.depth -= 1;
            mon.refs -= 1;
            if mon.depth == 0 {
                mon.owner = None;
                self.slot.available.notify_all();
            }
        }
    }
}

impl HandleGuard {
    pub fn id(&self) -> HandleId {
        self.slot.id
    }

    pub fn config(&self) -> &HandlerConfig {
        &self.slot.config
    }

    fn state(&self) -> MirrorResult<MutexGuard<'_, HandleState>> {
        self.slot.state.lock().map_err(|_| MirrorError::LockPoisoned)
    }

    /// Probe the hardware and reconcile the live entity cache against
    /// the result. A failed probe mutates nothing.
    pub fn discover(&self) -> MirrorResult<ReconcileStats> {
        let snapshot = self.slot.backend.probe_snapshot()?;
        let mut st = self.state()?;
        let HandleState { entities, events, .. } = &mut *st;
        Ok(reconcile::reconcile(entities, &snapshot, events))
    }

    /// Bring the log mirror up to date with the hardware log.
    pub fn sync_log(&self) -> MirrorResult<SyncOutcome> {
        let mut st = self.state()?;
        let HandleState { log, events, .. } = &mut *st;
        elog::check_sync(
            self.slot.backend.as_ref(),
            log,
            events,
            self.slot.config.simulated,
        )
    }

    /// Empty the local log mirror. The hardware-side clear is
    /// [`HandleGuard::hardware_clear`]; sequencing the two is the
    /// caller's business.
    pub fn clear_log(&self) -> MirrorResult<()> {
        self.state()?.log.clear();
        Ok(())
    }

    /// Ask the hardware to clear its own log.
    pub fn hardware_clear(&self) -> MirrorResult<()> {
        self.slot.backend.hardware_clear()
    }

    /// Oldest pending event, or `None` when the queue is drained.
    pub fn pop_event(&self) -> MirrorResult<Option<Event>> {
        Ok(self.state()?.events.pop())
    }

    pub fn pending_events(&self) -> MirrorResult<usize> {
        Ok(self.state()?.events.len())
    }

    pub fn get_entity(&self, id: EntityId) -> MirrorResult<Entity> {
        self.state()?
            .entities
            .get_by_id(id)
            .cloned()
            .ok_or(MirrorError::NotPresent)
    }

    pub fn get_entity_by_path(&self, path: &EntityPath) -> MirrorResult<Entity> {
        self.state()?
            .entities
            .get_by_path(path)
            .cloned()
            .ok_or(MirrorError::NotPresent)
    }

    /// Entities in insertion order, cloned out as one consistent view.
    pub fn entities(&self) -> MirrorResult<Vec<Entity>> {
        Ok(self.state()?.entities.iterate_entities().cloned().collect())
    }

    pub fn get_record(&self, entity_id: EntityId, record_id: RecordId) -> MirrorResult<Record> {
        self.state()?
            .entities
            .get_record(entity_id, record_id)
            .cloned()
            .ok_or(MirrorError::NotPresent)
    }

    pub fn get_record_by_type(
        &self,
        entity_id: EntityId,
        record_type: RecordType,
        type_num: u16,
    ) -> MirrorResult<Record> {
        self.state()?
            .entities
            .get_record_by_type(entity_id, record_type, type_num)
            .cloned()
            .ok_or(MirrorError::NotPresent)
    }

    pub fn records(&self, entity_id: EntityId) -> MirrorResult<Vec<Record>> {
        Ok(self.state()?.entities.iterate_records(entity_id).cloned().collect())
    }

    /// Rename a live entity and notify consumers.
    pub fn set_entity_tag(&self, id: EntityId, tag: &str) -> MirrorResult<()> {
        let mut st = self.state()?;
        let HandleState { entities, events, .. } = &mut *st;
        let entity = entities.entity_mut(id).ok_or(MirrorError::NotPresent)?;
        entity.tag = tag.to_string();
        let updated = entity.clone();
        events.push(Event::EntityChanged(updated));
        Ok(())
    }

    /// Adjust a live entity's severity and notify consumers.
    pub fn set_entity_severity(&self, id: EntityId, severity: Severity) -> MirrorResult<()> {
        let mut st = self.state()?;
        let HandleState { entities, events, .. } = &mut *st;
        let entity = entities.entity_mut(id).ok_or(MirrorError::NotPresent)?;
        entity.severity = severity;
        let updated = entity.clone();
        events.push(Event::EntityChanged(updated));
        Ok(())
    }

    pub fn log_info(&self) -> MirrorResult<LogInfo> {
        Ok(self.state()?.log.info())
    }

    /// Retrieve one mirrored log entry with its neighbour ids.
    pub fn log_entry(
        &self,
        pos: LogPosition,
    ) -> MirrorResult<(CachedLogEntry, Option<crate::types::LogRecordId>, Option<crate::types::LogRecordId>)> {
        let st = self.state()?;
        let (entry, prev, next) = st.log.get(pos)?;
        Ok((entry.clone(), prev, next))
    }
}
