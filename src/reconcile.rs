// CLASSIFICATION: COMMUNITY
// Filename: reconcile.rs v0.9
// Author: Lukas Bower
// Date Modified: 2026-07-05

//! Discovery reconciler: diff a freshly probed snapshot against the live
//! entity cache, apply the difference, and emit an ordered event batch.
//!
//! Matching is by entity path, never by id; hardware-assigned ids are not
//! stable across probes. Emission order is fixed: removals first with
//! records strictly before their owning entity, then a path-ordered walk
//! of the snapshot emitting adds and changes. Consumers build UI and
//! alerting off that order.

use log::debug;

use crate::cache::EntityCache;
use crate::queue::{Event, EventQueue};
use crate::types::EntityPath;

/// Path-keyed difference between the live cache and a probed snapshot.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileDelta {
    /// Present in live, absent from the snapshot.
    pub gone: Vec<EntityPath>,
    /// Present in the snapshot, unseen in live.
    pub fresh: Vec<EntityPath>,
    /// Present in both with different attributes or record sets.
    pub changed: Vec<EntityPath>,
    /// Present in both, identical.
    pub unchanged: Vec<EntityPath>,
}

/// Counts of applied mutations, for callers that log poll summaries.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileStats {
    pub removed: usize,
    pub added: usize,
    pub changed: usize,
    pub events: usize,
}

/// Compute the set difference between `live` and `snapshot`, all four
/// sets sorted by path.
pub fn diff(live: &EntityCache, snapshot: &EntityCache) -> ReconcileDelta {
    let mut delta = ReconcileDelta::default();

    for path in snapshot.sorted_paths() {
        let Some(snap) = snapshot.get_by_path(&path) else { continue };
        match live.get_by_path(&path) {
            None => delta.fresh.push(path),
            Some(cur) => {
                let attrs_differ = cur.attrs() != snap.attrs();
                let live_records: Vec<_> = live.iterate_records(cur.id).cloned().collect();
                let snap_records: Vec<_> = snapshot.iterate_records(snap.id).cloned().collect();
                if attrs_differ || live_records != snap_records {
                    delta.changed.push(path);
                } else {
                    delta.unchanged.push(path);
                }
            }
        }
    }

    for path in live.sorted_paths() {
        if snapshot.get_by_path(&path).is_none() {
            delta.gone.push(path);
        }
    }

    delta
}

/// Apply a probed snapshot to the live cache and queue the resulting
/// events as one batch.
///
/// The caller has already survived the probe; from here on nothing
/// fails. A snapshot with zero entities is a valid observation and
/// removes everything.
pub fn reconcile(
    live: &mut EntityCache,
    snapshot: &EntityCache,
    queue: &mut EventQueue,
) -> ReconcileStats {
    let delta = diff(live, snapshot);
    debug!(
        "reconcile: {} gone, {} new, {} changed, {} unchanged",
        delta.gone.len(),
        delta.fresh.len(),
        delta.changed.len(),
        delta.unchanged.len()
    );

    let mut events: Vec<Event> = Vec::new();
    let mut stats = ReconcileStats::default();

    // Departures first, children strictly before their parent entity.
    for path in &delta.gone {
        let Some(entity) = live.get_by_path(path) else { continue };
        let id = entity.id;
        for record in live.iterate_records(id) {
            events.push(Event::RecordRemoved {
                record_id: record.id,
                entity_path: path.clone(),
            });
        }
        events.push(Event::EntityRemoved { id, path: path.clone() });
        live.remove_entity(id);
        stats.removed += 1;
    }

    // One path-ordered walk of the snapshot, emitting an insertion or an
    // in-place change as each path is encountered.
    let mut touched: Vec<(&EntityPath, bool)> = delta
        .fresh
        .iter()
        .map(|p| (p, true))
        .chain(delta.changed.iter().map(|p| (p, false)))
        .collect();
    touched.sort_by(|a, b| a.0.cmp(b.0));

    for (path, is_fresh) in touched {
        let Some(snap) = snapshot.get_by_path(path) else { continue };
        let id = live.upsert_entity(path.clone(), snap.attrs());
        if is_fresh {
            if let Some(inserted) = live.get_by_id(id) {
                events.push(Event::EntityAdded(inserted.clone()));
            }
            for record in snapshot.iterate_records(snap.id) {
                let mut rec = record.clone();
                rec.path = path.clone();
                if let Ok(rid) = live.add_record(id, rec.clone()) {
                    rec.id = rid;
                    events.push(Event::RecordAdded { entity_id: id, record: rec });
                }
            }
            stats.added += 1;
        } else {
            // Changed entities are treated as fully replaced for record
            // purposes; no record-level diff is attempted.
            let records: Vec<_> = snapshot.iterate_records(snap.id).cloned().collect();
            live.replace_records(id, records);
            if let Some(updated) = live.get_by_id(id) {
                events.push(Event::EntityChanged(updated.clone()));
            }
            stats.changed += 1;
        }
    }

    stats.events = events.len();
    queue.push_batch(events);
    stats
}
