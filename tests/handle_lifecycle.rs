// CLASSIFICATION: COMMUNITY
// Filename: handle_lifecycle.rs v0.4
// Author: Lukas Bower
// Date Modified: 2026-07-19

//! Handle registry locking and lifecycle scenarios.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use hwmirror::registry::{self, TestRegistryGuard};
use hwmirror::sim::SimBackend;
use hwmirror::{
    Capabilities, EntityAttrs, EntityCache, EntityKind, EntityPath, Event, HandleId,
    HandlerConfig, LogEntry, MirrorError, Severity,
};
use serial_test::serial;

fn sim_handle(id: u32) -> (HandleId, Arc<SimBackend>) {
    let _ = env_logger::builder().is_test(true).try_init();
    let hid = HandleId(id);
    let backend = Arc::new(SimBackend::new());
    let config = HandlerConfig { simulated: true, ..HandlerConfig::default() };
    registry::register(hid, backend.clone(), config).unwrap();
    (hid, backend)
}

fn attrs(tag: &str) -> EntityAttrs {
    EntityAttrs {
        kind: EntityKind::Fan,
        capabilities: Capabilities::SENSOR,
        severity: Severity::Ok,
        tag: tag.to_string(),
        failed: false,
    }
}

fn entry(ts: i64, msg: &str) -> LogEntry {
    LogEntry {
        timestamp: ts,
        severity: Severity::Informational,
        source: "SERVPROC".into(),
        message: msg.into(),
        entity_path: None,
        overflow_marker: false,
    }
}

#[test]
#[serial]
fn second_thread_blocks_until_first_releases() {
    let _reset = TestRegistryGuard::new();
    let (hid, _backend) = sim_handle(30);

    let (held_tx, held_rx) = mpsc::channel();
    let holder = thread::spawn(move || {
        let guard = registry::acquire(hid).unwrap();
        held_tx.send(()).unwrap();
        thread::sleep(Duration::from_millis(300));
        drop(guard);
    });

    held_rx.recv().unwrap();
    let start = Instant::now();
    let guard = registry::acquire(hid).unwrap();
    let waited = start.elapsed();
    drop(guard);
    holder.join().unwrap();

    // The second acquisition could not complete until the holder let go.
    assert!(waited >= Duration::from_millis(200), "waited only {waited:?}");
}

#[test]
#[serial]
fn same_thread_nests_without_deadlock() {
    let _reset = TestRegistryGuard::new();
    let (hid, backend) = sim_handle(31);

    let mut snap = EntityCache::new();
    snap.upsert_entity(EntityPath::root(EntityKind::Fan, 1), attrs("fan-1"));
    backend.set_snapshot(snap);

    let outer = registry::acquire(hid).unwrap();
    outer.discover().unwrap();

    // A nested call path re-enters the registry for the same handle.
    let inner = registry::acquire(hid).unwrap();
    assert_eq!(inner.entities().unwrap().len(), 1);
    drop(inner);

    // The outer guard still works after the nested release.
    assert_eq!(outer.entities().unwrap().len(), 1);
}

#[test]
#[serial]
fn handles_do_not_serialize_against_each_other() {
    let _reset = TestRegistryGuard::new();
    let (first, _) = sim_handle(32);
    let (second, _) = sim_handle(33);

    let guard_first = registry::acquire(first).unwrap();

    // Acquiring a different handle from another thread returns promptly
    // even while the first is held here.
    let done = thread::spawn(move || {
        let start = Instant::now();
        let guard = registry::acquire(second).unwrap();
        let waited = start.elapsed();
        drop(guard);
        waited
    })
    .join()
    .unwrap();

    drop(guard_first);
    assert!(done < Duration::from_millis(100), "cross-handle wait {done:?}");
}

#[test]
#[serial]
fn events_from_discovery_and_log_sync_stay_in_push_order() {
    let _reset = TestRegistryGuard::new();
    let (hid, backend) = sim_handle(34);

    let mut snap = EntityCache::new();
    snap.upsert_entity(EntityPath::root(EntityKind::Fan, 1), attrs("fan-1"));
    backend.set_snapshot(snap);
    backend.push_log_entry(entry(100, "powered on"));

    let handle = registry::acquire(hid).unwrap();
    handle.discover().unwrap();
    handle.sync_log().unwrap();

    // Discovery batch first, then the log batch, FIFO within each.
    match handle.pop_event().unwrap() {
        Some(Event::EntityAdded(e)) => assert_eq!(e.tag, "fan-1"),
        other => panic!("unexpected event: {other:?}"),
    }
    match handle.pop_event().unwrap() {
        Some(Event::LogEntryAdded { entry, .. }) => assert_eq!(entry.timestamp, 100),
        other => panic!("unexpected event: {other:?}"),
    }
    assert_eq!(handle.pop_event().unwrap(), None);
}

#[test]
#[serial]
fn outstanding_guard_survives_unregistration() {
    let _reset = TestRegistryGuard::new();
    let (hid, backend) = sim_handle(35);

    let mut snap = EntityCache::new();
    snap.upsert_entity(EntityPath::root(EntityKind::Fan, 1), attrs("fan-1"));
    backend.set_snapshot(snap);

    let handle = registry::acquire(hid).unwrap();
    handle.discover().unwrap();

    // Teardown is requested while this caller is still inside.
    registry::unregister(hid).unwrap();

    // The holder finishes its work normally...
    assert_eq!(handle.entities().unwrap().len(), 1);
    drop(handle);

    // ...and nobody gets in afterwards.
    assert!(matches!(registry::acquire(hid), Err(MirrorError::NotPresent)));
}
