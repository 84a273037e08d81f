// CLASSIFICATION: COMMUNITY
// Filename: log_sync.rs v0.5
// Author: Lukas Bower
// Date Modified: 2026-07-19

//! Event-log mirror synchronization scenarios.

use std::sync::Arc;

use hwmirror::registry::{self, TestRegistryGuard};
use hwmirror::sim::SimBackend;
use hwmirror::Backend;
use hwmirror::{
    Event, HandleId, HandlerConfig, LogEntry, LogPosition, LogTimestamp, MirrorError, Severity,
    SyncOutcome,
};
use serial_test::serial;

fn entry(ts: LogTimestamp, msg: &str) -> LogEntry {
    LogEntry {
        timestamp: ts,
        severity: Severity::Informational,
        source: "SERVPROC".into(),
        message: msg.into(),
        entity_path: None,
        overflow_marker: false,
    }
}

fn sim_handle(id: u32, simulated: bool) -> (HandleId, Arc<SimBackend>) {
    let _ = env_logger::builder().is_test(true).try_init();
    let hid = HandleId(id);
    let backend = Arc::new(SimBackend::new());
    let config = HandlerConfig { simulated, ..HandlerConfig::default() };
    registry::register(hid, backend.clone(), config).unwrap();
    (hid, backend)
}

#[test]
#[serial]
fn first_sync_rebuilds_oldest_first() {
    let _reset = TestRegistryGuard::new();
    let (hid, backend) = sim_handle(20, true);
    backend.push_log_entry(entry(100, "powered on"));
    backend.push_log_entry(entry(200, "fan fault"));
    backend.push_log_entry(entry(300, "fan recovered"));

    let handle = registry::acquire(hid).unwrap();
    assert_eq!(handle.sync_log().unwrap(), SyncOutcome::Rebuilt(3));

    let info = handle.log_info().unwrap();
    assert_eq!(info.entries, 3);
    assert!(!info.overflow);
    assert_eq!(info.last_update, Some(300));

    let (oldest, prev, _) = handle.log_entry(LogPosition::Oldest).unwrap();
    assert_eq!(oldest.entry.timestamp, 100);
    assert_eq!(prev, None);
    let (newest, _, next) = handle.log_entry(LogPosition::Newest).unwrap();
    assert_eq!(newest.entry.timestamp, 300);
    assert_eq!(next, None);

    // One LogEntryAdded per mirrored entry, oldest first.
    let mut timestamps = Vec::new();
    while let Some(ev) = handle.pop_event().unwrap() {
        match ev {
            Event::LogEntryAdded { entry, .. } => timestamps.push(entry.timestamp),
            other => panic!("unexpected event: {other:?}"),
        }
    }
    assert_eq!(timestamps, vec![100, 200, 300]);
}

#[test]
#[serial]
fn unchanged_newest_entry_syncs_with_a_single_probe() {
    let _reset = TestRegistryGuard::new();
    let (hid, backend) = sim_handle(21, true);
    for ts in [100, 200, 300] {
        backend.push_log_entry(entry(ts, "event"));
    }

    let handle = registry::acquire(hid).unwrap();
    handle.sync_log().unwrap();
    while handle.pop_event().unwrap().is_some() {}

    backend.reset_counters();
    assert_eq!(handle.sync_log().unwrap(), SyncOutcome::AlreadySynced);
    assert_eq!(backend.fetch_count(), 1);
    assert_eq!(handle.log_info().unwrap().entries, 3);
    assert_eq!(handle.pop_event().unwrap(), None);
}

#[test]
#[serial]
fn gap_of_k_entries_fetches_each_new_entry_once() {
    let _reset = TestRegistryGuard::new();
    let (hid, backend) = sim_handle(22, true);
    for ts in [100, 200, 300] {
        backend.push_log_entry(entry(ts, "old"));
    }

    let handle = registry::acquire(hid).unwrap();
    handle.sync_log().unwrap();
    while handle.pop_event().unwrap().is_some() {}

    backend.push_log_entry(entry(400, "new-1"));
    backend.push_log_entry(entry(500, "new-2"));

    backend.reset_counters();
    assert_eq!(handle.sync_log().unwrap(), SyncOutcome::Appended(2));
    // K new entries cost K fetches plus the one probe that finds the
    // matching older timestamp; nothing is re-read.
    assert_eq!(backend.fetch_count(), 3);

    let info = handle.log_info().unwrap();
    assert_eq!(info.entries, 5);
    assert_eq!(info.last_update, Some(500));

    let mut timestamps = Vec::new();
    while let Some(ev) = handle.pop_event().unwrap() {
        match ev {
            Event::LogEntryAdded { entry, .. } => timestamps.push(entry.timestamp),
            other => panic!("unexpected event: {other:?}"),
        }
    }
    assert_eq!(timestamps, vec![400, 500]);
}

#[test]
#[serial]
fn unmatched_walk_clears_and_rebuilds() {
    let _reset = TestRegistryGuard::new();
    let (hid, backend) = sim_handle(23, true);
    for ts in [100, 200] {
        backend.push_log_entry(entry(ts, "old"));
    }

    let handle = registry::acquire(hid).unwrap();
    handle.sync_log().unwrap();
    while handle.pop_event().unwrap().is_some() {}

    // Hardware wrapped far enough that the mirror's newest entry is no
    // longer anywhere in the log.
    backend.hardware_clear().unwrap();
    backend.push_log_entry(entry(900, "after wrap"));

    match handle.sync_log().unwrap() {
        SyncOutcome::Rebuilt(n) => assert_eq!(n, 2),
        other => panic!("expected rebuild, got {other:?}"),
    }
    let (oldest, _, _) = handle.log_entry(LogPosition::Oldest).unwrap();
    assert!(oldest.entry.message.contains("cleared"));
    let (newest, _, _) = handle.log_entry(LogPosition::Newest).unwrap();
    assert_eq!(newest.entry.timestamp, 900);
}

#[test]
#[serial]
fn transient_walk_failure_leaves_mirror_as_is() {
    let _reset = TestRegistryGuard::new();
    let (hid, backend) = sim_handle(24, true);
    for ts in [100, 200, 300] {
        backend.push_log_entry(entry(ts, "old"));
    }

    let handle = registry::acquire(hid).unwrap();
    handle.sync_log().unwrap();
    while handle.pop_event().unwrap().is_some() {}

    backend.push_log_entry(entry(400, "new"));
    backend.push_log_entry(entry(500, "newer"));
    // The probe of index 2 dies mid-walk.
    backend.poison_index(2);

    let err = handle.sync_log().unwrap_err();
    assert!(matches!(err, MirrorError::Protocol(_)));
    // Previously read entries remain valid; nothing was appended or
    // rolled back.
    assert_eq!(handle.log_info().unwrap().entries, 3);
    assert_eq!(handle.pop_event().unwrap(), None);
}

#[test]
#[serial]
fn corrupt_entry_is_skipped_during_rebuild() {
    let _reset = TestRegistryGuard::new();
    let (hid, backend) = sim_handle(25, true);
    for ts in [100, 200, 300] {
        backend.push_log_entry(entry(ts, "event"));
    }
    // Index 2 (the middle entry) cannot be decoded.
    backend.poison_index(2);

    let handle = registry::acquire(hid).unwrap();
    assert_eq!(handle.sync_log().unwrap(), SyncOutcome::Rebuilt(2));
    let mut timestamps = Vec::new();
    while let Some(ev) = handle.pop_event().unwrap() {
        if let Event::LogEntryAdded { entry, .. } = ev {
            timestamps.push(entry.timestamp);
        }
    }
    assert_eq!(timestamps, vec![100, 300]);
}

#[test]
#[serial]
fn overflow_marker_latches_until_clear() {
    let _reset = TestRegistryGuard::new();
    let (hid, backend) = sim_handle(26, true);
    backend.push_log_entry(entry(100, "event"));
    let mut marker = entry(200, "Event log full");
    marker.overflow_marker = true;
    backend.push_log_entry(marker);

    let handle = registry::acquire(hid).unwrap();
    handle.sync_log().unwrap();
    assert!(handle.log_info().unwrap().overflow);

    // More appends do not reset it.
    backend.push_log_entry(entry(300, "later"));
    handle.sync_log().unwrap();
    assert!(handle.log_info().unwrap().overflow);

    handle.clear_log().unwrap();
    assert!(!handle.log_info().unwrap().overflow);
    assert_eq!(handle.log_info().unwrap().entries, 0);
}

#[test]
#[serial]
fn clear_then_sync_picks_up_hardware_marker_entry() {
    let _reset = TestRegistryGuard::new();
    let (hid, backend) = sim_handle(27, true);
    backend.push_log_entry(entry(100, "event"));

    let handle = registry::acquire(hid).unwrap();
    handle.sync_log().unwrap();
    while handle.pop_event().unwrap().is_some() {}

    // Caller sequences the hardware clear with the mirror clear, then
    // the next sync rebuilds and sees the hardware's own marker entry.
    handle.hardware_clear().unwrap();
    handle.clear_log().unwrap();

    match handle.sync_log().unwrap() {
        SyncOutcome::Rebuilt(1) => {}
        other => panic!("expected rebuild of marker entry, got {other:?}"),
    }
    let (only, _, _) = handle.log_entry(LogPosition::Newest).unwrap();
    assert!(only.entry.message.contains("cleared"));
}

#[test]
#[serial]
fn empty_hardware_log_empties_the_mirror() {
    let _reset = TestRegistryGuard::new();
    let (hid, backend) = sim_handle(28, true);
    for ts in [100, 200] {
        backend.push_log_entry(entry(ts, "event"));
    }

    let handle = registry::acquire(hid).unwrap();
    handle.sync_log().unwrap();
    while handle.pop_event().unwrap().is_some() {}

    // The hardware log vanished underneath us, without even a marker.
    backend.truncate_log();
    assert_eq!(handle.sync_log().unwrap(), SyncOutcome::Cleared);
    assert_eq!(handle.log_info().unwrap().entries, 0);
    assert_eq!(handle.pop_event().unwrap(), None);
}
