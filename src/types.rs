// CLASSIFICATION: COMMUNITY
// Filename: types.rs v0.7
// Author: Lukas Bower
// Date Modified: 2026-06-02

//! Common cross-module types for the hardware state mirror.
//!
//! Everything here is plain data. Identity rules: an [`EntityId`] is
//! process-local and stable for the lifetime of the discovered resource;
//! the [`EntityPath`] is the key that survives across probes, since most
//! managed hardware cannot produce a stable numeric id from one poll to
//! the next.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Process-local identity of a discovered resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

/// Identity of one handler instance in the process-wide registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HandleId(pub u32);

/// Kind of managed hardware a path segment or entity refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Chassis,
    Blade,
    AddInCard,
    Fan,
    PowerSupply,
    Interconnect,
    MediaTray,
    ManagementModule,
    Other,
}

/// One step of a hierarchical hardware address, e.g. `{Blade,3}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PathSegment {
    pub kind: EntityKind,
    pub location: u32,
}

/// Hierarchical location address of an entity, outermost segment first.
///
/// Paths are totally ordered so discovery walks are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityPath(Vec<PathSegment>);

impl EntityPath {
    /// Path of the enclosure root, location `loc`.
    pub fn root(kind: EntityKind, loc: u32) -> Self {
        EntityPath(vec![PathSegment { kind, location: loc }])
    }

    /// Extend this path with a child segment, returning the child's path.
    pub fn push_child(&self, kind: EntityKind, loc: u32) -> Self {
        let mut segs = self.0.clone();
        segs.push(PathSegment { kind, location: loc });
        EntityPath(segs)
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    /// Location index of the innermost segment of kind `kind`, if present.
    pub fn instance_of(&self, kind: EntityKind) -> Option<u32> {
        self.0
            .iter()
            .rev()
            .find(|s| s.kind == kind)
            .map(|s| s.location)
    }

    /// True when `prefix` addresses this path or one of its ancestors.
    pub fn starts_with(&self, prefix: &EntityPath) -> bool {
        self.0.len() >= prefix.0.len() && self.0[..prefix.0.len()] == prefix.0[..]
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for EntityPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for seg in &self.0 {
            write!(f, "{{{:?},{}}}", seg.kind, seg.location)?;
        }
        Ok(())
    }
}

bitflags! {
    /// What kinds of records and operations an entity supports.
    /// Serde impls come from the bitflags `serde` feature.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Capabilities: u32 {
        const SENSOR    = 1 << 0;
        const CONTROL   = 1 << 1;
        const INVENTORY = 1 << 2;
        const WATCHDOG  = 1 << 3;
        const LOG       = 1 << 4;
        const FRU       = 1 << 5;
    }
}

/// Severity ladder shared by entities and log entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Critical,
    Major,
    Minor,
    Informational,
    Ok,
    Debug,
}

/// Mutable attributes of an entity, everything except its identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityAttrs {
    pub kind: EntityKind,
    pub capabilities: Capabilities,
    pub severity: Severity,
    pub tag: String,
    pub failed: bool,
}

/// A discovered hardware resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub path: EntityPath,
    pub kind: EntityKind,
    pub capabilities: Capabilities,
    pub severity: Severity,
    pub tag: String,
    pub failed: bool,
}

impl Entity {
    pub fn attrs(&self) -> EntityAttrs {
        EntityAttrs {
            kind: self.kind,
            capabilities: self.capabilities,
            severity: self.severity,
            tag: self.tag.clone(),
            failed: self.failed,
        }
    }

    pub(crate) fn set_attrs(&mut self, attrs: EntityAttrs) {
        self.kind = attrs.kind;
        self.capabilities = attrs.capabilities;
        self.severity = attrs.severity;
        self.tag = attrs.tag;
        self.failed = attrs.failed;
    }
}

/// Identity of a record within its owning entity.
///
/// Composed from the record type and the type-local number so the id is
/// stable across probes without any hardware cooperation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId(pub u32);

impl RecordId {
    /// Sentinel meaning "assign me an id on insertion".
    pub const UNASSIGNED: RecordId = RecordId(0);

    pub fn compose(record_type: RecordType, type_num: u16) -> Self {
        RecordId((record_type.code() << 16) | u32::from(type_num))
    }
}

/// Typed sub-component of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    Sensor,
    Control,
    Inventory,
    Watchdog,
}

impl RecordType {
    fn code(self) -> u32 {
        match self {
            RecordType::Sensor => 1,
            RecordType::Control => 2,
            RecordType::Inventory => 3,
            RecordType::Watchdog => 4,
        }
    }
}

/// Opaque payload of a record, interpreted by the protocol layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordData {
    pub name: String,
    pub payload: Vec<u8>,
}

/// A record attached to exactly one owning entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub record_type: RecordType,
    pub type_num: u16,
    pub path: EntityPath,
    pub data: RecordData,
}

/// Nanoseconds since the epoch as reported by the hardware clock.
pub type LogTimestamp = i64;

/// Mirror-local sequence number of a cached log entry, first entry is 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LogRecordId(pub u32);

/// One decoded hardware event-log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: LogTimestamp,
    pub severity: Severity,
    pub source: String,
    pub message: String,
    /// Entity the hardware attributes this entry to, when it names one.
    pub entity_path: Option<EntityPath>,
    /// Set by the decoder when the raw payload is the backend's
    /// "log full" sentinel.
    pub overflow_marker: bool,
}
