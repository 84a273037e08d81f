// CLASSIFICATION: COMMUNITY
// Filename: cache.rs v0.8
// Author: Lukas Bower
// Date Modified: 2026-06-28

//! Authoritative in-memory store of discovered entities and their
//! records.
//!
//! Pure data structure: no I/O, no locking. Concurrency discipline lives
//! in the handle registry; everything here assumes the caller already
//! holds the owning handle's lock.
//!
//! Identity rules: ids are allocated from a per-cache counter the first
//! time a path is seen and never change while the path stays present.
//! Two distinct ids never share a path.

use log::debug;
use std::collections::{BTreeMap, HashMap};

use crate::error::{MirrorError, MirrorResult};
use crate::types::{
    Entity, EntityAttrs, EntityId, EntityPath, Record, RecordId, RecordType,
};

#[derive(Debug, Clone)]
struct EntityNode {
    entity: Entity,
    records: Vec<Record>,
}

/// Entity cache indexed by id and by hierarchical path.
///
/// Ids are handed out in ascending order, so iterating the id-keyed map
/// yields entities in insertion order.
#[derive(Debug, Clone, Default)]
pub struct EntityCache {
    entities: BTreeMap<EntityId, EntityNode>,
    by_path: HashMap<EntityPath, EntityId>,
    next_id: u32,
}

impl EntityCache {
    pub fn new() -> Self {
        EntityCache::default()
    }

    /// Insert an entity at `path`, or update the attributes of the one
    /// already there. Identity is preserved on update.
    pub fn upsert_entity(&mut self, path: EntityPath, attrs: EntityAttrs) -> EntityId {
        if let Some(&id) = self.by_path.get(&path) {
            if let Some(node) = self.entities.get_mut(&id) {
                node.entity.set_attrs(attrs);
            }
            return id;
        }
        self.next_id += 1;
        let id = EntityId(self.next_id);
        let entity = Entity {
            id,
            path: path.clone(),
            kind: attrs.kind,
            capabilities: attrs.capabilities,
            severity: attrs.severity,
            tag: attrs.tag,
            failed: attrs.failed,
        };
        self.by_path.insert(path, id);
        self.entities.insert(id, EntityNode { entity, records: Vec::new() });
        id
    }

    /// Remove an entity and every record it owns. Silent when the id is
    /// not present.
    pub fn remove_entity(&mut self, id: EntityId) {
        if let Some(node) = self.entities.remove(&id) {
            self.by_path.remove(&node.entity.path);
            debug!(
                "removed entity {:?} at {} with {} records",
                id,
                node.entity.path,
                node.records.len()
            );
        }
    }

    pub fn get_by_id(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id).map(|n| &n.entity)
    }

    pub fn get_by_path(&self, path: &EntityPath) -> Option<&Entity> {
        self.by_path
            .get(path)
            .and_then(|id| self.entities.get(id))
            .map(|n| &n.entity)
    }

    pub(crate) fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id).map(|n| &mut n.entity)
    }

    /// Attach a record to its owning entity. A record arriving with
    /// [`RecordId::UNASSIGNED`] gets an id composed from its type and
    /// type-local number; a record whose id is already present overlays
    /// the existing one in place.
    pub fn add_record(&mut self, entity_id: EntityId, mut record: Record) -> MirrorResult<RecordId> {
        let node = self
            .entities
            .get_mut(&entity_id)
            .ok_or(MirrorError::NotPresent)?;
        if record.id == RecordId::UNASSIGNED {
            record.id = RecordId::compose(record.record_type, record.type_num);
        }
        record.path = node.entity.path.clone();
        let id = record.id;
        if let Some(existing) = node.records.iter_mut().find(|r| r.id == id) {
            *existing = record;
        } else {
            node.records.push(record);
        }
        Ok(id)
    }

    pub fn remove_record(&mut self, entity_id: EntityId, record_id: RecordId) -> MirrorResult<()> {
        let node = self
            .entities
            .get_mut(&entity_id)
            .ok_or(MirrorError::NotPresent)?;
        let before = node.records.len();
        node.records.retain(|r| r.id != record_id);
        if node.records.len() == before {
            return Err(MirrorError::NotPresent);
        }
        Ok(())
    }

    pub fn get_record(&self, entity_id: EntityId, record_id: RecordId) -> Option<&Record> {
        self.entities
            .get(&entity_id)
            .and_then(|n| n.records.iter().find(|r| r.id == record_id))
    }

    /// Look a record up by its type and type-local number.
    pub fn get_record_by_type(
        &self,
        entity_id: EntityId,
        record_type: RecordType,
        type_num: u16,
    ) -> Option<&Record> {
        self.entities.get(&entity_id).and_then(|n| {
            n.records
                .iter()
                .find(|r| r.record_type == record_type && r.type_num == type_num)
        })
    }

    /// Replace an entity's whole record repository.
    pub(crate) fn replace_records(&mut self, entity_id: EntityId, records: Vec<Record>) {
        if let Some(node) = self.entities.get_mut(&entity_id) {
            let path = node.entity.path.clone();
            node.records = records
                .into_iter()
                .map(|mut r| {
                    if r.id == RecordId::UNASSIGNED {
                        r.id = RecordId::compose(r.record_type, r.type_num);
                    }
                    r.path = path.clone();
                    r
                })
                .collect();
        }
    }

    /// Entities in insertion order.
    pub fn iterate_entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values().map(|n| &n.entity)
    }

    /// Records of one entity in insertion order; empty when the id is
    /// unknown.
    pub fn iterate_records(&self, entity_id: EntityId) -> impl Iterator<Item = &Record> {
        self.entities
            .get(&entity_id)
            .map(|n| n.records.as_slice())
            .unwrap_or(&[])
            .iter()
    }

    /// All present paths, sorted. Drives deterministic reconciliation.
    pub fn sorted_paths(&self) -> Vec<EntityPath> {
        let mut paths: Vec<EntityPath> = self.by_path.keys().cloned().collect();
        paths.sort();
        paths
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn clear(&mut self) {
        self.entities.clear();
        self.by_path.clear();
    }
}
