//! Reference mapper: cross-instance identity translation for one push run.
//!
//! Entities reference each other by instance-local numeric ids, which differ
//! between the source and target instance. The mapper records, per kind,
//! which source record corresponds to which target record so foreign keys
//! can be rewritten before writing to the target.
//!
//! # Structure
//!
//! One [`MappingTable`] per kind, each keyed by that kind's natural key type:
//!
//! | Kind | Key |
//! |------|-----|
//! | Gallery | name (case-insensitive) |
//! | Asset | file name (case-insensitive) |
//! | Model, Container | reference name (case-insensitive) |
//! | Content item, Template, Page | source id |
//!
//! Records live in an arena; a secondary index maps source ids back to their
//! slot. A slot may hold only the source side (seen on source, not
//! yet on target) or both sides (resolved).
//!
//! The mapper is built fresh for every run and never persisted. It has no
//! removal operation.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use crate::model::{Asset, Container, ContentItem, EntityKind, Gallery, Model, Page, Template};

/// Case-insensitive name used as a natural key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NameKey(String);

impl NameKey {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self(name.to_lowercase())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Source-instance id used as the key for kinds without a stable name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(pub i64);

/// An entity that can be tracked by the mapper.
pub trait Mappable: Clone {
    type Key: Eq + Hash + Clone + Debug;
    const KIND: EntityKind;

    /// Instance-local id.
    fn id(&self) -> i64;

    /// Natural key derived from this record.
    ///
    /// For id-keyed kinds this is only meaningful for source records; target
    /// records of those kinds are attached with [`MappingTable::resolve`].
    fn natural_key(&self) -> Self::Key;
}

impl Mappable for Gallery {
    type Key = NameKey;
    const KIND: EntityKind = EntityKind::Gallery;
    fn id(&self) -> i64 {
        self.id
    }
    fn natural_key(&self) -> NameKey {
        NameKey::new(&self.name)
    }
}

impl Mappable for Asset {
    type Key = NameKey;
    const KIND: EntityKind = EntityKind::Asset;
    fn id(&self) -> i64 {
        self.id
    }
    fn natural_key(&self) -> NameKey {
        NameKey::new(&self.origin_key())
    }
}

impl Mappable for Model {
    type Key = NameKey;
    const KIND: EntityKind = EntityKind::Model;
    fn id(&self) -> i64 {
        self.id
    }
    fn natural_key(&self) -> NameKey {
        NameKey::new(&self.reference_name)
    }
}

impl Mappable for Container {
    type Key = NameKey;
    const KIND: EntityKind = EntityKind::Container;
    fn id(&self) -> i64 {
        self.id
    }
    fn natural_key(&self) -> NameKey {
        NameKey::new(&self.reference_name)
    }
}

impl Mappable for ContentItem {
    type Key = SourceId;
    const KIND: EntityKind = EntityKind::ContentItem;
    fn id(&self) -> i64 {
        self.id
    }
    fn natural_key(&self) -> SourceId {
        SourceId(self.id)
    }
}

impl Mappable for Template {
    type Key = SourceId;
    const KIND: EntityKind = EntityKind::Template;
    fn id(&self) -> i64 {
        self.id
    }
    fn natural_key(&self) -> SourceId {
        SourceId(self.id)
    }
}

impl Mappable for Page {
    type Key = SourceId;
    const KIND: EntityKind = EntityKind::Page;
    fn id(&self) -> i64 {
        self.id
    }
    fn natural_key(&self) -> SourceId {
        SourceId(self.id)
    }
}

/// Which instance a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Source,
    Target,
}

/// Result of a lookup. Both sides are `None` on a miss.
#[derive(Debug)]
pub struct Mapping<'a, T> {
    pub source: Option<&'a T>,
    pub target: Option<&'a T>,
}

impl<T> Clone for Mapping<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Mapping<'_, T> {}

impl<'a, T: Mappable> Mapping<'a, T> {
    const MISS: Self = Self {
        source: None,
        target: None,
    };

    /// Nothing is known about this key.
    #[must_use]
    pub fn is_miss(&self) -> bool {
        self.source.is_none() && self.target.is_none()
    }

    /// Both sides are known.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.source.is_some() && self.target.is_some()
    }

    #[must_use]
    pub fn target_id(&self) -> Option<i64> {
        self.target.map(Mappable::id)
    }

    #[must_use]
    pub fn source_id(&self) -> Option<i64> {
        self.source.map(Mappable::id)
    }
}

#[derive(Debug, Clone)]
struct Slot<T> {
    source: Option<T>,
    target: Option<T>,
}

/// Identity table for one entity kind.
#[derive(Debug, Clone)]
pub struct MappingTable<T: Mappable> {
    slots: Vec<Slot<T>>,
    by_key: HashMap<T::Key, usize>,
    by_source_id: HashMap<i64, usize>,
}

impl<T: Mappable> Default for MappingTable<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            by_key: HashMap::new(),
            by_source_id: HashMap::new(),
        }
    }
}

impl<T: Mappable> MappingTable<T> {
    fn slot_for(&mut self, key: T::Key) -> usize {
        if let Some(&idx) = self.by_key.get(&key) {
            return idx;
        }
        self.slots.push(Slot {
            source: None,
            target: None,
        });
        let idx = self.slots.len() - 1;
        self.by_key.insert(key, idx);
        idx
    }

    fn place(&mut self, idx: usize, side: Side, record: T) {
        match side {
            Side::Source => {
                let id = record.id();
                if let Some(previous) = self.slots[idx].source.replace(record) {
                    self.by_source_id.remove(&previous.id());
                }
                self.by_source_id.insert(id, idx);
            }
            Side::Target => self.slots[idx].target = Some(record),
        }
    }

    /// Register a record under its natural key.
    ///
    /// A second call for the same key from the other side resolves the
    /// mapping; a second call from the same side replaces the earlier record.
    pub fn add_record(&mut self, side: Side, record: T) {
        let idx = self.slot_for(record.natural_key());
        self.place(idx, side, record);
    }

    /// Attach the target record for an existing (or new) natural key.
    pub fn resolve(&mut self, key: &T::Key, target: T) {
        let idx = self.slot_for(key.clone());
        self.place(idx, Side::Target, target);
    }

    /// Look up by natural key.
    #[must_use]
    pub fn get_mapping(&self, key: &T::Key) -> Mapping<'_, T> {
        self.by_key
            .get(key)
            .map_or(Mapping::MISS, |&idx| self.mapping_at(idx))
    }

    /// Look up by the id a record has on the source instance.
    #[must_use]
    pub fn by_source_id(&self, id: i64) -> Mapping<'_, T> {
        self.by_source_id
            .get(&id)
            .map_or(Mapping::MISS, |&idx| self.mapping_at(idx))
    }

    /// Target id for a source id, if resolved.
    #[must_use]
    pub fn target_id_for(&self, source_id: i64) -> Option<i64> {
        self.by_source_id(source_id).target_id()
    }

    fn mapping_at(&self, idx: usize) -> Mapping<'_, T> {
        let slot = &self.slots[idx];
        Mapping {
            source: slot.source.as_ref(),
            target: slot.target.as_ref(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of keys with both sides known.
    #[must_use]
    pub fn resolved_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| s.source.is_some() && s.target.is_some())
            .count()
    }
}

/// Per-kind identity tables for one push run, from one source instance into
/// one target instance.
#[derive(Debug, Clone, Default)]
pub struct ReferenceMapper {
    pub galleries: MappingTable<Gallery>,
    pub assets: MappingTable<Asset>,
    pub models: MappingTable<Model>,
    pub containers: MappingTable<Container>,
    pub content_items: MappingTable<ContentItem>,
    pub templates: MappingTable<Template>,
    pub pages: MappingTable<Page>,
}

/// Mapping coverage for one kind.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct MappingStats {
    pub kind: EntityKind,
    pub records: usize,
    pub resolved: usize,
}

impl ReferenceMapper {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Coverage of every table, in dependency order.
    #[must_use]
    pub fn stats(&self) -> Vec<MappingStats> {
        fn stat<T: Mappable>(table: &MappingTable<T>) -> MappingStats {
            MappingStats {
                kind: T::KIND,
                records: table.len(),
                resolved: table.resolved_count(),
            }
        }
        vec![
            stat(&self.galleries),
            stat(&self.assets),
            stat(&self.models),
            stat(&self.containers),
            stat(&self.content_items),
            stat(&self.templates),
            stat(&self.pages),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelKind;

    fn model(id: i64, reference_name: &str) -> Model {
        Model {
            id,
            reference_name: reference_name.to_string(),
            display_name: reference_name.to_string(),
            fields: vec![],
            kind: ModelKind::Content,
        }
    }

    #[test]
    fn test_source_then_target_resolves() {
        let mut mapper = ReferenceMapper::new();
        mapper.models.add_record(Side::Source, model(5, "BlogPost"));
        mapper.models.add_record(Side::Target, model(77, "BlogPost"));

        let mapping = mapper.models.get_mapping(&NameKey::new("BlogPost"));
        assert!(mapping.is_resolved());
        assert_eq!(mapping.source_id(), Some(5));
        assert_eq!(mapping.target_id(), Some(77));
        assert_eq!(mapper.models.target_id_for(5), Some(77));
    }

    #[test]
    fn test_miss_returns_empty_mapping() {
        let mapper = ReferenceMapper::new();
        let mapping = mapper.models.get_mapping(&NameKey::new("Nope"));
        assert!(mapping.is_miss());
        assert!(mapping.source.is_none());
        assert!(mapping.target.is_none());
        assert!(mapper.content_items.by_source_id(3).is_miss());
    }

    #[test]
    fn test_source_only_is_not_resolvable() {
        let mut mapper = ReferenceMapper::new();
        mapper.models.add_record(Side::Source, model(5, "Post"));
        let mapping = mapper.models.get_mapping(&NameKey::new("post"));
        assert!(!mapping.is_miss());
        assert!(!mapping.is_resolved());
        assert_eq!(mapping.target_id(), None);
    }

    #[test]
    fn test_same_side_overwrites() {
        let mut mapper = ReferenceMapper::new();
        mapper.models.add_record(Side::Target, model(10, "Post"));
        mapper.models.add_record(Side::Target, model(11, "Post"));

        assert_eq!(mapper.models.len(), 1);
        assert_eq!(
            mapper.models.get_mapping(&NameKey::new("Post")).target_id(),
            Some(11)
        );
    }

    #[test]
    fn test_resolve_id_keyed_kind() {
        let mut mapper = ReferenceMapper::new();
        let item = ContentItem {
            id: 3,
            container_reference_name: "posts".into(),
            model_id: 1,
            state: crate::model::ItemState::Published,
            fields: serde_json::Map::new(),
        };
        mapper.content_items.add_record(Side::Source, item.clone());
        let mut created = item;
        created.id = 900;
        mapper.content_items.resolve(&SourceId(3), created);

        assert_eq!(mapper.content_items.target_id_for(3), Some(900));
        let stats = mapper.stats();
        let content = stats
            .iter()
            .find(|s| s.kind == EntityKind::ContentItem)
            .unwrap();
        assert_eq!((content.records, content.resolved), (1, 1));
    }
}
