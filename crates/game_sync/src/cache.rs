//! Local caches for server data.
//!
//! Two update disciplines, shared by every cache shape:
//! - `replace_all`: full snapshot, previous contents are discarded.
//! - `merge`: insert-or-overwrite per record, everything else untouched.
//!
//! Records that fail validation (or whose group cannot be resolved) are
//! dropped with a warning and counted in the returned [`ApplyReport`].

use std::{collections::BTreeMap, fmt::Debug};

use tracing::warn;

/// A server record with a stable primary id.
pub trait Record {
    type Id: Ord + Copy + Debug;

    fn id(&self) -> Self::Id;

    /// Records failing this check never enter a cache.
    fn is_valid(&self) -> bool {
        true
    }
}

/// Outcome of applying a batch of records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub applied: usize,
    pub dropped: usize,
}

/// Two-level cache `group -> id -> record`. The group of a record comes from
/// a resolver (typically a static config lookup), never from the record.
#[derive(Debug, Clone)]
pub struct GroupedCache<G, V: Record> {
    groups: BTreeMap<G, BTreeMap<V::Id, V>>,
    index: BTreeMap<V::Id, G>,
}

impl<G, V: Record> Default for GroupedCache<G, V> {
    fn default() -> Self {
        Self {
            groups: BTreeMap::new(),
            index: BTreeMap::new(),
        }
    }
}

impl<G, V> GroupedCache<G, V>
where
    G: Ord + Copy + Debug,
    V: Record,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace_all<I, F>(&mut self, records: I, resolve: F) -> ApplyReport
    where
        I: IntoIterator<Item = V>,
        F: Fn(&V) -> Option<G>,
    {
        self.clear();
        self.merge(records, resolve)
    }

    pub fn merge<I, F>(&mut self, records: I, resolve: F) -> ApplyReport
    where
        I: IntoIterator<Item = V>,
        F: Fn(&V) -> Option<G>,
    {
        let mut report = ApplyReport::default();
        for record in records {
            let id = record.id();
            if !record.is_valid() {
                warn!(target: "game_sync::cache", ?id, "invalid record dropped");
                report.dropped += 1;
                continue;
            }
            let Some(group) = resolve(&record) else {
                warn!(target: "game_sync::cache", ?id, "no group configured for record, dropped");
                report.dropped += 1;
                continue;
            };
            if let Some(previous) = self.index.insert(id, group) {
                if previous != group {
                    self.remove_from_group(previous, id);
                }
            }
            self.groups.entry(group).or_default().insert(id, record);
            report.applied += 1;
        }
        report
    }

    fn remove_from_group(&mut self, group: G, id: V::Id) {
        if let Some(members) = self.groups.get_mut(&group) {
            members.remove(&id);
            if members.is_empty() {
                self.groups.remove(&group);
            }
        }
    }

    pub fn remove(&mut self, id: V::Id) -> Option<V> {
        let group = self.index.remove(&id)?;
        let members = self.groups.get_mut(&group)?;
        let removed = members.remove(&id);
        if members.is_empty() {
            self.groups.remove(&group);
        }
        removed
    }

    pub fn get(&self, id: V::Id) -> Option<&V> {
        let group = self.index.get(&id)?;
        self.groups.get(group)?.get(&id)
    }

    pub fn group(&self, group: G) -> Option<&BTreeMap<V::Id, V>> {
        self.groups.get(&group)
    }

    pub fn group_of(&self, id: V::Id) -> Option<G> {
        self.index.get(&id).copied()
    }

    pub fn groups(&self) -> impl Iterator<Item = (&G, &BTreeMap<V::Id, V>)> {
        self.groups.iter()
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.groups.values().flat_map(|members| members.values())
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn clear(&mut self) {
        self.groups.clear();
        self.index.clear();
    }
}

/// Single-level cache `id -> record`.
#[derive(Debug, Clone)]
pub struct KeyedCache<V: Record> {
    records: BTreeMap<V::Id, V>,
}

impl<V: Record> Default for KeyedCache<V> {
    fn default() -> Self {
        Self {
            records: BTreeMap::new(),
        }
    }
}

impl<V: Record> KeyedCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace_all<I: IntoIterator<Item = V>>(&mut self, records: I) -> ApplyReport {
        self.records.clear();
        self.merge(records)
    }

    pub fn merge<I: IntoIterator<Item = V>>(&mut self, records: I) -> ApplyReport {
        let mut report = ApplyReport::default();
        for record in records {
            if !record.is_valid() {
                warn!(target: "game_sync::cache", id = ?record.id(), "invalid record dropped");
                report.dropped += 1;
                continue;
            }
            self.records.insert(record.id(), record);
            report.applied += 1;
        }
        report
    }

    pub fn get(&self, id: V::Id) -> Option<&V> {
        self.records.get(&id)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

/// At most one record, replaced wholesale.
#[derive(Debug, Clone)]
pub struct SingleRecordCache<V> {
    value: Option<V>,
}

impl<V> Default for SingleRecordCache<V> {
    fn default() -> Self {
        Self { value: None }
    }
}

impl<V> SingleRecordCache<V> {
    pub fn set(&mut self, value: V) -> Option<V> {
        self.value.replace(value)
    }

    pub fn get(&self) -> Option<&V> {
        self.value.as_ref()
    }

    pub fn clear(&mut self) {
        self.value = None;
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_none()
    }
}
