//! Sub-document arena -- ownership and copy-on-reattach for nested documents.
//!
//! Every sub-document instance lives in a [`SubdocumentStore`] slot and is
//! addressed by a generational [`SubdocId`]. Each instance records where it is
//! currently attached: nowhere, or one `(owner, key, array path)` [`Location`].
//!
//! # Attachment rules
//!
//! - An unattached instance stored somewhere becomes attached there and is
//!   stored by reference.
//! - Storing an instance again at the location it is already attached to is a
//!   plain reference store.
//! - Storing an instance anywhere else stores a deep copy instead. The copy is
//!   attached at the new location; the original keeps its attachment.
//! - Storing an instance inside itself (directly or through a descendant) also
//!   stores a copy, so the graph never contains a cycle.
//!
//! Removing a key does not detach anything: the instance stays attached to the
//! location that dropped it until it is swept by [`SubdocumentStore::retain_reachable`].

use crate::error::{PropsError, Result};
use crate::graph::{ContainerId, RawMap};
use crate::value::Value;
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::{debug, trace};

static NEXT_STORE: AtomicU32 = AtomicU32::new(1);

/// Handle to a sub-document instance.
///
/// Handles are only meaningful for the store that issued them. A handle whose
/// instance was released, or that came from another store, is rejected when
/// written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubdocId {
    store: u32,
    index: u32,
    generation: u32,
}

impl fmt::Display for SubdocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "subdoc#{}:{}v{}", self.store, self.index, self.generation)
    }
}

/// A slot that can hold a direct reference to a sub-document.
///
/// `path` lists array indices beneath `key`; it is empty when the instance is
/// the key's value itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    pub owner: ContainerId,
    pub key: String,
    pub path: Vec<usize>,
}

impl Location {
    pub fn new(owner: impl Into<ContainerId>, key: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            key: key.into(),
            path: Vec::new(),
        }
    }

    /// The location of element `index` inside the array held here.
    pub fn element(&self, index: usize) -> Self {
        let mut path = self.path.clone();
        path.push(index);
        Self {
            owner: self.owner,
            key: self.key.clone(),
            path,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.owner, self.key)?;
        for index in &self.path {
            write!(f, "[{}]", index)?;
        }
        Ok(())
    }
}

#[derive(Debug)]
struct Entry {
    content: RawMap,
    attachment: Option<Location>,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    entry: Option<Entry>,
}

/// Arena owning every sub-document instance of one document graph.
#[derive(Debug)]
pub struct SubdocumentStore {
    id: u32,
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl Default for SubdocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SubdocumentStore {
    pub fn new() -> Self {
        Self {
            id: NEXT_STORE.fetch_add(1, Ordering::Relaxed),
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Number of live instances.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.entry.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Create an empty, unattached instance.
    pub fn create(&mut self) -> SubdocId {
        self.create_with(RawMap::new())
    }

    pub(crate) fn create_with(&mut self, content: RawMap) -> SubdocId {
        let entry = Entry {
            content,
            attachment: None,
        };
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.entry = Some(entry);
            return SubdocId {
                store: self.id,
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            entry: Some(entry),
        });
        SubdocId {
            store: self.id,
            index,
            generation: 0,
        }
    }

    /// Create an empty instance already attached at `location`.
    pub(crate) fn create_attached(&mut self, location: Location) -> SubdocId {
        let id = self.create();
        self.attach(id, location);
        id
    }

    pub fn contains(&self, id: SubdocId) -> bool {
        self.entry(id).is_some()
    }

    /// Where the instance is attached, or `None` if it is unattached or unknown.
    pub fn attachment(&self, id: SubdocId) -> Option<&Location> {
        self.entry(id).and_then(|e| e.attachment.as_ref())
    }

    pub fn content(&self, id: SubdocId) -> Option<&RawMap> {
        self.entry(id).map(|e| &e.content)
    }

    pub(crate) fn content_mut(&mut self, id: SubdocId) -> Option<&mut RawMap> {
        self.entry_mut(id).map(|e| &mut e.content)
    }

    /// Decide which instance to store at `target` for a write of `id`.
    ///
    /// Returns `id` itself when it may be referenced from `target`, otherwise
    /// the handle of a fresh deep copy attached at `target`.
    pub fn claim(&mut self, id: SubdocId, target: &Location) -> Result<SubdocId> {
        let current = self
            .entry(id)
            .ok_or(PropsError::UnknownSubdocument(id))?
            .attachment
            .clone();

        match current {
            Some(location) if location == *target => Ok(id),
            None if !self.is_within(target.owner, id) => {
                self.attach(id, target.clone());
                debug!(subdoc = %id, location = %target, "subdocument attached");
                Ok(id)
            }
            current => {
                let copy = self.deep_copy(id)?;
                self.attach(copy, target.clone());
                debug!(
                    subdoc = %id,
                    copy = %copy,
                    attached_at = ?current.map(|l| l.to_string()),
                    location = %target,
                    "subdocument already attached, stored a copy"
                );
                Ok(copy)
            }
        }
    }

    /// Copy an instance and every sub-document beneath it.
    ///
    /// The returned instance is unattached; nested copies are attached inside it.
    pub fn deep_copy(&mut self, id: SubdocId) -> Result<SubdocId> {
        let source = self
            .content(id)
            .ok_or(PropsError::UnknownSubdocument(id))?
            .clone();
        let copy = self.create();

        let mut content = RawMap::new();
        for (key, value) in source.into_entries() {
            let location = Location::new(copy, key.as_str());
            let copied = self.copy_value(value, &location)?;
            content.raw_set(&key, Some(copied));
        }
        if let Some(slot) = self.content_mut(copy) {
            *slot = content;
        }
        Ok(copy)
    }

    fn copy_value(&mut self, value: Value, location: &Location) -> Result<Value> {
        match value {
            Value::Subdocument(child) => {
                let copied = self.deep_copy(child)?;
                self.attach(copied, location.clone());
                Ok(Value::Subdocument(copied))
            }
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| self.copy_value(item, &location.element(i)))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            other => Ok(other),
        }
    }

    /// Free an unattached instance. Attached instances are left alone and
    /// `false` is returned; they are reclaimed by [`Self::retain_reachable`].
    pub fn release(&mut self, id: SubdocId) -> bool {
        match self.entry(id) {
            Some(entry) if entry.attachment.is_none() => {
                self.free_slot(id.index);
                true
            }
            _ => false,
        }
    }

    /// Free every attached instance that is not reachable from `roots` or from
    /// an unattached instance. Returns the number of instances freed.
    pub fn retain_reachable<'a>(&mut self, roots: impl IntoIterator<Item = &'a Value>) -> usize {
        let mut marked: HashSet<u32> = HashSet::new();
        let mut pending: Vec<SubdocId> = Vec::new();

        for root in roots {
            collect_handles(root, &mut pending);
        }
        for (index, slot) in self.slots.iter().enumerate() {
            if let Some(entry) = &slot.entry {
                if entry.attachment.is_none() {
                    pending.push(SubdocId {
                        store: self.id,
                        index: index as u32,
                        generation: slot.generation,
                    });
                }
            }
        }

        while let Some(id) = pending.pop() {
            if !self.contains(id) || !marked.insert(id.index) {
                continue;
            }
            if let Some(content) = self.content(id) {
                for (_, value) in content.iter() {
                    collect_handles(value, &mut pending);
                }
            }
        }

        let doomed: Vec<u32> = self
            .slots
            .iter()
            .enumerate()
            .filter(|(index, slot)| slot.entry.is_some() && !marked.contains(&(*index as u32)))
            .map(|(index, _)| index as u32)
            .collect();
        for index in &doomed {
            self.free_slot(*index);
        }
        trace!(freed = doomed.len(), live = self.len(), "subdocument sweep");
        doomed.len()
    }

    fn attach(&mut self, id: SubdocId, location: Location) {
        if let Some(entry) = self.entry_mut(id) {
            entry.attachment = Some(location);
        }
    }

    /// True when `owner` is `id` or lies somewhere beneath it.
    fn is_within(&self, owner: ContainerId, id: SubdocId) -> bool {
        let mut current = owner;
        loop {
            match current {
                ContainerId::Document(_) => return false,
                ContainerId::Subdocument(sub) if sub == id => return true,
                ContainerId::Subdocument(sub) => match self.attachment(sub) {
                    Some(location) => current = location.owner,
                    None => return false,
                },
            }
        }
    }

    fn free_slot(&mut self, index: u32) {
        let slot = &mut self.slots[index as usize];
        slot.entry = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(index);
    }

    fn entry(&self, id: SubdocId) -> Option<&Entry> {
        if id.store != self.id {
            return None;
        }
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entry.as_ref())
    }

    fn entry_mut(&mut self, id: SubdocId) -> Option<&mut Entry> {
        if id.store != self.id {
            return None;
        }
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entry.as_mut())
    }
}

/// Push every sub-document handle found in `value` (through arrays and raw maps).
fn collect_handles(value: &Value, out: &mut Vec<SubdocId>) {
    match value {
        Value::Subdocument(id) => out.push(*id),
        Value::Array(items) => items.iter().for_each(|item| collect_handles(item, out)),
        Value::Map(map) => map.values().for_each(|item| collect_handles(item, out)),
        _ => {}
    }
}
