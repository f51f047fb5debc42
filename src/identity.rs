//! Per-call identity and deduplication index.
//!
//! Both directions of the codec need to answer "have I already seen this
//! resource?". Marshal asks it to keep every resource object unique across
//! primary data and `included` and to stop at cycles; unmarshal asks it to
//! collapse repeated objects and to resolve relationship linkage to an entity
//! slot. The index lives for one call and is dropped with it.

use crate::document::{ResourceIdentifier, ResourceObject};
use crate::graph::EntityId;
use std::collections::HashMap;
use std::collections::hash_map::Entry;

/// The deduplication key of a resource.
///
/// Resources with an id are keyed by `(type, id)`. A resource with neither a
/// primary key nor a client-id has no wire identity, so it is keyed by the
/// graph slot it lives in instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum Identity {
    Wire(ResourceIdentifier),
    Slot(EntityId),
}

impl Identity {
    /// Keys a resource about to be written from `slot`.
    pub(crate) fn of(identifier: &ResourceIdentifier, slot: EntityId) -> Self {
        if identifier.id.is_empty() {
            Self::Slot(slot)
        } else {
            Self::Wire(ResourceIdentifier::new(
                identifier.kind.as_str(),
                identifier.id.as_str(),
            ))
        }
    }

    /// Keys a resource read from the wire: `id`, falling back to `lid`.
    ///
    /// Returns `None` for an object that carries neither.
    pub(crate) fn on_wire(kind: &str, id: &str, lid: Option<&str>) -> Option<Self> {
        let key = if id.is_empty() { lid? } else { id };
        (!key.is_empty()).then(|| Self::Wire(ResourceIdentifier::new(kind, key)))
    }
}

/// Marshal-side state of one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Visit {
    /// Emitted as primary data.
    Primary,
    /// Side-loaded into the given `included` slot.
    Included(usize),
}

/// Maps identities to per-call state.
#[derive(Debug)]
pub(crate) struct IdentityIndex<S> {
    states: HashMap<Identity, S>,
}

impl<S: Copy> IdentityIndex<S> {
    pub(crate) fn new() -> Self {
        Self {
            states: HashMap::new(),
        }
    }

    pub(crate) fn get(&self, identity: &Identity) -> Option<S> {
        self.states.get(identity).copied()
    }

    /// Records `state` unless the identity is already known.
    ///
    /// Returns `None` on first sight and the existing state otherwise, so the
    /// first writer of an identity always wins.
    pub(crate) fn claim(&mut self, identity: Identity, state: S) -> Option<S> {
        match self.states.entry(identity) {
            Entry::Occupied(existing) => Some(*existing.get()),
            Entry::Vacant(slot) => {
                slot.insert(state);
                None
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.states.len()
    }
}

impl<S: Copy> Default for IdentityIndex<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// The `included` list under construction.
///
/// A slot is reserved the moment a resource is first reached, before its
/// relationships are walked, and filled once they are. Reservation order is
/// the output order.
#[derive(Debug, Default)]
pub(crate) struct IncludedSet {
    slots: Vec<Option<ResourceObject>>,
}

impl IncludedSet {
    pub(crate) fn reserve(&mut self) -> usize {
        self.slots.push(None);
        self.slots.len() - 1
    }

    pub(crate) fn fill(&mut self, slot: usize, object: ResourceObject) {
        if let Some(entry) = self.slots.get_mut(slot) {
            *entry = Some(object);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    /// The finished list. Slots still empty are dropped; the resolver fills
    /// every slot it reserves before a call succeeds.
    pub(crate) fn into_objects(self) -> Vec<ResourceObject> {
        self.slots.into_iter().flatten().collect()
    }
}
