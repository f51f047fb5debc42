use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// A strong type naming one slot of an [`EntityGraph`](super::EntityGraph).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u32); // u32 is plenty for one document.

impl EntityId {
    /// Restricted to the graph module so slots cannot be forged.
    pub(crate) fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw slot number.
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A typed handle to an entity owned by an [`EntityGraph`](super::EntityGraph).
///
/// Relationship fields hold `Option<Ref<T>>` (to-one) or `Vec<Ref<T>>`
/// (to-many). Handles are plain copies of a slot number, so graphs may contain
/// cycles without any owning pointer loop.
pub struct Ref<T> {
    id: EntityId,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Ref<T> {
    /// Only the graph hands out handles, after checking the slot's type.
    pub(crate) fn new(id: EntityId) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    /// The untyped slot this handle points at.
    pub fn id(&self) -> EntityId {
        self.id
    }
}

// Manual impls: derives would demand the same traits of `T`.

impl<T> Clone for Ref<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Ref<T> {}

impl<T> PartialEq for Ref<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Ref<T> {}

impl<T> Hash for Ref<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T> fmt::Debug for Ref<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = std::any::type_name::<T>();
        let short = name.rsplit("::").next().unwrap_or(name);
        write!(f, "Ref<{short}>({})", self.id.0)
    }
}
