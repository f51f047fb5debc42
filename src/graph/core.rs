use super::id::{EntityId, Ref};
use crate::resource::Resource;
use std::any::TypeId;
use std::fmt;

/// The arena that owns every entity of a document.
///
/// Marshal reads from it; unmarshal hands a freshly built one back. Entities
/// refer to each other through [`Ref`] handles into the same graph, so shared
/// sub-graphs and cycles are just repeated slot numbers.
///
/// ```rust
/// use japi::{EntityGraph, Ref, Resource};
///
/// #[derive(Debug, Default, Resource)]
/// struct Person {
///     #[japi(primary = "people")]
///     id: u64,
///     #[japi(relation = "friend")]
///     friend: Option<Ref<Person>>,
/// }
///
/// let mut graph = EntityGraph::new();
/// let alice = graph.insert(Person { id: 1, friend: None });
/// let bob = graph.insert(Person { id: 2, friend: Some(alice) });
/// if let Some(a) = graph.get_mut(alice) {
///     a.friend = Some(bob); // a cycle, owned by nobody but the graph
/// }
/// assert_eq!(graph.len(), 2);
/// ```
#[derive(Default)]
pub struct EntityGraph {
    nodes: Vec<Box<dyn Resource>>,
}

impl EntityGraph {
    /// Creates a new, empty graph.
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Moves an entity into the graph and returns its handle.
    pub fn insert<T: Resource>(&mut self, entity: T) -> Ref<T> {
        Ref::new(self.push_boxed(Box::new(entity)))
    }

    /// Borrows the entity behind a handle.
    ///
    /// Returns `None` when the handle belongs to another graph.
    pub fn get<T: Resource>(&self, handle: Ref<T>) -> Option<&T> {
        self.node(handle.id())?.as_any().downcast_ref::<T>()
    }

    /// Mutably borrows the entity behind a handle.
    pub fn get_mut<T: Resource>(&mut self, handle: Ref<T>) -> Option<&mut T> {
        self.node_mut(handle.id())?.as_any_mut().downcast_mut::<T>()
    }

    /// Borrows an entity without knowing its type.
    pub fn node(&self, id: EntityId) -> Option<&dyn Resource> {
        self.nodes.get(id.as_u32() as usize).map(|boxed| &**boxed)
    }

    pub(crate) fn node_mut(&mut self, id: EntityId) -> Option<&mut (dyn Resource + 'static)> {
        self.nodes.get_mut(id.as_u32() as usize).map(|boxed| &mut **boxed)
    }

    /// Turns a slot back into a typed handle if the slot holds a `T`.
    pub fn typed<T: Resource>(&self, id: EntityId) -> Option<Ref<T>> {
        (self.type_id_of(id)? == TypeId::of::<T>()).then(|| Ref::new(id))
    }

    /// Concrete type of the entity in a slot.
    pub(crate) fn type_id_of(&self, id: EntityId) -> Option<TypeId> {
        self.node(id).map(|node| node.as_any().type_id())
    }

    pub(crate) fn push_boxed(&mut self, entity: Box<dyn Resource>) -> EntityId {
        let id = EntityId::new(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
        self.nodes.push(entity);
        id
    }

    /// Handles to every entity of type `T`, in insertion order.
    pub fn all<T: Resource>(&self) -> Vec<Ref<T>> {
        (0..self.nodes.len())
            .filter_map(|i| u32::try_from(i).ok())
            .filter_map(|i| self.typed::<T>(EntityId::new(i)))
            .collect()
    }

    /// Returns true if the graph holds no entities.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the number of entities in the graph.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }
}

impl fmt::Debug for EntityGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityGraph")
            .field("len", &self.nodes.len())
            .finish()
    }
}
