//! Defines the `Resource` trait implemented by `#[derive(Resource)]`.
//!
//! A `Resource` exposes two things: its field declarations (consumed once by
//! the descriptor resolver) and slot-addressed accessors the codec uses to
//! read and write individual fields without reflection. Slots are the
//! positions of `#[japi]`-tagged fields in declaration order; a path of slots
//! descends through `#[japi(embed)]` fields.

use crate::attribute::AttrOptions;
use crate::descriptor::{FieldDecl, TypeDescriptor};
use crate::error::{AttrError, Result};
use crate::graph::{EntityId, Ref};
use crate::hooks::{Hooks, LinksHook, MetaHook, RelationshipLinksHook, RelationshipMetaHook};
use serde_json::Value;
use std::any::Any;
use std::sync::Arc;

/// Upcasts to [`Any`] for downcasting entities out of the graph.
pub trait AsAny: Any {
    /// Borrows `self` as `Any`.
    fn as_any(&self) -> &dyn Any;
    /// Mutably borrows `self` as `Any`.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A type that maps onto a JSON:API resource object.
///
/// Implemented by `#[derive(Resource)]`; hand-written impls only need
/// [`declare`](Resource::declare) and [`descriptor`](Resource::descriptor)
/// plus the accessors for the slot kinds they declare.
pub trait Resource: AsAny + Send + Sync {
    /// The raw field declarations, in declaration order.
    fn declare() -> Vec<FieldDecl>
    where
        Self: Sized;

    /// Hook capabilities this type provides.
    fn hooks() -> Hooks
    where
        Self: Sized,
    {
        Hooks::empty()
    }

    /// The cached descriptor of the concrete type.
    fn descriptor(&self) -> Result<Arc<TypeDescriptor>>;

    /// Encodes the attribute (or key) at `path`.
    fn encode_attribute(&self, path: &[usize], options: &AttrOptions) -> std::result::Result<Value, AttrError> {
        let _ = (path, options);
        Err(AttrError::NoSuchField)
    }

    /// Whether the attribute at `path` is empty for `omitempty`.
    fn attribute_is_empty(&self, path: &[usize]) -> std::result::Result<bool, AttrError> {
        let _ = path;
        Err(AttrError::NoSuchField)
    }

    /// Decodes `value` into the attribute at `path`.
    fn decode_attribute(
        &mut self,
        path: &[usize],
        value: Value,
        options: &AttrOptions,
    ) -> std::result::Result<(), AttrError> {
        let _ = (path, value, options);
        Err(AttrError::NoSuchField)
    }

    /// Reads the key (primary or client-id) at `path` as an id string.
    fn read_key(&self, path: &[usize]) -> std::result::Result<Option<String>, AttrError> {
        let _ = path;
        Err(AttrError::NoSuchField)
    }

    /// Parses `key` into the key field at `path`.
    fn write_key(&mut self, path: &[usize], key: &str) -> std::result::Result<(), AttrError> {
        let _ = (path, key);
        Err(AttrError::NoSuchField)
    }

    /// Slots referenced by the relationship at `path`.
    fn relation_targets(&self, path: &[usize]) -> std::result::Result<Vec<EntityId>, AttrError> {
        let _ = path;
        Err(AttrError::NoSuchField)
    }

    /// Replaces the relationship at `path`. Targets are already type-checked.
    fn write_relation(&mut self, path: &[usize], targets: Vec<EntityId>) -> std::result::Result<(), AttrError> {
        let _ = (path, targets);
        Err(AttrError::NoSuchField)
    }

    /// Resource-level links provider.
    fn links_hook(&self) -> Option<&dyn LinksHook> {
        None
    }

    /// Resource-level meta provider.
    fn meta_hook(&self) -> Option<&dyn MetaHook> {
        None
    }

    /// Relationship-level links provider.
    fn relationship_links_hook(&self) -> Option<&dyn RelationshipLinksHook> {
        None
    }

    /// Relationship-level meta provider.
    fn relationship_meta_hook(&self) -> Option<&dyn RelationshipMetaHook> {
        None
    }
}

/// Cardinality of a relationship field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    /// `Option<Ref<T>>`
    ToOne,
    /// `Vec<Ref<T>>`
    ToMany,
}

/// Field types that can hold a relationship.
pub trait Relation: Sized {
    /// Fixed for the life of the type.
    const CARDINALITY: Cardinality;

    /// The related entity type.
    type Target: Resource;

    /// The slots currently referenced.
    fn targets(&self) -> Vec<EntityId>;

    /// Rebuilds the field from slots already checked to hold `Target`.
    fn from_targets(targets: Vec<EntityId>) -> Self;
}

impl<T: Resource> Relation for Option<Ref<T>> {
    const CARDINALITY: Cardinality = Cardinality::ToOne;
    type Target = T;

    fn targets(&self) -> Vec<EntityId> {
        self.iter().map(Ref::id).collect()
    }

    fn from_targets(targets: Vec<EntityId>) -> Self {
        targets.into_iter().next().map(Ref::new)
    }
}

impl<T: Resource> Relation for Vec<Ref<T>> {
    const CARDINALITY: Cardinality = Cardinality::ToMany;
    type Target = T;

    fn targets(&self) -> Vec<EntityId> {
        self.iter().map(Ref::id).collect()
    }

    fn from_targets(targets: Vec<EntityId>) -> Self {
        targets.into_iter().map(Ref::new).collect()
    }
}
