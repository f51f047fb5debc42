//! The document parser (unmarshal).
//!
//! Rebuilds an [`EntityGraph`] from a [`Document`] in two passes. The
//! construction pass creates one zero-valued entity per distinct resource in
//! `data` and `included`; the population pass then fills keys and attributes
//! and wires relationships by identifier. Splitting the passes is what lets a
//! relationship point forward to a resource that appears later in the
//! document, or back to one that points at it.

use super::{Document, Linkage, ResourceObject};
use crate::descriptor::{FieldDescriptor, FieldKind, TypeDescriptor, resolve};
use crate::error::{DecodeError, Result};
use crate::graph::{EntityGraph, EntityId, Ref};
use crate::identity::{Identity, IdentityIndex};
use crate::registry::TypeRegistry;
use crate::resource::{Cardinality, Resource};
use std::fmt;
use std::sync::Arc;

/// Primary data handles of a decoded document.
pub enum Primary<T> {
    /// The document carried a single resource, or `null`.
    One(Option<Ref<T>>),
    /// The document carried a collection.
    Many(Vec<Ref<T>>),
}

impl<T> Primary<T> {
    /// All handles regardless of shape.
    pub fn handles(&self) -> Vec<Ref<T>> {
        match self {
            Self::One(handle) => handle.iter().copied().collect(),
            Self::Many(handles) => handles.clone(),
        }
    }
}

// Manual impls: derives would demand the same traits of `T`.

impl<T> Clone for Primary<T> {
    fn clone(&self) -> Self {
        match self {
            Self::One(handle) => Self::One(*handle),
            Self::Many(handles) => Self::Many(handles.clone()),
        }
    }
}

impl<T> PartialEq for Primary<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::One(a), Self::One(b)) => a == b,
            (Self::Many(a), Self::Many(b)) => a == b,
            _ => false,
        }
    }
}

impl<T> Eq for Primary<T> {}

impl<T> fmt::Debug for Primary<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::One(handle) => f.debug_tuple("One").field(handle).finish(),
            Self::Many(handles) => f.debug_tuple("Many").field(handles).finish(),
        }
    }
}

/// The result of unmarshalling: the graph that owns every entity of the
/// document, and handles to its primary data.
pub struct Decoded<T> {
    graph: EntityGraph,
    data: Primary<T>,
}

impl<T: Resource> Decoded<T> {
    /// The owning graph.
    pub fn graph(&self) -> &EntityGraph {
        &self.graph
    }

    /// Mutable access to the owning graph.
    pub fn graph_mut(&mut self) -> &mut EntityGraph {
        &mut self.graph
    }

    /// Primary data handles.
    pub fn data(&self) -> &Primary<T> {
        &self.data
    }

    /// The single primary entity, if the document carried exactly one.
    pub fn one(&self) -> Option<&T> {
        match &self.data {
            Primary::One(handle) => self.graph.get((*handle)?),
            Primary::Many(_) => None,
        }
    }

    /// All primary entities in document order.
    pub fn many(&self) -> Vec<&T> {
        self.data
            .handles()
            .into_iter()
            .filter_map(|handle| self.graph.get(handle))
            .collect()
    }

    /// Borrows any entity of the graph.
    pub fn get<U: Resource>(&self, handle: Ref<U>) -> Option<&U> {
        self.graph.get(handle)
    }

    /// Splits into the graph and the primary handles.
    pub fn into_parts(self) -> (EntityGraph, Primary<T>) {
        (self.graph, self.data)
    }
}

impl<T> fmt::Debug for Decoded<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decoded")
            .field("graph", &self.graph)
            .field("data", &self.data)
            .finish()
    }
}

/// Unmarshals `doc` with `T` as the primary resource type.
pub(crate) fn parse<T: Resource + Default>(doc: &Document, registry: &TypeRegistry) -> Result<Decoded<T>> {
    doc.validate()?;
    let Some(data) = &doc.data else {
        return Err(DecodeError::MissingPrimaryData.into());
    };

    let root = resolve::<T>()?;
    for object in data.resources() {
        if object.kind != root.wire_type() {
            return Err(DecodeError::TypeMismatch {
                expected: root.wire_type(),
                found: object.kind.clone(),
            }
            .into());
        }
    }

    let mut graph = EntityGraph::new();
    let mut index = IdentityIndex::new();
    let mut pending = Vec::new();

    let mut primary = Vec::new();
    for object in data.resources() {
        let id = construct::<T>(&mut graph, &mut index, &mut pending, registry, &root, object)?;
        let handle = graph.typed::<T>(id).ok_or_else(|| DecodeError::TypeMismatch {
            expected: root.wire_type(),
            found: object.kind.clone(),
        })?;
        if !primary.contains(&handle) {
            primary.push(handle);
        }
    }
    for object in &doc.included {
        construct::<T>(&mut graph, &mut index, &mut pending, registry, &root, object)?;
    }

    for (id, object) in pending {
        populate(&mut graph, &index, id, object)?;
    }

    let data = match data {
        super::PrimaryData::One(_) => Primary::One(primary.into_iter().next()),
        super::PrimaryData::Many(_) => Primary::Many(primary),
    };

    tracing::debug!(
        root = root.wire_type(),
        entities = graph.len(),
        identities = index.len(),
        "unmarshalled document"
    );
    Ok(Decoded { graph, data })
}

/// Creates the zero value for `object`, or returns the slot of the first
/// object with the same identity.
fn construct<'d, T: Resource + Default>(
    graph: &mut EntityGraph,
    index: &mut IdentityIndex<EntityId>,
    pending: &mut Vec<(EntityId, &'d ResourceObject)>,
    registry: &TypeRegistry,
    root: &TypeDescriptor,
    object: &'d ResourceObject,
) -> Result<EntityId> {
    let identity = Identity::on_wire(&object.kind, &object.id, object.lid.as_deref());
    if let Some(existing) = identity.as_ref().and_then(|key| index.get(key)) {
        return Ok(existing);
    }

    let entity = registry
        .construct_or::<T>(&object.kind, root.wire_type())
        .ok_or_else(|| DecodeError::UnknownResourceType(object.kind.clone()))?;
    let id = graph.push_boxed(entity);
    if let Some(key) = identity {
        index.claim(key, id);
    }
    tracing::trace!(kind = %object.kind, id = %object.id, slot = %id, "constructed entity");
    pending.push((id, object));
    Ok(id)
}

fn populate(
    graph: &mut EntityGraph,
    index: &IdentityIndex<EntityId>,
    id: EntityId,
    object: &ResourceObject,
) -> Result<()> {
    let desc = match graph.node(id) {
        Some(node) => node.descriptor()?,
        None => return Ok(()),
    };

    // Relationships are resolved against the graph before the entity is
    // borrowed mutably.
    let mut relations = Vec::new();
    for (name, relationship) in &object.relationships {
        let Some(field) = desc.field(name).filter(|f| f.kind() == FieldKind::Relationship) else {
            continue;
        };
        let Some(linkage) = &relationship.data else {
            continue;
        };
        relations.push((field, link_targets(graph, index, field, linkage)?));
    }

    let Some(entity) = graph.node_mut(id) else {
        return Ok(());
    };
    write_keys(&mut *entity, &desc, object)?;

    for (name, value) in &object.attributes {
        let Some(field) = desc.field(name).filter(|f| f.kind() == FieldKind::Attribute) else {
            continue;
        };
        entity
            .decode_attribute(field.path(), value.clone(), field.options())
            .map_err(|reason| DecodeError::Attribute {
                field: name.clone(),
                reason,
            })?;
    }

    for (field, targets) in relations {
        entity
            .write_relation(field.path(), targets)
            .map_err(|reason| DecodeError::Attribute {
                field: field.name().to_owned(),
                reason,
            })?;
    }
    Ok(())
}

fn write_keys(entity: &mut dyn Resource, desc: &Arc<TypeDescriptor>, object: &ResourceObject) -> Result<()> {
    let lid = object.lid.as_deref();
    // Marshal only emits an `id` equal to its `lid` when the primary key is unset.
    if !object.id.is_empty() && lid != Some(object.id.as_str()) {
        entity
            .write_key(desc.primary().path(), &object.id)
            .map_err(|reason| DecodeError::Attribute {
                field: "id".into(),
                reason,
            })?;
    }
    if let (Some(lid), Some(field)) = (lid, desc.client_id()) {
        entity
            .write_key(field.path(), lid)
            .map_err(|reason| DecodeError::Attribute {
                field: "lid".into(),
                reason,
            })?;
    }
    Ok(())
}

/// Resolves linkage to slots, checking cardinality and target type.
fn link_targets(
    graph: &EntityGraph,
    index: &IdentityIndex<EntityId>,
    field: &FieldDescriptor,
    linkage: &Linkage,
) -> Result<Vec<EntityId>> {
    let Some(info) = field.relation() else {
        return Ok(Vec::new());
    };
    let mismatch = || DecodeError::CardinalityMismatch {
        relation: field.name(),
    };
    match (info.cardinality, linkage) {
        (Cardinality::ToOne, Linkage::Many(_)) => return Err(mismatch().into()),
        (Cardinality::ToMany, Linkage::One(Some(_))) => return Err(mismatch().into()),
        _ => {}
    }

    let mut targets = Vec::new();
    for identifier in linkage.identifiers() {
        let target = Identity::on_wire(&identifier.kind, &identifier.id, identifier.lid.as_deref())
            .and_then(|key| index.get(&key))
            .ok_or_else(|| DecodeError::DanglingReference {
                kind: identifier.kind.clone(),
                id: identifier.id.clone(),
            })?;
        if graph.type_id_of(target) != Some(info.target) {
            return Err(DecodeError::RelationshipTypeMismatch {
                relation: field.name(),
                found: identifier.kind.clone(),
            }
            .into());
        }
        targets.push(target);
    }
    Ok(targets)
}
