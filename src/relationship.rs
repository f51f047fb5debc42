//! The relationship resolver.
//!
//! Walks relationship fields of the entities being marshalled, emits resource
//! identifier linkage for each, and side-loads every related entity reached
//! for the first time into the `included` set.
//!
//! The walk is depth-first with pre-visit marking: a target is claimed in the
//! identity index (and its `included` slot reserved) before any of its own
//! relationships are looked at, so a cycle back to it only emits linkage. The
//! pending targets live on an explicit stack rather than the call stack, which
//! keeps long relationship chains from overflowing it.

use crate::descriptor::{FieldDescriptor, RelationInfo, TypeDescriptor};
use crate::document::builder::resource_object;
use crate::document::{Linkage, RelationshipObject, ResourceIdentifier, ResourceObject};
use crate::error::{EncodeError, Result};
use crate::graph::{EntityGraph, EntityId};
use crate::hooks::{Context, Hooks, validate_links, validate_meta};
use crate::identity::{Identity, IdentityIndex, IncludedSet, Visit};
use crate::resource::{Cardinality, Resource};
use std::any::TypeId;
use std::collections::BTreeMap;
use std::sync::Arc;

/// An entity borrowed from the graph together with its descriptor.
pub(crate) struct Node<'g> {
    pub(crate) id: EntityId,
    pub(crate) entity: &'g dyn Resource,
    pub(crate) desc: Arc<TypeDescriptor>,
}

/// Marshal-time walker over one [`EntityGraph`].
pub(crate) struct Resolver<'g> {
    graph: &'g EntityGraph,
    ctx: &'g Context,
    include: bool,
    index: IdentityIndex<Visit>,
    included: IncludedSet,
    pending: Vec<(usize, Node<'g>, ResourceIdentifier)>,
}

impl<'g> Resolver<'g> {
    pub(crate) fn new(graph: &'g EntityGraph, ctx: &'g Context, include: bool) -> Self {
        Self {
            graph,
            ctx,
            include,
            index: IdentityIndex::new(),
            included: IncludedSet::default(),
            pending: Vec::new(),
        }
    }

    /// Borrows an entity and resolves its descriptor.
    pub(crate) fn node(&self, id: EntityId) -> Result<Node<'g>> {
        let entity = self
            .graph
            .node(id)
            .ok_or(EncodeError::DanglingEntity { slot: id.as_u32() })?;
        let desc = entity.descriptor()?;
        Ok(Node { id, entity, desc })
    }

    /// Like [`node`](Self::node), but also checks that the slot holds the
    /// type the handle was typed with. A handle from another graph can point
    /// at a slot of a different type here.
    pub(crate) fn typed_node(&self, id: EntityId, expected: TypeId, expected_name: &'static str) -> Result<Node<'g>> {
        let node = self.node(id)?;
        if self.graph.type_id_of(id) != Some(expected) {
            return Err(EncodeError::EntityTypeMismatch {
                slot: id.as_u32(),
                expected: expected_name,
            }
            .into());
        }
        Ok(node)
    }

    /// Claims a primary resource. Returns `false` when the same resource was
    /// already claimed as primary data.
    pub(crate) fn mark_primary(&mut self, node: &Node<'g>, identifier: &ResourceIdentifier) -> bool {
        self.index
            .claim(Identity::of(identifier, node.id), Visit::Primary)
            .is_none()
    }

    /// Builds the `relationships` member of `node`, queueing newly reached
    /// targets for side-loading.
    pub(crate) fn relationships(&mut self, node: &Node<'g>) -> Result<BTreeMap<String, RelationshipObject>> {
        let mut out = BTreeMap::new();
        for field in node.desc.relationships() {
            let linkage = self.linkage(node, field)?;
            let object = relationship_object(node, field.name(), linkage, self.ctx)?;
            out.insert(field.name().to_owned(), object);
        }
        Ok(out)
    }

    fn linkage(&mut self, node: &Node<'g>, field: &FieldDescriptor) -> Result<Linkage> {
        let targets = node
            .entity
            .relation_targets(field.path())
            .map_err(|reason| EncodeError::Attribute {
                field: field.name(),
                reason,
            })?;

        let Some(info) = field.relation() else {
            return Ok(Linkage::Many(Vec::new()));
        };

        let mut identifiers = Vec::with_capacity(targets.len());
        for target in targets {
            identifiers.push(self.visit(target, info)?);
        }

        Ok(match info.cardinality {
            Cardinality::ToOne => Linkage::One(identifiers.into_iter().next()),
            Cardinality::ToMany => Linkage::Many(identifiers),
        })
    }

    /// Identifies a relationship target, claiming and queueing it on first
    /// sight.
    fn visit(&mut self, target: EntityId, info: &RelationInfo) -> Result<ResourceIdentifier> {
        let node = self.typed_node(target, info.target, info.target_name)?;
        let identifier = identify(&node)?;
        if !self.include {
            return Ok(identifier);
        }

        let identity = Identity::of(&identifier, target);
        if self.index.get(&identity).is_none() {
            let slot = self.included.reserve();
            self.index.claim(identity, Visit::Included(slot));
            self.pending.push((slot, node, identifier.clone()));
        }
        Ok(identifier)
    }

    /// Builds every queued resource object, including the ones queued while
    /// doing so.
    pub(crate) fn drain(&mut self) -> Result<()> {
        while let Some((slot, node, identifier)) = self.pending.pop() {
            let mut object = resource_object(&node, identifier, self.ctx)?;
            object.relationships = self.relationships(&node)?;
            tracing::trace!(
                kind = %object.kind,
                id = %object.id,
                slot,
                "side-loaded resource"
            );
            self.included.fill(slot, object);
        }
        Ok(())
    }

    /// Finishes the walk and returns the `included` list.
    pub(crate) fn into_included(mut self) -> Result<Vec<ResourceObject>> {
        self.drain()?;
        Ok(self.included.into_objects())
    }
}

/// Computes the wire identity of an entity.
///
/// `id` is the primary key when set and otherwise the client-id. A set
/// client-id is also carried as `lid`, except when it equals the primary key:
/// an `id` equal to its `lid` reads back as a client-id only.
pub(crate) fn identify(node: &Node<'_>) -> Result<ResourceIdentifier> {
    let desc = &node.desc;
    let primary = node
        .entity
        .read_key(desc.primary().path())
        .map_err(|reason| EncodeError::Attribute { field: "id", reason })?;
    let client = match desc.client_id() {
        Some(field) => node
            .entity
            .read_key(field.path())
            .map_err(|reason| EncodeError::Attribute { field: "lid", reason })?,
        None => None,
    };

    let lid = client.clone().filter(|lid| primary.as_ref() != Some(lid));
    Ok(ResourceIdentifier {
        kind: desc.wire_type().to_owned(),
        id: primary.or(client).unwrap_or_default(),
        lid,
        meta: None,
    })
}

fn relationship_object(
    node: &Node<'_>,
    relation: &str,
    linkage: Linkage,
    ctx: &Context,
) -> Result<RelationshipObject> {
    let hooks = node.desc.hooks();
    let mut object = RelationshipObject {
        data: Some(linkage),
        links: None,
        meta: None,
    };

    if hooks.contains(Hooks::RELATIONSHIP_LINKS) {
        if let Some(value) = node
            .entity
            .relationship_links_hook()
            .and_then(|hook| hook.relationship_links(relation, ctx))
        {
            object.links = Some(validate_links(value)?);
        }
    }
    if hooks.contains(Hooks::RELATIONSHIP_META) {
        if let Some(value) = node
            .entity
            .relationship_meta_hook()
            .and_then(|hook| hook.relationship_meta(relation, ctx))
        {
            object.meta = Some(validate_meta(value)?);
        }
    }
    Ok(object)
}
