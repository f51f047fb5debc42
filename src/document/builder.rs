//! The document builder (marshal).
//!
//! Composes a top-level [`Document`] from entities in an [`EntityGraph`]:
//! primary data first, then whatever the relationship resolver side-loads.
//! Primary resources are claimed in the identity index before any
//! relationship is walked, so none of them can reappear in `included`.

use super::{Document, JsonApiObject, PrimaryData, ResourceIdentifier, ResourceObject};
use crate::api::JapiOptions;
use crate::error::{EncodeError, Result};
use crate::graph::{EntityGraph, EntityId, Ref};
use crate::hooks::{Context, Hooks, validate_links, validate_meta};
use crate::relationship::{Node, Resolver, identify};
use crate::resource::Resource;
use std::any::TypeId;

/// The requested primary data and the type every root must have.
#[derive(Debug, Clone)]
pub(crate) struct Roots {
    ids: Vec<EntityId>,
    many: bool,
    target: TypeId,
    target_name: &'static str,
}

impl Roots {
    /// A single resource, or `null`.
    pub(crate) fn one<T: Resource>(root: Option<Ref<T>>) -> Self {
        Self {
            ids: root.iter().map(Ref::id).collect(),
            many: false,
            target: TypeId::of::<T>(),
            target_name: std::any::type_name::<T>(),
        }
    }

    /// A collection, possibly empty.
    pub(crate) fn many<T: Resource>(roots: &[Ref<T>]) -> Self {
        Self {
            ids: roots.iter().map(Ref::id).collect(),
            many: true,
            target: TypeId::of::<T>(),
            target_name: std::any::type_name::<T>(),
        }
    }
}

/// Marshals `roots` out of `graph`.
pub(crate) fn build(
    graph: &EntityGraph,
    roots: Roots,
    ctx: &Context,
    options: &JapiOptions,
) -> Result<Document> {
    let mut resolver = Resolver::new(graph, ctx, options.include);

    let Roots {
        ids,
        many,
        target,
        target_name,
    } = roots;

    let mut primaries = Vec::with_capacity(ids.len());
    for id in ids {
        let node = resolver.typed_node(id, target, target_name)?;
        let identifier = identify(&node)?;
        if resolver.mark_primary(&node, &identifier) {
            primaries.push((node, identifier));
        }
    }

    let mut objects = Vec::with_capacity(primaries.len());
    for (node, identifier) in primaries {
        let mut object = resource_object(&node, identifier, ctx)?;
        object.relationships = resolver.relationships(&node)?;
        objects.push(object);
    }
    let included = resolver.into_included()?;

    let data = if many {
        PrimaryData::Many(objects)
    } else {
        PrimaryData::One(objects.into_iter().next().map(Box::new))
    };

    tracing::debug!(
        primary = data.resources().len(),
        included = included.len(),
        "marshalled document"
    );

    Ok(Document {
        data: Some(data),
        errors: None,
        included,
        links: options.links.clone(),
        meta: options.meta.clone(),
        jsonapi: jsonapi_object(options),
    })
}

/// Builds an error document.
pub(crate) fn build_errors(errors: Vec<super::ErrorObject>, options: &JapiOptions) -> Document {
    Document {
        links: options.links.clone(),
        meta: options.meta.clone(),
        jsonapi: jsonapi_object(options),
        ..Document::from_errors(errors)
    }
}

fn jsonapi_object(options: &JapiOptions) -> Option<JsonApiObject> {
    options.version.as_ref().map(|version| JsonApiObject {
        version: Some(version.clone()),
        meta: None,
    })
}

/// Builds one resource object without its relationships: identity,
/// attributes, and resource-level links and meta.
pub(crate) fn resource_object(
    node: &Node<'_>,
    identifier: ResourceIdentifier,
    ctx: &Context,
) -> Result<ResourceObject> {
    let mut object = ResourceObject::new(identifier);

    for field in node.desc.attributes() {
        let attribute_error = |reason| EncodeError::Attribute {
            field: field.name(),
            reason,
        };
        let options = field.options();
        if options.omit_empty
            && node
                .entity
                .attribute_is_empty(field.path())
                .map_err(attribute_error)?
        {
            continue;
        }
        let value = node
            .entity
            .encode_attribute(field.path(), options)
            .map_err(attribute_error)?;
        object.attributes.insert(field.name().to_owned(), value);
    }

    let hooks = node.desc.hooks();
    if hooks.contains(Hooks::LINKS) {
        if let Some(value) = node.entity.links_hook().and_then(|hook| hook.links(ctx)) {
            object.links = Some(validate_links(value)?);
        }
    }
    if hooks.contains(Hooks::META) {
        if let Some(value) = node.entity.meta_hook().and_then(|hook| hook.meta(ctx)) {
            object.meta = Some(validate_meta(value)?);
        }
    }
    Ok(object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Resource;
    use serde_json::json;

    #[derive(Debug, Default, Resource)]
    struct Step {
        #[japi(primary = "nodes")]
        id: u32,
        #[japi(attr = "label", omitempty)]
        label: String,
        #[japi(relation = "next")]
        next: Option<Ref<Step>>,
    }

    #[test]
    fn a_self_cycle_marshals_to_linkage() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let mut graph = EntityGraph::new();
        let root = graph.insert(Step {
            id: 1,
            label: "root".into(),
            next: None,
        });
        if let Some(node) = graph.get_mut(root) {
            node.next = Some(root);
        }

        let doc = build(&graph, Roots::one(Some(root)), &Context::new(), &JapiOptions::default())?;
        assert!(doc.included.is_empty());
        assert_eq!(
            serde_json::to_value(&doc)?,
            json!({
                "data": {
                    "type": "nodes",
                    "id": "1",
                    "attributes": { "label": "root" },
                    "relationships": {
                        "next": { "data": { "type": "nodes", "id": "1" } }
                    }
                }
            })
        );
        Ok(())
    }

    #[test]
    fn omitted_roots_give_null_data() -> Result<()> {
        let graph = EntityGraph::new();
        let doc = build(&graph, Roots::one::<Step>(None), &Context::new(), &JapiOptions::default())?;
        assert_eq!(doc.data, Some(PrimaryData::One(None)));

        let doc = build(&graph, Roots::many::<Step>(&[]), &Context::new(), &JapiOptions::default())?;
        assert_eq!(doc.data, Some(PrimaryData::Many(Vec::new())));
        Ok(())
    }

    #[test]
    fn empty_attributes_are_omitted_when_asked() -> Result<()> {
        let mut graph = EntityGraph::new();
        let root = graph.insert(Step::default());
        let doc = build(&graph, Roots::one(Some(root)), &Context::new(), &JapiOptions::default())?;
        let object = doc.primary()[0].clone();
        assert!(object.attributes.is_empty());
        assert_eq!(object.id, "");
        assert!(object.relationships.contains_key("next"));
        Ok(())
    }
}
