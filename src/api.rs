//! The main entry points.

use crate::document::builder::{self, Roots};
use crate::document::parser::{self, Decoded};
use crate::document::{Document, ErrorObject, Links, Meta};
use crate::error::{DecodeError, EncodeError, Result};
use crate::graph::{EntityGraph, Ref};
use crate::hooks::Context;
use crate::registry::TypeRegistry;
use crate::resource::Resource;

/// The codec facade.
///
/// Every call is independent: the only state shared between calls is the
/// process-wide descriptor cache.
///
/// ```rust
/// use japi::{Context, EntityGraph, Japi, Resource, TypeRegistry};
///
/// #[derive(Debug, Default, Resource)]
/// struct Post {
///     #[japi(primary = "posts")]
///     id: u64,
///     #[japi(attr = "title")]
///     title: String,
/// }
///
/// let mut graph = EntityGraph::new();
/// let post = graph.insert(Post { id: 1, title: "Hello".into() });
///
/// let doc = Japi::marshal(&graph, post, &Context::new())?;
/// let decoded = Japi::unmarshal::<Post>(&doc, &TypeRegistry::new())?;
/// assert_eq!(decoded.one().map(|p| p.title.as_str()), Some("Hello"));
/// # Ok::<(), japi::JapiError>(())
/// ```
#[derive(Debug)]
pub struct Japi;

impl Japi {
    /// Marshals one resource as primary data.
    pub fn marshal<T: Resource>(graph: &EntityGraph, root: Ref<T>, ctx: &Context) -> Result<Document> {
        builder::build(graph, Roots::one(Some(root)), ctx, &JapiOptions::default())
    }

    /// Marshals a collection as primary data. Repeated roots collapse.
    pub fn marshal_many<T: Resource>(graph: &EntityGraph, roots: &[Ref<T>], ctx: &Context) -> Result<Document> {
        builder::build(graph, Roots::many(roots), ctx, &JapiOptions::default())
    }

    /// Marshals an optional resource; `None` gives `"data": null`.
    pub fn marshal_optional<T: Resource>(
        graph: &EntityGraph,
        root: Option<Ref<T>>,
        ctx: &Context,
    ) -> Result<Document> {
        builder::build(graph, Roots::one(root), ctx, &JapiOptions::default())
    }

    /// Builds an error document.
    pub fn marshal_errors(errors: Vec<ErrorObject>) -> Document {
        Self::builder().marshal_errors(errors)
    }

    /// Unmarshals a document whose primary data is of type `T`.
    ///
    /// `registry` must know every other resource type the document contains;
    /// `T` itself need not be registered.
    pub fn unmarshal<T: Resource + Default>(doc: &Document, registry: &TypeRegistry) -> Result<Decoded<T>> {
        parser::parse(doc, registry)
    }

    /// Parses JSON text, then unmarshals it.
    pub fn unmarshal_str<T: Resource + Default>(json: &str, registry: &TypeRegistry) -> Result<Decoded<T>> {
        let doc: Document = serde_json::from_str(json).map_err(DecodeError::from)?;
        Self::unmarshal(&doc, registry)
    }

    /// Parses JSON bytes, then unmarshals them.
    pub fn unmarshal_slice<T: Resource + Default>(json: &[u8], registry: &TypeRegistry) -> Result<Decoded<T>> {
        let doc: Document = serde_json::from_slice(json).map_err(DecodeError::from)?;
        Self::unmarshal(&doc, registry)
    }

    /// Returns the error objects of an error document.
    ///
    /// A document carrying `data` instead yields an empty list.
    pub fn unmarshal_errors(doc: &Document) -> Result<Vec<ErrorObject>> {
        doc.validate()?;
        Ok(doc.errors.clone().unwrap_or_default())
    }

    /// Serializes a document to JSON text.
    pub fn to_string(doc: &Document) -> Result<String> {
        serde_json::to_string(doc).map_err(|e| EncodeError::from(e).into())
    }

    /// Serializes a document to JSON bytes.
    pub fn to_vec(doc: &Document) -> Result<Vec<u8>> {
        serde_json::to_vec(doc).map_err(|e| EncodeError::from(e).into())
    }

    /// Starts a configured marshal call.
    pub fn builder() -> JapiOptions {
        JapiOptions::default()
    }
}

/// Per-call marshal options.
///
/// ```rust
/// use japi::{Japi, Link};
///
/// let doc = Japi::builder()
///     .version("1.1")
///     .link("self", Link::Url("https://example.com/posts".into()))
///     .marshal_errors(Vec::new());
/// assert_eq!(doc.jsonapi.and_then(|j| j.version).as_deref(), Some("1.1"));
/// ```
#[derive(Debug)]
pub struct JapiOptions {
    pub(crate) context: Context,
    pub(crate) include: bool,
    pub(crate) links: Option<Links>,
    pub(crate) meta: Option<Meta>,
    pub(crate) version: Option<String>,
}

impl Default for JapiOptions {
    fn default() -> Self {
        Self {
            context: Context::new(),
            include: true,
            links: None,
            meta: None,
            version: None,
        }
    }
}

impl JapiOptions {
    /// Sets the context handed to hooks.
    pub fn context(mut self, ctx: Context) -> Self {
        self.context = ctx;
        self
    }

    /// Whether related resources are side-loaded into `included`.
    /// Linkage is emitted either way. Defaults to `true`.
    pub fn include(mut self, include: bool) -> Self {
        self.include = include;
        self
    }

    /// Replaces the top-level `links`.
    pub fn links(mut self, links: Links) -> Self {
        self.links = Some(links);
        self
    }

    /// Adds one top-level link.
    pub fn link(mut self, name: impl Into<String>, link: crate::document::Link) -> Self {
        self.links.get_or_insert_with(Links::new).insert(name.into(), link);
        self
    }

    /// Replaces the top-level `meta`.
    pub fn meta(mut self, meta: Meta) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Emits a top-level `jsonapi` object with this version.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Marshals one resource.
    pub fn marshal<T: Resource>(&self, graph: &EntityGraph, root: Ref<T>) -> Result<Document> {
        builder::build(graph, Roots::one(Some(root)), &self.context, self)
    }

    /// Marshals a collection.
    pub fn marshal_many<T: Resource>(&self, graph: &EntityGraph, roots: &[Ref<T>]) -> Result<Document> {
        builder::build(graph, Roots::many(roots), &self.context, self)
    }

    /// Marshals an optional resource.
    pub fn marshal_optional<T: Resource>(&self, graph: &EntityGraph, root: Option<Ref<T>>) -> Result<Document> {
        builder::build(graph, Roots::one(root), &self.context, self)
    }

    /// Builds an error document carrying these options' links, meta and
    /// version.
    pub fn marshal_errors(&self, errors: Vec<ErrorObject>) -> Document {
        builder::build_errors(errors, self)
    }
}
