//! # Japi
//!
//! A bidirectional codec between typed entity graphs and JSON:API documents.
//!
//! ## Overview
//!
//! Domain types declare how they map onto resource objects with
//! `#[derive(Resource)]` and field-level `#[japi(...)]` tags. The library
//! discovers each type's shape once, validates it, and caches it; marshal and
//! unmarshal then walk arbitrary graphs of such entities, including shared and
//! cyclic references, without any hand-written serialization code.
//!
//! ### Key Features
//!
//! *   **Declarative mapping:** primary key, attributes (with `iso8601` and
//!     `omitempty` flags), to-one and to-many relationships, client-ids and
//!     embedded structs, all from field tags.
//! *   **Compound documents:** related resources are side-loaded into
//!     `included` exactly once, no matter how many times they are referenced.
//! *   **Cycle safety:** entities live in an [`EntityGraph`] arena and refer to
//!     each other through [`Ref`] handles, so cycles are plain data.
//! *   **Hooks:** types may supply resource and relationship links and meta.
//!     Hook output is validated before it reaches the document.
//! *   **Fail fast:** invalid type declarations, malformed documents and bad
//!     hook output are errors, never partial documents.
//!
//! ## Architecture
//!
//! ```text
//! #[derive(Resource)] ──► descriptor (cached per type)
//!                               │
//! EntityGraph ──► builder ──► relationship resolver ──► Document ──► JSON
//! EntityGraph ◄── parser  ◄──────── TypeRegistry ◄───── Document ◄── JSON
//! ```
//!
//! - [`descriptor`] turns a type's declarations into a [`TypeDescriptor`].
//! - [`attribute`] converts field values to and from JSON.
//! - The builder composes documents; the parser rebuilds graphs. Both share a
//!   per-call identity index for deduplication.
//! - [`TypeRegistry`] maps wire type names back to Rust types on unmarshal.
//!
//! ## Usage
//!
//! ```rust
//! use japi::{Context, EntityGraph, Japi, Ref, Resource, TypeRegistry};
//!
//! #[derive(Debug, Default, Resource)]
//! struct Post {
//!     #[japi(primary = "posts")]
//!     id: u64,
//!     #[japi(attr = "title")]
//!     title: String,
//!     #[japi(relation = "comments")]
//!     comments: Vec<Ref<Comment>>,
//! }
//!
//! #[derive(Debug, Default, Resource)]
//! struct Comment {
//!     #[japi(primary = "comments")]
//!     id: u64,
//!     #[japi(attr = "body")]
//!     body: String,
//! }
//!
//! let mut graph = EntityGraph::new();
//! let first = graph.insert(Comment { id: 1, body: "First!".into() });
//! let post = graph.insert(Post { id: 7, title: "Hello".into(), comments: vec![first] });
//!
//! let json = Japi::to_string(&Japi::marshal(&graph, post, &Context::new())?)?;
//!
//! let registry = TypeRegistry::new().with::<Comment>()?;
//! let decoded = Japi::unmarshal_str::<Post>(&json, &registry)?;
//! let post = decoded.one().ok_or(japi::DecodeError::MissingPrimaryData)?;
//! let comment = decoded.get(post.comments[0]).ok_or(japi::DecodeError::MissingPrimaryData)?;
//! assert_eq!(comment.body, "First!");
//! # Ok::<(), japi::JapiError>(())
//! ```
//!
//! ### Safety and Error Handling
//!
//! * **No unsafe code.**
//! * **No Panics:** No `unwrap()` or `panic!()` calls in the library (enforced by clippy lints).
//! * **Comprehensive Errors:** All failures correspond to a [`JapiError`] type.

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![warn(missing_docs)]

// Lets the derive's `japi::` paths resolve inside this crate too.
extern crate self as japi;

// --- PUBLIC API MODULES ---
pub mod api;
pub mod attribute;
pub mod descriptor;
pub mod document;
pub mod error;
pub mod graph;
pub mod hooks;
pub mod registry;
pub mod resource;

// Private modules
mod identity;
mod relationship;

// --- MACRO SUPPORT MODULES ---

/// Runtime utilities used by the derived code.
#[doc(hidden)]
pub mod rt;

/// Internal re-exports for the macro to ensure dependencies are available.
#[doc(hidden)]
pub mod internal {
    pub use serde_json;
}

// --- RE-EXPORTS ---

pub use api::{Japi, JapiOptions};
pub use attribute::{AttrOptions, Attribute, Json};
pub use descriptor::TypeDescriptor;
pub use document::parser::{Decoded, Primary};
pub use document::{
    Document, ErrorObject, ErrorSource, JsonApiObject, Link, Linkage, Links, Meta, PrimaryData,
    RelationshipObject, ResourceIdentifier, ResourceObject,
};
pub use error::{AttrError, ConfigError, DecodeError, EncodeError, JapiError, Result};
pub use graph::{EntityGraph, EntityId, Ref};
pub use hooks::{Context, Hooks, LinksHook, MetaHook, RelationshipLinksHook, RelationshipMetaHook};
pub use registry::TypeRegistry;
pub use resource::{Cardinality, Relation, Resource};

// Re-export the derive macro so it is accessible as `japi::Resource`
pub use japi_derive::Resource;
