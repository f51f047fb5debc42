//! The JSON:API wire model.
//!
//! These types mirror the document format one-to-one and (de)serialize with
//! serde. The builder produces them from an [`EntityGraph`](crate::EntityGraph)
//! and the parser turns them back into one.
//!
//! ```text
//! { "data": <ResourceObject | [ResourceObject] | null>,   // or "errors"
//!   "included": [ResourceObject],
//!   "links": {..}, "meta": {..}, "jsonapi": {..} }
//! ```

pub(crate) mod builder;
pub(crate) mod parser;

use crate::error::{JapiError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

/// Free-form `meta` object.
pub type Meta = serde_json::Map<String, Value>;

/// A `links` object.
pub type Links = BTreeMap<String, Link>;

/// One member of a `links` object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Link {
    /// A bare URL.
    Url(String),
    /// A link object.
    Object {
        /// The link target.
        href: String,
        /// Extra information about the link.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        meta: Option<Meta>,
    },
}

/// Distinguishes an explicit `null` from an absent member.
fn present<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// `(type, id)` of a resource, the unit of deduplication.
///
/// Equality and hashing look at `type` and `id` only; `lid` and `meta` ride
/// along.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceIdentifier {
    /// Resource type name.
    #[serde(rename = "type")]
    pub kind: String,
    /// Resource id, always a string on the wire.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Client-assigned local id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lid: Option<String>,
    /// Identifier-level meta.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl ResourceIdentifier {
    /// Creates an identifier with no `lid` or meta.
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
            lid: None,
            meta: None,
        }
    }
}

impl PartialEq for ResourceIdentifier {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.id == other.id
    }
}

impl Eq for ResourceIdentifier {}

impl Hash for ResourceIdentifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.id.hash(state);
    }
}

/// The wire representation of one entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceObject {
    /// Resource type name.
    #[serde(rename = "type")]
    pub kind: String,
    /// Resource id; empty for not-yet-persisted resources.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Client-assigned local id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lid: Option<String>,
    /// Attribute values by wire name.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub attributes: serde_json::Map<String, Value>,
    /// Relationships by wire name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub relationships: BTreeMap<String, RelationshipObject>,
    /// Resource-level links.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Links>,
    /// Resource-level meta.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl ResourceObject {
    /// An object with identity only.
    pub fn new(identifier: ResourceIdentifier) -> Self {
        Self {
            kind: identifier.kind,
            id: identifier.id,
            lid: identifier.lid,
            ..Self::default()
        }
    }

    /// The identifier of this object.
    pub fn identifier(&self) -> ResourceIdentifier {
        ResourceIdentifier {
            kind: self.kind.clone(),
            id: self.id.clone(),
            lid: self.lid.clone(),
            meta: None,
        }
    }
}

/// Relationship linkage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Linkage {
    /// To-many: possibly empty.
    Many(Vec<ResourceIdentifier>),
    /// To-one: `null` when absent.
    One(Option<ResourceIdentifier>),
}

impl Linkage {
    /// All identifiers, regardless of cardinality.
    pub fn identifiers(&self) -> Vec<&ResourceIdentifier> {
        match self {
            Self::Many(ids) => ids.iter().collect(),
            Self::One(id) => id.iter().collect(),
        }
    }
}

/// One member of a `relationships` object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationshipObject {
    /// Resource linkage.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    pub data: Option<Linkage>,
    /// Relationship links.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Links>,
    /// Relationship meta.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

/// Primary data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrimaryData {
    /// A collection.
    Many(Vec<ResourceObject>),
    /// A single resource, or `null`.
    One(Option<Box<ResourceObject>>),
}

impl PrimaryData {
    /// All primary resource objects.
    pub fn resources(&self) -> Vec<&ResourceObject> {
        match self {
            Self::Many(objects) => objects.iter().collect(),
            Self::One(object) => object.iter().map(|boxed| &**boxed).collect(),
        }
    }
}

/// A JSON:API error object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
    /// Unique id of this occurrence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Links about this occurrence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Links>,
    /// HTTP status code as a string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Application-specific error code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Short summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Explanation of this occurrence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Where in the request the problem is.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ErrorSource>,
    /// Free-form meta.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

/// The `source` member of an error object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorSource {
    /// JSON pointer into the request document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pointer: Option<String>,
    /// Offending query parameter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
    /// Offending request header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
}

/// The top-level `jsonapi` object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JsonApiObject {
    /// Spec version the document follows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Free-form meta.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

/// A top-level JSON:API document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Primary data; mutually exclusive with `errors`.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    pub data: Option<PrimaryData>,
    /// Error objects; mutually exclusive with `data`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<ErrorObject>>,
    /// Side-loaded resources.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub included: Vec<ResourceObject>,
    /// Top-level links.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Links>,
    /// Top-level meta.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
    /// Implementation information.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jsonapi: Option<JsonApiObject>,
}

impl Document {
    /// An error document.
    pub fn from_errors(errors: Vec<ErrorObject>) -> Self {
        Self {
            errors: Some(errors),
            ..Self::default()
        }
    }

    /// Primary resource objects, or none for error and meta-only documents.
    pub fn primary(&self) -> Vec<&ResourceObject> {
        self.data.as_ref().map(PrimaryData::resources).unwrap_or_default()
    }

    /// Checks the top-level member rules.
    pub fn validate(&self) -> Result<()> {
        match (&self.data, &self.errors) {
            (Some(_), Some(_)) => Err(JapiError::Structural(
                "document must not contain both data and errors".into(),
            )),
            (None, None) if self.meta.is_none() => Err(JapiError::Structural(
                "document must contain at least one of data, errors or meta".into(),
            )),
            _ => Ok(()),
        }
    }
}
