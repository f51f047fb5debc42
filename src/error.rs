//! Centralized error handling for japi.
//!
//! Every failure the codec can produce is represented by [`JapiError`] and
//! returned through [`Result`]. Nothing is swallowed and nothing is half-done:
//! a failed marshal or unmarshal call discards its work in progress and hands
//! back only the error.
//!
//! ## Error Categories
//!
//! - **Configuration** ([`JapiError::Configuration`]): a type's declared shape
//!   is invalid. Detected once when its descriptor is resolved, cached, and
//!   re-raised on every later use of that type.
//! - **Encode** ([`JapiError::Encode`]): a hook returned an unsupported value
//!   or an attribute could not be converted to JSON.
//! - **Decode** ([`JapiError::Decode`]): the wire document does not fit the
//!   target types (unknown resource type, type mismatch, dangling reference,
//!   malformed attribute).
//! - **Structural** ([`JapiError::Structural`]): the top-level document breaks
//!   the `data`/`errors` exclusivity rule.
//!
//! ## Cloneability
//!
//! [`JapiError`] is `Clone`. The descriptor cache stores failed resolutions and
//! hands out copies of the same error to every later caller.
//!
//! ## Example
//!
//! ```rust
//! use japi::{DecodeError, JapiError};
//!
//! fn describe(err: &JapiError) -> &'static str {
//!     match err {
//!         JapiError::Decode(DecodeError::UnknownResourceType(_)) => "register the type first",
//!         JapiError::Configuration(_) => "fix the #[japi] attributes",
//!         _ => "other",
//!     }
//! }
//! # let _ = describe;
//! ```

use std::fmt;

/// A specialized `Result` type for japi operations.
pub type Result<T> = std::result::Result<T, JapiError>;

/// The master error enum covering all failure domains.
#[derive(Debug, Clone, PartialEq)]
pub enum JapiError {
    /// A type's declared field metadata is invalid.
    Configuration(ConfigError),
    /// Marshalling failed.
    Encode(EncodeError),
    /// Unmarshalling failed.
    Decode(DecodeError),
    /// The document violates the top-level shape rules.
    Structural(String),
}

impl fmt::Display for JapiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration(e) => write!(f, "Configuration Error: {e}"),
            Self::Encode(e) => write!(f, "Encode Error: {e}"),
            Self::Decode(e) => write!(f, "Decode Error: {e}"),
            Self::Structural(s) => write!(f, "Structural Error: {s}"),
        }
    }
}

impl std::error::Error for JapiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Configuration(e) => Some(e),
            Self::Encode(e) => Some(e),
            Self::Decode(e) => Some(e),
            Self::Structural(_) => None,
        }
    }
}

impl From<ConfigError> for JapiError {
    fn from(err: ConfigError) -> Self {
        Self::Configuration(err)
    }
}

impl From<EncodeError> for JapiError {
    fn from(err: EncodeError) -> Self {
        Self::Encode(err)
    }
}

impl From<DecodeError> for JapiError {
    fn from(err: DecodeError) -> Self {
        Self::Decode(err)
    }
}

/// An invalid type shape, reported with the Rust type name it concerns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No field is tagged `primary`.
    MissingPrimary {
        /// Rust type name.
        type_name: &'static str,
    },
    /// More than one field is tagged `primary`.
    DuplicatePrimary {
        /// Rust type name.
        type_name: &'static str,
    },
    /// The primary tag carries an empty resource type name.
    MissingTypeName {
        /// Rust type name.
        type_name: &'static str,
    },
    /// The key field cannot be converted to a canonical string.
    UnsupportedPrimaryKey {
        /// Rust type name.
        type_name: &'static str,
        /// Rust field name.
        field: &'static str,
    },
    /// More than one field is tagged `client_id`.
    DuplicateClientId {
        /// Rust type name.
        type_name: &'static str,
    },
    /// Two attribute or relationship fields share a wire name.
    DuplicateWireName {
        /// Rust type name.
        type_name: &'static str,
        /// The colliding wire name.
        name: &'static str,
    },
    /// Two registered types claim the same resource type name.
    DuplicateResourceType {
        /// The colliding resource type name.
        wire_type: &'static str,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingPrimary { type_name } => {
                write!(f, "missing primary field on `{type_name}`")
            }
            Self::DuplicatePrimary { type_name } => {
                write!(f, "duplicate primary field on `{type_name}`")
            }
            Self::MissingTypeName { type_name } => {
                write!(f, "missing resource type name on `{type_name}`")
            }
            Self::UnsupportedPrimaryKey { type_name, field } => {
                write!(f, "unsupported primary key kind for `{type_name}.{field}`")
            }
            Self::DuplicateClientId { type_name } => {
                write!(f, "duplicate client-id field on `{type_name}`")
            }
            Self::DuplicateWireName { type_name, name } => {
                write!(f, "duplicate wire name '{name}' on `{type_name}`")
            }
            Self::DuplicateResourceType { wire_type } => {
                write!(f, "duplicate resource type '{wire_type}' in registry")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// A marshal-time failure.
#[derive(Debug, Clone, PartialEq)]
pub enum EncodeError {
    /// A links hook produced a member that is neither a URL nor a link object.
    InvalidLinkValue {
        /// The offending member name (empty when the whole value was not an object).
        key: String,
        /// JSON kind that was found instead.
        found: &'static str,
    },
    /// A meta hook produced something other than a JSON object.
    InvalidMetaValue {
        /// JSON kind that was found instead.
        found: &'static str,
    },
    /// An attribute could not be converted to a wire value.
    Attribute {
        /// Wire name of the attribute.
        field: &'static str,
        /// What went wrong.
        reason: AttrError,
    },
    /// A relationship handle does not point into the entity graph.
    DanglingEntity {
        /// Raw slot number of the missing entity.
        slot: u32,
    },
    /// A handle points at a slot holding a different type than it was typed with.
    EntityTypeMismatch {
        /// Raw slot number of the entity.
        slot: u32,
        /// Rust type name the handle expects.
        expected: &'static str,
    },
    /// The finished document could not be serialized.
    Json(String),
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidLinkValue { key, found } if key.is_empty() => {
                write!(f, "invalid link value: expected an object of links, found {found}")
            }
            Self::InvalidLinkValue { key, found } => {
                write!(
                    f,
                    "invalid link value for '{key}': expected a URL or link object, found {found}"
                )
            }
            Self::InvalidMetaValue { found } => {
                write!(f, "invalid meta value: expected an object, found {found}")
            }
            Self::Attribute { field, reason } => {
                write!(f, "attribute '{field}' could not be encoded: {reason}")
            }
            Self::DanglingEntity { slot } => {
                write!(f, "dangling entity reference #{slot}")
            }
            Self::EntityTypeMismatch { slot, expected } => {
                write!(f, "entity #{slot} is not a `{expected}`")
            }
            Self::Json(msg) => write!(f, "document serialization failed: {msg}"),
        }
    }
}

impl std::error::Error for EncodeError {}

impl From<serde_json::Error> for EncodeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// An unmarshal-time failure.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// The registry has no constructor for this resource type.
    UnknownResourceType(String),
    /// Primary data carries a different resource type than requested.
    TypeMismatch {
        /// Resource type of the requested root.
        expected: &'static str,
        /// Resource type found in the document.
        found: String,
    },
    /// A relationship names a resource that is neither primary nor included.
    DanglingReference {
        /// Resource type of the missing target.
        kind: String,
        /// Id of the missing target.
        id: String,
    },
    /// A relationship target was constructed as a different type than the field holds.
    RelationshipTypeMismatch {
        /// Wire name of the relationship.
        relation: &'static str,
        /// Resource type of the offending target.
        found: String,
    },
    /// A to-one relationship received an array or a to-many an object.
    CardinalityMismatch {
        /// Wire name of the relationship.
        relation: &'static str,
    },
    /// An attribute (or the id) did not fit the target field.
    Attribute {
        /// Wire name of the attribute (`id` / `lid` for keys).
        field: String,
        /// What went wrong.
        reason: AttrError,
    },
    /// The document has no primary data to unmarshal.
    MissingPrimaryData,
    /// The input was not valid JSON or not a JSON:API document.
    Json(String),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownResourceType(kind) => write!(f, "unknown resource type '{kind}'"),
            Self::TypeMismatch { expected, found } => {
                write!(f, "type mismatch: expected '{expected}', found '{found}'")
            }
            Self::DanglingReference { kind, id } => {
                write!(f, "dangling relationship reference to {kind}:{id}")
            }
            Self::RelationshipTypeMismatch { relation, found } => {
                write!(f, "relationship type mismatch on '{relation}': found '{found}'")
            }
            Self::CardinalityMismatch { relation } => {
                write!(f, "relationship cardinality mismatch on '{relation}'")
            }
            Self::Attribute { field, reason } => write!(f, "field '{field}': {reason}"),
            Self::MissingPrimaryData => write!(f, "missing primary data"),
            Self::Json(msg) => write!(f, "malformed document: {msg}"),
        }
    }
}

impl std::error::Error for DecodeError {}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// A field-level codec failure.
///
/// Raised by [`Attribute`](crate::Attribute) impls, which do not know the
/// field they are working on; the caller wraps it with the wire name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrError {
    /// The JSON kind or text does not fit the field type.
    TypeMismatch {
        /// Human-readable expected kind.
        expected: &'static str,
        /// Extra detail (the JSON kind found, or the parse error).
        detail: String,
    },
    /// Timestamp text could not be parsed, or a timestamp is out of range.
    BadTimestamp(String),
    /// The value could not be turned into JSON.
    Unrepresentable(String),
    /// Generated accessors were asked for a slot they do not have.
    NoSuchField,
}

impl AttrError {
    /// Shorthand for a type mismatch against a JSON value.
    pub fn mismatch(expected: &'static str, found: &serde_json::Value) -> Self {
        Self::TypeMismatch {
            expected,
            detail: format!("found {}", json_kind(found)),
        }
    }
}

impl fmt::Display for AttrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TypeMismatch { expected, detail } => {
                write!(f, "attribute type mismatch: expected {expected}, {detail}")
            }
            Self::BadTimestamp(s) => write!(f, "bad timestamp format: {s}"),
            Self::Unrepresentable(s) => write!(f, "value has no JSON form: {s}"),
            Self::NoSuchField => write!(f, "no such field"),
        }
    }
}

impl std::error::Error for AttrError {}

/// Names the kind of a JSON value for error messages.
pub(crate) fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
