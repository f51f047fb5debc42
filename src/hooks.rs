//! Optional hook capabilities.
//!
//! A resource type may supply links and meta for its resource objects and for
//! each of its relationships. Capabilities are declared on the type with
//! `#[japi(links, meta, relationship_links, relationship_meta)]`, recorded in
//! its descriptor once, and invoked during marshal with the caller's
//! [`Context`].
//!
//! Hooks return loose JSON. The builder checks the shape before anything
//! reaches the document: links must be an object whose members are a URL
//! string or `{ "href": ..., "meta": {...} }`, meta must be an object.

use crate::document::{Link, Links, Meta};
use crate::error::{EncodeError, json_kind};
use bitflags::bitflags;
use serde_json::Value;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

bitflags! {
    /// Hook capabilities a type provides.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Hooks: u8 {
        /// Implements [`LinksHook`].
        const LINKS = 1;
        /// Implements [`MetaHook`].
        const META = 1 << 1;
        /// Implements [`RelationshipLinksHook`].
        const RELATIONSHIP_LINKS = 1 << 2;
        /// Implements [`RelationshipMetaHook`].
        const RELATIONSHIP_META = 1 << 3;
    }
}

/// Supplies the `links` member of a resource object.
pub trait LinksHook {
    /// Returns a JSON object of links, or `None` for no links.
    fn links(&self, ctx: &Context) -> Option<Value>;
}

/// Supplies the `meta` member of a resource object.
pub trait MetaHook {
    /// Returns a JSON object, or `None` for no meta.
    fn meta(&self, ctx: &Context) -> Option<Value>;
}

/// Supplies the `links` member of each relationship object.
pub trait RelationshipLinksHook {
    /// Returns a JSON object of links for `relation`, or `None`.
    fn relationship_links(&self, relation: &str, ctx: &Context) -> Option<Value>;
}

/// Supplies the `meta` member of each relationship object.
pub trait RelationshipMetaHook {
    /// Returns a JSON object for `relation`, or `None`.
    fn relationship_meta(&self, relation: &str, ctx: &Context) -> Option<Value>;
}

/// Opaque per-call values handed to hooks, keyed by type.
///
/// ```rust
/// use japi::Context;
///
/// struct BaseUrl(&'static str);
///
/// let ctx = Context::new().with(BaseUrl("https://example.com"));
/// assert_eq!(ctx.get::<BaseUrl>().map(|b| b.0), Some("https://example.com"));
/// ```
#[derive(Default)]
pub struct Context {
    values: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Context {
    /// An empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value, replacing any earlier value of the same type.
    pub fn with<T: Any + Send + Sync>(mut self, value: T) -> Self {
        self.insert(value);
        self
    }

    /// Adds a value, replacing any earlier value of the same type.
    pub fn insert<T: Any + Send + Sync>(&mut self, value: T) {
        self.values.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Looks up a value by type.
    pub fn get<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.values
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref::<T>())
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("values", &self.values.len())
            .finish()
    }
}

/// Checks hook output against the link shapes.
pub(crate) fn validate_links(value: Value) -> Result<Links, EncodeError> {
    let Value::Object(members) = value else {
        return Err(EncodeError::InvalidLinkValue {
            key: String::new(),
            found: json_kind(&value),
        });
    };
    members
        .into_iter()
        .map(|(key, member)| {
            let link = validate_link(&key, member)?;
            Ok((key, link))
        })
        .collect()
}

fn validate_link(key: &str, value: Value) -> Result<Link, EncodeError> {
    let invalid = |found| EncodeError::InvalidLinkValue {
        key: key.to_owned(),
        found,
    };
    match value {
        Value::String(href) => Ok(Link::Url(href)),
        Value::Object(mut object) => {
            let href = match object.remove("href") {
                Some(Value::String(href)) => href,
                Some(other) => return Err(invalid(json_kind(&other))),
                None => return Err(invalid("object without href")),
            };
            let meta = match object.remove("meta") {
                None | Some(Value::Null) => None,
                Some(Value::Object(meta)) => Some(meta),
                Some(other) => return Err(invalid(json_kind(&other))),
            };
            if !object.is_empty() {
                return Err(invalid("object with unknown members"));
            }
            Ok(Link::Object { href, meta })
        }
        other => Err(invalid(json_kind(&other))),
    }
}

/// Checks hook output against the meta shape.
pub(crate) fn validate_meta(value: Value) -> Result<Meta, EncodeError> {
    match value {
        Value::Object(meta) => Ok(meta),
        other => Err(EncodeError::InvalidMetaValue {
            found: json_kind(&other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_urls_and_link_objects() {
        let links = validate_links(json!({
            "self": "https://example.com/api/blogs/1",
            "comments": {
                "href": "https://example.com/api/blogs/1/comments",
                "meta": { "counts": { "likes": 4, "comments": 20 } }
            }
        }))
        .expect("valid links");

        assert_eq!(
            links.get("self"),
            Some(&Link::Url("https://example.com/api/blogs/1".into()))
        );
        match links.get("comments") {
            Some(Link::Object { href, meta }) => {
                assert!(href.ends_with("/comments"));
                assert_eq!(meta.as_ref().map(|m| m["counts"]["likes"].clone()), Some(json!(4)));
            }
            other => panic!("unexpected link {other:?}"),
        }
    }

    #[test]
    fn rejects_a_list_of_strings() {
        let err = validate_links(json!({ "self": ["invalid", "should error"] })).unwrap_err();
        assert_eq!(
            err,
            EncodeError::InvalidLinkValue {
                key: "self".into(),
                found: "array"
            }
        );
    }

    #[test]
    fn rejects_non_object_payloads() {
        assert!(validate_links(json!("https://example.com")).is_err());
        assert!(validate_links(json!({ "related": { "meta": {} } })).is_err());
        assert!(validate_meta(json!([1, 2])).is_err());
        assert!(validate_meta(json!({ "detail": "ok" })).is_ok());
    }

    #[test]
    fn context_is_keyed_by_type() {
        struct Tenant(u32);
        let mut ctx = Context::new().with(Tenant(1));
        ctx.insert(Tenant(2));
        assert_eq!(ctx.get::<Tenant>().map(|t| t.0), Some(2));
        assert!(ctx.get::<String>().is_none());
    }
}
