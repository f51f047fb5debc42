//! The caller-supplied type registry used by unmarshal.
//!
//! The wire format only names resource types by string. To rebuild a typed
//! graph the parser needs a zero-value constructor for each name it meets;
//! the registry maps one to the other.

use crate::descriptor::resolve;
use crate::error::{ConfigError, Result};
use crate::resource::Resource;
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;

type Constructor = fn() -> Box<dyn Resource>;

fn construct<T: Resource + Default>() -> Box<dyn Resource> {
    Box::new(T::default())
}

#[derive(Clone, Copy)]
struct Entry {
    type_id: TypeId,
    type_name: &'static str,
    construct: Constructor,
}

/// Maps resource type names to constructors.
///
/// ```rust
/// use japi::{Resource, TypeRegistry};
///
/// #[derive(Debug, Default, Resource)]
/// struct Tag {
///     #[japi(primary = "tags")]
///     id: String,
/// }
///
/// let registry = TypeRegistry::new().with::<Tag>()?;
/// assert!(registry.contains("tags"));
/// # Ok::<(), japi::JapiError>(())
/// ```
#[derive(Clone, Default)]
pub struct TypeRegistry {
    entries: HashMap<&'static str, Entry>,
}

impl TypeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T` under its resource type name.
    ///
    /// Fails when `T`'s declarations are invalid or another type already
    /// claimed the name. Registering the same type twice is a no-op.
    pub fn register<T: Resource + Default>(&mut self) -> Result<&mut Self> {
        let desc = resolve::<T>()?;
        let wire_type = desc.wire_type();
        match self.entries.get(wire_type) {
            Some(existing) if existing.type_id != TypeId::of::<T>() => {
                return Err(ConfigError::DuplicateResourceType { wire_type }.into());
            }
            Some(_) => {}
            None => {
                self.entries.insert(
                    wire_type,
                    Entry {
                        type_id: TypeId::of::<T>(),
                        type_name: desc.type_name(),
                        construct: construct::<T>,
                    },
                );
            }
        }
        Ok(self)
    }

    /// Builder form of [`register`](Self::register).
    pub fn with<T: Resource + Default>(mut self) -> Result<Self> {
        self.register::<T>()?;
        Ok(self)
    }

    /// Whether a constructor exists for `wire_type`.
    pub fn contains(&self, wire_type: &str) -> bool {
        self.entries.contains_key(wire_type)
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Builds a zero value of the type registered for `wire_type`.
    pub(crate) fn construct(&self, wire_type: &str) -> Option<Box<dyn Resource>> {
        self.entries.get(wire_type).map(|entry| (entry.construct)())
    }

    /// Like [`construct`](Self::construct), falling back to `T` for the
    /// root's own type name when the caller did not register it.
    pub(crate) fn construct_or<T: Resource + Default>(
        &self,
        wire_type: &str,
        root_wire_type: &str,
    ) -> Option<Box<dyn Resource>> {
        self.construct(wire_type)
            .or_else(|| (wire_type == root_wire_type).then(construct::<T>))
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self
            .entries
            .iter()
            .map(|(wire, entry)| (*wire, entry.type_name))
            .collect();
        names.sort_unstable();
        f.debug_struct("TypeRegistry").field("types", &names).finish()
    }
}
