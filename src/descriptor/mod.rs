//! Type descriptors: how one Rust type maps onto resource objects.
//!
//! A [`TypeDescriptor`] is built from the declarations a type's
//! [`Resource::declare`] returns, validated once, and cached for the life of
//! the process by [`resolve`]. Embedded structs are flattened into their
//! owner here, so the codec only ever sees a flat list of fields with access
//! paths.

mod cache;
mod decl;

pub use cache::{clear, contains, resolve};
pub use decl::{DeclKind, FieldDecl};

use crate::attribute::{AttrOptions, KeyKind};
use crate::error::ConfigError;
use crate::hooks::Hooks;
use crate::resource::{Cardinality, Resource};
use std::any::TypeId;

/// What a descriptor field is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// The resource id.
    Primary,
    /// A member of `attributes`.
    Attribute,
    /// A member of `relationships`.
    Relationship,
    /// A client-assigned id, used when the primary key is unset.
    ClientId,
}

/// Target and cardinality of a relationship field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationInfo {
    /// To-one or to-many.
    pub cardinality: Cardinality,
    /// Concrete type of the related entity.
    pub target: TypeId,
    /// Rust name of the related entity type.
    pub target_name: &'static str,
}

/// One resolved field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    kind: FieldKind,
    name: &'static str,
    ident: &'static str,
    path: Vec<usize>,
    options: AttrOptions,
    key: KeyKind,
    relation: Option<RelationInfo>,
}

impl FieldDescriptor {
    /// Field kind.
    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Wire name. For the primary field this is the resource type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Rust field name.
    pub fn ident(&self) -> &'static str {
        self.ident
    }

    /// Slot path handed to the generated accessors.
    pub fn path(&self) -> &[usize] {
        &self.path
    }

    /// Formatting options (attributes only).
    pub fn options(&self) -> &AttrOptions {
        &self.options
    }

    /// Key capability (primary and client-id only).
    pub fn key(&self) -> KeyKind {
        self.key
    }

    /// Relationship details (relationships only).
    pub fn relation(&self) -> Option<&RelationInfo> {
        self.relation.as_ref()
    }
}

/// The immutable, cached shape of a resource type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    type_name: &'static str,
    wire_type: &'static str,
    primary: FieldDescriptor,
    client_id: Option<FieldDescriptor>,
    fields: Vec<FieldDescriptor>,
    hooks: Hooks,
}

impl TypeDescriptor {
    /// Rust type name.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Resource type name used on the wire.
    pub fn wire_type(&self) -> &'static str {
        self.wire_type
    }

    /// The primary key field.
    pub fn primary(&self) -> &FieldDescriptor {
        &self.primary
    }

    /// The client-id field, if declared.
    pub fn client_id(&self) -> Option<&FieldDescriptor> {
        self.client_id.as_ref()
    }

    /// Attribute and relationship fields; the owner's own fields come first,
    /// then promoted embedded fields.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Attribute fields.
    pub fn attributes(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.kind == FieldKind::Attribute)
    }

    /// Relationship fields.
    pub fn relationships(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.kind == FieldKind::Relationship)
    }

    /// Looks a field up by wire name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Hook capabilities.
    pub fn hooks(&self) -> Hooks {
        self.hooks
    }
}

/// Fields of one declaration level, before validation.
#[derive(Default)]
struct Flat {
    primary: Vec<FieldDescriptor>,
    client_id: Vec<FieldDescriptor>,
    members: Vec<FieldDescriptor>,
}

impl Flat {
    fn has(&self, name: &str) -> bool {
        self.members.iter().any(|m| m.name == name)
    }

    fn claim(&mut self, type_name: &'static str, field: FieldDescriptor) -> Result<(), ConfigError> {
        if self.has(field.name) {
            return Err(ConfigError::DuplicateWireName {
                type_name,
                name: field.name,
            });
        }
        self.members.push(field);
        Ok(())
    }
}

/// Scans the declarations of `T` and validates them.
pub(crate) fn build<T: Resource>() -> Result<TypeDescriptor, ConfigError> {
    let type_name = std::any::type_name::<T>();
    let flat = flatten(type_name, T::declare(), &[])?;

    let mut primaries = flat.primary.into_iter();
    let primary = match (primaries.next(), primaries.next()) {
        (None, _) => return Err(ConfigError::MissingPrimary { type_name }),
        (Some(_), Some(_)) => return Err(ConfigError::DuplicatePrimary { type_name }),
        (Some(primary), None) => primary,
    };
    if primary.name.is_empty() {
        return Err(ConfigError::MissingTypeName { type_name });
    }
    if !primary.key.is_supported() {
        return Err(ConfigError::UnsupportedPrimaryKey {
            type_name,
            field: primary.ident,
        });
    }

    let mut client_ids = flat.client_id.into_iter();
    let client_id = match (client_ids.next(), client_ids.next()) {
        (Some(_), Some(_)) => return Err(ConfigError::DuplicateClientId { type_name }),
        (Some(client), None) if !client.key.is_supported() => {
            return Err(ConfigError::UnsupportedPrimaryKey {
                type_name,
                field: client.ident,
            });
        }
        (client, _) => client,
    };

    Ok(TypeDescriptor {
        type_name,
        wire_type: primary.name,
        primary,
        client_id,
        fields: flat.members,
        hooks: T::hooks(),
    })
}

/// Flattens one level of declarations.
///
/// Fields declared at this level shadow same-named embedded fields; embedded
/// siblings must not collide with each other.
fn flatten(
    type_name: &'static str,
    decls: Vec<FieldDecl>,
    prefix: &[usize],
) -> Result<Flat, ConfigError> {
    let mut direct = Flat::default();
    let mut nested = Vec::new();

    for (slot, decl) in decls.into_iter().enumerate() {
        let mut path = prefix.to_vec();
        path.push(slot);
        let field = |kind, name, options, key, relation| FieldDescriptor {
            kind,
            name,
            ident: decl.ident,
            path: path.clone(),
            options,
            key,
            relation,
        };

        match decl.kind {
            DeclKind::Primary { wire_type, key } => {
                direct.primary.push(field(
                    FieldKind::Primary,
                    wire_type,
                    AttrOptions::PLAIN,
                    key,
                    None,
                ));
            }
            DeclKind::ClientId { key } => {
                direct.client_id.push(field(
                    FieldKind::ClientId,
                    "lid",
                    AttrOptions::PLAIN,
                    key,
                    None,
                ));
            }
            DeclKind::Attribute { name, options } => {
                direct.claim(
                    type_name,
                    field(FieldKind::Attribute, name, options, KeyKind::Unsupported, None),
                )?;
            }
            DeclKind::Relationship {
                name,
                cardinality,
                target,
                target_name,
            } => {
                let info = RelationInfo {
                    cardinality,
                    target,
                    target_name,
                };
                direct.claim(
                    type_name,
                    field(
                        FieldKind::Relationship,
                        name,
                        AttrOptions::PLAIN,
                        KeyKind::Unsupported,
                        Some(info),
                    ),
                )?;
            }
            DeclKind::Embedded { declare } => {
                nested.push(flatten(type_name, declare(), &path)?);
            }
        }
    }

    let mut promoted = Flat::default();
    for inner in nested {
        promoted.primary.extend(inner.primary);
        promoted.client_id.extend(inner.client_id);
        for member in inner.members {
            if !direct.has(member.name) {
                promoted.claim(type_name, member)?;
            }
        }
    }

    if direct.primary.is_empty() {
        direct.primary = promoted.primary;
    }
    if direct.client_id.is_empty() {
        direct.client_id = promoted.client_id;
    }
    direct.members.extend(promoted.members);
    Ok(direct)
}
