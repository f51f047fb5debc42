use crate::attribute::{AttrOptions, KeyKind};
use crate::resource::Cardinality;
use std::any::TypeId;

/// One `#[japi(...)]`-tagged field as the derive macro saw it.
///
/// Declarations are raw: nothing is validated until the resolver builds a
/// [`TypeDescriptor`](super::TypeDescriptor) from them.
#[derive(Debug, Clone)]
pub struct FieldDecl {
    /// Rust field name.
    pub ident: &'static str,
    /// What the field was tagged as.
    pub kind: DeclKind,
}

/// The tag of a declared field.
#[derive(Debug, Clone)]
pub enum DeclKind {
    /// `#[japi(primary = "<type>")]`
    Primary {
        /// Resource type name.
        wire_type: &'static str,
        /// Key capability of the field type.
        key: KeyKind,
    },
    /// `#[japi(client_id)]`
    ClientId {
        /// Key capability of the field type.
        key: KeyKind,
    },
    /// `#[japi(attr = "<name>", ...)]`
    Attribute {
        /// Wire name.
        name: &'static str,
        /// Formatting flags.
        options: AttrOptions,
    },
    /// `#[japi(relation = "<name>")]`
    Relationship {
        /// Wire name.
        name: &'static str,
        /// Inferred from the field type.
        cardinality: Cardinality,
        /// Concrete type of the related entity.
        target: TypeId,
        /// Rust name of the related entity type.
        target_name: &'static str,
    },
    /// `#[japi(embed)]`: the nested type's declarations, flattened on resolve.
    Embedded {
        /// Declarations of the embedded type.
        declare: fn() -> Vec<FieldDecl>,
    },
}

impl FieldDecl {
    /// A primary key declaration.
    pub fn primary(ident: &'static str, wire_type: &'static str, key: KeyKind) -> Self {
        Self {
            ident,
            kind: DeclKind::Primary { wire_type, key },
        }
    }

    /// A client-id declaration.
    pub fn client_id(ident: &'static str, key: KeyKind) -> Self {
        Self {
            ident,
            kind: DeclKind::ClientId { key },
        }
    }

    /// An attribute declaration.
    pub fn attribute(ident: &'static str, name: &'static str, options: AttrOptions) -> Self {
        Self {
            ident,
            kind: DeclKind::Attribute { name, options },
        }
    }

    /// A relationship declaration.
    pub fn relationship<R: crate::resource::Relation>(ident: &'static str, name: &'static str) -> Self {
        Self {
            ident,
            kind: DeclKind::Relationship {
                name,
                cardinality: R::CARDINALITY,
                target: TypeId::of::<R::Target>(),
                target_name: std::any::type_name::<R::Target>(),
            },
        }
    }

    /// An embedded struct declaration.
    pub fn embedded(ident: &'static str, declare: fn() -> Vec<FieldDecl>) -> Self {
        Self {
            ident,
            kind: DeclKind::Embedded { declare },
        }
    }
}
