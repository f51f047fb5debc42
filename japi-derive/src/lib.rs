//! # Japi Derive Macros
//!
//! This crate provides the procedural macros for `japi`. It automates the
//! implementation of the `Resource` trait: the field declarations the
//! descriptor resolver validates, and the slot accessors the codec uses to
//! read and write fields.
//!
//! Compatible with `syn 2.0`.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{Attribute, Data, DeriveInput, Fields, LitStr, parse_macro_input};

/// Derives `japi::Resource`.
///
/// Struct-level flags, each requiring the matching hook trait impl:
/// `#[japi(links, meta, relationship_links, relationship_meta)]`.
///
/// Field-level tags, at most one kind per field:
/// - `#[japi(primary = "<type>")]`
/// - `#[japi(attr = "<name>")]`, optionally with `iso8601` and `omitempty`
/// - `#[japi(relation = "<name>")]` on `Option<Ref<T>>` or `Vec<Ref<T>>`
/// - `#[japi(client_id)]`
/// - `#[japi(embed)]` on a field whose type also derives `Resource`
///
/// Untagged fields are invisible to the codec.
#[proc_macro_derive(Resource, attributes(japi))]
pub fn derive_resource(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

// --- Internal Data Structures ---

#[derive(Default)]
struct HookFlags {
    links: bool,
    meta: bool,
    relationship_links: bool,
    relationship_meta: bool,
}

enum FieldTag {
    Primary(LitStr),
    ClientId,
    Attribute {
        name: LitStr,
        iso8601: bool,
        omit_empty: bool,
    },
    Relation(LitStr),
    Embed,
}

struct TaggedField {
    ident: syn::Ident,
    ty: syn::Type,
    tag: FieldTag,
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let fields = match &input.data {
        Data::Struct(ds) => match &ds.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return Err(syn::Error::new(
                    name.span(),
                    "Resource only supports structs with named fields",
                ));
            }
        },
        _ => return Err(syn::Error::new(name.span(), "Resource only supports structs")),
    };

    let hooks = parse_struct_attributes(&input.attrs)?;

    let mut tagged = Vec::new();
    for field in fields {
        if let Some(tag) = parse_field_attributes(&field.attrs)? {
            let ident = field
                .ident
                .clone()
                .ok_or_else(|| syn::Error::new_spanned(field, "expected a named field"))?;
            tagged.push(TaggedField {
                ident,
                ty: field.ty.clone(),
                tag,
            });
        }
    }

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let declare = generate_declare(&tagged);
    let hook_bits = generate_hooks(&hooks);
    let accessors = generate_accessors(&tagged);
    let hook_methods = generate_hook_methods(&hooks);

    Ok(quote! {
        impl #impl_generics japi::Resource for #name #ty_generics #where_clause {
            fn declare() -> ::std::vec::Vec<japi::descriptor::FieldDecl> {
                #declare
            }

            fn hooks() -> japi::Hooks {
                #hook_bits
            }

            fn descriptor(&self) -> japi::Result<::std::sync::Arc<japi::descriptor::TypeDescriptor>> {
                japi::descriptor::resolve::<Self>()
            }

            #accessors
            #hook_methods
        }
    })
}

/// Parses the struct-level `#[japi(...)]` hook flags.
fn parse_struct_attributes(attrs: &[Attribute]) -> syn::Result<HookFlags> {
    let mut flags = HookFlags::default();
    for attr in attrs {
        if attr.path().is_ident("japi") {
            attr.parse_nested_meta(|meta| {
                let slot = if meta.path.is_ident("links") {
                    &mut flags.links
                } else if meta.path.is_ident("meta") {
                    &mut flags.meta
                } else if meta.path.is_ident("relationship_links") {
                    &mut flags.relationship_links
                } else if meta.path.is_ident("relationship_meta") {
                    &mut flags.relationship_meta
                } else {
                    return Err(meta.error(
                        "Unknown japi struct attribute. Supported: links, meta, relationship_links, relationship_meta",
                    ));
                };
                *slot = true;
                Ok(())
            })?;
        }
    }
    Ok(flags)
}

/// Parses the field-level `#[japi(...)]` tag, if any.
fn parse_field_attributes(attrs: &[Attribute]) -> syn::Result<Option<FieldTag>> {
    let mut tag: Option<FieldTag> = None;
    let mut iso8601 = false;
    let mut omit_empty = false;
    let mut flag_span = None;

    for attr in attrs {
        if !attr.path().is_ident("japi") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            let kind = if meta.path.is_ident("primary") {
                FieldTag::Primary(meta.value()?.parse()?)
            } else if meta.path.is_ident("attr") {
                FieldTag::Attribute {
                    name: meta.value()?.parse()?,
                    iso8601: false,
                    omit_empty: false,
                }
            } else if meta.path.is_ident("relation") {
                FieldTag::Relation(meta.value()?.parse()?)
            } else if meta.path.is_ident("client_id") {
                FieldTag::ClientId
            } else if meta.path.is_ident("embed") {
                FieldTag::Embed
            } else if meta.path.is_ident("iso8601") {
                iso8601 = true;
                flag_span = Some(meta.path.clone());
                return Ok(());
            } else if meta.path.is_ident("omitempty") {
                omit_empty = true;
                flag_span = Some(meta.path.clone());
                return Ok(());
            } else {
                return Err(meta.error(
                    "Unknown japi attribute key. Supported: primary, attr, relation, client_id, embed, iso8601, omitempty",
                ));
            };

            if tag.is_some() {
                return Err(meta.error("a field can carry only one of primary, attr, relation, client_id, embed"));
            }
            tag = Some(kind);
            Ok(())
        })?;
    }

    match &mut tag {
        Some(FieldTag::Attribute {
            iso8601: iso,
            omit_empty: omit,
            ..
        }) => {
            *iso = iso8601;
            *omit = omit_empty;
        }
        _ => {
            if let Some(path) = flag_span {
                return Err(syn::Error::new_spanned(
                    path,
                    "iso8601 and omitempty only apply to attr fields",
                ));
            }
        }
    }
    Ok(tag)
}

// --- Generator: declare() ---

fn generate_declare(fields: &[TaggedField]) -> TokenStream2 {
    let decls = fields.iter().map(|f| {
        let ident = f.ident.to_string();
        let ty = &f.ty;
        match &f.tag {
            FieldTag::Primary(wire) => quote! {
                japi::descriptor::FieldDecl::primary(#ident, #wire, <#ty as japi::Attribute>::KEY)
            },
            FieldTag::ClientId => quote! {
                japi::descriptor::FieldDecl::client_id(#ident, <#ty as japi::Attribute>::KEY)
            },
            FieldTag::Attribute {
                name,
                iso8601,
                omit_empty,
            } => quote! {
                japi::descriptor::FieldDecl::attribute(
                    #ident,
                    #name,
                    japi::AttrOptions { iso8601: #iso8601, omit_empty: #omit_empty },
                )
            },
            FieldTag::Relation(name) => quote! {
                japi::descriptor::FieldDecl::relationship::<#ty>(#ident, #name)
            },
            FieldTag::Embed => quote! {
                japi::descriptor::FieldDecl::embedded(#ident, <#ty as japi::Resource>::declare)
            },
        }
    });
    quote! { ::std::vec![#(#decls),*] }
}

// --- Generator: hooks() ---

fn generate_hooks(flags: &HookFlags) -> TokenStream2 {
    let mut bits = vec![quote! { japi::Hooks::empty() }];
    if flags.links {
        bits.push(quote! { japi::Hooks::LINKS });
    }
    if flags.meta {
        bits.push(quote! { japi::Hooks::META });
    }
    if flags.relationship_links {
        bits.push(quote! { japi::Hooks::RELATIONSHIP_LINKS });
    }
    if flags.relationship_meta {
        bits.push(quote! { japi::Hooks::RELATIONSHIP_META });
    }
    quote! { #(#bits)|* }
}

fn generate_hook_methods(flags: &HookFlags) -> TokenStream2 {
    let mut methods = Vec::new();
    let mut push = |enabled: bool, method: &str, hook: &str| {
        if enabled {
            let method = format_ident!("{}", method);
            let hook = format_ident!("{}", hook);
            methods.push(quote! {
                fn #method(&self) -> ::core::option::Option<&dyn japi::#hook> {
                    ::core::option::Option::Some(self)
                }
            });
        }
    };
    push(flags.links, "links_hook", "LinksHook");
    push(flags.meta, "meta_hook", "MetaHook");
    push(flags.relationship_links, "relationship_links_hook", "RelationshipLinksHook");
    push(flags.relationship_meta, "relationship_meta_hook", "RelationshipMetaHook");
    quote! { #(#methods)* }
}

// --- Generator: slot accessors ---

/// Which accessor an arm is generated for.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Accessor {
    Encode,
    IsEmpty,
    Decode,
    ReadKey,
    WriteKey,
    Targets,
    WriteRelation,
}

impl Accessor {
    fn applies_to(self, tag: &FieldTag) -> bool {
        match tag {
            FieldTag::Embed => true,
            FieldTag::Attribute { .. } => matches!(self, Self::Encode | Self::IsEmpty | Self::Decode),
            FieldTag::Primary(_) | FieldTag::ClientId => matches!(self, Self::ReadKey | Self::WriteKey),
            FieldTag::Relation(_) => matches!(self, Self::Targets | Self::WriteRelation),
        }
    }

    /// The call on a leaf field.
    fn leaf(self, ident: &syn::Ident) -> TokenStream2 {
        match self {
            Self::Encode => quote! { japi::rt::encode(&self.#ident, options) },
            Self::IsEmpty => quote! { japi::rt::is_empty(&self.#ident) },
            Self::Decode => quote! { japi::rt::decode(&mut self.#ident, value, options) },
            Self::ReadKey => quote! { japi::rt::read_key(&self.#ident) },
            Self::WriteKey => quote! { japi::rt::write_key(&mut self.#ident, key) },
            Self::Targets => quote! { japi::rt::relation_targets(&self.#ident) },
            Self::WriteRelation => quote! { japi::rt::write_relation(&mut self.#ident, targets) },
        }
    }

    /// The delegating call into an embedded field.
    fn nested(self, ident: &syn::Ident, ty: &syn::Type) -> TokenStream2 {
        let r = quote! { <#ty as japi::Resource> };
        match self {
            Self::Encode => quote! { #r::encode_attribute(&self.#ident, rest, options) },
            Self::IsEmpty => quote! { #r::attribute_is_empty(&self.#ident, rest) },
            Self::Decode => quote! { #r::decode_attribute(&mut self.#ident, rest, value, options) },
            Self::ReadKey => quote! { #r::read_key(&self.#ident, rest) },
            Self::WriteKey => quote! { #r::write_key(&mut self.#ident, rest, key) },
            Self::Targets => quote! { #r::relation_targets(&self.#ident, rest) },
            Self::WriteRelation => quote! { #r::write_relation(&mut self.#ident, rest, targets) },
        }
    }

    fn signature(self) -> TokenStream2 {
        let value = quote! { japi::internal::serde_json::Value };
        let result = |ok: TokenStream2| quote! { ::core::result::Result<#ok, japi::AttrError> };
        match self {
            Self::Encode => {
                let ret = result(value.clone());
                quote! { fn encode_attribute(&self, path: &[usize], options: &japi::AttrOptions) -> #ret }
            }
            Self::IsEmpty => {
                let ret = result(quote! { bool });
                quote! { fn attribute_is_empty(&self, path: &[usize]) -> #ret }
            }
            Self::Decode => {
                let ret = result(quote! { () });
                quote! {
                    fn decode_attribute(&mut self, path: &[usize], value: #value, options: &japi::AttrOptions) -> #ret
                }
            }
            Self::ReadKey => {
                let ret = result(quote! { ::core::option::Option<::std::string::String> });
                quote! { fn read_key(&self, path: &[usize]) -> #ret }
            }
            Self::WriteKey => {
                let ret = result(quote! { () });
                quote! { fn write_key(&mut self, path: &[usize], key: &str) -> #ret }
            }
            Self::Targets => {
                let ret = result(quote! { ::std::vec::Vec<japi::EntityId> });
                quote! { fn relation_targets(&self, path: &[usize]) -> #ret }
            }
            Self::WriteRelation => {
                let ret = result(quote! { () });
                quote! {
                    fn write_relation(&mut self, path: &[usize], targets: ::std::vec::Vec<japi::EntityId>) -> #ret
                }
            }
        }
    }

    /// Parameters the method takes besides `path`, silenced when no arm uses them.
    fn unused(self) -> TokenStream2 {
        match self {
            Self::Encode => quote! { let _ = options; },
            Self::Decode => quote! { let _ = (&value, options); },
            Self::WriteKey => quote! { let _ = key; },
            Self::WriteRelation => quote! { let _ = &targets; },
            Self::IsEmpty | Self::ReadKey | Self::Targets => quote! {},
        }
    }
}

const ACCESSORS: [Accessor; 7] = [
    Accessor::Encode,
    Accessor::IsEmpty,
    Accessor::Decode,
    Accessor::ReadKey,
    Accessor::WriteKey,
    Accessor::Targets,
    Accessor::WriteRelation,
];

fn generate_accessors(fields: &[TaggedField]) -> TokenStream2 {
    let methods = ACCESSORS.iter().filter_map(|&accessor| {
        let arms: Vec<_> = fields
            .iter()
            .enumerate()
            .filter(|(_, f)| accessor.applies_to(&f.tag))
            .map(|(slot, f)| match f.tag {
                FieldTag::Embed => {
                    let call = accessor.nested(&f.ident, &f.ty);
                    quote! { [#slot, rest @ ..] => #call, }
                }
                _ => {
                    let call = accessor.leaf(&f.ident);
                    quote! { [#slot] => #call, }
                }
            })
            .collect();

        // Without any arm the trait default already answers `NoSuchField`.
        if arms.is_empty() {
            return None;
        }
        let signature = accessor.signature();
        let unused = accessor.unused();
        Some(quote! {
            #signature {
                match path {
                    #(#arms)*
                    _ => {
                        #unused
                        ::core::result::Result::Err(japi::AttrError::NoSuchField)
                    }
                }
            }
        })
    });
    quote! { #(#methods)* }
}
