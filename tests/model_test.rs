#![allow(missing_docs)]

use chrono::{DateTime, TimeZone, Utc};
use japi::descriptor::{self, FieldKind};
use japi::{ConfigError, Context, DecodeError, EntityGraph, Japi, JapiError, Json, Ref, Resource, TypeRegistry};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

// --- INVALID DECLARATIONS ---

#[derive(Debug, Default, Resource)]
struct Unnamed {
    #[japi(primary = "")]
    id: u32,
}

#[derive(Debug, Default, Resource)]
struct Keyless {
    #[japi(attr = "name")]
    name: String,
}

#[derive(Debug, Default, Resource)]
struct Floaty {
    #[japi(primary = "floats")]
    id: f64,
}

#[derive(Debug, Default, Resource)]
struct TwoKeys {
    #[japi(primary = "twos")]
    id: u32,
    #[japi(primary = "twos")]
    other: u32,
}

#[derive(Debug, Default, Resource)]
struct TwoClientIds {
    #[japi(primary = "drafts")]
    id: u32,
    #[japi(client_id)]
    first: String,
    #[japi(client_id)]
    second: String,
}

#[derive(Debug, Default, Resource)]
struct Clash {
    #[japi(primary = "clashes")]
    id: u32,
    #[japi(attr = "owner")]
    owner_name: String,
    #[japi(relation = "owner")]
    owner: Option<Ref<Keyed>>,
}

// --- EMBEDDING ---

#[derive(Debug, Default, Resource)]
struct Audit {
    #[japi(client_id)]
    draft_id: String,
    #[japi(attr = "created_at", iso8601)]
    created_at: DateTime<Utc>,
    #[japi(attr = "title")]
    title: String,
}

#[derive(Debug, Default, Resource)]
struct Article {
    #[japi(primary = "articles")]
    id: String,
    #[japi(attr = "title")]
    title: String,
    #[japi(embed)]
    audit: Audit,
}

#[derive(Debug, Default, Resource)]
struct DoubleAudit {
    #[japi(primary = "double_audits")]
    id: u32,
    #[japi(embed)]
    first: Audit,
    #[japi(embed)]
    second: Audit,
}

#[derive(Debug, Default, Resource)]
struct Keyed {
    #[japi(primary = "keys")]
    id: u32,
}

#[derive(Debug, Default, Resource)]
struct Wrapper {
    #[japi(embed)]
    key: Keyed,
    #[japi(attr = "note")]
    note: String,
}

// --- CUSTOM ATTRIBUTE TYPES ---

#[derive(Debug, Clone, Default, PartialEq)]
struct Slug(String);

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Slug {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.chars().all(|c| c.is_ascii_lowercase() || c == '-') {
            Ok(Slug(s.to_owned()))
        } else {
            Err(format!("'{s}' is not a slug"))
        }
    }
}

japi::text_attribute!(Slug);

#[derive(Debug, Default, Resource)]
struct Page {
    #[japi(primary = "pages")]
    id: Slug,
    #[japi(attr = "redirect")]
    redirect: Option<Slug>,
    #[japi(relation = "parent")]
    parent: Option<Ref<Page>>,
}

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
struct Dimensions {
    width: u32,
    height: u32,
}

#[derive(Debug, Default, Resource)]
struct Product {
    #[japi(primary = "products")]
    id: u32,
    #[japi(attr = "dimensions")]
    dimensions: Json<Dimensions>,
    #[japi(attr = "tags")]
    tags: Vec<String>,
    #[japi(attr = "extra")]
    extra: serde_json::Value,
}

#[derive(Debug, Default, Resource)]
struct Gadget {
    #[japi(primary = "gadgets")]
    id: u64,
    #[japi(attr = "label")]
    label: String,
}

fn audit_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2016, 8, 17, 8, 27, 12)
        .single()
        .unwrap_or_default()
}

// --- TESTS ---

#[test]
fn invalid_declarations_are_configuration_errors() {
    assert!(matches!(
        descriptor::resolve::<Unnamed>(),
        Err(JapiError::Configuration(ConfigError::MissingTypeName { .. }))
    ));
    assert!(matches!(
        descriptor::resolve::<Floaty>(),
        Err(JapiError::Configuration(ConfigError::UnsupportedPrimaryKey { field: "id", .. }))
    ));
    assert!(matches!(
        descriptor::resolve::<TwoKeys>(),
        Err(JapiError::Configuration(ConfigError::DuplicatePrimary { .. }))
    ));
    assert!(matches!(
        descriptor::resolve::<TwoClientIds>(),
        Err(JapiError::Configuration(ConfigError::DuplicateClientId { .. }))
    ));
    assert!(matches!(
        descriptor::resolve::<Clash>(),
        Err(JapiError::Configuration(ConfigError::DuplicateWireName { name: "owner", .. }))
    ));
}

#[test]
fn failed_resolutions_are_cached() {
    assert!(!descriptor::contains::<Keyless>());

    let first = descriptor::resolve::<Keyless>().unwrap_err();
    assert!(descriptor::contains::<Keyless>());
    assert!(first.to_string().contains("missing primary field"));

    // Every later use reports the same failure.
    let mut graph = EntityGraph::new();
    let keyless = graph.insert(Keyless::default());
    assert_eq!(Japi::marshal(&graph, keyless, &Context::new()).unwrap_err(), first);
    assert_eq!(TypeRegistry::new().with::<Keyless>().unwrap_err(), first);
}

#[test]
fn concurrent_resolution_shares_one_descriptor() {
    let resolved: Vec<_> = std::thread::scope(|scope| {
        let workers: Vec<_> = (0..8)
            .map(|_| scope.spawn(descriptor::resolve::<Gadget>))
            .collect();
        workers
            .into_iter()
            .map(|w| w.join().expect("resolver thread panicked"))
            .collect()
    });

    let first = resolved[0].as_ref().expect("Gadget is valid");
    for other in &resolved {
        let other = other.as_ref().expect("Gadget is valid");
        assert!(Arc::ptr_eq(first, other));
    }
}

#[test]
fn owner_fields_shadow_embedded_ones() -> japi::Result<()> {
    let desc = descriptor::resolve::<Article>()?;
    assert_eq!(desc.wire_type(), "articles");

    let titles: Vec<_> = desc.attributes().filter(|f| f.name() == "title").collect();
    assert_eq!(titles.len(), 1);
    assert_eq!(titles[0].path(), &[1]);

    let created = desc.field("created_at").expect("promoted from Audit");
    assert_eq!(created.kind(), FieldKind::Attribute);
    assert_eq!(created.path(), &[2, 1]);
    assert!(created.options().iso8601);

    assert_eq!(desc.client_id().map(|f| f.path().to_vec()), Some(vec![2, 0]));
    Ok(())
}

#[test]
fn embedded_siblings_must_not_collide() {
    assert!(matches!(
        descriptor::resolve::<DoubleAudit>(),
        Err(JapiError::Configuration(ConfigError::DuplicateWireName { name: "created_at", .. }))
    ));
}

#[test]
fn embedded_primary_is_promoted() -> japi::Result<()> {
    let desc = descriptor::resolve::<Wrapper>()?;
    assert_eq!(desc.wire_type(), "keys");
    assert_eq!(desc.primary().path(), &[0, 0]);

    let mut graph = EntityGraph::new();
    let wrapper = graph.insert(Wrapper {
        key: Keyed { id: 3 },
        note: "wrapped".into(),
    });
    let doc = Japi::marshal(&graph, wrapper, &Context::new())?;
    let object = doc.primary()[0];
    assert_eq!((object.kind.as_str(), object.id.as_str()), ("keys", "3"));
    assert_eq!(object.attributes["note"], json!("wrapped"));
    Ok(())
}

#[test]
fn embedded_fields_round_trip() -> japi::Result<()> {
    let mut graph = EntityGraph::new();
    let article = graph.insert(Article {
        id: "intro".into(),
        title: "Outer".into(),
        audit: Audit {
            draft_id: "tmp-7".into(),
            created_at: audit_time(),
            title: "Inner".into(),
        },
    });

    let doc = Japi::marshal(&graph, article, &Context::new())?;
    let object = doc.primary()[0];
    assert_eq!(object.id, "intro");
    assert_eq!(object.lid.as_deref(), Some("tmp-7"));
    assert_eq!(object.attributes["title"], json!("Outer"));
    assert_eq!(object.attributes["created_at"], json!("2016-08-17T08:27:12Z"));

    let decoded = Japi::unmarshal::<Article>(&doc, &TypeRegistry::new())?;
    let article = decoded.one().ok_or(DecodeError::MissingPrimaryData)?;
    assert_eq!(article.id, "intro");
    assert_eq!(article.title, "Outer");
    assert_eq!(article.audit.title, "");
    assert_eq!(article.audit.draft_id, "tmp-7");
    assert_eq!(article.audit.created_at, audit_time());
    Ok(())
}

#[test]
fn text_keys_round_trip() -> japi::Result<()> {
    let mut graph = EntityGraph::new();
    let home = graph.insert(Page {
        id: Slug("home".into()),
        ..Page::default()
    });
    let about = graph.insert(Page {
        id: Slug("about-us".into()),
        redirect: Some(Slug("team".into())),
        parent: Some(home),
    });

    let json = Japi::to_string(&Japi::marshal(&graph, about, &Context::new())?)?;
    let decoded = Japi::unmarshal_str::<Page>(&json, &TypeRegistry::new())?;
    let page = decoded.one().ok_or(DecodeError::MissingPrimaryData)?;
    assert_eq!(page.id, Slug("about-us".into()));
    assert_eq!(page.redirect, Some(Slug("team".into())));

    let parent = page
        .parent
        .and_then(|p| decoded.get(p))
        .ok_or(DecodeError::MissingPrimaryData)?;
    assert_eq!(parent.id, Slug("home".into()));
    assert_eq!(parent.redirect, None);
    Ok(())
}

#[test]
fn text_keys_reject_malformed_ids() {
    let err = Japi::unmarshal_str::<Page>(
        r#"{"data":{"type":"pages","id":"Not A Slug"}}"#,
        &TypeRegistry::new(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        JapiError::Decode(DecodeError::Attribute { ref field, .. }) if field == "id"
    ));
}

#[test]
fn structured_attributes_round_trip() -> japi::Result<()> {
    let mut graph = EntityGraph::new();
    let product = graph.insert(Product {
        id: 9,
        dimensions: Json(Dimensions { width: 3, height: 4 }),
        tags: vec!["new".into(), "sale".into()],
        extra: json!({ "origin": "warehouse" }),
    });

    let doc = Japi::marshal(&graph, product, &Context::new())?;
    let object = doc.primary()[0];
    let attributes = &object.attributes;
    assert_eq!(attributes["dimensions"], json!({ "width": 3, "height": 4 }));
    assert_eq!(attributes["tags"], json!(["new", "sale"]));

    let decoded = Japi::unmarshal::<Product>(&doc, &TypeRegistry::new())?;
    let product = decoded.one().ok_or(DecodeError::MissingPrimaryData)?;
    assert_eq!(product.dimensions, Json(Dimensions { width: 3, height: 4 }));
    assert_eq!(product.tags, ["new", "sale"]);
    assert_eq!(product.extra["origin"], "warehouse");
    Ok(())
}
