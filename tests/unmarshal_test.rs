#![allow(missing_docs)]

use chrono::{DateTime, TimeZone, Utc};
use japi::{
    AttrError, ConfigError, Context, DecodeError, Document, EntityGraph, Japi, JapiError, Primary,
    Ref, Resource, TypeRegistry,
};
use serde_json::json;

// --- FIXTURES ---

#[derive(Debug, Default, Resource)]
struct Blog {
    #[japi(primary = "blogs")]
    id: u64,
    #[japi(attr = "title")]
    title: String,
    #[japi(relation = "posts")]
    posts: Vec<Ref<Post>>,
    #[japi(relation = "current_post")]
    current_post: Option<Ref<Post>>,
    #[japi(attr = "created_at")]
    created_at: DateTime<Utc>,
    #[japi(attr = "view_count")]
    view_count: u32,
}

#[derive(Debug, Default, Resource)]
struct Post {
    #[japi(primary = "posts")]
    id: u64,
    #[japi(attr = "blog_id")]
    blog_id: u64,
    #[japi(client_id)]
    client_id: String,
    #[japi(attr = "title")]
    title: String,
    #[japi(attr = "body")]
    body: String,
    #[japi(attr = "subtitle")]
    subtitle: Option<String>,
    #[japi(relation = "comments")]
    comments: Vec<Ref<Comment>>,
    #[japi(relation = "latest_comment")]
    latest_comment: Option<Ref<Comment>>,
}

#[derive(Debug, Default, Resource)]
struct Comment {
    #[japi(primary = "comments")]
    id: u64,
    #[japi(client_id)]
    client_id: String,
    #[japi(attr = "body")]
    body: String,
}

/// Claims the `comments` type name too.
#[derive(Debug, Default, Resource)]
struct Remark {
    #[japi(primary = "comments")]
    id: u64,
}

#[derive(Debug, Default, Resource)]
struct Timestamp {
    #[japi(primary = "timestamps")]
    id: u32,
    #[japi(attr = "timestamp", iso8601)]
    time: DateTime<Utc>,
    #[japi(attr = "next", iso8601)]
    next: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Resource)]
struct Person {
    #[japi(primary = "people")]
    id: u32,
    #[japi(attr = "name")]
    name: String,
    #[japi(relation = "friend")]
    friend: Option<Ref<Person>>,
}

fn registry() -> japi::Result<TypeRegistry> {
    TypeRegistry::new().with::<Post>()?.with::<Comment>()
}

fn doc(value: serde_json::Value) -> Document {
    serde_json::from_value(value).expect("fixture is a JSON:API document")
}

fn created_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2016, 8, 17, 8, 27, 12)
        .single()
        .unwrap_or_default()
}

// --- TESTS ---

#[test]
fn round_trip_rebuilds_the_graph() -> japi::Result<()> {
    let mut graph = EntityGraph::new();
    let c1 = graph.insert(Comment {
        id: 1,
        body: "foo".into(),
        ..Comment::default()
    });
    let c2 = graph.insert(Comment {
        id: 2,
        body: "bar".into(),
        ..Comment::default()
    });
    let post = graph.insert(Post {
        id: 1,
        blog_id: 5,
        title: "Foo".into(),
        comments: vec![c1, c2],
        latest_comment: Some(c2),
        ..Post::default()
    });
    let blog = graph.insert(Blog {
        id: 5,
        title: "Title 1".into(),
        posts: vec![post],
        current_post: Some(post),
        created_at: created_at(),
        view_count: 1000,
    });

    let json = Japi::to_string(&Japi::marshal(&graph, blog, &Context::new())?)?;
    // `Blog` is the root and needs no registration.
    let decoded = Japi::unmarshal_str::<Blog>(&json, &registry()?)?;

    let blog = decoded.one().ok_or(DecodeError::MissingPrimaryData)?;
    assert_eq!(blog.id, 5);
    assert_eq!(blog.title, "Title 1");
    assert_eq!(blog.created_at, created_at());
    assert_eq!(blog.view_count, 1000);
    assert_eq!(blog.posts.len(), 1);
    assert_eq!(blog.current_post, Some(blog.posts[0]));

    let post = decoded.get(blog.posts[0]).ok_or(DecodeError::MissingPrimaryData)?;
    assert_eq!(post.title, "Foo");
    assert_eq!(post.blog_id, 5);
    assert_eq!(post.comments.len(), 2);
    // One entity per identifier: the latest comment is the second comment.
    assert_eq!(post.latest_comment, Some(post.comments[1]));

    let bodies: Vec<_> = post
        .comments
        .iter()
        .filter_map(|c| decoded.get(*c))
        .map(|c| c.body.as_str())
        .collect();
    assert_eq!(bodies, ["foo", "bar"]);
    assert_eq!(decoded.graph().len(), 4);
    Ok(())
}

#[test]
fn forward_references_and_cycles_resolve() -> japi::Result<()> {
    let input = doc(json!({
        "data": {
            "type": "people", "id": "1",
            "attributes": { "name": "Alice" },
            "relationships": { "friend": { "data": { "type": "people", "id": "2" } } }
        },
        "included": [{
            "type": "people", "id": "2",
            "attributes": { "name": "Bob" },
            "relationships": { "friend": { "data": { "type": "people", "id": "1" } } }
        }]
    }));

    let decoded = Japi::unmarshal::<Person>(&input, &TypeRegistry::new())?;
    let Primary::One(Some(alice)) = decoded.data().clone() else {
        panic!("expected one primary resource");
    };
    let bob = decoded
        .get(alice)
        .and_then(|a| a.friend)
        .ok_or(DecodeError::MissingPrimaryData)?;

    assert_eq!(decoded.get(bob).map(|b| b.name.as_str()), Some("Bob"));
    assert_eq!(decoded.get(bob).and_then(|b| b.friend), Some(alice));
    Ok(())
}

#[test]
fn collections_decode_in_document_order() -> japi::Result<()> {
    let input = doc(json!({
        "data": [
            { "type": "comments", "id": "2", "attributes": { "body": "b" } },
            { "type": "comments", "id": "1", "attributes": { "body": "a" } },
            { "type": "comments", "id": "2", "attributes": { "body": "ignored" } }
        ]
    }));

    let decoded = Japi::unmarshal::<Comment>(&input, &TypeRegistry::new())?;
    let bodies: Vec<_> = decoded.many().into_iter().map(|c| c.body.as_str()).collect();
    assert_eq!(bodies, ["b", "a"]);
    assert!(decoded.one().is_none());
    Ok(())
}

#[test]
fn null_primary_data_decodes_to_nothing() -> japi::Result<()> {
    let decoded = Japi::unmarshal_str::<Post>(r#"{"data":null}"#, &TypeRegistry::new())?;
    assert_eq!(decoded.data(), &Primary::One(None));
    assert!(decoded.graph().is_empty());
    Ok(())
}

#[test]
fn unknown_resource_types_are_rejected() {
    let input = doc(json!({
        "data": {
            "type": "posts", "id": "1",
            "relationships": { "comments": { "data": [{ "type": "comments", "id": "1" }] } }
        },
        "included": [{ "type": "comments", "id": "1", "attributes": { "body": "x" } }]
    }));

    let err = Japi::unmarshal::<Post>(&input, &TypeRegistry::new()).unwrap_err();
    assert_eq!(
        err,
        JapiError::Decode(DecodeError::UnknownResourceType("comments".into()))
    );
}

#[test]
fn dangling_references_are_rejected() -> japi::Result<()> {
    let input = doc(json!({
        "data": {
            "type": "posts", "id": "1",
            "relationships": { "comments": { "data": [{ "type": "comments", "id": "9" }] } }
        }
    }));

    let err = Japi::unmarshal::<Post>(&input, &registry()?).unwrap_err();
    assert_eq!(
        err,
        JapiError::Decode(DecodeError::DanglingReference {
            kind: "comments".into(),
            id: "9".into(),
        })
    );
    assert!(err.to_string().contains("dangling relationship reference"));
    Ok(())
}

#[test]
fn primary_type_must_match_the_root() {
    let input = doc(json!({ "data": { "type": "blogs", "id": "1" } }));

    let err = Japi::unmarshal::<Post>(&input, &TypeRegistry::new()).unwrap_err();
    assert_eq!(
        err,
        JapiError::Decode(DecodeError::TypeMismatch {
            expected: "posts",
            found: "blogs".into(),
        })
    );
}

#[test]
fn relationship_targets_must_match_the_field_type() {
    let input = doc(json!({
        "data": {
            "type": "posts", "id": "1",
            "relationships": { "latest_comment": { "data": { "type": "posts", "id": "1" } } }
        }
    }));

    let err = Japi::unmarshal::<Post>(&input, &TypeRegistry::new()).unwrap_err();
    assert_eq!(
        err,
        JapiError::Decode(DecodeError::RelationshipTypeMismatch {
            relation: "latest_comment",
            found: "posts".into(),
        })
    );
}

#[test]
fn linkage_shape_must_match_cardinality() -> japi::Result<()> {
    let to_one_with_array = doc(json!({
        "data": {
            "type": "posts", "id": "1",
            "relationships": { "latest_comment": { "data": [{ "type": "comments", "id": "1" }] } }
        },
        "included": [{ "type": "comments", "id": "1" }]
    }));
    let err = Japi::unmarshal::<Post>(&to_one_with_array, &registry()?).unwrap_err();
    assert_eq!(
        err,
        JapiError::Decode(DecodeError::CardinalityMismatch {
            relation: "latest_comment"
        })
    );

    let to_many_with_object = doc(json!({
        "data": {
            "type": "posts", "id": "1",
            "relationships": { "comments": { "data": { "type": "comments", "id": "1" } } }
        },
        "included": [{ "type": "comments", "id": "1" }]
    }));
    let err = Japi::unmarshal::<Post>(&to_many_with_object, &registry()?).unwrap_err();
    assert_eq!(
        err,
        JapiError::Decode(DecodeError::CardinalityMismatch { relation: "comments" })
    );
    Ok(())
}

#[test]
fn structural_rules_are_enforced() {
    let both = doc(json!({ "data": null, "errors": [] }));
    assert!(matches!(
        Japi::unmarshal::<Post>(&both, &TypeRegistry::new()),
        Err(JapiError::Structural(_))
    ));

    let neither = Document::default();
    assert!(matches!(
        Japi::unmarshal::<Post>(&neither, &TypeRegistry::new()),
        Err(JapiError::Structural(_))
    ));

    let meta_only = doc(json!({ "meta": { "total": 0 } }));
    assert_eq!(
        Japi::unmarshal::<Post>(&meta_only, &TypeRegistry::new()).unwrap_err(),
        JapiError::Decode(DecodeError::MissingPrimaryData)
    );
}

#[test]
fn error_documents_decode_to_their_errors() -> japi::Result<()> {
    let input = doc(json!({
        "errors": [{ "status": "404", "title": "Not Found", "source": { "pointer": "/data" } }]
    }));

    assert_eq!(
        Japi::unmarshal::<Post>(&input, &TypeRegistry::new()).unwrap_err(),
        JapiError::Decode(DecodeError::MissingPrimaryData)
    );

    let errors = Japi::unmarshal_errors(&input)?;
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].status.as_deref(), Some("404"));
    assert_eq!(
        errors[0].source.as_ref().and_then(|s| s.pointer.as_deref()),
        Some("/data")
    );
    Ok(())
}

#[test]
fn null_absent_and_unknown_attributes() -> japi::Result<()> {
    let input = doc(json!({
        "data": {
            "type": "posts", "id": "1",
            "attributes": {
                "title": null,
                "subtitle": null,
                "body": "kept",
                "not_a_field": 42
            }
        }
    }));

    let decoded = Japi::unmarshal::<Post>(&input, &TypeRegistry::new())?;
    let post = decoded.one().ok_or(DecodeError::MissingPrimaryData)?;
    assert_eq!(post.title, "");
    assert_eq!(post.subtitle, None);
    assert_eq!(post.body, "kept");
    assert_eq!(post.blog_id, 0);
    Ok(())
}

#[test]
fn attribute_kind_mismatches_name_the_field() {
    let input = doc(json!({
        "data": { "type": "posts", "id": "1", "attributes": { "blog_id": "five" } }
    }));

    let err = Japi::unmarshal::<Post>(&input, &TypeRegistry::new()).unwrap_err();
    match err {
        JapiError::Decode(DecodeError::Attribute { field, reason }) => {
            assert_eq!(field, "blog_id");
            assert!(matches!(reason, AttrError::TypeMismatch { .. }));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn unparsable_ids_are_attribute_errors() {
    let input = doc(json!({ "data": { "type": "posts", "id": "not-a-number" } }));

    let err = Japi::unmarshal::<Post>(&input, &TypeRegistry::new()).unwrap_err();
    assert!(matches!(
        err,
        JapiError::Decode(DecodeError::Attribute { ref field, .. }) if field == "id"
    ));
}

#[test]
fn iso8601_timestamps_parse_and_reject_bad_text() -> japi::Result<()> {
    let good = doc(json!({
        "data": {
            "type": "timestamps", "id": "1",
            "attributes": { "timestamp": "2016-08-17T08:27:12Z", "next": null }
        }
    }));
    let decoded = Japi::unmarshal::<Timestamp>(&good, &TypeRegistry::new())?;
    let ts = decoded.one().ok_or(DecodeError::MissingPrimaryData)?;
    assert_eq!(ts.time, created_at());
    assert_eq!(ts.next, None);

    let bad = doc(json!({
        "data": { "type": "timestamps", "id": "1", "attributes": { "timestamp": "17/08/2016" } }
    }));
    let err = Japi::unmarshal::<Timestamp>(&bad, &TypeRegistry::new()).unwrap_err();
    assert!(matches!(
        err,
        JapiError::Decode(DecodeError::Attribute {
            reason: AttrError::BadTimestamp(_),
            ..
        })
    ));
    assert!(err.to_string().contains("bad timestamp format"));
    Ok(())
}

#[test]
fn client_ids_round_trip_through_lid() -> japi::Result<()> {
    let input = doc(json!({
        "data": [
            { "type": "comments", "id": "tmp-1", "lid": "tmp-1", "attributes": { "body": "new" } },
            { "type": "comments", "id": "5", "lid": "tmp-2", "attributes": { "body": "saved" } },
            { "type": "comments", "lid": "tmp-3" }
        ]
    }));

    let decoded = Japi::unmarshal::<Comment>(&input, &TypeRegistry::new())?;
    let comments = decoded.many();
    assert_eq!(comments.len(), 3);

    // An id equal to the lid was a client-id, not a primary key.
    assert_eq!((comments[0].id, comments[0].client_id.as_str()), (0, "tmp-1"));
    assert_eq!((comments[1].id, comments[1].client_id.as_str()), (5, "tmp-2"));
    assert_eq!((comments[2].id, comments[2].client_id.as_str()), (0, "tmp-3"));
    Ok(())
}

#[test]
fn a_client_id_equal_to_the_primary_key_keeps_the_key() -> japi::Result<()> {
    let mut graph = EntityGraph::new();
    let same = graph.insert(Comment {
        id: 5,
        client_id: "5".into(),
        body: "same".into(),
    });
    let fresh = graph.insert(Comment {
        client_id: "7".into(),
        body: "fresh".into(),
        ..Comment::default()
    });

    let doc = Japi::marshal_many(&graph, &[same, fresh], &Context::new())?;
    let objects = doc.primary();
    assert_eq!((objects[0].id.as_str(), objects[0].lid.as_deref()), ("5", None));
    assert_eq!((objects[1].id.as_str(), objects[1].lid.as_deref()), ("7", Some("7")));

    let decoded = Japi::unmarshal::<Comment>(&doc, &TypeRegistry::new())?;
    let comments = decoded.many();
    assert_eq!((comments[0].id, comments[0].body.as_str()), (5, "same"));
    assert_eq!((comments[1].id, comments[1].client_id.as_str()), (0, "7"));
    Ok(())
}

#[test]
fn linkage_can_point_at_a_lid() -> japi::Result<()> {
    let input = doc(json!({
        "data": {
            "type": "posts", "id": "1",
            "relationships": { "latest_comment": { "data": { "type": "comments", "lid": "tmp-1" } } }
        },
        "included": [{ "type": "comments", "lid": "tmp-1", "attributes": { "body": "draft" } }]
    }));

    let decoded = Japi::unmarshal::<Post>(&input, &registry()?)?;
    let post = decoded.one().ok_or(DecodeError::MissingPrimaryData)?;
    let latest = post
        .latest_comment
        .and_then(|c| decoded.get(c))
        .ok_or(DecodeError::MissingPrimaryData)?;
    assert_eq!(latest.body, "draft");
    assert_eq!(latest.client_id, "tmp-1");
    Ok(())
}

#[test]
fn a_type_name_belongs_to_one_registered_type() {
    let err = TypeRegistry::new()
        .with::<Comment>()
        .and_then(|r| r.with::<Remark>())
        .unwrap_err();
    assert_eq!(
        err,
        JapiError::Configuration(ConfigError::DuplicateResourceType {
            wire_type: "comments"
        })
    );
}

#[test]
fn malformed_json_is_a_decode_error() {
    let err = Japi::unmarshal_slice::<Post>(b"{\"data\": [", &TypeRegistry::new()).unwrap_err();
    assert!(matches!(err, JapiError::Decode(DecodeError::Json(_))));
}
