// src/rt.rs

//! Runtime utilities for generated code (Macros).
//! Do not use directly.
//!
//! Each helper is the body of one slot accessor of the `Resource` trait, so
//! the derive only has to emit the slot `match` and a call per field.

use crate::attribute::{AttrOptions, Attribute};
use crate::error::AttrError;
use crate::graph::EntityId;
use crate::resource::Relation;
use serde_json::Value;

/// Encodes an attribute or key field.
pub fn encode<A: Attribute>(field: &A, options: &AttrOptions) -> Result<Value, AttrError> {
    field.encode(options)
}

/// `omitempty` test.
pub fn is_empty<A: Attribute>(field: &A) -> Result<bool, AttrError> {
    Ok(field.is_empty())
}

/// Decodes into `field`.
///
/// A JSON `null` only overwrites fields that can hold one; other fields keep
/// their current value.
pub fn decode<A: Attribute>(field: &mut A, value: Value, options: &AttrOptions) -> Result<(), AttrError> {
    if value.is_null() {
        if let Some(empty) = A::decode_null() {
            *field = empty;
        }
        return Ok(());
    }
    *field = A::decode(value, options)?;
    Ok(())
}

/// Reads a key field; `None` when unset.
pub fn read_key<A: Attribute>(field: &A) -> Result<Option<String>, AttrError> {
    Ok(field.to_key())
}

/// Parses `key` into a key field.
pub fn write_key<A: Attribute>(field: &mut A, key: &str) -> Result<(), AttrError> {
    *field = A::from_key(key)?;
    Ok(())
}

/// Slots referenced by a relationship field.
pub fn relation_targets<R: Relation>(field: &R) -> Result<Vec<EntityId>, AttrError> {
    Ok(field.targets())
}

/// Replaces a relationship field.
pub fn write_relation<R: Relation>(field: &mut R, targets: Vec<EntityId>) -> Result<(), AttrError> {
    *field = R::from_targets(targets);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_keeps_plain_fields_and_clears_optional_ones() -> Result<(), AttrError> {
        let mut count = 7_u32;
        decode(&mut count, Value::Null, &AttrOptions::PLAIN)?;
        assert_eq!(count, 7);

        let mut label = Some("x".to_string());
        decode(&mut label, Value::Null, &AttrOptions::PLAIN)?;
        assert_eq!(label, None);

        decode(&mut count, json!(3), &AttrOptions::PLAIN)?;
        assert_eq!(count, 3);
        Ok(())
    }

    #[test]
    fn keys_round_trip_through_text() -> Result<(), AttrError> {
        let mut id = 0_u64;
        assert_eq!(read_key(&id)?, None);
        write_key(&mut id, "42")?;
        assert_eq!(read_key(&id)?, Some("42".to_string()));
        assert!(write_key(&mut id, "forty-two").is_err());
        Ok(())
    }
}
