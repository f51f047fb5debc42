//! The process-wide descriptor cache.
//!
//! Keyed by `TypeId`, holding the outcome of the first resolution of each
//! type, failures included. Readers only take the read lock. A miss builds the
//! descriptor outside any lock and installs it first-writer-wins, so racing
//! resolvers of the same type all end up holding the same `Arc`; a partially
//! built descriptor is never visible.

use super::{TypeDescriptor, build};
use crate::error::{ConfigError, Result};
use crate::resource::Resource;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

type Resolved = std::result::Result<Arc<TypeDescriptor>, ConfigError>;

fn cache() -> &'static RwLock<HashMap<TypeId, Resolved>> {
    static CACHE: OnceLock<RwLock<HashMap<TypeId, Resolved>>> = OnceLock::new();
    CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Returns the descriptor of `T`, building and caching it on first use.
///
/// A type whose declarations are invalid fails with the same
/// [`ConfigError`] on every call; the declarations are scanned once.
pub fn resolve<T: Resource>() -> Result<Arc<TypeDescriptor>> {
    let type_id = TypeId::of::<T>();
    if let Some(hit) = lookup(type_id) {
        return hit.map_err(Into::into);
    }

    let built = build::<T>().map(Arc::new);
    match &built {
        Ok(desc) => tracing::debug!(
            type_name = desc.type_name(),
            wire_type = desc.wire_type(),
            fields = desc.fields().len(),
            "resolved resource descriptor"
        ),
        Err(err) => tracing::warn!(
            type_name = std::any::type_name::<T>(),
            error = %err,
            "resource declarations rejected"
        ),
    }
    install(type_id, built).map_err(Into::into)
}

fn lookup(type_id: TypeId) -> Option<Resolved> {
    cache()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&type_id)
        .cloned()
}

fn install(type_id: TypeId, resolved: Resolved) -> Resolved {
    cache()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .entry(type_id)
        .or_insert(resolved)
        .clone()
}

/// Whether `T` has been resolved (successfully or not).
pub fn contains<T: Resource>() -> bool {
    lookup(TypeId::of::<T>()).is_some()
}

/// Drops every cached descriptor. Meant for test isolation.
pub fn clear() {
    cache()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .clear();
}
