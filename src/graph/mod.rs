//! The entity arena.
//!
//! This module defines the `EntityGraph` that owns entities, the `EntityId`
//! slot numbers, and the typed `Ref` handles relationship fields hold.

/// Defines the `EntityGraph` arena.
pub mod core;
/// Defines `EntityId` and `Ref`.
pub mod id;

pub use self::core::EntityGraph;
pub use id::{EntityId, Ref};
