//! Yerb ECS -- sparse-set component storage with deferred entity lifecycle.
//!
//! Components live in per-type sparse-set pools inside a type-erased
//! [`ComponentRegistry`](registry::ComponentRegistry). Entities are bare
//! id + tag handles issued by an [`EntityManager`](manager::EntityManager),
//! which admits new entities and removes destroyed ones only at its
//! once-per-frame [`update`](manager::EntityManager::update) call.
//!
//! # Quick Start
//!
//! ```
//! use yerb_ecs::prelude::*;
//!
//! let mut manager = EntityManager::new();
//!
//! let player = manager.add_entity(EntityTag::Player);
//! player.set_component(Transform::new(Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0)));
//! player.set_component(Shape::new(16.0, 16.0));
//! manager.update();
//!
//! // A movement pass over every transform, densely packed.
//! for transform in manager.components().dense::<Transform>() {
//!     let mut t = transform.borrow_mut();
//!     let velocity = t.velocity;
//!     t.position += velocity;
//! }
//!
//! assert_eq!(player.center_pos(), Some(Vec2::new(9.0, 8.0)));
//! ```

#![deny(unsafe_code)]

pub mod components;
pub mod entity;
pub mod manager;
pub mod pool;
pub mod registry;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by ECS operations.
///
/// Storage and lifecycle operations never fail; absence is reported as
/// `None`. This type covers conversions at the crate boundary.
#[derive(Debug, thiserror::Error)]
pub enum EcsError {
    /// A tag name did not match any [`EntityTag`](entity::EntityTag) variant.
    #[error("unknown entity tag '{name}'")]
    UnknownTag { name: String },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::components::{
        entities_in_radius, BounceTracker, Effect, EffectKind, Effects, Input, Lifespan, Shape,
        Transform, Vec2,
    };
    pub use crate::entity::{Entity, EntityId, EntityTag};
    pub use crate::manager::{EntityList, EntityManager, UpdateReport};
    pub use crate::pool::ComponentPool;
    pub use crate::registry::{ComponentRegistry, Shared};
    pub use crate::EcsError;
}

// ---------------------------------------------------------------------------
// Integration Tests
// ---------------------------------------------------------------------------
