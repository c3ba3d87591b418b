//! Stock gameplay components.
//!
//! Plain data shared by the movement, collision and spawning layers. The
//! registry accepts any `'static` type; these are just the ones every game
//! built on the engine ends up needing.

use std::ops::{Add, AddAssign, Mul, Sub};
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::entity::Entity;
use crate::manager::EntityList;

// ---------------------------------------------------------------------------
// Vec2
// ---------------------------------------------------------------------------

/// 2D vector in screen space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f32 {
        self.x.hypot(self.y)
    }

    /// Unit vector in the same direction. The zero vector stays zero.
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len > 0.0 {
            Self::new(self.x / len, self.y / len)
        } else {
            self
        }
    }

    pub fn distance_squared(self, other: Vec2) -> f32 {
        let d = other - self;
        d.x * d.x + d.y * d.y
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

/// Position of the top-left corner plus per-frame velocity.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec2,
    pub velocity: Vec2,
}

impl Transform {
    pub fn new(position: Vec2, velocity: Vec2) -> Self {
        Self { position, velocity }
    }
}

/// Axis-aligned bounding size.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Shape {
    pub width: f32,
    pub height: f32,
}

impl Shape {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Directional input state for player-controlled entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Input {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
}

/// Remaining lifetime in frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Lifespan {
    pub remaining: u32,
}

impl Lifespan {
    pub fn new(frames: u32) -> Self {
        Self { remaining: frames }
    }

    /// Count down by `frames`. Returns `true` once the lifespan has run out.
    pub fn tick(&mut self, frames: u32) -> bool {
        self.remaining = self.remaining.saturating_sub(frames);
        self.is_expired()
    }

    pub fn is_expired(&self) -> bool {
        self.remaining == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectKind {
    Speed,
    Slowness,
}

/// A timed status effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Effect {
    pub kind: EffectKind,
    /// Frame the effect started on.
    pub start_frame: u64,
    /// Length in frames.
    pub duration: u64,
}

impl Effect {
    pub fn is_expired(&self, frame: u64) -> bool {
        frame >= self.start_frame.saturating_add(self.duration)
    }
}

/// Active status effects, at most one per [`EffectKind`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Effects {
    effects: Vec<Effect>,
}

impl Effects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `effect` unless one of the same kind is already active.
    ///
    /// Returns `true` if it was added.
    pub fn add(&mut self, effect: Effect) -> bool {
        if self.has(effect.kind) {
            return false;
        }
        self.effects.push(effect);
        true
    }

    pub fn remove(&mut self, kind: EffectKind) {
        self.effects.retain(|effect| effect.kind != kind);
    }

    pub fn has(&self, kind: EffectKind) -> bool {
        self.effects.iter().any(|effect| effect.kind == kind)
    }

    pub fn clear(&mut self) {
        self.effects.clear();
    }

    /// Drop every effect that has run out by `frame`.
    pub fn expire(&mut self, frame: u64) {
        self.effects.retain(|effect| !effect.is_expired(frame));
    }

    pub fn iter(&self) -> impl Iterator<Item = &Effect> {
        self.effects.iter()
    }
}

/// Counts wall bounces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BounceTracker {
    bounces: u32,
}

impl BounceTracker {
    pub fn add_bounce(&mut self) {
        self.bounces += 1;
    }

    pub fn bounces(&self) -> u32 {
        self.bounces
    }
}

// ---------------------------------------------------------------------------
// Spatial helpers
// ---------------------------------------------------------------------------

impl Entity {
    /// Center of the entity's bounding box.
    ///
    /// Needs both a [`Transform`] and a [`Shape`]; logs an error and returns
    /// `None` if either is missing. Callers used to a `(0, 0)` fallback for
    /// incomplete entities must handle the `None` explicitly.
    pub fn center_pos(&self) -> Option<Vec2> {
        let (Some(transform), Some(shape)) = (
            self.get_component::<Transform>(),
            self.get_component::<Shape>(),
        ) else {
            error!(
                entity = %self.id(),
                tag = %self.tag(),
                "entity lacks a transform or shape; cannot compute center"
            );
            return None;
        };
        let shape = shape.borrow();
        let center = transform.borrow().position + Vec2::new(shape.width / 2.0, shape.height / 2.0);
        Some(center)
    }
}

/// Candidates (other than `entity`) whose centers lie strictly within
/// `radius` of `entity`'s center.
///
/// Candidates without a computable center are skipped rather than treated
/// as sitting at the origin. If `entity` itself has none, nothing is
/// returned.
pub fn entities_in_radius(entity: &Rc<Entity>, candidates: &[Rc<Entity>], radius: f32) -> EntityList {
    let Some(center) = entity.center_pos() else {
        return Vec::new();
    };
    let radius_squared = radius * radius;

    candidates
        .iter()
        .filter(|candidate| !Rc::ptr_eq(*candidate, entity))
        .filter(|candidate| {
            candidate
                .center_pos()
                .is_some_and(|other| center.distance_squared(other) < radius_squared)
        })
        .cloned()
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
