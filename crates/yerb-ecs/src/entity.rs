//! Entity identifiers, tags, and the [`Entity`] handle.
//!
//! Entities carry no component data. An [`Entity`] is an id plus a coarse
//! [`EntityTag`] and a liveness flag; every component operation is forwarded
//! to the [`ComponentRegistry`] shared by the issuing
//! [`EntityManager`](crate::manager::EntityManager).

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::registry::{ComponentRegistry, Shared, SharedRegistry};
use crate::EcsError;

// ---------------------------------------------------------------------------
// EntityId
// ---------------------------------------------------------------------------

/// A monotonically issued entity identifier. Ids are never reused.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// Raw `u64` representation.
    #[inline]
    pub fn to_raw(self) -> u64 {
        self.0
    }

    /// Reconstruct from a raw `u64`.
    #[inline]
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The id as a sparse-array index.
    ///
    /// Ids are issued from zero, so this is lossless on 64-bit targets. On
    /// narrower targets ids past `usize::MAX` would wrap; reaching them takes
    /// over four billion spawns.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// EntityTag
// ---------------------------------------------------------------------------

/// Coarse category used to partition entity queries.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub enum EntityTag {
    Player,
    Wall,
    SpeedBoost,
    SlownessDebuff,
    Enemy,
    Bullet,
    Item,
    #[default]
    Default,
}

impl EntityTag {
    /// Number of tags.
    pub const COUNT: usize = 8;

    /// Every tag, in declaration order.
    pub const ALL: [EntityTag; Self::COUNT] = [
        EntityTag::Player,
        EntityTag::Wall,
        EntityTag::SpeedBoost,
        EntityTag::SlownessDebuff,
        EntityTag::Enemy,
        EntityTag::Bullet,
        EntityTag::Item,
        EntityTag::Default,
    ];

    /// Position of this tag within [`EntityTag::ALL`].
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Variant name.
    pub fn name(self) -> &'static str {
        match self {
            EntityTag::Player => "Player",
            EntityTag::Wall => "Wall",
            EntityTag::SpeedBoost => "SpeedBoost",
            EntityTag::SlownessDebuff => "SlownessDebuff",
            EntityTag::Enemy => "Enemy",
            EntityTag::Bullet => "Bullet",
            EntityTag::Item => "Item",
            EntityTag::Default => "Default",
        }
    }
}

impl fmt::Display for EntityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EntityTag {
    type Err = EcsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityTag::ALL
            .into_iter()
            .find(|tag| tag.name() == s)
            .ok_or_else(|| EcsError::UnknownTag { name: s.to_owned() })
    }
}

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// Handle to an entity issued by an [`EntityManager`](crate::manager::EntityManager).
///
/// Handles are shared (`Rc<Entity>`) between the manager's indices and any
/// system that keeps one. The registry reference is weak: once the manager
/// (and with it the registry) is gone, component operations quietly do
/// nothing and reads return `None`.
///
/// Writes made while the registry is borrowed, such as from inside a
/// `manager.components().dense::<T>()` loop, are queued and take effect at
/// the next [`update`](crate::manager::EntityManager::update). Once the
/// entity is destroyed, writes that would add components are ignored.
pub struct Entity {
    id: EntityId,
    tag: EntityTag,
    active: Cell<bool>,
    registry: Weak<SharedRegistry>,
}

impl Entity {
    pub(crate) fn new(
        id: EntityId,
        tag: EntityTag,
        registry: Weak<SharedRegistry>,
    ) -> Self {
        Self {
            id,
            tag,
            active: Cell::new(true),
            registry,
        }
    }

    #[inline]
    pub fn id(&self) -> EntityId {
        self.id
    }

    #[inline]
    pub fn tag(&self) -> EntityTag {
        self.tag
    }

    /// `false` once [`destroy`](Self::destroy) has been called.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    /// Mark the entity for removal.
    ///
    /// Nothing is removed here. The manager drops the entity from its indices
    /// and purges its components on the next
    /// [`update`](crate::manager::EntityManager::update). Calling this more
    /// than once has no further effect.
    pub fn destroy(&self) {
        self.active.set(false);
    }

    /// Run `f` against the registry if it still exists and is not being
    /// written through a `components_mut` guard.
    fn read<R>(&self, f: impl FnOnce(&ComponentRegistry) -> R) -> Option<R> {
        let shared = self.registry.upgrade()?;
        let Ok(guard) = shared.registry().try_borrow() else {
            warn!(entity = %self.id, "component registry is mutably borrowed; read skipped");
            return None;
        };
        Some(f(&guard))
    }

    /// Apply `op` now, or queue it for the next update if the registry is
    /// borrowed. Returns `false` if the entity is destroyed or the registry
    /// is gone.
    fn write(&self, op: impl FnOnce(&mut ComponentRegistry) + 'static) -> bool {
        if !self.is_active() {
            trace!(entity = %self.id, "ignored component write to destroyed entity");
            return false;
        }
        let Some(shared) = self.registry.upgrade() else {
            return false;
        };
        match shared.registry().try_borrow_mut() {
            Ok(mut registry) => op(&mut registry),
            Err(_) => {
                debug!(entity = %self.id, "component registry busy; write deferred");
                shared.defer(op);
            }
        }
        true
    }

    /// Shared handle to this entity's `T`, if attached.
    pub fn get_component<T: 'static>(&self) -> Option<Shared<T>> {
        self.read(|registry| registry.get::<T>(self.id)).flatten()
    }

    /// Attach `value` as this entity's `T`, replacing any existing `T`.
    ///
    /// Returns the handle that will be stored, or `None` if the entity is
    /// destroyed or the registry no longer exists. A deferred write is not
    /// visible to [`get_component`](Self::get_component) until the next update.
    pub fn set_component<T: 'static>(&self, value: T) -> Option<Shared<T>> {
        let handle = Rc::new(RefCell::new(value));
        let stored = Rc::clone(&handle);
        let id = self.id;
        self.write(move |registry| registry.attach(id, stored))
            .then_some(handle)
    }

    /// Attach an existing shared component, replacing any existing `T`.
    pub fn attach_component<T: 'static>(&self, component: Shared<T>) {
        let id = self.id;
        self.write(move |registry| registry.attach(id, component));
    }

    /// Detach this entity's `T`, returning the handle that was stored.
    ///
    /// Works on destroyed entities too. If the registry is borrowed the
    /// removal is queued for the next update and `None` is returned.
    pub fn remove_component<T: 'static>(&self) -> Option<Shared<T>> {
        let shared = self.registry.upgrade()?;
        let Ok(mut registry) = shared.registry().try_borrow_mut() else {
            let id = self.id;
            debug!(entity = %id, "component registry busy; removal deferred");
            shared.defer(move |registry| {
                registry.remove::<T>(id);
            });
            return None;
        };
        registry.remove::<T>(self.id)
    }

    pub fn has_component<T: 'static>(&self) -> bool {
        self.read(|registry| registry.contains::<T>(self.id))
            .unwrap_or(false)
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("tag", &self.tag)
            .field("active", &self.active.get())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Health(u32);

    #[derive(Debug, Clone, PartialEq)]
    struct Armor(u32);

    fn registry() -> Rc<SharedRegistry> {
        Rc::new(SharedRegistry::new())
    }

    fn entity(raw: u64, registry: &Rc<SharedRegistry>) -> Entity {
        Entity::new(EntityId::from_raw(raw), EntityTag::Player, Rc::downgrade(registry))
    }

    #[test]
    fn new_entity_is_active() {
        let reg = registry();
        let e = entity(0, &reg);
        assert!(e.is_active());
        assert_eq!(e.tag(), EntityTag::Player);
    }

    #[test]
    fn destroy_is_idempotent() {
        let reg = registry();
        let e = entity(0, &reg);
        e.destroy();
        assert!(!e.is_active());
        e.destroy();
        assert!(!e.is_active());
    }

    #[test]
    fn set_then_get_round_trip() {
        let reg = registry();
        let e = entity(1, &reg);
        e.set_component(Health(30));
        let health = e.get_component::<Health>().unwrap();
        assert_eq!(*health.borrow(), Health(30));
    }

    #[test]
    fn set_component_overwrites() {
        let reg = registry();
        let e = entity(1, &reg);
        e.set_component(Health(30));
        e.set_component(Health(5));
        assert_eq!(*e.get_component::<Health>().unwrap().borrow(), Health(5));
        assert_eq!(reg.registry().borrow().dense::<Health>().len(), 1);
    }

    #[test]
    fn components_are_independent_per_type() {
        let reg = registry();
        let e = entity(2, &reg);
        e.set_component(Health(1));
        assert!(e.has_component::<Health>());
        assert!(!e.has_component::<Armor>());

        e.set_component(Armor(9));
        let removed = e.remove_component::<Health>().unwrap();
        assert_eq!(*removed.borrow(), Health(1));
        assert!(!e.has_component::<Health>());
        assert!(e.has_component::<Armor>());
        assert!(e.remove_component::<Health>().is_none());
    }

    #[test]
    fn attach_component_shares_the_handle() {
        let reg = registry();
        let a = entity(0, &reg);
        let b = entity(1, &reg);
        let shared = Rc::new(RefCell::new(Health(10)));
        a.attach_component(Rc::clone(&shared));
        b.attach_component(Rc::clone(&shared));
        shared.borrow_mut().0 = 99;
        assert_eq!(*a.get_component::<Health>().unwrap().borrow(), Health(99));
        assert_eq!(*b.get_component::<Health>().unwrap().borrow(), Health(99));
    }

    #[test]
    fn dropped_registry_makes_operations_noops() {
        let reg = registry();
        let e = entity(0, &reg);
        e.set_component(Health(3));
        drop(reg);

        assert!(e.get_component::<Health>().is_none());
        assert!(!e.has_component::<Health>());
        assert!(e.set_component(Health(4)).is_none());
        assert!(e.remove_component::<Health>().is_none());
        e.attach_component(Rc::new(RefCell::new(Armor(1))));
        e.destroy();
        assert!(!e.is_active());
    }

    #[test]
    fn destroyed_entity_ignores_additions() {
        let reg = registry();
        let e = entity(0, &reg);
        e.set_component(Health(3));
        e.destroy();

        assert!(e.set_component(Armor(1)).is_none());
        e.attach_component(Rc::new(RefCell::new(Armor(2))));
        assert!(!e.has_component::<Armor>());
        assert!(reg.registry().borrow().dense::<Armor>().is_empty());

        // Removal still works until the sweep gets there.
        assert_eq!(*e.remove_component::<Health>().unwrap().borrow(), Health(3));
    }

    #[test]
    fn writes_while_registry_is_read_are_deferred() {
        let reg = registry();
        let e = entity(0, &reg);
        e.set_component(Armor(1));
        {
            let _pass = reg.registry().borrow();
            let handle = e.set_component(Health(7)).unwrap();
            assert_eq!(*handle.borrow(), Health(7));
            assert!(e.remove_component::<Armor>().is_none());
            // Reads still work; the writes have not landed yet.
            assert!(!e.has_component::<Health>());
            assert!(e.has_component::<Armor>());
        }
        assert_eq!(reg.pending_writes(), 2);
        reg.apply_deferred();
        assert_eq!(*e.get_component::<Health>().unwrap().borrow(), Health(7));
        assert!(!e.has_component::<Armor>());
    }

    #[test]
    fn reads_while_registry_is_written_return_none() {
        let reg = registry();
        let e = entity(0, &reg);
        e.set_component(Health(1));
        let guard = reg.registry().borrow_mut();
        assert!(e.get_component::<Health>().is_none());
        assert!(!e.has_component::<Health>());
        drop(guard);
        assert!(e.has_component::<Health>());
    }

    #[test]
    fn tag_display_and_parse() {
        for tag in EntityTag::ALL {
            assert_eq!(tag.to_string().parse::<EntityTag>().unwrap(), tag);
        }
        assert_eq!(EntityTag::SlownessDebuff.to_string(), "SlownessDebuff");
        assert!(matches!(
            "Boss".parse::<EntityTag>(),
            Err(EcsError::UnknownTag { name }) if name == "Boss"
        ));
    }

    #[test]
    fn tag_index_matches_all_order() {
        for (i, tag) in EntityTag::ALL.iter().enumerate() {
            assert_eq!(tag.index(), i);
        }
        assert_eq!(EntityTag::default(), EntityTag::Default);
    }

    #[test]
    fn entity_id_display() {
        let id = EntityId::from_raw(42);
        assert_eq!(id.to_string(), "#42");
        assert_eq!(format!("{id:?}"), "EntityId(42)");
        assert_eq!(id.index(), 42);
    }
}
