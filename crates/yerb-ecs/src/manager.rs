//! Entity lifecycle management with a once-per-frame commit point.
//!
//! The [`EntityManager`] issues [`Entity`] handles and keeps the committed
//! view of the world: a canonical list plus one list per [`EntityTag`].
//! Those lists only change inside [`EntityManager::update`]:
//!
//! 1. **Commit** -- entities staged by [`add_entity`](EntityManager::add_entity)
//!    since the last update become visible.
//! 2. **Sweep** -- entities flagged by [`Entity::destroy`] are dropped from
//!    every list and their components are purged from the registry.
//!
//! Systems can therefore spawn and destroy freely while iterating
//! [`entities`](EntityManager::entities); nothing they iterate moves until the
//! frame's single `update()` call. Component writes made while a
//! [`components`](EntityManager::components) guard is alive are queued and
//! applied at the start of that same call, before the commit.
//!
//! # Example
//!
//! ```
//! use yerb_ecs::prelude::*;
//!
//! let mut manager = EntityManager::new();
//! let bullet = manager.add_entity(EntityTag::Bullet);
//! bullet.set_component(Lifespan::new(30));
//!
//! // Staged, not yet visible.
//! assert!(manager.entities().is_empty());
//!
//! manager.update();
//! assert_eq!(manager.entities_by_tag(EntityTag::Bullet).len(), 1);
//!
//! bullet.destroy();
//! manager.update();
//! assert!(manager.entities().is_empty());
//! assert!(bullet.get_component::<Lifespan>().is_none());
//! ```

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::entity::{Entity, EntityId, EntityTag};
use crate::registry::{ComponentRegistry, SharedRegistry};

/// Shared entity handles in iteration order.
pub type EntityList = Vec<Rc<Entity>>;

// ---------------------------------------------------------------------------
// UpdateReport
// ---------------------------------------------------------------------------

/// Summary of one [`EntityManager::update`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateReport {
    /// Queued component writes applied by this update.
    pub deferred_writes: usize,
    /// Staged entities made visible by this update.
    pub committed: usize,
    /// Destroyed entities removed by this update.
    pub purged: usize,
    /// Committed entities after the update.
    pub live: usize,
}

// ---------------------------------------------------------------------------
// EntityManager
// ---------------------------------------------------------------------------

/// Owns every entity index and the component registry they share.
pub struct EntityManager {
    /// Committed entities, in commit order.
    entities: EntityList,
    /// Entities issued since the last update.
    to_add: RefCell<EntityList>,
    /// Committed entities partitioned by tag, indexed by [`EntityTag::index`].
    by_tag: [EntityList; EntityTag::COUNT],
    /// Next id to issue. Only ever increases.
    next_id: Cell<u64>,
    registry: Rc<SharedRegistry>,
    last_report: UpdateReport,
}

impl EntityManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an empty manager with room for `capacity` committed entities.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entities: Vec::with_capacity(capacity),
            to_add: RefCell::new(Vec::new()),
            by_tag: std::array::from_fn(|_| Vec::new()),
            next_id: Cell::new(0),
            registry: Rc::new(SharedRegistry::new()),
            last_report: UpdateReport::default(),
        }
    }

    /// Issue a new entity with the next id.
    ///
    /// The handle is usable right away (components can be attached) but the
    /// entity stays out of [`entities`](Self::entities) and
    /// [`entities_by_tag`](Self::entities_by_tag) until the next
    /// [`update`](Self::update).
    pub fn add_entity(&self, tag: EntityTag) -> Rc<Entity> {
        let id = EntityId::from_raw(self.next_id.get());
        self.next_id.set(id.to_raw() + 1);

        let entity = Rc::new(Entity::new(id, tag, Rc::downgrade(&self.registry)));
        self.to_add.borrow_mut().push(Rc::clone(&entity));
        trace!(entity = %id, %tag, "staged entity");
        entity
    }

    /// Every committed entity, in commit order.
    pub fn entities(&self) -> &[Rc<Entity>] {
        &self.entities
    }

    /// Committed entities carrying `tag`.
    pub fn entities_by_tag(&self, tag: EntityTag) -> &[Rc<Entity>] {
        &self.by_tag[tag.index()]
    }

    /// Number of committed entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether there are no committed entities.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Number of entities waiting for the next commit.
    pub fn pending_count(&self) -> usize {
        self.to_add.borrow().len()
    }

    /// The id the next [`add_entity`](Self::add_entity) call will issue.
    pub fn next_id(&self) -> EntityId {
        EntityId::from_raw(self.next_id.get())
    }

    /// Read access to the component registry, e.g. for dense iteration.
    ///
    /// While the guard is alive, entity reads work as usual and entity writes
    /// ([`Entity::set_component`] and friends) are queued until the next
    /// [`update`](Self::update).
    ///
    /// # Panics
    ///
    /// Panics if a [`components_mut`](Self::components_mut) guard is alive.
    pub fn components(&self) -> Ref<'_, ComponentRegistry> {
        self.registry.registry().borrow()
    }

    /// Write access to the component registry.
    ///
    /// While the guard is alive, entity reads return `None` and entity writes
    /// are queued until the next [`update`](Self::update).
    ///
    /// # Panics
    ///
    /// Panics if any [`components`](Self::components) or `components_mut`
    /// guard is alive.
    pub fn components_mut(&self) -> RefMut<'_, ComponentRegistry> {
        self.registry.registry().borrow_mut()
    }

    /// Component writes queued because the registry was borrowed.
    pub fn pending_writes(&self) -> usize {
        self.registry.pending_writes()
    }

    /// Pre-size `T`'s pool for the next `additional` entities to be issued.
    pub fn reserve_components<T: 'static>(&mut self, additional: usize) {
        let id_bound = self.next_id().index().saturating_add(additional);
        self.registry
            .registry()
            .borrow_mut()
            .reserve::<T>(additional, id_bound);
    }

    /// Report from the last [`update`](Self::update) call.
    pub fn last_report(&self) -> UpdateReport {
        self.last_report
    }

    /// Apply queued component writes, commit staged entities, then sweep
    /// destroyed ones.
    ///
    /// Call exactly once per frame, after every system has finished with the
    /// entity lists for that frame. An entity destroyed before it was ever
    /// committed is committed and swept by the same call.
    pub fn update(&mut self) -> UpdateReport {
        let deferred_writes = self.registry.apply_deferred();

        let staged = std::mem::take(self.to_add.get_mut());
        let committed = staged.len();
        for entity in staged {
            self.by_tag[entity.tag().index()].push(Rc::clone(&entity));
            self.entities.push(entity);
        }

        // An entity sits in the canonical list and in one tag bucket; the
        // set keeps its components from being purged twice.
        let mut purged = HashSet::new();
        let registry = self.registry.registry();
        sweep(&mut self.entities, registry, &mut purged);
        for bucket in &mut self.by_tag {
            sweep(bucket, registry, &mut purged);
        }

        let report = UpdateReport {
            deferred_writes,
            committed,
            purged: purged.len(),
            live: self.entities.len(),
        };
        if report.committed > 0 || report.purged > 0 {
            debug!(
                deferred_writes = report.deferred_writes,
                committed = report.committed,
                purged = report.purged,
                live = report.live,
                "entity manager update"
            );
        }
        self.last_report = report;
        report
    }
}

/// Drop inactive entities from `list`, purging each one's components the
/// first time it is seen.
fn sweep(
    list: &mut EntityList,
    registry: &RefCell<ComponentRegistry>,
    purged: &mut HashSet<EntityId>,
) {
    list.retain(|entity| {
        if entity.is_active() {
            return true;
        }
        if purged.insert(entity.id()) {
            let components = registry.borrow_mut().remove_all_for_entity(entity.id());
            trace!(entity = %entity.id(), tag = %entity.tag(), components, "purged entity");
        }
        false
    });
}

impl Default for EntityManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EntityManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityManager")
            .field("live", &self.entities.len())
            .field("pending", &self.to_add.borrow().len())
            .field("next_id", &self.next_id.get())
            .field("registry", &self.registry)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
