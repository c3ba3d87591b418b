//! Type-erased component storage.
//!
//! The [`ComponentRegistry`] owns one [`ComponentPool`] per component type,
//! keyed by the Rust `TypeId`. Pools are created the first time a value of
//! that type is written; reading a type that was never written simply yields
//! nothing. Values are stored as [`Shared`] cells so a handle handed out to a
//! system stays valid after the pool slot is overwritten or removed.
//!
//! The registry has no notion of entities beyond their ids. Lifecycle is the
//! [`EntityManager`](crate::manager::EntityManager)'s job.

use std::any::{type_name, Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::entity::EntityId;
use crate::pool::ComponentPool;

/// Reference-counted, interior-mutable component handle.
pub type Shared<T> = Rc<RefCell<T>>;

// ---------------------------------------------------------------------------
// ErasedPool -- the per-type operations the registry needs without knowing T
// ---------------------------------------------------------------------------

trait ErasedPool {
    /// Remove `id`'s value. Returns `true` if one was stored.
    fn remove_entity(&mut self, id: EntityId) -> bool;
    fn contains_entity(&self, id: EntityId) -> bool;
    fn len(&self) -> usize;
    fn clear(&mut self);
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: 'static> ErasedPool for ComponentPool<Shared<T>> {
    fn remove_entity(&mut self, id: EntityId) -> bool {
        self.remove(id).is_some()
    }

    fn contains_entity(&self, id: EntityId) -> bool {
        self.contains(id)
    }

    fn len(&self) -> usize {
        ComponentPool::len(self)
    }

    fn clear(&mut self) {
        ComponentPool::clear(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

struct PoolEntry {
    name: &'static str,
    pool: Box<dyn ErasedPool>,
}

// ---------------------------------------------------------------------------
// ComponentRegistry
// ---------------------------------------------------------------------------

/// Keyed store of component pools, one per component type.
///
/// Pools are kept in the order their types were first written. Bulk
/// operations such as [`remove_all_for_entity`](Self::remove_all_for_entity)
/// visit them in that order.
#[derive(Default)]
pub struct ComponentRegistry {
    /// TypeId -> index into `pools`.
    by_type: HashMap<TypeId, usize>,
    pools: Vec<PoolEntry>,
}

impl ComponentRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Typed view of the pool for `T`, if one exists.
    pub fn pool<T: 'static>(&self) -> Option<&ComponentPool<Shared<T>>> {
        let idx = *self.by_type.get(&TypeId::of::<T>())?;
        self.pools[idx].pool.as_any().downcast_ref()
    }

    fn pool_mut<T: 'static>(&mut self) -> Option<&mut ComponentPool<Shared<T>>> {
        let idx = *self.by_type.get(&TypeId::of::<T>())?;
        self.pools[idx].pool.as_any_mut().downcast_mut()
    }

    /// The pool for `T`, created on first use.
    fn pool_or_create<T: 'static>(&mut self) -> &mut ComponentPool<Shared<T>> {
        let idx = match self.by_type.get(&TypeId::of::<T>()) {
            Some(&idx) => idx,
            None => {
                let idx = self.pools.len();
                let name = type_name::<T>();
                self.pools.push(PoolEntry {
                    name,
                    pool: Box::new(ComponentPool::<Shared<T>>::new()),
                });
                self.by_type.insert(TypeId::of::<T>(), idx);
                debug!(component = name, pools = self.pools.len(), "created component pool");
                idx
            }
        };
        self.pools[idx]
            .pool
            .as_any_mut()
            .downcast_mut()
            .expect("pool stored under a TypeId always has that component type")
    }

    /// Store `value` for `id` unless `id` already has a `T`.
    ///
    /// First write wins: an existing `T` is kept and its handle returned,
    /// and `value` is dropped. Use [`set`](Self::set) to overwrite.
    pub fn insert<T: 'static>(&mut self, id: EntityId, value: T) -> Shared<T> {
        let stored = self
            .pool_or_create::<T>()
            .insert_if_absent(id, Rc::new(RefCell::new(value)));
        Rc::clone(stored)
    }

    /// Store `value` for `id`, replacing any existing `T`.
    ///
    /// The replaced handle (if any) is released by the pool. Systems still
    /// holding it keep the old value alive.
    pub fn set<T: 'static>(&mut self, id: EntityId, value: T) -> Shared<T> {
        let handle = Rc::new(RefCell::new(value));
        self.attach(id, Rc::clone(&handle));
        handle
    }

    /// Store an existing handle for `id`, replacing any existing `T`.
    pub fn attach<T: 'static>(&mut self, id: EntityId, component: Shared<T>) {
        self.pool_or_create::<T>().insert(id, component);
    }

    /// Handle to `id`'s `T`.
    pub fn get<T: 'static>(&self, id: EntityId) -> Option<Shared<T>> {
        self.pool::<T>()?.get(id).cloned()
    }

    pub fn contains<T: 'static>(&self, id: EntityId) -> bool {
        self.pool::<T>().is_some_and(|pool| pool.contains(id))
    }

    /// Remove `id`'s `T`, returning the handle the pool held.
    pub fn remove<T: 'static>(&mut self, id: EntityId) -> Option<Shared<T>> {
        self.pool_mut::<T>()?.remove(id)
    }

    /// Every stored `T`, densely packed. Empty if `T` was never written.
    pub fn dense<T: 'static>(&self) -> &[Shared<T>] {
        match self.pool::<T>() {
            Some(pool) => pool.dense(),
            None => &[],
        }
    }

    /// Owning entity of each slot of [`dense`](Self::dense).
    pub fn dense_ids<T: 'static>(&self) -> &[EntityId] {
        match self.pool::<T>() {
            Some(pool) => pool.dense_ids(),
            None => &[],
        }
    }

    /// Pre-size the pool for `T`: dense room for `additional` more values and
    /// sparse room for ids below `id_bound`.
    ///
    /// Creates the pool if needed, which fixes its place in first-use order.
    pub fn reserve<T: 'static>(&mut self, additional: usize, id_bound: usize) {
        let pool = self.pool_or_create::<T>();
        pool.reserve_dense(additional);
        pool.resize_sparse(id_bound);
    }

    /// Remove `id` from every pool, whatever its type.
    ///
    /// Returns the number of pools that held a value for `id`.
    pub fn remove_all_for_entity(&mut self, id: EntityId) -> usize {
        self.pools
            .iter_mut()
            .map(|entry| entry.pool.remove_entity(id))
            .filter(|&removed| removed)
            .count()
    }

    /// Number of components of any type attached to `id`.
    pub fn component_count(&self, id: EntityId) -> usize {
        self.pools
            .iter()
            .filter(|entry| entry.pool.contains_entity(id))
            .count()
    }

    /// Number of materialized pools.
    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    /// Type names of every materialized pool, in creation order.
    pub fn component_names(&self) -> Vec<&'static str> {
        self.pools.iter().map(|entry| entry.name).collect()
    }

    /// Empty every pool. Pools themselves are kept.
    pub fn clear(&mut self) {
        for entry in &mut self.pools {
            entry.pool.clear();
        }
    }
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.pools.iter().map(|entry| (entry.name, entry.pool.len())))
            .finish()
    }
}

// ---------------------------------------------------------------------------
// SharedRegistry -- the registry as seen from entity handles
// ---------------------------------------------------------------------------

type DeferredWrite = Box<dyn FnOnce(&mut ComponentRegistry)>;

/// A [`ComponentRegistry`] shared by a manager and the entities it issues.
///
/// Entity writes that arrive while the registry is borrowed (typically from
/// inside a `dense::<T>()` pass) cannot run immediately. They are queued here
/// and run, in arrival order, by [`apply_deferred`](Self::apply_deferred) at
/// the start of the next manager update.
#[derive(Default)]
pub(crate) struct SharedRegistry {
    registry: RefCell<ComponentRegistry>,
    deferred: RefCell<Vec<DeferredWrite>>,
}

impl SharedRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn registry(&self) -> &RefCell<ComponentRegistry> {
        &self.registry
    }

    pub(crate) fn defer(&self, op: impl FnOnce(&mut ComponentRegistry) + 'static) {
        self.deferred.borrow_mut().push(Box::new(op));
    }

    /// Number of queued writes.
    pub(crate) fn pending_writes(&self) -> usize {
        self.deferred.try_borrow().map_or(0, |queue| queue.len())
    }

    /// Run every queued write. Returns how many ran.
    ///
    /// The caller must not hold a registry borrow.
    pub(crate) fn apply_deferred(&self) -> usize {
        let queued = std::mem::take(&mut *self.deferred.borrow_mut());
        if queued.is_empty() {
            return 0;
        }
        let count = queued.len();
        let mut registry = self.registry.borrow_mut();
        for op in queued {
            op(&mut registry);
        }
        debug!(writes = count, "applied deferred component writes");
        count
    }
}

impl fmt::Debug for SharedRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedRegistry")
            .field("registry", &self.registry)
            .field("deferred", &self.pending_writes())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
