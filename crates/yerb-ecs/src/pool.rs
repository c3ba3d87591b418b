//! Sparse-set component storage.
//!
//! A [`ComponentPool`] keeps one value of a single component type per entity.
//! Three arrays stay in lockstep:
//!
//! - `sparse`: entity index -> dense slot (or [`ABSENT`])
//! - `dense_ids`: dense slot -> owning [`EntityId`]
//! - `dense`: dense slot -> component value
//!
//! `sparse[id] == k` holds exactly when `dense_ids[k] == id`, in which case
//! `dense[k]` is the value stored for `id`. Removal swap-removes the dense slot
//! and re-points the sparse entry of whichever element moved into the hole.

use crate::entity::EntityId;

/// Sparse-array sentinel for "no value stored for this entity".
pub const ABSENT: usize = usize::MAX;

// ---------------------------------------------------------------------------
// ComponentPool
// ---------------------------------------------------------------------------

/// Sparse-set store of one component type, keyed by [`EntityId`].
///
/// Lookup, insertion and removal are O(1) (amortized for insertion). Values
/// are packed contiguously in [`dense`](Self::dense) for bulk iteration; the
/// order of that slice is not stable across removals.
#[derive(Debug, Clone)]
pub struct ComponentPool<T> {
    sparse: Vec<usize>,
    dense_ids: Vec<EntityId>,
    dense: Vec<T>,
}

impl<T> ComponentPool<T> {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self {
            sparse: Vec::new(),
            dense_ids: Vec::new(),
            dense: Vec::new(),
        }
    }

    /// Dense slot for `id`, if present.
    #[inline]
    fn slot(&self, id: EntityId) -> Option<usize> {
        match self.sparse.get(id.index()) {
            Some(&slot) if slot != ABSENT => Some(slot),
            _ => None,
        }
    }

    /// Whether `id` currently has a stored value.
    #[inline]
    pub fn contains(&self, id: EntityId) -> bool {
        self.slot(id).is_some()
    }

    /// Number of stored values.
    #[inline]
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    /// Whether the pool holds no values.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    /// Drop every stored value and forget every mapping.
    pub fn clear(&mut self) {
        self.sparse.clear();
        self.dense_ids.clear();
        self.dense.clear();
    }

    /// Grow the sparse array to at least `len` entries. Never shrinks.
    pub fn resize_sparse(&mut self, len: usize) {
        if len > self.sparse.len() {
            self.sparse.resize(len, ABSENT);
        }
    }

    /// Reserve room for `additional` more values in the dense arrays.
    pub fn reserve_dense(&mut self, additional: usize) {
        self.dense.reserve(additional);
        self.dense_ids.reserve(additional);
    }

    /// Append `value` for `id`, which must not be present.
    fn push(&mut self, id: EntityId, value: T) -> usize {
        self.resize_sparse(id.index() + 1);
        let slot = self.dense.len();
        self.sparse[id.index()] = slot;
        self.dense_ids.push(id);
        self.dense.push(value);
        slot
    }

    /// Store `value` for `id` unless a value is already present.
    ///
    /// First write wins: when `id` already has a value the pool is left
    /// untouched, `value` is dropped and the existing value is returned.
    pub fn insert_if_absent(&mut self, id: EntityId, value: T) -> &mut T {
        let slot = match self.slot(id) {
            Some(slot) => slot,
            None => self.push(id, value),
        };
        &mut self.dense[slot]
    }

    /// Store `value` for `id`, replacing any existing value.
    ///
    /// Returns the replaced value, if there was one.
    pub fn insert(&mut self, id: EntityId, value: T) -> Option<T> {
        match self.slot(id) {
            Some(slot) => Some(std::mem::replace(&mut self.dense[slot], value)),
            None => {
                self.push(id, value);
                None
            }
        }
    }

    /// Remove and return the value stored for `id`.
    ///
    /// Returns `None` when `id` has no value, including ids past the end of
    /// the sparse array (which is never grown by a removal).
    pub fn remove(&mut self, id: EntityId) -> Option<T> {
        let slot = self.slot(id)?;
        let last = self.dense.len() - 1;

        let value = self.dense.swap_remove(slot);
        self.dense_ids.swap_remove(slot);
        if slot != last {
            let moved = self.dense_ids[slot];
            self.sparse[moved.index()] = slot;
        }
        self.sparse[id.index()] = ABSENT;
        Some(value)
    }

    /// Shared reference to the value stored for `id`.
    #[inline]
    pub fn get(&self, id: EntityId) -> Option<&T> {
        self.slot(id).map(|slot| &self.dense[slot])
    }

    /// Mutable reference to the value stored for `id`.
    #[inline]
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut T> {
        let slot = self.slot(id)?;
        Some(&mut self.dense[slot])
    }

    /// All stored values, densely packed.
    pub fn dense(&self) -> &[T] {
        &self.dense
    }

    /// All stored values, densely packed, mutably.
    ///
    /// Only the values are exposed; the id arrays cannot be reordered.
    pub fn dense_mut(&mut self) -> &mut [T] {
        &mut self.dense
    }

    /// Owning entity of each slot in [`dense`](Self::dense).
    pub fn dense_ids(&self) -> &[EntityId] {
        &self.dense_ids
    }

    /// `(entity, value)` pairs in dense order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.dense_ids.iter().copied().zip(self.dense.iter())
    }

    /// Length of the sparse array (one past the largest addressable index).
    pub fn sparse_len(&self) -> usize {
        self.sparse.len()
    }
}

impl<T> Default for ComponentPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
