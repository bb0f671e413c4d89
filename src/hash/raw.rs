//! Open-addressing engine shared by [`HashMap`](super::HashMap) and
//! [`HashSet`](super::HashSet).
//!
//! Linear probing over a power-of-two buffer, with optional Robin-Hood
//! displacement. In Robin-Hood mode `probe_cache[i]` holds the ideal slot of
//! the key stored at `i`, so the probe distance of any occupant is one
//! subtraction away and never requires rehashing the key.
//!
//! Deletion is backward-shift: no tombstones are ever left behind.

use std::collections::TryReserveError;
use std::mem;

use crate::config::{Config, HashConfig};
use crate::error::{CollectionError, Result};
use crate::hashing::{self, mix32, HashStrategy};

/// Panics with the error message, as `std` collections do when they cannot
/// grow.
pub(crate) fn unwrap_growth<T>(result: Result<T>) -> T {
    match result {
        Ok(v) => v,
        Err(e) => panic!("{e}"),
    }
}

/// Freshly allocated backing arrays, not yet attached to a table.
struct Buffers<K, V> {
    keys: Vec<Option<K>>,
    values: Vec<Option<V>>,
    probe_cache: Vec<u32>,
}

fn try_allocate<K, V>(
    capacity: usize,
    robin_hood: bool,
) -> std::result::Result<Buffers<K, V>, TryReserveError> {
    let mut keys = Vec::new();
    keys.try_reserve_exact(capacity)?;
    keys.resize_with(capacity, || None);

    let mut values = Vec::new();
    values.try_reserve_exact(capacity)?;
    values.resize_with(capacity, || None);

    let mut probe_cache = Vec::new();
    if robin_hood {
        probe_cache.try_reserve_exact(capacity)?;
        probe_cache.resize(capacity, 0);
    }

    Ok(Buffers {
        keys,
        values,
        probe_cache,
    })
}

pub(crate) struct RawTable<K, V, S> {
    /// Hash-indexed keys; `None` marks an empty slot.
    keys: Vec<Option<K>>,
    /// Values, index-aligned with `keys`.
    values: Vec<Option<V>>,
    /// Ideal slot of each occupied index. Empty unless `robin_hood`.
    probe_cache: Vec<u32>,
    /// Number of occupied slots.
    assigned: usize,
    /// Grow when `assigned` would exceed this.
    resize_at: usize,
    load_factor: f64,
    robin_hood: bool,
    /// Per-instance hash perturbation.
    perturbation: u32,
    strategy: S,
}

impl<K, V, S: HashStrategy<K>> RawTable<K, V, S> {
    pub(crate) fn new(config: &HashConfig, strategy: S) -> Result<Self> {
        config.validate()?;
        let capacity = hashing::min_buffer_size(config.initial_capacity, config.load_factor)?;
        let buffers = try_allocate(capacity, config.robin_hood).map_err(|_| {
            log::warn!("refused initial allocation of {capacity} slots");
            CollectionError::out_of_memory(0, capacity)
        })?;
        Ok(Self::from_buffers(
            buffers,
            config.load_factor,
            config.robin_hood,
            strategy,
        ))
    }

    fn from_buffers(buffers: Buffers<K, V>, load_factor: f64, robin_hood: bool, strategy: S) -> Self {
        let capacity = buffers.keys.len();
        Self {
            keys: buffers.keys,
            values: buffers.values,
            probe_cache: buffers.probe_cache,
            assigned: 0,
            resize_at: hashing::resize_threshold(capacity, load_factor),
            load_factor,
            robin_hood,
            perturbation: hashing::random_perturbation(),
            strategy,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.assigned
    }

    /// Elements storable before the next resize.
    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.resize_at
    }

    #[inline]
    pub(crate) fn load_factor(&self) -> f64 {
        self.load_factor
    }

    #[inline]
    pub(crate) fn is_robin_hood(&self) -> bool {
        self.robin_hood
    }

    #[inline]
    pub(crate) fn strategy(&self) -> &S {
        &self.strategy
    }

    #[inline]
    pub(crate) fn keys(&self) -> &[Option<K>] {
        &self.keys
    }

    #[inline]
    pub(crate) fn values(&self) -> &[Option<V>] {
        &self.values
    }

    #[inline]
    pub(crate) fn slots_mut(&mut self) -> (&[Option<K>], &mut [Option<V>]) {
        (&self.keys, &mut self.values)
    }

    #[inline]
    pub(crate) fn into_slots(self) -> (Vec<Option<K>>, Vec<Option<V>>) {
        (self.keys, self.values)
    }

    // =========================================================================
    // Probing
    // =========================================================================

    #[inline]
    fn mask(&self) -> usize {
        self.keys.len() - 1
    }

    #[inline]
    fn ideal_slot(&self, key: &K) -> usize {
        (mix32(self.strategy.hash(key) ^ self.perturbation) as usize) & self.mask()
    }

    /// Distance of the occupant of `slot` from its ideal slot.
    #[inline]
    fn probe_distance(&self, slot: usize) -> usize {
        debug_assert!(self.robin_hood && self.keys[slot].is_some());
        slot.wrapping_sub(self.probe_cache[slot] as usize) & self.mask()
    }

    pub(crate) fn find_slot(&self, key: &K) -> Option<usize> {
        let mask = self.mask();
        let mut slot = self.ideal_slot(key);
        let mut dist = 0usize;
        loop {
            let existing = self.keys[slot].as_ref()?;
            // An occupant closer to home than we are means the key would have
            // displaced it on insertion.
            if self.robin_hood && dist > self.probe_distance(slot) {
                return None;
            }
            if self.strategy.equals(existing, key) {
                return Some(slot);
            }
            slot = (slot + 1) & mask;
            dist += 1;
        }
    }

    #[inline]
    pub(crate) fn get(&self, key: &K) -> Option<&V> {
        let slot = self.find_slot(key)?;
        self.values[slot].as_ref()
    }

    #[inline]
    pub(crate) fn get_key_value(&self, key: &K) -> Option<(&K, &V)> {
        let slot = self.find_slot(key)?;
        match (&self.keys[slot], &self.values[slot]) {
            (Some(k), Some(v)) => Some((k, v)),
            _ => None,
        }
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let slot = self.find_slot(key)?;
        self.values[slot].as_mut()
    }

    #[inline]
    pub(crate) fn contains(&self, key: &K) -> bool {
        self.find_slot(key).is_some()
    }

    // =========================================================================
    // Insertion
    // =========================================================================

    /// Inserts or updates, returning the previous value.
    pub(crate) fn insert(&mut self, key: K, value: V) -> Result<Option<V>> {
        let mask = self.mask();
        let mut slot = self.ideal_slot(&key);

        // Fast path: the home slot is free or already holds the key.
        let home_occupied = match &self.keys[slot] {
            Some(existing) => {
                if self.strategy.equals(existing, &key) {
                    return Ok(self.values[slot].replace(value));
                }
                true
            }
            None => false,
        };
        if !home_occupied && self.assigned < self.resize_at {
            self.store(slot, key, value, slot as u32);
            return Ok(None);
        }

        // At the threshold the new buffers must exist before any swap below
        // moves an existing entry out of the table.
        let pending = if self.assigned == self.resize_at {
            if let Some(found) = self.find_slot(&key) {
                return Ok(self.values[found].replace(value));
            }
            Some(self.allocate_next()?)
        } else {
            None
        };

        let mut key = key;
        let mut value = value;
        let mut initial_slot = slot as u32;
        let mut dist = 0usize;

        while let Some(existing) = &self.keys[slot] {
            if self.strategy.equals(existing, &key) {
                return Ok(self.values[slot].replace(value));
            }

            if self.robin_hood {
                let existing_distance = self.probe_distance(slot);
                if dist > existing_distance {
                    self.swap_carried(slot, &mut key, &mut value, &mut initial_slot);
                    dist = existing_distance;
                }
            }

            slot = (slot + 1) & mask;
            dist += 1;
        }

        match pending {
            Some(buffers) => self.expand_and_put(buffers, key, value, slot),
            None => self.store(slot, key, value, initial_slot),
        }
        Ok(None)
    }

    #[inline]
    fn store(&mut self, slot: usize, key: K, value: V, initial_slot: u32) {
        debug_assert!(self.keys[slot].is_none());
        self.keys[slot] = Some(key);
        self.values[slot] = Some(value);
        if self.robin_hood {
            self.probe_cache[slot] = initial_slot;
        }
        self.assigned += 1;
    }

    /// Exchanges the carried entry with the occupant of `slot`.
    #[inline]
    fn swap_carried(&mut self, slot: usize, key: &mut K, value: &mut V, initial_slot: &mut u32) {
        if let (Some(k), Some(v)) = (self.keys[slot].as_mut(), self.values[slot].as_mut()) {
            mem::swap(k, key);
            mem::swap(v, value);
        }
        mem::swap(&mut self.probe_cache[slot], initial_slot);
    }

    /// Places a key known to be absent. Does not touch `assigned`.
    fn reinsert(&mut self, mut key: K, mut value: V) {
        let mask = self.mask();
        let mut slot = self.ideal_slot(&key);
        let mut initial_slot = slot as u32;
        let mut dist = 0usize;

        while self.keys[slot].is_some() {
            if self.robin_hood {
                let existing_distance = self.probe_distance(slot);
                if dist > existing_distance {
                    self.swap_carried(slot, &mut key, &mut value, &mut initial_slot);
                    dist = existing_distance;
                }
            }
            slot = (slot + 1) & mask;
            dist += 1;
        }

        self.keys[slot] = Some(key);
        self.values[slot] = Some(value);
        if self.robin_hood {
            self.probe_cache[slot] = initial_slot;
        }
    }

    // =========================================================================
    // Growth
    // =========================================================================

    fn allocate(&self, capacity: usize) -> Result<Buffers<K, V>> {
        try_allocate(capacity, self.robin_hood).map_err(|_| {
            log::warn!(
                "refused buffer growth {} -> {} slots",
                self.keys.len(),
                capacity
            );
            CollectionError::out_of_memory(self.keys.len(), capacity)
        })
    }

    fn allocate_next(&self) -> Result<Buffers<K, V>> {
        let next = hashing::next_buffer_size(self.keys.len(), self.assigned, self.load_factor)?;
        self.allocate(next)
    }

    fn expand_and_put(&mut self, buffers: Buffers<K, V>, key: K, value: V, free_slot: usize) {
        debug_assert_eq!(self.assigned, self.resize_at);

        // The pending entry joins the old table, then everything is rehashed.
        self.keys[free_slot] = Some(key);
        self.values[free_slot] = Some(value);
        self.assigned += 1;

        self.rehash_into(buffers);
    }

    /// Moves every entry into `buffers`, walking the old arrays from the
    /// highest slot down to keep the new conflict chains short.
    fn rehash_into(&mut self, buffers: Buffers<K, V>) {
        let old_len = self.keys.len();
        let old_keys = mem::replace(&mut self.keys, buffers.keys);
        let old_values = mem::replace(&mut self.values, buffers.values);
        self.probe_cache = buffers.probe_cache;
        self.resize_at = hashing::resize_threshold(self.keys.len(), self.load_factor);

        log::debug!(
            "hash table grown {} -> {} slots ({} entries)",
            old_len,
            self.keys.len(),
            self.assigned
        );

        for (k, v) in old_keys.into_iter().zip(old_values).rev() {
            if let (Some(k), Some(v)) = (k, v) {
                self.reinsert(k, v);
            }
        }
    }

    /// Grows so that `additional` more entries fit without a resize.
    pub(crate) fn try_reserve(&mut self, additional: usize) -> Result<()> {
        let needed = self.assigned.saturating_add(additional);
        if needed <= self.resize_at {
            return Ok(());
        }
        let capacity = hashing::min_buffer_size(needed, self.load_factor)
            .map_err(|_| CollectionError::out_of_memory(self.keys.len(), hashing::MAX_CAPACITY * 2))?;
        let buffers = self.allocate(capacity)?;
        self.rehash_into(buffers);
        Ok(())
    }

    // =========================================================================
    // Removal
    // =========================================================================

    pub(crate) fn remove(&mut self, key: &K) -> Option<(K, V)> {
        let slot = self.find_slot(key)?;
        self.remove_slot(slot)
    }

    fn remove_slot(&mut self, slot: usize) -> Option<(K, V)> {
        let key = self.keys[slot].take();
        let value = self.values[slot].take();
        self.assigned -= 1;
        self.shift_conflicting_keys(slot);
        key.zip(value)
    }

    /// Backward-shift deletion: closes the gap at `gap` by pulling forward every
    /// following entry whose probe chain passes through the gap.
    fn shift_conflicting_keys(&mut self, mut gap: usize) {
        let mask = self.mask();
        let mut distance = 0usize;
        loop {
            distance += 1;
            let slot = (gap + distance) & mask;
            let ideal = match &self.keys[slot] {
                None => break,
                Some(existing) if self.robin_hood => {
                    debug_assert_eq!(self.probe_cache[slot] as usize, self.ideal_slot(existing));
                    self.probe_cache[slot] as usize
                }
                Some(existing) => self.ideal_slot(existing),
            };

            let shift = slot.wrapping_sub(ideal) & mask;
            if shift >= distance {
                // The entry's ideal slot is at or before the gap: move it.
                self.keys[gap] = self.keys[slot].take();
                self.values[gap] = self.values[slot].take();
                if self.robin_hood {
                    self.probe_cache[gap] = self.probe_cache[slot];
                }
                gap = slot;
                distance = 0;
            }
        }
        self.keys[gap] = None;
        self.values[gap] = None;
    }

    /// Removes every entry matching `predicate`. The scan index does not
    /// advance after a removal: the shifted-in entry is tested next.
    pub(crate) fn remove_if<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&K, &V) -> bool,
    {
        let before = self.assigned;
        let mut i = 0;
        while i < self.keys.len() {
            let hit = match (&self.keys[i], &self.values[i]) {
                (Some(k), Some(v)) => predicate(k, v),
                _ => false,
            };
            if hit {
                self.remove_slot(i);
            } else {
                i += 1;
            }
        }
        before - self.assigned
    }

    /// Empties the table without releasing its buffers.
    pub(crate) fn clear(&mut self) {
        self.keys.iter_mut().for_each(|k| *k = None);
        self.values.iter_mut().for_each(|v| *v = None);
        self.assigned = 0;
    }

    /// Copy with a fresh perturbation: entries are re-inserted, never copied
    /// slot-for-slot.
    pub(crate) fn clone_fresh(&self) -> Self
    where
        K: Clone,
        V: Clone,
        S: Clone,
    {
        let capacity = self.keys.len();
        let mut keys = Vec::with_capacity(capacity);
        keys.resize_with(capacity, || None);
        let mut values = Vec::with_capacity(capacity);
        values.resize_with(capacity, || None);
        let probe_cache = if self.robin_hood {
            vec![0u32; capacity]
        } else {
            Vec::new()
        };

        let mut cloned = Self::from_buffers(
            Buffers {
                keys,
                values,
                probe_cache,
            },
            self.load_factor,
            self.robin_hood,
            self.strategy.clone(),
        );
        for (k, v) in self.keys.iter().zip(&self.values).rev() {
            if let (Some(k), Some(v)) = (k, v) {
                cloned.reinsert(k.clone(), v.clone());
            }
        }
        cloned.assigned = self.assigned;
        cloned
    }
}

// =============================================================================
// Test support
// =============================================================================

#[cfg(test)]
impl<K, V, S: HashStrategy<K>> RawTable<K, V, S> {
    pub(crate) fn slot_count(&self) -> usize {
        self.keys.len()
    }

    pub(crate) fn perturbation(&self) -> u32 {
        self.perturbation
    }

    /// Probe distance of every occupied slot, recomputed from the hash.
    pub(crate) fn probe_distances(&self) -> Vec<usize> {
        let mask = self.mask();
        self.keys
            .iter()
            .enumerate()
            .filter_map(|(i, k)| k.as_ref().map(|k| i.wrapping_sub(self.ideal_slot(k)) & mask))
            .collect()
    }

    /// Panics if any structural invariant is broken.
    pub(crate) fn validate(&self) {
        let mask = self.mask();
        assert!(self.keys.len().is_power_of_two());
        assert_eq!(self.keys.len(), self.values.len());
        assert!(self.assigned <= self.resize_at, "assigned past threshold");
        assert!(self.resize_at < self.keys.len(), "no guaranteed empty slot");
        if self.robin_hood {
            assert_eq!(self.probe_cache.len(), self.keys.len());
        }

        let mut occupied = 0usize;
        for (i, k) in self.keys.iter().enumerate() {
            assert_eq!(k.is_some(), self.values[i].is_some(), "key/value occupancy mismatch at {i}");
            let Some(k) = k else { continue };
            occupied += 1;

            let ideal = self.ideal_slot(k);
            if self.robin_hood {
                assert_eq!(self.probe_cache[i] as usize, ideal, "stale probe cache at {i}");
            }
            // Linear probing: every slot between home and here is occupied.
            let mut s = ideal;
            while s != i {
                assert!(self.keys[s].is_some(), "hole in probe chain of slot {i} at {s}");
                s = (s + 1) & mask;
            }
            assert_eq!(self.find_slot(k), Some(i), "key at {i} not reachable");
        }
        assert_eq!(occupied, self.assigned);
    }
}
