use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::AddAssign;

use crate::config::HashConfig;
use crate::error::{CollectionError, Result};
use crate::hash::iter::{IntoIter, Iter, IterMut, Keys, Values, ValuesMut};
use crate::hash::raw::{unwrap_growth, RawTable};
use crate::hashing::{phi_mix, DefaultStrategy, HashKey, HashStrategy};
use crate::lookup::Lookup;

/// Open-addressing hash map with linear probing and optional Robin-Hood
/// displacement.
///
/// Keys hash through `S` (by default [`HashKey`]); each instance perturbs hashes
/// with its own random seed, so iteration order differs between instances even
/// for identical contents.
pub struct HashMap<K, V, S = DefaultStrategy> {
    pub(crate) table: RawTable<K, V, S>,
}

// =============================================================================
// Construction
// =============================================================================

impl<K: HashKey, V> HashMap<K, V> {
    /// Empty map with the default configuration.
    pub fn new() -> Self {
        Self::with_strategy(DefaultStrategy)
    }

    /// Empty map that holds `expected_elements` without growing.
    ///
    /// # Panics
    ///
    /// If `expected_elements` exceeds the maximum capacity.
    pub fn with_capacity(expected_elements: usize) -> Self {
        unwrap_growth(Self::with_config(
            HashConfig::default().with_initial_capacity(expected_elements),
        ))
    }

    pub fn with_config(config: HashConfig) -> Result<Self> {
        Self::with_config_and_strategy(config, DefaultStrategy)
    }

    /// Builds a map from parallel key and value arrays. Later duplicates win.
    pub fn from_arrays(keys: Vec<K>, values: Vec<V>) -> Result<Self> {
        if keys.len() != values.len() {
            return Err(CollectionError::invalid_configuration(format!(
                "key and value arrays differ in length: {} != {}",
                keys.len(),
                values.len()
            )));
        }
        let mut map = Self::with_config(HashConfig::default().with_initial_capacity(keys.len()))?;
        for (k, v) in keys.into_iter().zip(values) {
            map.try_insert(k, v)?;
        }
        Ok(map)
    }
}

impl<K, V, S: HashStrategy<K>> HashMap<K, V, S> {
    /// Empty map hashing through `strategy`.
    ///
    /// # Panics
    ///
    /// If the default-sized buffers cannot be allocated.
    pub fn with_strategy(strategy: S) -> Self {
        unwrap_growth(Self::with_config_and_strategy(HashConfig::default(), strategy))
    }

    pub fn with_config_and_strategy(config: HashConfig, strategy: S) -> Result<Self> {
        Ok(Self {
            table: RawTable::new(&config, strategy)?,
        })
    }

    // =========================================================================
    // Point operations
    // =========================================================================

    /// Inserts or replaces, returning the previous value.
    ///
    /// # Panics
    ///
    /// If the map must grow past its maximum capacity or the allocator refuses
    /// the new buffers. [`try_insert`](Self::try_insert) reports this instead.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        unwrap_growth(self.table.insert(key, value))
    }

    /// Fallible [`insert`](Self::insert). On error the map is unchanged.
    pub fn try_insert(&mut self, key: K, value: V) -> Result<Option<V>> {
        self.table.insert(key, value)
    }

    #[inline]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.table.get(key)
    }

    #[inline]
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.table.get_mut(key)
    }

    #[inline]
    pub fn get_key_value(&self, key: &K) -> Option<(&K, &V)> {
        self.table.get_key_value(key)
    }

    #[inline]
    pub fn contains_key(&self, key: &K) -> bool {
        self.table.contains(key)
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.table.remove(key).map(|(_, v)| v)
    }

    pub fn remove_entry(&mut self, key: &K) -> Option<(K, V)> {
        self.table.remove(key)
    }

    /// Inserts only if `key` is absent. Returns whether the map changed.
    pub fn put_if_absent(&mut self, key: K, value: V) -> bool {
        if self.contains_key(&key) {
            return false;
        }
        self.insert(key, value);
        true
    }

    /// Stores `put_value` if `key` is absent, otherwise adds `increment` to the
    /// existing value. Returns the value now stored.
    pub fn put_or_add(&mut self, key: K, put_value: V, increment: V) -> V
    where
        V: AddAssign + Copy,
    {
        if let Some(v) = self.table.get_mut(&key) {
            *v += increment;
            return *v;
        }
        self.insert(key, put_value);
        put_value
    }

    /// Adds `increment` to the value of `key`, starting from `V::default()`.
    pub fn add_to(&mut self, key: K, increment: V) -> V
    where
        V: AddAssign + Copy + Default,
    {
        let mut start = V::default();
        start += increment;
        self.put_or_add(key, start, increment)
    }

    // =========================================================================
    // Bulk operations
    // =========================================================================

    /// Inserts every pair, returning how many keys were new.
    pub fn put_all<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) -> usize {
        let before = self.len();
        for (k, v) in iter {
            self.insert(k, v);
        }
        self.len() - before
    }

    /// Removes every key present in `other`.
    pub fn remove_all<L>(&mut self, other: &L) -> usize
    where
        L: Lookup<K> + ?Sized,
    {
        self.table.remove_if(|k, _| other.contains_key(k))
    }

    pub fn remove_if<F>(&mut self, predicate: F) -> usize
    where
        F: FnMut(&K, &V) -> bool,
    {
        self.table.remove_if(predicate)
    }

    /// Removes every entry whose value equals `value`.
    pub fn remove_values(&mut self, value: &V) -> usize
    where
        V: PartialEq,
    {
        self.table.remove_if(|_, v| v == value)
    }

    /// Keeps only the entries for which `keep` returns true.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        self.table.remove_if(|k, v| !keep(k, v));
    }

    pub fn for_each<F: FnMut(&K, &V)>(&self, mut f: F) {
        for (k, v) in self.iter() {
            f(k, v);
        }
    }

    /// Visits entries until `f` returns false. Returns whether every entry was
    /// visited.
    pub fn for_each_while<F: FnMut(&K, &V) -> bool>(&self, mut f: F) -> bool {
        self.iter().all(|(k, v)| f(k, v))
    }

    pub fn try_reserve(&mut self, additional: usize) -> Result<()> {
        self.table.try_reserve(additional)
    }

    /// # Panics
    ///
    /// If the new capacity cannot be allocated.
    pub fn reserve(&mut self, additional: usize) {
        unwrap_growth(self.table.try_reserve(additional))
    }

    /// Empties the map. Buffers are kept.
    pub fn clear(&mut self) {
        self.table.clear()
    }
}

// =============================================================================
// Views and introspection
// =============================================================================

impl<K, V, S: HashStrategy<K>> HashMap<K, V, S> {
    #[inline]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.table.len() == 0
    }

    /// Number of entries storable before the next resize.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    #[inline]
    pub fn load_factor(&self) -> f64 {
        self.table.load_factor()
    }

    #[inline]
    pub fn is_robin_hood(&self) -> bool {
        self.table.is_robin_hood()
    }

    #[inline]
    pub fn strategy(&self) -> &S {
        self.table.strategy()
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(self.table.keys(), self.table.values(), self.len())
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        let len = self.len();
        let (keys, values) = self.table.slots_mut();
        IterMut::new(keys, values, len)
    }

    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys::new(self.iter())
    }

    pub fn values(&self) -> Values<'_, K, V> {
        Values::new(self.iter())
    }

    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut::new(self.iter_mut())
    }
}

// =============================================================================
// Trait impls
// =============================================================================

impl<K: HashKey, V> Default for HashMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone, V: Clone, S: HashStrategy<K> + Clone> Clone for HashMap<K, V, S> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone_fresh(),
        }
    }
}

impl<K, V, S> PartialEq for HashMap<K, V, S>
where
    V: PartialEq,
    S: HashStrategy<K> + PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.strategy() == other.strategy()
            && self.len() == other.len()
            && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl<K, V: Eq, S: HashStrategy<K> + Eq> Eq for HashMap<K, V, S> {}

impl<K, V: Hash, S: HashStrategy<K>> Hash for HashMap<K, V, S> {
    /// Order-independent: a wrapping sum of per-entry hashes.
    fn hash<H: Hasher>(&self, state: &mut H) {
        let mut sum = 0u64;
        for (k, v) in self.iter() {
            let mut h = DefaultHasher::new();
            v.hash(&mut h);
            sum = sum
                .wrapping_add(u64::from(phi_mix(self.strategy().hash(k))))
                .wrapping_add(h.finish());
        }
        state.write_usize(self.len());
        state.write_u64(sum);
    }
}

impl<K: fmt::Display, V: fmt::Display, S: HashStrategy<K>> fmt::Display for HashMap<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, (k, v)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{k}=>{v}")?;
        }
        f.write_str("]")
    }
}

impl<K: fmt::Debug, V: fmt::Debug, S: HashStrategy<K>> fmt::Debug for HashMap<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: HashKey, V> FromIterator<(K, V)> for HashMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut map = Self::with_capacity(iter.size_hint().0);
        map.put_all(iter);
        map
    }
}

impl<K, V, S: HashStrategy<K>> Extend<(K, V)> for HashMap<K, V, S> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.put_all(iter);
    }
}

impl<K, V, S: HashStrategy<K>> Lookup<K> for HashMap<K, V, S> {
    #[inline]
    fn contains_key(&self, key: &K) -> bool {
        self.table.contains(key)
    }
}

impl<K, V, S: HashStrategy<K>> IntoIterator for HashMap<K, V, S> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> IntoIter<K, V> {
        let len = self.len();
        let (keys, values) = self.table.into_slots();
        IntoIter::new(keys, values, len)
    }
}

impl<'a, K, V, S: HashStrategy<K>> IntoIterator for &'a HashMap<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

impl<'a, K, V, S: HashStrategy<K>> IntoIterator for &'a mut HashMap<K, V, S> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> IterMut<'a, K, V> {
        self.iter_mut()
    }
}
