use std::fmt;
use std::hash::{Hash, Hasher};

use crate::config::HashConfig;
use crate::error::Result;
use crate::hash::iter::{IntoIter, Iter, SetIntoIter, SetIter};
use crate::hash::raw::{unwrap_growth, RawTable};
use crate::hashing::{phi_mix, DefaultStrategy, HashKey, HashStrategy};
use crate::lookup::Lookup;

/// Open-addressing hash set. Shares its engine with
/// [`HashMap`](crate::HashMap), storing unit values.
pub struct HashSet<K, S = DefaultStrategy> {
    pub(crate) table: RawTable<K, (), S>,
}

impl<K: HashKey> HashSet<K> {
    pub fn new() -> Self {
        Self::with_strategy(DefaultStrategy)
    }

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
}

impl<K, S: HashStrategy<K>> HashSet<K, S> {
    pub fn with_strategy(strategy: S) -> Self {
        unwrap_growth(Self::with_config_and_strategy(HashConfig::default(), strategy))
    }

    pub fn with_config_and_strategy(config: HashConfig, strategy: S) -> Result<Self> {
        Ok(Self {
            table: RawTable::new(&config, strategy)?,
        })
    }

    /// Adds `key`, returning true if it was not already present.
    ///
    /// # Panics
    ///
    /// If the set must grow and cannot. See [`try_add`](Self::try_add).
    pub fn add(&mut self, key: K) -> bool {
        unwrap_growth(self.try_add(key))
    }

    pub fn try_add(&mut self, key: K) -> Result<bool> {
        Ok(self.table.insert(key, ())?.is_none())
    }

    /// Adds every element, returning how many were new.
    pub fn add_all<I: IntoIterator<Item = K>>(&mut self, iter: I) -> usize {
        let before = self.len();
        for k in iter {
            self.add(k);
        }
        self.len() - before
    }

    #[inline]
    pub fn contains(&self, key: &K) -> bool {
        self.table.contains(key)
    }

    /// Returns true if `key` was present.
    pub fn remove(&mut self, key: &K) -> bool {
        self.table.remove(key).is_some()
    }

    /// Removes and returns the stored element equal to `key`.
    pub fn take(&mut self, key: &K) -> Option<K> {
        self.table.remove(key).map(|(k, _)| k)
    }

    pub fn remove_all<L>(&mut self, other: &L) -> usize
    where
        L: Lookup<K> + ?Sized,
    {
        self.table.remove_if(|k, _| other.contains_key(k))
    }

    pub fn remove_if<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&K) -> bool,
    {
        self.table.remove_if(|k, _| predicate(k))
    }

    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&K) -> bool,
    {
        self.table.remove_if(|k, _| !keep(k));
    }

    pub fn for_each<F: FnMut(&K)>(&self, f: F) {
        self.iter().for_each(f)
    }

    /// Visits elements until `f` returns false. Returns whether every element
    /// was visited.
    pub fn for_each_while<F: FnMut(&K) -> bool>(&self, f: F) -> bool {
        self.iter().all(f)
    }

    pub fn iter(&self) -> SetIter<'_, K> {
        SetIter::new(Iter::new(self.table.keys(), self.table.values(), self.len()))
    }

    pub fn to_vec(&self) -> Vec<K>
    where
        K: Clone,
    {
        self.iter().cloned().collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.table.len() == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    #[inline]
    pub fn is_robin_hood(&self) -> bool {
        self.table.is_robin_hood()
    }

    #[inline]
    pub fn strategy(&self) -> &S {
        self.table.strategy()
    }

    pub fn try_reserve(&mut self, additional: usize) -> Result<()> {
        self.table.try_reserve(additional)
    }

    pub fn clear(&mut self) {
        self.table.clear()
    }
}

impl<K: HashKey> Default for HashSet<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone, S: HashStrategy<K> + Clone> Clone for HashSet<K, S> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone_fresh(),
        }
    }
}

impl<K, S: HashStrategy<K> + PartialEq> PartialEq for HashSet<K, S> {
    fn eq(&self, other: &Self) -> bool {
        self.strategy() == other.strategy()
            && self.len() == other.len()
            && self.iter().all(|k| other.contains(k))
    }
}

impl<K, S: HashStrategy<K> + Eq> Eq for HashSet<K, S> {}

impl<K, S: HashStrategy<K>> Hash for HashSet<K, S> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let sum = self.iter().fold(0u32, |acc, k| {
            acc.wrapping_add(phi_mix(self.strategy().hash(k)))
        });
        state.write_usize(self.len());
        state.write_u32(sum);
    }
}

impl<K: fmt::Display, S: HashStrategy<K>> fmt::Display for HashSet<K, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, k) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{k}")?;
        }
        f.write_str("]")
    }
}

impl<K: fmt::Debug, S: HashStrategy<K>> fmt::Debug for HashSet<K, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<K: HashKey> FromIterator<K> for HashSet<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut set = Self::with_capacity(iter.size_hint().0);
        set.add_all(iter);
        set
    }
}

impl<K, S: HashStrategy<K>> Extend<K> for HashSet<K, S> {
    fn extend<I: IntoIterator<Item = K>>(&mut self, iter: I) {
        self.add_all(iter);
    }
}

impl<K, S: HashStrategy<K>> Lookup<K> for HashSet<K, S> {
    #[inline]
    fn contains_key(&self, key: &K) -> bool {
        self.contains(key)
    }
}

impl<K, S: HashStrategy<K>> IntoIterator for HashSet<K, S> {
    type Item = K;
    type IntoIter = SetIntoIter<K>;

    fn into_iter(self) -> SetIntoIter<K> {
        let len = self.len();
        let (keys, values) = self.table.into_slots();
        SetIntoIter::new(IntoIter::new(keys, values, len))
    }
}

impl<'a, K, S: HashStrategy<K>> IntoIterator for &'a HashSet<K, S> {
    type Item = &'a K;
    type IntoIter = SetIter<'a, K>;

    fn into_iter(self) -> SetIter<'a, K> {
        self.iter()
    }
}
