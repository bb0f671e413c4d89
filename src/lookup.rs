//! Membership contract used by the `remove_all` bulk operations.

/// Anything that can answer "is this key present?".
pub trait Lookup<K: ?Sized> {
    fn contains_key(&self, key: &K) -> bool;
}

impl<K: Ord> Lookup<K> for std::collections::BTreeSet<K> {
    fn contains_key(&self, key: &K) -> bool {
        self.contains(key)
    }
}

impl<K: std::hash::Hash + Eq, S: std::hash::BuildHasher> Lookup<K>
    for std::collections::HashSet<K, S>
{
    fn contains_key(&self, key: &K) -> bool {
        self.contains(key)
    }
}

impl<K: PartialEq> Lookup<K> for [K] {
    fn contains_key(&self, key: &K) -> bool {
        self.contains(key)
    }
}

impl<K: PartialEq> Lookup<K> for Vec<K> {
    fn contains_key(&self, key: &K) -> bool {
        self.as_slice().contains(key)
    }
}
