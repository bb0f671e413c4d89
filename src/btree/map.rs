use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::Rev;
use std::mem;
use std::sync::Arc;

use crate::btree::comparator::{Comparator, NaturalOrder};
use crate::btree::iter::{Iter, Keys, Range, Values};
use crate::btree::node::{node_capacity, Arena, Internal, Leaf, Node, NodeId, Pos, NIL};
use crate::config::{Config, TreeConfig};
use crate::error::Result;
use crate::lookup::Lookup;

/// Internal nodes visited on the way down, with the child index taken at each.
type Path = Vec<(NodeId, usize)>;

/// Removals of at most this many equal keys go through the single-entry path
/// instead of a range sweep.
const POINT_REMOVAL_LIMIT: usize = 2;

/// Ordered map backed by a B+tree with linked leaves.
///
/// Keys are ordered by `C`. In multimap mode equal keys coexist and a forward
/// scan meets them newest-first; [`get`](Self::get) and
/// [`remove`](Self::remove) act on the newest.
///
/// Every non-root node stays at least half full. Range removals compact leaves
/// in place and rebuild the tree bottom-up if any leaf drops below that bound.
pub struct BPlusTreeMap<K, V, C = NaturalOrder> {
    arena: Arena<K, V>,
    root: NodeId,
    /// Leftmost and rightmost leaves: the min and max keys live there.
    head: NodeId,
    tail: NodeId,
    len: usize,
    /// Levels including the leaf level.
    height: usize,
    /// Max entries per leaf and max keys per internal node.
    capacity: usize,
    multimap: bool,
    comparator: Arc<C>,
}

// =============================================================================
// Construction
// =============================================================================

impl<K: Ord, V> BPlusTreeMap<K, V> {
    pub fn new() -> Self {
        Self::build(TreeConfig::default(), Arc::new(NaturalOrder))
    }

    /// Empty map that keeps entries with equal keys.
    pub fn new_multimap() -> Self {
        Self::build(TreeConfig::default().with_multimap(true), Arc::new(NaturalOrder))
    }

    pub fn with_config(config: TreeConfig) -> Result<Self> {
        Self::with_comparator(config, NaturalOrder)
    }
}

impl<K, V, C: Comparator<K>> BPlusTreeMap<K, V, C> {
    pub fn with_comparator(config: TreeConfig, comparator: C) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config, Arc::new(comparator)))
    }

    fn build(config: TreeConfig, comparator: Arc<C>) -> Self {
        let capacity = node_capacity::<K>();
        let mut arena = Arena::with_capacity(config.initial_capacity / (capacity / 2) + 1);
        let root = arena.alloc(Node::Leaf(Leaf::new(capacity)));
        Self {
            arena,
            root,
            head: root,
            tail: root,
            len: 0,
            height: 1,
            capacity,
            multimap: config.multimap,
            comparator,
        }
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn is_multimap(&self) -> bool {
        self.multimap
    }

    #[inline]
    pub fn comparator(&self) -> &C {
        &self.comparator
    }

    /// Levels from root to leaves; `1` while the root is a leaf.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    fn min_occupancy(&self) -> usize {
        self.capacity / 2
    }

    // =========================================================================
    // Search
    // =========================================================================

    #[inline]
    fn cmp(&self, a: &K, b: &K) -> Ordering {
        self.comparator.compare(a, b)
    }

    /// First index whose key is `>= key`, or `> key` when `upper`.
    #[inline]
    fn search(&self, keys: &[K], key: &K, upper: bool) -> usize {
        keys.partition_point(|candidate| match self.cmp(candidate, key) {
            Ordering::Less => true,
            Ordering::Equal => upper,
            Ordering::Greater => false,
        })
    }

    /// Leaf and in-leaf index of the bound. The index may equal the leaf
    /// length when the bound lies in the next leaf.
    fn locate(&self, key: &K, upper: bool) -> (NodeId, usize) {
        let mut node = self.root;
        for _ in 1..self.height {
            let internal = self.arena.internal(node);
            node = internal.children[self.search(&internal.keys, key, upper)];
        }
        (node, self.search(&self.arena.leaf(node).keys, key, upper))
    }

    fn locate_with_path(&self, key: &K, path: &mut Path) -> (NodeId, usize) {
        let mut node = self.root;
        for _ in 1..self.height {
            let internal = self.arena.internal(node);
            let child = self.search(&internal.keys, key, false);
            path.push((node, child));
            node = internal.children[child];
        }
        (node, self.search(&self.arena.leaf(node).keys, key, false))
    }

    /// Steps `path` to the next leaf to the right, returning it.
    fn advance_path(&self, path: &mut Path) -> Option<NodeId> {
        let depth = path.len();
        while let Some(&(node, child)) = path.last() {
            let children = &self.arena.internal(node).children;
            if child + 1 < children.len() {
                let mut next = children[child + 1];
                let top = path.len() - 1;
                path[top].1 = child + 1;
                while path.len() < depth {
                    path.push((next, 0));
                    next = self.arena.internal(next).children[0];
                }
                return Some(next);
            }
            path.pop();
        }
        None
    }

    #[inline]
    fn lower_bound(&self, key: &K) -> Pos {
        let (leaf, idx) = self.locate(key, false);
        self.arena.normalize(leaf, idx)
    }

    #[inline]
    fn upper_bound(&self, key: &K) -> Pos {
        let (leaf, idx) = self.locate(key, true);
        self.arena.normalize(leaf, idx)
    }

    /// Position of the newest entry equal to `key`.
    fn find(&self, key: &K) -> Option<Pos> {
        let pos = self.lower_bound(key);
        if pos.is_end() {
            return None;
        }
        let found = &self.arena.leaf(pos.leaf).keys[pos.idx];
        (self.cmp(found, key) == Ordering::Equal).then_some(pos)
    }

    /// Normalized `[front, back)` for a key range. Empty if `lower > upper`.
    fn range_bounds(&self, lower: &K, upper: &K, inclusive: bool) -> (Pos, Pos) {
        if self.cmp(lower, upper) == Ordering::Greater {
            return (Pos::END, Pos::END);
        }
        let front = self.lower_bound(lower);
        let back = if inclusive {
            self.upper_bound(upper)
        } else {
            self.lower_bound(upper)
        };
        (front, back)
    }

    // =========================================================================
    // Point queries
    // =========================================================================

    pub fn get(&self, key: &K) -> Option<&V> {
        let pos = self.find(key)?;
        Some(&self.arena.leaf(pos.leaf).values[pos.idx])
    }

    pub fn get_key_value(&self, key: &K) -> Option<(&K, &V)> {
        let pos = self.find(key)?;
        let leaf = self.arena.leaf(pos.leaf);
        Some((&leaf.keys[pos.idx], &leaf.values[pos.idx]))
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let pos = self.find(key)?;
        Some(&mut self.arena.leaf_mut(pos.leaf).values[pos.idx])
    }

    #[inline]
    pub fn contains_key(&self, key: &K) -> bool {
        self.find(key).is_some()
    }

    /// Number of entries equal to `key`: at most one unless multimap.
    pub fn count(&self, key: &K) -> usize {
        self.count_range(key, key, true)
    }

    pub fn first(&self) -> Option<(&K, &V)> {
        if self.len == 0 {
            return None;
        }
        let leaf = self.arena.leaf(self.head);
        Some((&leaf.keys[0], &leaf.values[0]))
    }

    pub fn last(&self) -> Option<(&K, &V)> {
        if self.len == 0 {
            return None;
        }
        let leaf = self.arena.leaf(self.tail);
        let i = leaf.len() - 1;
        Some((&leaf.keys[i], &leaf.values[i]))
    }

    #[inline]
    pub fn min_key(&self) -> Option<&K> {
        self.first().map(|(k, _)| k)
    }

    #[inline]
    pub fn max_key(&self) -> Option<&K> {
        self.last().map(|(k, _)| k)
    }

    // =========================================================================
    // Iteration
    // =========================================================================

    pub fn iter(&self) -> Iter<'_, K, V> {
        let front = self.arena.normalize(self.head, 0);
        Iter::new(Range::new(&self.arena, self.tail, front, Pos::END), self.len)
    }

    pub fn reversed_iter(&self) -> Rev<Iter<'_, K, V>> {
        self.iter().rev()
    }

    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys::new(self.iter())
    }

    pub fn values(&self) -> Values<'_, K, V> {
        Values::new(self.iter())
    }

    /// Entries with `lower <= key < upper`, or `<= upper` when `inclusive`.
    pub fn range_iter(&self, lower: &K, upper: &K, inclusive: bool) -> Range<'_, K, V> {
        let (front, back) = self.range_bounds(lower, upper, inclusive);
        Range::new(&self.arena, self.tail, front, back)
    }

    pub fn reversed_range_iter(&self, lower: &K, upper: &K, inclusive: bool) -> Rev<Range<'_, K, V>> {
        self.range_iter(lower, upper, inclusive).rev()
    }

    pub fn for_each<F: FnMut(&K, &V)>(&self, mut f: F) {
        for (k, v) in self.iter() {
            f(k, v);
        }
    }

    /// Visits entries in order until `f` returns false. Returns whether every
    /// entry was visited.
    pub fn for_each_while<F: FnMut(&K, &V) -> bool>(&self, mut f: F) -> bool {
        self.iter().all(|(k, v)| f(k, v))
    }

    pub fn count_range(&self, lower: &K, upper: &K, inclusive: bool) -> usize {
        let (front, back) = self.range_bounds(lower, upper, inclusive);
        self.arena.count_between(front, back)
    }

    pub fn count_range_if<F>(&self, lower: &K, upper: &K, inclusive: bool, mut predicate: F) -> usize
    where
        F: FnMut(&K, &V) -> bool,
    {
        self.range_iter(lower, upper, inclusive)
            .filter(|(k, v)| predicate(k, v))
            .count()
    }

    pub fn for_each_in_range<F>(&self, lower: &K, upper: &K, inclusive: bool, mut f: F)
    where
        F: FnMut(&K, &V),
    {
        for (k, v) in self.range_iter(lower, upper, inclusive) {
            f(k, v);
        }
    }

    /// Returns whether the whole range was visited.
    pub fn for_each_in_range_while<F>(&self, lower: &K, upper: &K, inclusive: bool, mut f: F) -> bool
    where
        F: FnMut(&K, &V) -> bool,
    {
        self.range_iter(lower, upper, inclusive).all(|(k, v)| f(k, v))
    }

    /// Resets to a single empty leaf. The arena allocation is kept.
    pub fn clear(&mut self) {
        self.arena.clear();
        let root = self.arena.alloc(Node::Leaf(Leaf::new(self.capacity)));
        self.root = root;
        self.head = root;
        self.tail = root;
        self.len = 0;
        self.height = 1;
    }
}

// =============================================================================
// Mutation
// =============================================================================

impl<K: Clone, V, C: Comparator<K>> BPlusTreeMap<K, V, C> {
    /// Unique map: inserts or replaces, returning the previous value.
    /// Multimap: adds the entry ahead of any equal keys and returns `None`.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let mut path = Vec::with_capacity(self.height);
        let (leaf, idx) = self.locate_with_path(&key, &mut path);

        if !self.multimap {
            let pos = self.arena.normalize(leaf, idx);
            if !pos.is_end() && self.cmp(&self.arena.leaf(pos.leaf).keys[pos.idx], &key) == Ordering::Equal {
                let slot = &mut self.arena.leaf_mut(pos.leaf).values[pos.idx];
                return Some(mem::replace(slot, value));
            }
        }

        self.insert_at(path, leaf, idx, key, value);
        None
    }

    /// Inserts only when no entry equals `key`. Returns whether the map changed.
    pub fn put_if_absent(&mut self, key: K, value: V) -> bool {
        if self.contains_key(&key) {
            return false;
        }
        self.insert(key, value);
        true
    }

    /// Inserts every pair, returning how many entries were added.
    pub fn put_all<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) -> usize {
        let before = self.len;
        for (k, v) in iter {
            self.insert(k, v);
        }
        self.len - before
    }

    fn insert_at(&mut self, path: Path, leaf: NodeId, idx: usize, key: K, value: V) {
        let l = self.arena.leaf_mut(leaf);
        l.keys.insert(idx, key);
        l.values.insert(idx, value);
        let overflow = l.len() > self.capacity;
        self.len += 1;

        if overflow {
            let (separator, right) = self.split_leaf(leaf);
            self.insert_separator(path, leaf, separator, right);
        }
    }

    /// Moves the upper half of `leaf` into a new right sibling. Returns the
    /// separator and the sibling.
    fn split_leaf(&mut self, leaf: NodeId) -> (K, NodeId) {
        let capacity = self.capacity;
        let l = self.arena.leaf_mut(leaf);
        let mid = l.len() / 2;

        let mut right = Leaf::new(capacity);
        right.keys.extend(l.keys.drain(mid..));
        right.values.extend(l.values.drain(mid..));
        right.prev = leaf;
        right.next = l.next;
        let old_next = l.next;
        let separator = right.keys[0].clone();

        let right_id = self.arena.alloc(Node::Leaf(right));
        self.arena.leaf_mut(leaf).next = right_id;
        if old_next == NIL {
            self.tail = right_id;
        } else {
            self.arena.leaf_mut(old_next).prev = right_id;
        }
        (separator, right_id)
    }

    /// Moves the upper half of `node` into a new right sibling, promoting the
    /// median key.
    fn split_internal(&mut self, node: NodeId) -> (K, NodeId) {
        let n = self.arena.internal_mut(node);
        let mid = n.keys.len() / 2;
        let mut right_keys = n.keys.split_off(mid);
        let promoted = right_keys.remove(0);
        let right_children = n.children.split_off(mid + 1);

        let right = self.arena.alloc(Node::Internal(Internal {
            keys: right_keys,
            children: right_children,
        }));
        (promoted, right)
    }

    fn insert_separator(&mut self, mut path: Path, mut left: NodeId, mut separator: K, mut right: NodeId) {
        loop {
            let Some((parent, child)) = path.pop() else {
                let mut keys = Vec::with_capacity(self.capacity + 1);
                keys.push(separator);
                let mut children = Vec::with_capacity(self.capacity + 2);
                children.extend([left, right]);
                self.root = self.arena.alloc(Node::Internal(Internal { keys, children }));
                self.height += 1;
                log::trace!("B+tree root split, height now {}", self.height);
                return;
            };

            let p = self.arena.internal_mut(parent);
            p.keys.insert(child, separator);
            p.children.insert(child + 1, right);
            if p.keys.len() <= self.capacity {
                return;
            }
            let (promoted, sibling) = self.split_internal(parent);
            left = parent;
            separator = promoted;
            right = sibling;
        }
    }

    // =========================================================================
    // Single removal
    // =========================================================================

    /// Removes the newest entry equal to `key`.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.remove_entry(key).map(|(_, v)| v)
    }

    pub fn remove_entry(&mut self, key: &K) -> Option<(K, V)> {
        let mut path = Vec::with_capacity(self.height);
        let (mut leaf, mut idx) = self.locate_with_path(key, &mut path);
        if idx >= self.arena.leaf(leaf).len() {
            leaf = self.advance_path(&mut path)?;
            idx = 0;
        }
        if self.cmp(&self.arena.leaf(leaf).keys[idx], key) != Ordering::Equal {
            return None;
        }
        Some(self.remove_at(path, leaf, idx))
    }

    fn remove_at(&mut self, path: Path, leaf: NodeId, idx: usize) -> (K, V) {
        let l = self.arena.leaf_mut(leaf);
        let key = l.keys.remove(idx);
        let value = l.values.remove(idx);
        let remaining = l.len();
        self.len -= 1;

        if !path.is_empty() && remaining < self.min_occupancy() {
            self.rebalance_leaf(path, leaf);
        }
        (key, value)
    }

    /// Refills an underfull non-root leaf from a sibling that can spare the
    /// shortfall, or merges it with one.
    fn rebalance_leaf(&mut self, mut path: Path, leaf: NodeId) {
        let Some((parent, idx)) = path.pop() else {
            return;
        };
        let min = self.min_occupancy();
        let len = self.arena.leaf(leaf).len();
        if len >= min {
            return;
        }
        let need = min - len;
        let siblings = &self.arena.internal(parent).children;
        let left = if idx > 0 { Some(siblings[idx - 1]) } else { None };
        let right = siblings.get(idx + 1).copied();

        if let Some(left) = left.filter(|&l| self.arena.leaf(l).len() >= min + need) {
            let l = self.arena.leaf_mut(left);
            let at = l.len() - need;
            let mut keys = l.keys.split_off(at);
            let mut values = l.values.split_off(at);
            let n = self.arena.leaf_mut(leaf);
            keys.append(&mut n.keys);
            values.append(&mut n.values);
            n.keys = keys;
            n.values = values;
            let separator = n.keys[0].clone();
            self.arena.internal_mut(parent).keys[idx - 1] = separator;
            return;
        }

        if let Some(right) = right.filter(|&r| self.arena.leaf(r).len() >= min + need) {
            let r = self.arena.leaf_mut(right);
            let keys: Vec<K> = r.keys.drain(..need).collect();
            let values: Vec<V> = r.values.drain(..need).collect();
            let separator = r.keys[0].clone();
            let n = self.arena.leaf_mut(leaf);
            n.keys.extend(keys);
            n.values.extend(values);
            self.arena.internal_mut(parent).keys[idx] = separator;
            return;
        }

        match (left, right) {
            (Some(left), _) => {
                self.merge_leaves(left, leaf);
                let p = self.arena.internal_mut(parent);
                p.keys.remove(idx - 1);
                p.children.remove(idx);
            }
            (None, Some(right)) => {
                self.merge_leaves(leaf, right);
                let p = self.arena.internal_mut(parent);
                p.keys.remove(idx);
                p.children.remove(idx + 1);
            }
            (None, None) => {
                debug_assert!(false, "internal node {parent} with a single child");
                return;
            }
        }
        self.rebalance_internal(path, parent);
    }

    /// Appends `from` to `into` and unlinks `from`.
    fn merge_leaves(&mut self, into: NodeId, from: NodeId) {
        let from_leaf = self.arena.release(from).into_leaf();
        let next = from_leaf.next;
        let l = self.arena.leaf_mut(into);
        l.keys.extend(from_leaf.keys);
        l.values.extend(from_leaf.values);
        l.next = next;
        if next == NIL {
            self.tail = into;
        } else {
            self.arena.leaf_mut(next).prev = into;
        }
    }

    /// Restores occupancy of `node` and its ancestors after a child merge.
    fn rebalance_internal(&mut self, mut path: Path, mut node: NodeId) {
        let min = self.min_occupancy();
        loop {
            let Some((parent, idx)) = path.pop() else {
                // Root: collapse once it routes to a single child.
                if self.arena.internal(node).keys.is_empty() {
                    let child = self.arena.release(node).into_internal().children[0];
                    self.root = child;
                    self.height -= 1;
                    log::trace!("B+tree root collapsed, height now {}", self.height);
                }
                return;
            };
            if self.arena.internal(node).keys.len() >= min {
                return;
            }

            let siblings = &self.arena.internal(parent).children;
            let left = if idx > 0 { Some(siblings[idx - 1]) } else { None };
            let right = siblings.get(idx + 1).copied();

            if let Some(left) = left.filter(|&l| self.arena.internal(l).keys.len() > min) {
                let l = self.arena.internal_mut(left);
                if let (Some(up), Some(child)) = (l.keys.pop(), l.children.pop()) {
                    let down = mem::replace(&mut self.arena.internal_mut(parent).keys[idx - 1], up);
                    let n = self.arena.internal_mut(node);
                    n.keys.insert(0, down);
                    n.children.insert(0, child);
                }
                return;
            }

            if let Some(right) = right.filter(|&r| self.arena.internal(r).keys.len() > min) {
                let r = self.arena.internal_mut(right);
                let up = r.keys.remove(0);
                let child = r.children.remove(0);
                let down = mem::replace(&mut self.arena.internal_mut(parent).keys[idx], up);
                let n = self.arena.internal_mut(node);
                n.keys.push(down);
                n.children.push(child);
                return;
            }

            match (left, right) {
                (Some(left), _) => {
                    let p = self.arena.internal_mut(parent);
                    let down = p.keys.remove(idx - 1);
                    p.children.remove(idx);
                    let absorbed = self.arena.release(node).into_internal();
                    let l = self.arena.internal_mut(left);
                    l.keys.push(down);
                    l.keys.extend(absorbed.keys);
                    l.children.extend(absorbed.children);
                }
                (None, Some(right)) => {
                    let p = self.arena.internal_mut(parent);
                    let down = p.keys.remove(idx);
                    p.children.remove(idx + 1);
                    let absorbed = self.arena.release(right).into_internal();
                    let n = self.arena.internal_mut(node);
                    n.keys.push(down);
                    n.keys.extend(absorbed.keys);
                    n.children.extend(absorbed.children);
                }
                (None, None) => {
                    debug_assert!(false, "internal node {parent} with a single child");
                    return;
                }
            }
            node = parent;
        }
    }

    // =========================================================================
    // Bulk removal
    // =========================================================================

    /// Removes every entry equal to `key`, returning how many.
    pub fn remove_all_keys(&mut self, key: &K) -> usize {
        let n = self.count(key);
        if n <= POINT_REMOVAL_LIMIT {
            for _ in 0..n {
                self.remove(key);
            }
            return n;
        }
        self.remove_in_range(key, key, true)
    }

    /// Removes every entry whose key is present in `other`.
    pub fn remove_all<L>(&mut self, other: &L) -> usize
    where
        L: Lookup<K> + ?Sized,
    {
        self.remove_if(|k, _| other.contains_key(k))
    }

    pub fn remove_if<F>(&mut self, predicate: F) -> usize
    where
        F: FnMut(&K, &V) -> bool,
    {
        let front = self.arena.normalize(self.head, 0);
        self.sweep(front, Pos::END, predicate)
    }

    /// Keeps only the entries for which `keep` returns true.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        self.remove_if(|k, v| !keep(k, v));
    }

    pub fn remove_in_range(&mut self, lower: &K, upper: &K, inclusive: bool) -> usize {
        self.remove_in_range_if(lower, upper, inclusive, |_, _| true)
    }

    pub fn remove_in_range_if<F>(&mut self, lower: &K, upper: &K, inclusive: bool, predicate: F) -> usize
    where
        F: FnMut(&K, &V) -> bool,
    {
        let (front, back) = self.range_bounds(lower, upper, inclusive);
        self.sweep(front, back, predicate)
    }

    /// Drops matching entries in `[front, back)` by compacting each leaf in
    /// place, then restores occupancy of the leaves left underfull. When at
    /// least half the entries went, rebuilding is cheaper than repairing.
    fn sweep<F>(&mut self, front: Pos, back: Pos, mut predicate: F) -> usize
    where
        F: FnMut(&K, &V) -> bool,
    {
        let min = self.min_occupancy();
        let rooted_leaf = self.height == 1;
        let before = self.len;
        let mut removed = 0;
        let mut underfull = Vec::new();
        let mut pos = front;

        while !pos.is_end() {
            let last = pos.leaf == back.leaf;
            let l = self.arena.leaf_mut(pos.leaf);
            let end = if last { back.idx } else { l.len() };

            let tail_keys = l.keys.split_off(end);
            let tail_values = l.values.split_off(end);
            let keys = l.keys.split_off(pos.idx);
            let values = l.values.split_off(pos.idx);
            for (k, v) in keys.into_iter().zip(values) {
                if predicate(&k, &v) {
                    removed += 1;
                } else {
                    l.keys.push(k);
                    l.values.push(v);
                }
            }
            l.keys.extend(tail_keys);
            l.values.extend(tail_values);

            if !rooted_leaf && l.len() < min {
                underfull.push(pos.leaf);
            }
            if last {
                break;
            }
            pos = Pos { leaf: l.next, idx: 0 };
        }

        self.len -= removed;
        if underfull.is_empty() {
            return removed;
        }
        if removed * 2 >= before {
            self.rebuild();
        } else {
            // Left to right: each leaf's left neighbour is already repaired.
            for leaf in underfull {
                self.repair_leaf(leaf);
            }
        }
        removed
    }

    /// Borrows into or merges `leaf` until it is no longer underfull. A leaf
    /// released by an earlier merge is skipped.
    fn repair_leaf(&mut self, leaf: NodeId) {
        while self.height > 1
            && self.arena.is_leaf(leaf)
            && self.arena.leaf(leaf).len() < self.min_occupancy()
        {
            let path = self.path_to_leaf(leaf);
            self.rebalance_leaf(path, leaf);
        }
    }

    /// Descent path to `target`, found from the nearest non-empty leaf at or
    /// before it. Separators still bound the keys of emptied leaves.
    fn path_to_leaf(&self, target: NodeId) -> Path {
        let mut path = Vec::with_capacity(self.height);
        let mut anchor = target;
        while anchor != NIL && self.arena.leaf(anchor).len() == 0 {
            anchor = self.arena.leaf(anchor).prev;
        }

        let mut leaf = if anchor == NIL {
            self.leftmost_with_path(&mut path)
        } else {
            self.locate_with_path(&self.arena.leaf(anchor).keys[0], &mut path).0
        };
        while leaf != target {
            let Some(next) = self.advance_path(&mut path) else {
                debug_assert!(false, "leaf {target} not reachable");
                break;
            };
            leaf = next;
        }
        path
    }

    fn leftmost_with_path(&self, path: &mut Path) -> NodeId {
        let mut node = self.root;
        for _ in 1..self.height {
            path.push((node, 0));
            node = self.arena.internal(node).children[0];
        }
        node
    }

    /// Reloads every entry from the leaf chain into a fresh, evenly filled tree.
    fn rebuild(&mut self) {
        let mut keys = Vec::with_capacity(self.len);
        let mut values = Vec::with_capacity(self.len);
        let mut leaf = self.head;
        while leaf != NIL {
            let l = self.arena.leaf_mut(leaf);
            keys.append(&mut l.keys);
            values.append(&mut l.values);
            leaf = l.next;
        }
        let old_height = self.height;
        self.arena.clear();
        self.bulk_load(keys, values);
        log::debug!(
            "B+tree rebuilt: {} entries, height {} -> {}",
            self.len,
            old_height,
            self.height
        );
    }

    /// Builds the tree bottom-up from sorted entries. The arena must be empty.
    fn bulk_load(&mut self, keys: Vec<K>, values: Vec<V>) {
        let len = keys.len();
        let capacity = self.capacity;
        let leaf_count = ((len + capacity - 1) / capacity).max(1);

        let mut keys = keys.into_iter();
        let mut values = values.into_iter();
        let mut level = Vec::with_capacity(leaf_count);
        let mut mins = Vec::with_capacity(leaf_count);
        let mut prev = NIL;
        for i in 0..leaf_count {
            let size = len / leaf_count + usize::from(i < len % leaf_count);
            let mut leaf = Leaf::new(capacity);
            leaf.keys.extend(keys.by_ref().take(size));
            leaf.values.extend(values.by_ref().take(size));
            leaf.prev = prev;
            if let Some(first) = leaf.keys.first() {
                mins.push(first.clone());
            }
            let id = self.arena.alloc(Node::Leaf(leaf));
            if prev != NIL {
                self.arena.leaf_mut(prev).next = id;
            }
            level.push(id);
            prev = id;
        }
        self.head = level[0];
        self.tail = prev;
        self.len = len;
        self.height = 1;

        let fan_out = capacity + 1;
        while level.len() > 1 {
            let n = level.len();
            let groups = (n + fan_out - 1) / fan_out;
            let mut next_level = Vec::with_capacity(groups);
            let mut next_mins = Vec::with_capacity(groups);
            let mut children = level.into_iter();
            let mut child_mins = mins.into_iter();
            for i in 0..groups {
                let size = n / groups + usize::from(i < n % groups);
                let mut node = Internal {
                    keys: Vec::with_capacity(capacity + 1),
                    children: Vec::with_capacity(capacity + 2),
                };
                node.children.extend(children.by_ref().take(size));
                let mut group_mins = child_mins.by_ref().take(size);
                if let Some(first) = group_mins.next() {
                    next_mins.push(first);
                }
                node.keys.extend(group_mins);
                next_level.push(self.arena.alloc(Node::Internal(node)));
            }
            level = next_level;
            mins = next_mins;
            self.height += 1;
        }
        self.root = level[0];
    }
}

// =============================================================================
// Trait impls
// =============================================================================

impl<K: Ord, V> Default for BPlusTreeMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone, V: Clone, C> Clone for BPlusTreeMap<K, V, C> {
    fn clone(&self) -> Self {
        Self {
            arena: self.arena.clone(),
            root: self.root,
            head: self.head,
            tail: self.tail,
            len: self.len,
            height: self.height,
            capacity: self.capacity,
            multimap: self.multimap,
            comparator: Arc::clone(&self.comparator),
        }
    }
}

impl<K, V: PartialEq, C: Comparator<K> + PartialEq> PartialEq for BPlusTreeMap<K, V, C> {
    fn eq(&self, other: &Self) -> bool {
        (Arc::ptr_eq(&self.comparator, &other.comparator) || self.comparator == other.comparator)
            && self.len == other.len
            && self
                .iter()
                .zip(other.iter())
                .all(|((k1, v1), (k2, v2))| self.cmp(k1, k2) == Ordering::Equal && v1 == v2)
    }
}

impl<K, V: Eq, C: Comparator<K> + Eq> Eq for BPlusTreeMap<K, V, C> {}

/// Keys are left out: equality compares them through `C`, which may be coarser
/// than their own `Hash`.
impl<K, V: Hash, C: Comparator<K>> Hash for BPlusTreeMap<K, V, C> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.len);
        for v in self.values() {
            v.hash(state);
        }
    }
}

impl<K: fmt::Display, V: fmt::Display, C: Comparator<K>> fmt::Display for BPlusTreeMap<K, V, C> {
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

impl<K: fmt::Debug, V: fmt::Debug, C: Comparator<K>> fmt::Debug for BPlusTreeMap<K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: Ord + Clone, V> FromIterator<(K, V)> for BPlusTreeMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.put_all(iter);
        map
    }
}

impl<K: Clone, V, C: Comparator<K>> Extend<(K, V)> for BPlusTreeMap<K, V, C> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.put_all(iter);
    }
}

impl<K, V, C: Comparator<K>> Lookup<K> for BPlusTreeMap<K, V, C> {
    #[inline]
    fn contains_key(&self, key: &K) -> bool {
        self.find(key).is_some()
    }
}

impl<'a, K, V, C: Comparator<K>> IntoIterator for &'a BPlusTreeMap<K, V, C> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

// =============================================================================
// Test support
// =============================================================================

#[cfg(test)]
impl<K: fmt::Debug, V, C: Comparator<K>> BPlusTreeMap<K, V, C> {
    /// Panics if any structural invariant is broken.
    pub(crate) fn validate(&self) {
        let mut leaves = Vec::new();
        let mut nodes = 0;
        let total = self.validate_node(self.root, 1, None, None, &mut leaves, &mut nodes);
        assert_eq!(total, self.len, "entry count");
        assert_eq!(nodes, self.arena.live(), "leaked arena nodes");

        assert_eq!(self.head, leaves[0]);
        assert_eq!(self.tail, *leaves.last().unwrap_or(&NIL));
        assert_eq!(self.arena.leaf(self.head).prev, NIL);
        assert_eq!(self.arena.leaf(self.tail).next, NIL);
        for w in leaves.windows(2) {
            assert_eq!(self.arena.leaf(w[0]).next, w[1], "broken next link");
            assert_eq!(self.arena.leaf(w[1]).prev, w[0], "broken prev link");
        }

        let keys: Vec<&K> = self.keys().collect();
        for w in keys.windows(2) {
            let order = self.cmp(w[0], w[1]);
            if self.multimap {
                assert_ne!(order, Ordering::Greater, "{:?} before {:?}", w[0], w[1]);
            } else {
                assert_eq!(order, Ordering::Less, "{:?} before {:?}", w[0], w[1]);
            }
        }
    }

    fn validate_node(
        &self,
        node: NodeId,
        depth: usize,
        lower: Option<&K>,
        upper: Option<&K>,
        leaves: &mut Vec<NodeId>,
        nodes: &mut usize,
    ) -> usize {
        *nodes += 1;
        let is_root = node == self.root;
        let in_bounds = |k: &K| {
            lower.map_or(true, |lo| self.cmp(lo, k) != Ordering::Greater)
                && upper.map_or(true, |hi| self.cmp(k, hi) != Ordering::Greater)
        };

        if depth == self.height {
            let leaf = self.arena.leaf(node);
            assert!(leaf.len() <= self.capacity, "leaf overflow");
            assert_eq!(leaf.keys.len(), leaf.values.len());
            if !is_root {
                assert!(leaf.len() >= self.min_occupancy(), "leaf underflow: {}", leaf.len());
            }
            for k in &leaf.keys {
                assert!(in_bounds(k), "{k:?} outside separator bounds {lower:?}..{upper:?}");
            }
            leaves.push(node);
            return leaf.len();
        }

        let internal = self.arena.internal(node);
        assert_eq!(internal.children.len(), internal.keys.len() + 1);
        assert!(internal.keys.len() <= self.capacity, "internal overflow");
        if is_root {
            assert!(!internal.keys.is_empty(), "internal root with one child");
        } else {
            assert!(internal.keys.len() >= self.min_occupancy(), "internal underflow");
        }
        for k in &internal.keys {
            assert!(in_bounds(k), "separator {k:?} outside {lower:?}..{upper:?}");
        }

        let mut total = 0;
        for (i, &child) in internal.children.iter().enumerate() {
            let lo = if i == 0 { lower } else { Some(&internal.keys[i - 1]) };
            let hi = internal.keys.get(i).or(upper);
            total += self.validate_node(child, depth + 1, lo, hi, leaves, nodes);
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::btree::comparator::ReverseOrder;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::BTreeMap;

    #[test]
    fn test_insert_get_remove() {
        let mut map = BPlusTreeMap::new();
        assert!(map.is_empty());
        assert_eq!(map.insert(5u32, "five"), None);
        assert_eq!(map.insert(1, "one"), None);
        assert_eq!(map.insert(5, "FIVE"), Some("five"));
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(&5), Some(&"FIVE"));
        assert_eq!(map.get(&2), None);
        assert_eq!(map.remove(&1), Some("one"));
        assert_eq!(map.remove(&1), None);
        assert_eq!(map.len(), 1);
        map.validate();
    }

    #[test]
    fn test_sequential_growth_and_shrink() {
        let mut map = BPlusTreeMap::new();
        for i in 0..20_000u64 {
            map.insert(i, i * 2);
        }
        assert!(map.height() >= 3);
        map.validate();
        assert_eq!(map.keys().copied().collect::<Vec<_>>(), (0..20_000).collect::<Vec<_>>());

        for i in (0..20_000u64).filter(|i| i % 3 != 0) {
            assert_eq!(map.remove(&i), Some(i * 2));
        }
        map.validate();
        for i in (0..20_000u64).step_by(3) {
            assert_eq!(map.remove(&i), Some(i * 2));
        }
        assert!(map.is_empty());
        assert_eq!(map.height(), 1);
        map.validate();
    }

    #[test]
    fn test_randomized_against_btreemap() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut map = BPlusTreeMap::new();
        let mut reference = BTreeMap::new();
        for round in 0..60_000 {
            let k: u16 = rng.gen_range(0..4_000);
            match rng.gen_range(0..5) {
                0..=2 => {
                    let v: u32 = rng.gen();
                    assert_eq!(map.insert(k, v), reference.insert(k, v));
                }
                3 => assert_eq!(map.remove(&k), reference.remove(&k)),
                _ => assert_eq!(map.get(&k), reference.get(&k)),
            }
            if round % 10_000 == 0 {
                map.validate();
            }
        }
        map.validate();
        assert!(map.iter().eq(reference.iter()));
        assert!(map.iter().rev().eq(reference.iter().rev()));
        assert_eq!(map.first(), reference.iter().next());
        assert_eq!(map.last(), reference.iter().next_back());
    }

    #[test]
    fn test_multimap_newest_first() {
        let mut map = BPlusTreeMap::new_multimap();
        for (i, k) in [5u32, 3, 5, 1, 5].into_iter().enumerate() {
            assert_eq!(map.insert(k, i), None);
        }
        assert_eq!(map.len(), 5);
        assert_eq!(map.count(&5), 3);
        assert_eq!(map.count(&3), 1);
        assert_eq!(map.count(&4), 0);
        assert_eq!(map.get(&5), Some(&4));

        let fives: Vec<usize> = map.range_iter(&5, &5, true).map(|(_, v)| *v).collect();
        assert_eq!(fives, vec![4, 2, 0]);

        assert_eq!(map.remove(&5), Some(4));
        assert_eq!(map.get(&5), Some(&2));
        assert_eq!(map.remove_all_keys(&5), 2);
        assert!(!map.contains_key(&5));
        map.validate();
    }

    #[test]
    fn test_multimap_many_duplicates() {
        let mut map = BPlusTreeMap::new_multimap();
        for i in 0..5_000u32 {
            map.insert(i % 7, i);
        }
        map.validate();
        for k in 0..7 {
            assert_eq!(map.count(&k), (0..5_000).filter(|i| i % 7 == k).count());
            // Newest-first: the largest value inserted for this key.
            let newest = (0..5_000u32).rev().find(|i| i % 7 == k);
            assert_eq!(map.get(&k).copied(), newest);
        }
        let removed = map.remove_all_keys(&3);
        assert_eq!(removed, 714);
        assert_eq!(map.count(&3), 0);
        assert_eq!(map.len(), 5_000 - 714);
        map.validate();

        for _ in 0..100 {
            map.remove(&4);
        }
        assert_eq!(map.count(&4), 714 - 100);
        map.validate();
    }

    #[test]
    fn test_count_range() {
        let map: BPlusTreeMap<u32, ()> = (1..=100).map(|k| (k, ())).collect();
        assert_eq!(map.count_range(&20, &30, true), 11);
        assert_eq!(map.count_range(&20, &30, false), 10);
        assert_eq!(map.count_range(&0, &1000, true), 100);
        assert_eq!(map.count_range(&30, &20, true), 0);
        assert_eq!(map.count_range(&20, &20, false), 0);
        assert_eq!(map.count_range(&20, &20, true), 1);
        assert_eq!(map.count_range_if(&1, &100, true, |k, _| k % 10 == 0), 10);
    }

    #[test]
    fn test_range_iteration_both_directions() {
        let map: BPlusTreeMap<i64, i64> = (0..1_000).map(|k| (k * 2, -k)).collect();
        let forward: Vec<i64> = map.range_iter(&101, &201, false).map(|(k, _)| *k).collect();
        assert_eq!(forward, (102..201).step_by(2).collect::<Vec<_>>());
        let backward: Vec<i64> = map.reversed_range_iter(&101, &201, false).map(|(k, _)| *k).collect();
        let mut expected = forward.clone();
        expected.reverse();
        assert_eq!(backward, expected);

        // Meeting in the middle.
        let mut range = map.range_iter(&0, &10, true);
        assert_eq!(range.next().map(|(k, _)| *k), Some(0));
        assert_eq!(range.next_back().map(|(k, _)| *k), Some(10));
        assert_eq!(range.count(), 4);

        let mut visited = Vec::new();
        assert!(!map.for_each_in_range_while(&0, &100, true, |k, _| {
            visited.push(*k);
            *k < 6
        }));
        assert_eq!(visited, vec![0, 2, 4, 6]);

        let mut sum = 0;
        map.for_each_in_range(&0, &6, true, |_, v| sum += v);
        assert_eq!(sum, -6);
    }

    #[test]
    fn test_reversed_iter_matches_forward() {
        let mut rng = StdRng::seed_from_u64(9);
        let map: BPlusTreeMap<u32, u32> = (0..3_000).map(|_| (rng.gen(), rng.gen())).collect();
        let mut forward: Vec<_> = map.iter().collect();
        forward.reverse();
        let backward: Vec<_> = map.reversed_iter().collect();
        assert_eq!(forward, backward);
        assert_eq!(map.iter().len(), map.len());
    }

    #[test]
    fn test_remove_in_range_rebuilds() {
        let mut map: BPlusTreeMap<u32, u32> = (0..10_000).map(|k| (k, k)).collect();
        assert_eq!(map.remove_in_range(&100, &9_900, false), 9_800);
        map.validate();
        assert_eq!(map.len(), 200);
        // Rebuilt into a handful of packed leaves rather than hundreds of
        // near-empty ones.
        assert!(map.arena.live() < 20);
        assert_eq!(map.keys().copied().collect::<Vec<_>>(), (0..100).chain(9_900..10_000).collect::<Vec<_>>());

        assert_eq!(map.remove_in_range_if(&0, &10_000, true, |k, _| k % 2 == 1), 100);
        map.validate();
        assert!(map.keys().all(|k| k % 2 == 0));
    }

    #[test]
    fn test_small_range_removals_repair_locally() {
        // Sequential loading leaves every leaf but the last exactly half full,
        // so each single-key removal underflows a leaf.
        let mut map: BPlusTreeMap<u32, u32> = (0..20_000).map(|k| (k, k)).collect();
        let mut reference: BTreeMap<u32, u32> = (0..20_000).map(|k| (k, k)).collect();
        let height = map.height();
        let nodes = map.arena.live();

        for i in 0..1_000u32 {
            let k = 2 * i + 1;
            let live = map.arena.live();
            assert_eq!(map.remove_in_range(&k, &k, true), 1);
            reference.remove(&k);
            // A rebuild would repack the leaves and free hundreds of nodes.
            assert!(live - map.arena.live() <= height, "round {i} freed too many nodes");
            assert_eq!(map.height(), height);
            if i % 100 == 0 {
                map.validate();
            }

            map.insert(k, k);
            reference.insert(k, k);
        }
        map.validate();
        assert!(map.arena.live() > nodes * 3 / 4);
        assert!(map.iter().eq(reference.iter()));
    }

    #[test]
    fn test_multi_leaf_range_removal_without_rebuild() {
        let mut map: BPlusTreeMap<u32, u32> = (0..10_000).map(|k| (k, k)).collect();
        assert_eq!(map.remove_in_range(&1_000, &3_000, false), 2_000);
        map.validate();
        assert_eq!(map.len(), 8_000);
        assert_eq!(map.count_range(&0, &10_000, false), 8_000);
        assert!(!map.contains_key(&1_000));
        assert!(map.contains_key(&999));
        assert!(map.contains_key(&3_000));

        // Every other entry of a stretch, leaving partial leaves behind.
        assert_eq!(map.remove_in_range_if(&5_000, &7_000, false, |k, _| k % 2 == 1), 1_000);
        map.validate();
        assert_eq!(map.range_iter(&5_000, &7_000, false).count(), 1_000);
        assert!(map.range_iter(&5_000, &7_000, false).all(|(k, _)| k % 2 == 0));

        // Range at the very front, so the first underfull leaf has no left
        // sibling.
        assert_eq!(map.remove_in_range(&0, &500, true), 501);
        map.validate();
        assert_eq!(map.min_key(), Some(&501));
    }

    #[test]
    fn test_multimap_range_removal_across_duplicates() {
        let mut map = BPlusTreeMap::new_multimap();
        for i in 0..6_000u32 {
            map.insert(i % 12, i);
        }
        assert_eq!(map.remove_in_range(&4, &5, true), 1_000);
        map.validate();
        assert_eq!(map.count(&3), 500);
        assert_eq!(map.count(&6), 500);
        assert_eq!(map.get(&3), Some(&5_991));

        assert_eq!(map.remove_all_keys(&0), 500);
        map.validate();
        assert_eq!(map.min_key(), Some(&1));
        assert_eq!(map.len(), 4_500);
    }

    #[test]
    fn test_bulk_removal_to_empty() {
        let mut map: BPlusTreeMap<u32, u32> = (0..5_000).map(|k| (k, k)).collect();
        assert_eq!(map.remove_if(|_, _| true), 5_000);
        assert!(map.is_empty());
        assert_eq!(map.height(), 1);
        assert_eq!(map.iter().next(), None);
        assert_eq!(map.min_key(), None);
        map.validate();

        map.insert(3, 3);
        assert_eq!(map.min_key(), Some(&3));
        map.validate();
    }

    #[test]
    fn test_remove_all_and_retain() {
        let mut map: BPlusTreeMap<u32, u32> = (0..1_000).map(|k| (k, k % 4)).collect();
        let doomed: std::collections::BTreeSet<u32> = (0..500).collect();
        assert_eq!(map.remove_all(&doomed), 500);
        map.retain(|_, v| *v != 0);
        assert_eq!(map.len(), 375);
        map.validate();
        assert_eq!(map.min_key(), Some(&501));
        assert_eq!(map.max_key(), Some(&999));
    }

    #[test]
    fn test_reverse_comparator() {
        let mut map = BPlusTreeMap::with_comparator(TreeConfig::default(), ReverseOrder).unwrap();
        for k in 0..500u32 {
            map.insert(k, ());
        }
        map.validate();
        assert_eq!(map.min_key(), Some(&499));
        assert_eq!(map.max_key(), Some(&0));
        let keys: Vec<u32> = map.keys().copied().collect();
        assert_eq!(keys, (0..500).rev().collect::<Vec<_>>());
        assert_eq!(map.count_range(&30, &20, true), 11);
    }

    #[test]
    fn test_put_if_absent_and_put_all() {
        let mut map = BPlusTreeMap::new();
        assert!(map.put_if_absent(1u8, 'a'));
        assert!(!map.put_if_absent(1, 'b'));
        assert_eq!(map.put_all([(1, 'c'), (2, 'd')]), 1);
        assert_eq!(map.get(&1), Some(&'c'));
        if let Some(v) = map.get_mut(&2) {
            *v = 'e';
        }
        assert_eq!(map.get_key_value(&2), Some((&2, &'e')));

        let mut multi = BPlusTreeMap::new_multimap();
        assert_eq!(multi.put_all([(1u8, 'a'), (1, 'b')]), 2);
        assert!(!multi.put_if_absent(1, 'c'));
    }

    #[test]
    fn test_value_semantics() {
        let a: BPlusTreeMap<u32, u32> = (0..300).map(|k| (k, k)).collect();
        let b: BPlusTreeMap<u32, u32> = (0..300).rev().map(|k| (k, k)).collect();
        assert_eq!(a, b);

        let mut c = a.clone();
        c.insert(7, 0);
        assert_ne!(a, c);
        assert_eq!(a.get(&7), Some(&7));
        c.validate();

        let small: BPlusTreeMap<u32, &str> = [(2, "b"), (1, "a")].into_iter().collect();
        assert_eq!(small.to_string(), "[1=>a, 2=>b]");
        assert_eq!(format!("{small:?}"), r#"{1: "a", 2: "b"}"#);
        assert_eq!(BPlusTreeMap::<u32, u32>::new().to_string(), "[]");
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    struct IgnoreCase;

    impl Comparator<String> for IgnoreCase {
        fn compare(&self, a: &String, b: &String) -> Ordering {
            a.to_lowercase().cmp(&b.to_lowercase())
        }
    }

    fn hash_of<T: Hash>(value: &T) -> u64 {
        let mut h = std::collections::hash_map::DefaultHasher::new();
        value.hash(&mut h);
        h.finish()
    }

    #[test]
    fn test_hash_agrees_with_comparator_equality() {
        let mut lower = BPlusTreeMap::with_comparator(TreeConfig::default(), IgnoreCase).unwrap();
        let mut upper = BPlusTreeMap::with_comparator(TreeConfig::default(), IgnoreCase).unwrap();
        for (i, word) in ["alpha", "beta", "gamma"].into_iter().enumerate() {
            lower.insert(word.to_string(), i);
            upper.insert(word.to_uppercase(), i);
        }
        assert_eq!(lower, upper);
        assert_eq!(hash_of(&lower), hash_of(&upper));

        upper.insert("DELTA".to_string(), 3);
        assert_ne!(lower, upper);
        assert_ne!(hash_of(&lower), hash_of(&upper));
    }

    #[test]
    fn test_clear_reuses_tree() {
        let mut map: BPlusTreeMap<u32, u32> = (0..2_000).map(|k| (k, k)).collect();
        map.clear();
        assert!(map.is_empty());
        assert_eq!(map.height(), 1);
        map.validate();
        map.insert(1, 1);
        assert_eq!(map.first(), Some((&1, &1)));
        map.validate();
    }
}
