//! Node arena for [`BPlusTreeMap`](super::BPlusTreeMap).
//!
//! Nodes live in a flat `Vec` and refer to each other by `u32` index. Freed
//! slots are recycled through a free list, so a tree that shrinks and regrows
//! does not reallocate its arena.

use std::mem;

pub(crate) type NodeId = u32;

/// Absent link.
pub(crate) const NIL: NodeId = u32::MAX;

/// Target byte footprint of a leaf's key array.
pub const LEAF_CHUNK_BYTES: usize = 256;

/// Maximum entries per leaf (and keys per internal node) for keys of type `K`.
#[inline]
pub(crate) fn node_capacity<K>() -> usize {
    let cap = LEAF_CHUNK_BYTES / mem::size_of::<K>().max(1);
    cap.clamp(8, 256) & !1
}

#[derive(Clone)]
pub(crate) struct Leaf<K, V> {
    pub(crate) keys: Vec<K>,
    pub(crate) values: Vec<V>,
    pub(crate) prev: NodeId,
    pub(crate) next: NodeId,
}

impl<K, V> Leaf<K, V> {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            // One spare slot: a leaf overflows by one entry before it splits.
            keys: Vec::with_capacity(capacity + 1),
            values: Vec::with_capacity(capacity + 1),
            prev: NIL,
            next: NIL,
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.keys.len()
    }
}

/// `children[i]` holds keys `<= keys[i]`; `children[i + 1]` holds keys `>= keys[i]`.
#[derive(Clone)]
pub(crate) struct Internal<K> {
    pub(crate) keys: Vec<K>,
    pub(crate) children: Vec<NodeId>,
}

#[derive(Clone)]
pub(crate) enum Node<K, V> {
    Leaf(Leaf<K, V>),
    Internal(Internal<K>),
    Free,
}

impl<K, V> Node<K, V> {
    pub(crate) fn into_leaf(self) -> Leaf<K, V> {
        match self {
            Node::Leaf(leaf) => leaf,
            _ => unreachable!("expected leaf node"),
        }
    }

    pub(crate) fn into_internal(self) -> Internal<K> {
        match self {
            Node::Internal(internal) => internal,
            _ => unreachable!("expected internal node"),
        }
    }
}

// =============================================================================
// Positions
// =============================================================================

/// Entry position within the leaf chain. Normalized positions always point at
/// an existing entry, or equal [`Pos::END`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Pos {
    pub(crate) leaf: NodeId,
    pub(crate) idx: usize,
}

impl Pos {
    pub(crate) const END: Pos = Pos { leaf: NIL, idx: 0 };

    #[inline]
    pub(crate) fn is_end(self) -> bool {
        self.leaf == NIL
    }
}

// =============================================================================
// Arena
// =============================================================================

#[derive(Clone)]
pub(crate) struct Arena<K, V> {
    nodes: Vec<Node<K, V>>,
    free: Vec<NodeId>,
}

impl<K, V> Arena<K, V> {
    pub(crate) fn with_capacity(nodes: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(nodes),
            free: Vec::new(),
        }
    }

    pub(crate) fn alloc(&mut self, node: Node<K, V>) -> NodeId {
        match self.free.pop() {
            Some(id) => {
                self.nodes[id as usize] = node;
                id
            }
            None => {
                let id = self.nodes.len() as NodeId;
                debug_assert!(id != NIL);
                self.nodes.push(node);
                id
            }
        }
    }

    /// Frees `id` and hands back its contents.
    pub(crate) fn release(&mut self, id: NodeId) -> Node<K, V> {
        self.free.push(id);
        mem::replace(&mut self.nodes[id as usize], Node::Free)
    }

    /// Drops every node, keeping the allocation.
    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
    }

    #[inline]
    pub(crate) fn leaf(&self, id: NodeId) -> &Leaf<K, V> {
        match &self.nodes[id as usize] {
            Node::Leaf(leaf) => leaf,
            _ => unreachable!("node {id} is not a leaf"),
        }
    }

    #[inline]
    pub(crate) fn leaf_mut(&mut self, id: NodeId) -> &mut Leaf<K, V> {
        match &mut self.nodes[id as usize] {
            Node::Leaf(leaf) => leaf,
            _ => unreachable!("node {id} is not a leaf"),
        }
    }

    /// Whether `id` still holds a leaf, as opposed to a released slot.
    #[inline]
    pub(crate) fn is_leaf(&self, id: NodeId) -> bool {
        matches!(self.nodes.get(id as usize), Some(Node::Leaf(_)))
    }

    #[inline]
    pub(crate) fn internal(&self, id: NodeId) -> &Internal<K> {
        match &self.nodes[id as usize] {
            Node::Internal(internal) => internal,
            _ => unreachable!("node {id} is not internal"),
        }
    }

    #[inline]
    pub(crate) fn internal_mut(&mut self, id: NodeId) -> &mut Internal<K> {
        match &mut self.nodes[id as usize] {
            Node::Internal(internal) => internal,
            _ => unreachable!("node {id} is not internal"),
        }
    }

    /// Nodes currently in use.
    #[cfg(test)]
    pub(crate) fn live(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    // =========================================================================
    // Cursor movement over the leaf chain
    // =========================================================================

    /// Skips forward past exhausted leaves.
    #[inline]
    pub(crate) fn normalize(&self, mut leaf: NodeId, mut idx: usize) -> Pos {
        while leaf != NIL {
            let l = self.leaf(leaf);
            if idx < l.len() {
                return Pos { leaf, idx };
            }
            leaf = l.next;
            idx = 0;
        }
        Pos::END
    }

    #[inline]
    pub(crate) fn advance(&self, pos: Pos) -> Pos {
        self.normalize(pos.leaf, pos.idx + 1)
    }

    /// Position immediately before `pos`, or `None` at the very start.
    pub(crate) fn retreat(&self, pos: Pos, tail: NodeId) -> Option<Pos> {
        let (mut leaf, mut idx) = if pos.is_end() {
            (tail, self.leaf(tail).len())
        } else {
            (pos.leaf, pos.idx)
        };
        loop {
            if idx > 0 {
                return Some(Pos { leaf, idx: idx - 1 });
            }
            leaf = self.leaf(leaf).prev;
            if leaf == NIL {
                return None;
            }
            idx = self.leaf(leaf).len();
        }
    }

    /// Entries from `from` up to, not including, `until`.
    pub(crate) fn count_between(&self, from: Pos, until: Pos) -> usize {
        let mut count = 0;
        let mut pos = from;
        while !pos.is_end() && pos.leaf != until.leaf {
            let leaf = self.leaf(pos.leaf);
            count += leaf.len() - pos.idx;
            pos = Pos {
                leaf: leaf.next,
                idx: 0,
            };
        }
        if !pos.is_end() {
            count += until.idx.saturating_sub(pos.idx);
        }
        count
    }
}
