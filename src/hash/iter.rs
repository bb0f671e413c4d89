//! Iterators over the open-addressing containers.
//!
//! All of them walk the slot arrays from the highest index down, which is the
//! order the tables rehash in. The order is otherwise unspecified.

use std::iter::{FusedIterator, Rev, Zip};
use std::{slice, vec};

// =============================================================================
// Map iterators
// =============================================================================

/// Borrowing iterator over `(key, value)` pairs.
pub struct Iter<'a, K, V> {
    keys: &'a [Option<K>],
    values: &'a [Option<V>],
    index: usize,
    remaining: usize,
}

impl<'a, K, V> Iter<'a, K, V> {
    pub(crate) fn new(keys: &'a [Option<K>], values: &'a [Option<V>], len: usize) -> Self {
        Self {
            keys,
            values,
            index: keys.len(),
            remaining: len,
        }
    }
}

impl<'a, K, V> Clone for Iter<'a, K, V> {
    fn clone(&self) -> Self {
        Self { ..*self }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let keys = self.keys;
        let values = self.values;
        while self.index > 0 {
            self.index -= 1;
            if let (Some(k), Some(v)) = (&keys[self.index], &values[self.index]) {
                self.remaining -= 1;
                return Some((k, v));
            }
        }
        None
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// Borrowing iterator over keys.
pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Keys<'a, K, V> {
    pub(crate) fn new(inner: Iter<'a, K, V>) -> Self {
        Self { inner }
    }
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    #[inline]
    fn next(&mut self) -> Option<&'a K> {
        self.inner.next().map(|(k, _)| k)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}
impl<K, V> FusedIterator for Keys<'_, K, V> {}

/// Borrowing iterator over values.
pub struct Values<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Values<'a, K, V> {
    pub(crate) fn new(inner: Iter<'a, K, V>) -> Self {
        Self { inner }
    }
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    #[inline]
    fn next(&mut self) -> Option<&'a V> {
        self.inner.next().map(|(_, v)| v)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}
impl<K, V> FusedIterator for Values<'_, K, V> {}

/// Iterator over keys with mutable access to values.
pub struct IterMut<'a, K, V> {
    inner: Rev<Zip<slice::Iter<'a, Option<K>>, slice::IterMut<'a, Option<V>>>>,
    remaining: usize,
}

impl<'a, K, V> IterMut<'a, K, V> {
    pub(crate) fn new(keys: &'a [Option<K>], values: &'a mut [Option<V>], len: usize) -> Self {
        Self {
            inner: keys.iter().zip(values.iter_mut()).rev(),
            remaining: len,
        }
    }
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        for (k, v) in self.inner.by_ref() {
            if let (Some(k), Some(v)) = (k.as_ref(), v.as_mut()) {
                self.remaining -= 1;
                return Some((k, v));
            }
        }
        None
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}
impl<K, V> FusedIterator for IterMut<'_, K, V> {}

/// Mutable iterator over values.
pub struct ValuesMut<'a, K, V> {
    inner: IterMut<'a, K, V>,
}

impl<'a, K, V> ValuesMut<'a, K, V> {
    pub(crate) fn new(inner: IterMut<'a, K, V>) -> Self {
        Self { inner }
    }
}

impl<'a, K, V> Iterator for ValuesMut<'a, K, V> {
    type Item = &'a mut V;

    #[inline]
    fn next(&mut self) -> Option<&'a mut V> {
        self.inner.next().map(|(_, v)| v)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for ValuesMut<'_, K, V> {}
impl<K, V> FusedIterator for ValuesMut<'_, K, V> {}

/// Owning iterator over `(key, value)` pairs.
pub struct IntoIter<K, V> {
    inner: Rev<Zip<vec::IntoIter<Option<K>>, vec::IntoIter<Option<V>>>>,
    remaining: usize,
}

impl<K, V> IntoIter<K, V> {
    pub(crate) fn new(keys: Vec<Option<K>>, values: Vec<Option<V>>, len: usize) -> Self {
        Self {
            inner: keys.into_iter().zip(values).rev(),
            remaining: len,
        }
    }
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<(K, V)> {
        for (k, v) in self.inner.by_ref() {
            if let (Some(k), Some(v)) = (k, v) {
                self.remaining -= 1;
                return Some((k, v));
            }
        }
        None
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {}
impl<K, V> FusedIterator for IntoIter<K, V> {}

// =============================================================================
// Set iterators
// =============================================================================

/// Borrowing iterator over set elements.
pub struct SetIter<'a, K> {
    inner: Iter<'a, K, ()>,
}

impl<'a, K> SetIter<'a, K> {
    pub(crate) fn new(inner: Iter<'a, K, ()>) -> Self {
        Self { inner }
    }
}

impl<K> Clone for SetIter<'_, K> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<'a, K> Iterator for SetIter<'a, K> {
    type Item = &'a K;

    #[inline]
    fn next(&mut self) -> Option<&'a K> {
        self.inner.next().map(|(k, _)| k)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K> ExactSizeIterator for SetIter<'_, K> {}
impl<K> FusedIterator for SetIter<'_, K> {}

/// Owning iterator over set elements.
pub struct SetIntoIter<K> {
    inner: IntoIter<K, ()>,
}

impl<K> SetIntoIter<K> {
    pub(crate) fn new(inner: IntoIter<K, ()>) -> Self {
        Self { inner }
    }
}

impl<K> Iterator for SetIntoIter<K> {
    type Item = K;

    #[inline]
    fn next(&mut self) -> Option<K> {
        self.inner.next().map(|(k, _)| k)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K> ExactSizeIterator for SetIntoIter<K> {}
impl<K> FusedIterator for SetIntoIter<K> {}
