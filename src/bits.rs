//! Bit utilities over `u64` word arrays.
//!
//! The pairwise functions operate over the common prefix of both slices.

/// Number of set bits in `words`.
#[inline]
pub fn pop_array(words: &[u64]) -> u64 {
    words.iter().map(|w| u64::from(w.count_ones())).sum()
}

#[inline]
fn pop_pairwise(a: &[u64], b: &[u64], op: impl Fn(u64, u64) -> u64) -> u64 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| u64::from(op(x, y).count_ones()))
        .sum()
}

/// Cardinality of `a & b`.
pub fn pop_intersect(a: &[u64], b: &[u64]) -> u64 {
    pop_pairwise(a, b, |x, y| x & y)
}

/// Cardinality of `a | b`.
pub fn pop_union(a: &[u64], b: &[u64]) -> u64 {
    pop_pairwise(a, b, |x, y| x | y)
}

/// Cardinality of `a & !b`.
pub fn pop_andnot(a: &[u64], b: &[u64]) -> u64 {
    pop_pairwise(a, b, |x, y| x & !y)
}

/// Cardinality of `a ^ b`.
pub fn pop_xor(a: &[u64], b: &[u64]) -> u64 {
    pop_pairwise(a, b, |x, y| x ^ y)
}

/// Next power of two `>= v`; `0` maps to `0`, and values above `2^31` wrap to `0`.
#[inline]
pub fn next_power_of_two_u32(v: u32) -> u32 {
    let mut v = v.wrapping_sub(1);
    v |= v >> 1;
    v |= v >> 2;
    v |= v >> 4;
    v |= v >> 8;
    v |= v >> 16;
    v.wrapping_add(1)
}

/// Next power of two `>= v`; `0` maps to `0`, and values above `2^63` wrap to `0`.
#[inline]
pub fn next_power_of_two_u64(v: u64) -> u64 {
    let mut v = v.wrapping_sub(1);
    v |= v >> 1;
    v |= v >> 2;
    v |= v >> 4;
    v |= v >> 8;
    v |= v >> 16;
    v |= v >> 32;
    v.wrapping_add(1)
}
