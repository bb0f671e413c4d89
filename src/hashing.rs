//! Hash mixing and capacity policy for the open-addressing containers.
//!
//! Keys expose a raw 32-bit hash through [`HashKey`] (or an external
//! [`HashStrategy`]). The tables never use that value directly: it is xor-ed
//! with a per-instance random perturbation and passed through [`mix32`], so two
//! tables holding the same keys end up with unrelated slot layouts.

use crate::bits::next_power_of_two_u64;
use crate::error::{CollectionError, Result};

// =============================================================================
// Capacity policy
// =============================================================================

/// Smallest backing buffer ever allocated.
pub const MIN_BUFFER_SIZE: usize = 8;

/// Hard cap on the backing buffer length. Keeps `capacity * 2` and every
/// cached ideal slot within `u32` range.
pub const MAX_CAPACITY: usize = 1 << 30;

pub const DEFAULT_LOAD_FACTOR: f64 = 0.75;
pub const MIN_LOAD_FACTOR: f64 = 1.0 / 32.0;
pub const MAX_LOAD_FACTOR: f64 = 0.99;

/// Default number of elements a fresh container holds without growing.
pub const DEFAULT_EXPECTED_ELEMENTS: usize = 8;

#[inline]
fn clamp_load_factor(load_factor: f64) -> f64 {
    load_factor.clamp(MIN_LOAD_FACTOR, MAX_LOAD_FACTOR)
}

/// Number of occupied slots a buffer of `capacity` slots accepts before it
/// must grow. Always leaves at least one empty slot so probe loops terminate.
#[inline]
pub fn resize_threshold(capacity: usize, load_factor: f64) -> usize {
    debug_assert!(capacity.is_power_of_two() && capacity >= 2);
    let t = (capacity as f64 * clamp_load_factor(load_factor)).floor() as usize;
    t.clamp(1, capacity - 1)
}

/// Smallest power-of-two buffer that holds `elements` without growing.
pub fn min_buffer_size(elements: usize, load_factor: f64) -> Result<usize> {
    let lf = clamp_load_factor(load_factor);
    let mut length = (elements as f64 / lf).ceil() as usize;
    if length <= elements {
        length = elements.saturating_add(1);
    }
    if length > MAX_CAPACITY {
        return Err(CollectionError::invalid_configuration(format!(
            "{elements} elements exceed the maximum capacity of {MAX_CAPACITY} slots"
        )));
    }

    let mut length = (next_power_of_two_u64(length as u64) as usize).max(MIN_BUFFER_SIZE);
    // Float rounding can leave the threshold one short.
    while resize_threshold(length, lf) < elements {
        if length >= MAX_CAPACITY {
            return Err(CollectionError::invalid_configuration(format!(
                "{elements} elements exceed the maximum capacity of {MAX_CAPACITY} slots"
            )));
        }
        length <<= 1;
    }
    Ok(length)
}

/// Buffer size to grow to once `assigned` reaches the threshold of `current`.
pub fn next_buffer_size(current: usize, assigned: usize, load_factor: f64) -> Result<usize> {
    debug_assert!(current.is_power_of_two());
    if current >= MAX_CAPACITY {
        return Err(CollectionError::out_of_memory(current, current.saturating_mul(2)));
    }
    let doubled = current << 1;
    match min_buffer_size(assigned.saturating_add(1), load_factor) {
        Ok(needed) => Ok(doubled.max(needed)),
        Err(_) => Err(CollectionError::out_of_memory(current, doubled)),
    }
}

// =============================================================================
// Mixing
// =============================================================================

/// MurmurHash3 32-bit finalizer.
#[inline]
pub fn mix32(mut h: u32) -> u32 {
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^ (h >> 16)
}

/// MurmurHash3 64-bit finalizer.
#[inline]
pub fn mix64(mut h: u64) -> u64 {
    h ^= h >> 33;
    h = h.wrapping_mul(0xff51_afd7_ed55_8ccd);
    h ^= h >> 33;
    h = h.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    h ^ (h >> 33)
}

/// Golden-ratio scramble, used where a cheap content hash is enough.
#[inline]
pub fn phi_mix(h: u32) -> u32 {
    let h = h.wrapping_mul(0x9e37_79b9);
    h ^ (h >> 16)
}

/// Fresh random perturbation for a new table instance.
#[inline]
pub fn random_perturbation() -> u32 {
    rand::random::<u32>()
}

#[inline]
fn fold64(v: u64) -> u32 {
    (v ^ (v >> 32)) as u32
}

#[inline]
fn hash_bytes(bytes: &[u8]) -> u32 {
    // FNV-1a; `mix32` runs on top of it at lookup time.
    let mut h: u32 = 0x811c_9dc5;
    for &b in bytes {
        h ^= u32::from(b);
        h = h.wrapping_mul(0x0100_0193);
    }
    h
}

// =============================================================================
// Key hashing
// =============================================================================

/// Keys usable with [`DefaultStrategy`].
///
/// `hash_key` only needs to be consistent with `Eq`; distribution quality is
/// provided by the table's own mixing.
pub trait HashKey: Eq {
    fn hash_key(&self) -> u32;
}

macro_rules! impl_hash_key_narrow {
    ($($t:ty),*) => {
        $(
            impl HashKey for $t {
                #[inline]
                fn hash_key(&self) -> u32 {
                    *self as u32
                }
            }
        )*
    };
}

macro_rules! impl_hash_key_wide {
    ($($t:ty),*) => {
        $(
            impl HashKey for $t {
                #[inline]
                fn hash_key(&self) -> u32 {
                    fold64(*self as u64)
                }
            }
        )*
    };
}

impl_hash_key_narrow!(u8, u16, u32, i8, i16, i32);
impl_hash_key_wide!(u64, i64, usize, isize);

impl HashKey for u128 {
    #[inline]
    fn hash_key(&self) -> u32 {
        fold64((*self as u64) ^ ((*self >> 64) as u64))
    }
}

impl HashKey for i128 {
    #[inline]
    fn hash_key(&self) -> u32 {
        (*self as u128).hash_key()
    }
}

impl HashKey for bool {
    #[inline]
    fn hash_key(&self) -> u32 {
        u32::from(*self)
    }
}

impl HashKey for char {
    #[inline]
    fn hash_key(&self) -> u32 {
        u32::from(*self)
    }
}

impl HashKey for () {
    #[inline]
    fn hash_key(&self) -> u32 {
        0
    }
}

impl HashKey for str {
    #[inline]
    fn hash_key(&self) -> u32 {
        hash_bytes(self.as_bytes())
    }
}

impl HashKey for String {
    #[inline]
    fn hash_key(&self) -> u32 {
        hash_bytes(self.as_bytes())
    }
}

impl HashKey for [u8] {
    #[inline]
    fn hash_key(&self) -> u32 {
        hash_bytes(self)
    }
}

impl HashKey for Vec<u8> {
    #[inline]
    fn hash_key(&self) -> u32 {
        hash_bytes(self)
    }
}

impl<const N: usize> HashKey for [u8; N] {
    #[inline]
    fn hash_key(&self) -> u32 {
        hash_bytes(self)
    }
}

impl<T: HashKey + ?Sized> HashKey for &T {
    #[inline]
    fn hash_key(&self) -> u32 {
        (**self).hash_key()
    }
}

impl<T: HashKey + ?Sized> HashKey for Box<T> {
    #[inline]
    fn hash_key(&self) -> u32 {
        (**self).hash_key()
    }
}

impl<A: HashKey, B: HashKey> HashKey for (A, B) {
    #[inline]
    fn hash_key(&self) -> u32 {
        phi_mix(self.0.hash_key()) ^ self.1.hash_key()
    }
}

/// External hashing/equality, for keys whose natural `Eq` is not the
/// equivalence the table should use.
pub trait HashStrategy<K: ?Sized> {
    fn hash(&self, key: &K) -> u32;
    fn equals(&self, a: &K, b: &K) -> bool;
}

/// Delegates to [`HashKey`] and `Eq`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct DefaultStrategy;

impl<K: HashKey + ?Sized> HashStrategy<K> for DefaultStrategy {
    #[inline]
    fn hash(&self, key: &K) -> u32 {
        key.hash_key()
    }

    #[inline]
    fn equals(&self, a: &K, b: &K) -> bool {
        a == b
    }
}
