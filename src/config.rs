//! Construction parameters for the containers.
//!
//! Every `with_config*` constructor calls [`Config::validate`] before
//! allocating, so an invalid configuration never produces a container.
//!
//! ```rust
//! use primcoll::{HashConfig, HashMap};
//!
//! let config = HashConfig::default()
//!     .with_initial_capacity(1000)
//!     .with_load_factor(0.5)
//!     .with_robin_hood(false);
//! let map: HashMap<u32, u64> = HashMap::with_config(config).unwrap();
//! assert!(map.capacity() >= 1000);
//! ```

use std::fmt;

use crate::error::{CollectionError, Result};
use crate::hashing::{
    DEFAULT_EXPECTED_ELEMENTS, DEFAULT_LOAD_FACTOR, MAX_CAPACITY, MAX_LOAD_FACTOR, MIN_LOAD_FACTOR,
};

/// Common configuration behaviour.
pub trait Config: Clone + fmt::Debug {
    /// `Ok(())` if the configuration can build a container.
    fn validate(&self) -> Result<()>;
}

/// Parameters for [`HashMap`](crate::HashMap) and [`HashSet`](crate::HashSet).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HashConfig {
    /// Number of elements storable before the first resize.
    pub initial_capacity: usize,
    /// Fraction of slots occupied before the buffers double. Must lie in
    /// `[MIN_LOAD_FACTOR, MAX_LOAD_FACTOR]`.
    pub load_factor: f64,
    /// Enables Robin-Hood displacement and the probe-distance cache.
    pub robin_hood: bool,
}

impl Default for HashConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_EXPECTED_ELEMENTS,
            load_factor: DEFAULT_LOAD_FACTOR,
            robin_hood: true,
        }
    }
}

impl HashConfig {
    pub fn with_initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }

    pub fn with_load_factor(mut self, load_factor: f64) -> Self {
        self.load_factor = load_factor;
        self
    }

    pub fn with_robin_hood(mut self, robin_hood: bool) -> Self {
        self.robin_hood = robin_hood;
        self
    }
}

impl Config for HashConfig {
    fn validate(&self) -> Result<()> {
        // NaN fails the range check too.
        if !(MIN_LOAD_FACTOR..=MAX_LOAD_FACTOR).contains(&self.load_factor) {
            return Err(CollectionError::invalid_configuration(format!(
                "load factor must be in [{MIN_LOAD_FACTOR}, {MAX_LOAD_FACTOR}], got {}",
                self.load_factor
            )));
        }
        if self.initial_capacity >= MAX_CAPACITY {
            return Err(CollectionError::invalid_configuration(format!(
                "initial capacity {} exceeds maximum {}",
                self.initial_capacity, MAX_CAPACITY
            )));
        }
        Ok(())
    }
}

/// Parameters for [`BPlusTreeMap`](crate::BPlusTreeMap).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeConfig {
    /// Expected number of entries; pre-sizes the node arena.
    pub initial_capacity: usize,
    /// Allow several entries with equal keys.
    pub multimap: bool,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 0,
            multimap: false,
        }
    }
}

impl TreeConfig {
    pub fn with_initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }

    pub fn with_multimap(mut self, multimap: bool) -> Self {
        self.multimap = multimap;
        self
    }
}

impl Config for TreeConfig {
    fn validate(&self) -> Result<()> {
        if self.initial_capacity > (u32::MAX / 2) as usize {
            return Err(CollectionError::invalid_configuration(format!(
                "initial capacity {} exceeds maximum {}",
                self.initial_capacity,
                u32::MAX / 2
            )));
        }
        Ok(())
    }
}
