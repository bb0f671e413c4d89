//! # primcoll
//!
//! Specialized collections: open-addressing hash maps and sets with optional
//! Robin-Hood hashing, and an ordered B+tree map that doubles as a multimap.
//!
//! The hash containers store keys and values in flat, power-of-two arrays and
//! probe linearly. With Robin-Hood enabled, each slot also caches its key's
//! ideal position so displacement and backward-shift deletion never rehash.
//!
//! ## Example
//!
//! ```rust
//! use primcoll::{BPlusTreeMap, HashMap};
//!
//! let mut counts: HashMap<u32, u64> = HashMap::new();
//! counts.add_to(7, 1);
//! counts.add_to(7, 1);
//! assert_eq!(counts.get(&7), Some(&2));
//!
//! let mut events = BPlusTreeMap::new_multimap();
//! events.insert(10u64, "boot");
//! events.insert(20, "login");
//! events.insert(20, "logout");
//! assert_eq!(events.count(&20), 2);
//! assert_eq!(events.get(&20), Some(&"logout"));
//! assert_eq!(events.count_range(&0, &20, false), 1);
//! ```

pub mod bits;
pub mod btree;
pub mod config;
pub mod error;
pub mod hash;
pub mod hashing;
pub mod lookup;

pub use btree::{BPlusTreeMap, Comparator, NaturalOrder, ReverseOrder};
pub use config::{Config, HashConfig, TreeConfig};
pub use error::{CollectionError, Result};
pub use hash::{HashMap, HashSet};
pub use hashing::{DefaultStrategy, HashKey, HashStrategy};
pub use lookup::Lookup;

#[cfg(test)]
mod proptests;
