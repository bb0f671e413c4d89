//! Ordered map on a B+tree.
//!
//! Nodes are held in an arena and addressed by index; leaves form a doubly
//! linked chain that iteration and range operations walk directly.

mod comparator;
mod iter;
mod map;
mod node;

pub use comparator::{Comparator, NaturalOrder, ReverseOrder};
pub use iter::{Iter, Keys, Range, Values};
pub use map::BPlusTreeMap;
pub use node::LEAF_CHUNK_BYTES;
