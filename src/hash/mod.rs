//! Open-addressing hash containers.

mod iter;
mod map;
mod raw;
mod set;

pub use iter::{IntoIter, Iter, IterMut, Keys, SetIntoIter, SetIter, Values, ValuesMut};
pub use map::HashMap;
pub use set::HashSet;

#[cfg(test)]
pub(crate) use raw::RawTable;
