//! Model set implementations.

pub mod memory;

pub use memory::{MemoryModelSet, ModelFile};
