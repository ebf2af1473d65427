//! # Value model
//!
//! Runtime values and the heap objects they may point at. Heap objects are
//! shared through `Rc` because constants, stack slots and globals can all
//! refer to the same object, and no object is ever mutated after it is built.

pub mod object;
pub mod value;
