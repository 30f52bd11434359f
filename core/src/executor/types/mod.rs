//! Type definitions for the executor
//!
//! - Compiled instructions (Instruction, Op, Arg)
//! - Runtime values (Val)

pub mod instruction;
pub mod values;

pub use instruction::{Arg, Instruction, Op, UNRESOLVED};
pub use values::Val;
