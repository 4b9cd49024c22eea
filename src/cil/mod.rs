//! Common Intermediate Language (ECMA-335) method bodies
//!
//! This is the output side of regeneration: instructions, the metadata they refer to, the method
//! whose body is being regenerated, and the finished [`MethodBody`] with its exception handlers.
//!
//! Instructions get an [`InsnId`] when they are emitted. Branch operands and exception handler
//! boundaries refer to those identities rather than to offsets, so code can be generated in any
//! order and laid out afterwards. Offsets only appear once a [`MethodBody`] is constructed.

mod body;
mod errors;
mod instruction;
pub mod jump_encoding;
pub mod metadata;
mod method;
mod opcodes;
mod stack_height;

pub use body::*;
pub use errors::*;
pub use instruction::*;
pub use method::*;
pub use opcodes::*;
pub use stack_height::*;
pub use crate::util::{Offset, OffsetResult, OffsetVec, Width};
