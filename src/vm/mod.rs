//! Properties of the virtual machine the input was recovered from

mod constants;

pub use constants::*;
