//! Recovered abstract syntax tree of a method
//!
//! This is the input to regeneration. A [`CompilationUnit`] declares the variables and
//! parameters of the method and owns its [`ControlFlowGraph`]. Each graph node owns a
//! [`BasicBlock`] of statements, and exception handling regions are described as sub-graphs.
//!
//! Expressions are trees whose leaves are instruction templates and variable references.
//! Instruction templates are plain [`crate::cil::Instruction`]s: a branch to another node uses
//! that node's anchor ([`ControlFlowGraph::anchor`]) as its target.

mod cfg;
mod expression;
mod format;
mod unit;

pub use cfg::*;
pub use expression::*;
pub use unit::*;
