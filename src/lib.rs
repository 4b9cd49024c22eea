//! Regenerate CIL method bodies from the recovered ASTs of virtualized methods
//!
//! The input is a [`ast::CompilationUnit`]: the variables, parameters and control-flow graph of
//! one method recovered from a VM's bytecode. The output is a [`cil::MethodBody`] with its
//! instructions laid out, its exception handlers resolved and its maximum stack depth computed,
//! ready to be encoded with [`cil::MethodBody::encode_code`].
//!
//! Entry point is [`regen::MethodGenerator`]. Expressions that also update the VM flags register
//! are lowered by a caller-supplied [`regen::FlagsExpressionBuilder`].

pub mod ast;
pub mod cil;
pub mod regen;
mod util;
pub mod vm;
