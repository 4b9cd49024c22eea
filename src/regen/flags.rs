use crate::cil::{EmittedInstruction, InsnIdGenerator, Instruction};
use crate::regen::Error;

/// Options for lowering a binary flag-affecting expression
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BinaryFlagsOptions {
    /// Concrete mask of the flags to update
    pub mask: u8,

    /// Invert the result before computing the flags
    pub invert: bool,

    /// Leave the result of the operation on the stack
    pub push_result: bool,
}

/// Lowering of expressions that also update the VM flags register
///
/// Implementations get the already lowered arguments and the operator template, and return the
/// whole instruction sequence: computing the result, updating the flags, and (for binary
/// expressions with `push_result`) leaving the result on the stack. New instructions must get
/// their identities from `ids`.
pub trait FlagsExpressionBuilder<'g> {
    fn build_unary(
        &mut self,
        ids: &mut InsnIdGenerator,
        argument: Vec<EmittedInstruction<'g>>,
        operator: &[Instruction<'g>],
        mask: u8,
    ) -> Result<Vec<EmittedInstruction<'g>>, Error>;

    fn build_binary(
        &mut self,
        ids: &mut InsnIdGenerator,
        left: Vec<EmittedInstruction<'g>>,
        right: Vec<EmittedInstruction<'g>>,
        operator: &[Instruction<'g>],
        options: BinaryFlagsOptions,
    ) -> Result<Vec<EmittedInstruction<'g>>, Error>;
}
