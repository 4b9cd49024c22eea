use crate::ast::VariableRef;
use crate::cil::metadata::TypeId;
use crate::cil::Instruction;
use crate::vm::VmFlags;

/// Statements of one control-flow graph node
#[derive(Clone, Debug, Default)]
pub struct BasicBlock<'g> {
    pub statements: Vec<Statement<'g>>,
}

impl<'g> BasicBlock<'g> {
    pub fn new(statements: Vec<Statement<'g>>) -> BasicBlock<'g> {
        BasicBlock { statements }
    }
}

#[derive(Clone, Debug)]
pub enum Statement<'g> {
    /// Expression evaluated for its effect
    Expression(Expression<'g>),

    Assignment(AssignmentStatement<'g>),
}

#[derive(Clone, Debug)]
pub struct AssignmentStatement<'g> {
    pub target: VariableRef,
    pub value: Expression<'g>,
}

impl<'g> Statement<'g> {
    pub fn assign(target: VariableRef, value: Expression<'g>) -> Statement<'g> {
        Statement::Assignment(AssignmentStatement { target, value })
    }
}

#[derive(Clone, Debug)]
pub enum Expression<'g> {
    Instruction(InstructionExpression<'g>),
    Variable(VariableExpression),
    UnboxToHost(UnboxToHostExpression<'g>),
}

/// Expression backed by a fixed template of instructions
///
/// The arguments are evaluated in order, then the template consumes their values.
#[derive(Clone, Debug)]
pub struct InstructionExpression<'g> {
    pub arguments: Vec<Expression<'g>>,
    pub instructions: Vec<Instruction<'g>>,

    /// Set if the expression also updates the VM flags register
    pub flags_update: Option<FlagsUpdate>,

    /// Type of the value left on the stack (`None` if there is none)
    pub result_type: Option<TypeId<'g>>,
}

/// Flags updated by an expression
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FlagsUpdate {
    pub affected: VmFlags,

    /// Invert the result before computing flags
    pub invert: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct VariableExpression {
    pub variable: VariableRef,

    /// Load the address of the variable instead of its value
    pub is_address: bool,
}

/// Convert a value in the VM representation into a value of a host type
#[derive(Clone, Debug)]
pub struct UnboxToHostExpression<'g> {
    pub expression: Box<Expression<'g>>,
    pub target_type: TypeId<'g>,
}

impl<'g> Expression<'g> {
    /// Template applied to arguments
    pub fn instructions(
        arguments: Vec<Expression<'g>>,
        instructions: Vec<Instruction<'g>>,
    ) -> Expression<'g> {
        Expression::Instruction(InstructionExpression {
            arguments,
            instructions,
            flags_update: None,
            result_type: None,
        })
    }

    /// Template applied to arguments, producing a value
    pub fn typed_instructions(
        arguments: Vec<Expression<'g>>,
        instructions: Vec<Instruction<'g>>,
        result_type: TypeId<'g>,
    ) -> Expression<'g> {
        Expression::Instruction(InstructionExpression {
            arguments,
            instructions,
            flags_update: None,
            result_type: Some(result_type),
        })
    }

    pub fn load(variable: VariableRef) -> Expression<'g> {
        Expression::Variable(VariableExpression {
            variable,
            is_address: false,
        })
    }

    pub fn address_of(variable: VariableRef) -> Expression<'g> {
        Expression::Variable(VariableExpression {
            variable,
            is_address: true,
        })
    }

    pub fn unbox_to_host(expression: Expression<'g>, target_type: TypeId<'g>) -> Expression<'g> {
        Expression::UnboxToHost(UnboxToHostExpression {
            expression: Box::new(expression),
            target_type,
        })
    }

    /// Mark an instruction expression as updating flags
    ///
    /// Other expressions are returned unchanged.
    pub fn with_flags(mut self, affected: VmFlags, invert: bool) -> Expression<'g> {
        if let Expression::Instruction(insn) = &mut self {
            insn.flags_update = Some(FlagsUpdate { affected, invert });
        }
        self
    }
}
