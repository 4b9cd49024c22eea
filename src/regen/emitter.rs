//! Lowering of AST nodes into instructions
//!
//! Every case returns its instructions rather than appending to a shared buffer, so that
//! flag-affecting expressions can hand the separately lowered arguments to the
//! [`FlagsExpressionBuilder`].
//!
//! [`FlagsExpressionBuilder`]: crate::regen::FlagsExpressionBuilder

use crate::ast::{
    AssignmentStatement, Expression, FlagsUpdate, InstructionExpression, Node, Statement,
    UnboxToHostExpression, VariableExpression, VariableRef,
};
use crate::cil::metadata::{CoreTypes, MemberRef, MethodId};
use crate::cil::{EmittedInstruction, Instruction, OpCode, Operand};
use crate::regen::{
    check_stack_balance, validate_expression, BinaryFlagsOptions, Error, GenerationContext,
};

type Code<'g> = Vec<EmittedInstruction<'g>>;

impl<'a, 'g> GenerationContext<'a, 'g> {
    /// Lower the block of a node, starting with the node's anchor
    pub fn emit_block(&mut self, node: &Node<'g>) -> Result<Code<'g>, Error> {
        let mut code = vec![EmittedInstruction {
            id: node.anchor,
            instruction: Instruction::anchor(),
        }];
        for statement in &node.block.statements {
            code.extend(self.emit_statement(statement)?);
        }
        Ok(code)
    }

    pub fn emit_statement(&mut self, statement: &Statement<'g>) -> Result<Code<'g>, Error> {
        match statement {
            Statement::Expression(expression) => {
                let discard = self.leaves_value(expression)?;
                let mut code = self.emit_expression(expression)?;
                if discard {
                    code.push(self.ids.emit(Instruction::simple(OpCode::Pop)));
                }
                Ok(code)
            }
            Statement::Assignment(AssignmentStatement { target, value }) => {
                let mut code = self.emit_expression(value)?;
                let opcode = if target.is_parameter() {
                    OpCode::Starg
                } else {
                    OpCode::Stloc
                };
                let store = Instruction::new(opcode, self.bindings.operand(*target)?);
                code.push(self.ids.emit(store));
                Ok(code)
            }
        }
    }

    pub fn emit_expression(&mut self, expression: &Expression<'g>) -> Result<Code<'g>, Error> {
        match expression {
            Expression::Variable(variable) => self.emit_variable(variable),
            Expression::Instruction(insn) => match insn.flags_update {
                Some(flags) => self.emit_flags_expression(insn, flags),
                None => self.emit_instruction_expression(insn),
            },
            Expression::UnboxToHost(unbox) => self.emit_unbox_to_host(unbox),
        }
    }

    /// Does evaluating the expression as a statement leave a value that must be popped?
    ///
    /// Typed expressions always leave their value. Untyped ones must leave nothing, except for
    /// binary flag-affecting expressions where the builder discards the result itself.
    fn leaves_value(&self, expression: &Expression<'g>) -> Result<bool, Error> {
        match expression {
            Expression::Variable(_) | Expression::UnboxToHost(_) => Ok(true),
            Expression::Instruction(insn) if insn.result_type.is_some() => Ok(true),
            Expression::Instruction(insn)
                if insn.flags_update.is_some() && insn.arguments.len() != 1 =>
            {
                Ok(false)
            }
            Expression::Instruction(insn) => {
                match check_stack_balance(insn, self.method_returns_value)? {
                    0 => Ok(false),
                    depth => Err(Error::ResidualValue {
                        expression: insn.to_string(),
                        depth,
                    }),
                }
            }
        }
    }

    fn emit_variable(&mut self, variable: &VariableExpression) -> Result<Code<'g>, Error> {
        let operand = self.bindings.operand(variable.variable)?;
        let opcode = match (variable.variable, variable.is_address) {
            (VariableRef::Parameter(_), false) => OpCode::Ldarg,
            (VariableRef::Parameter(_), true) => OpCode::Ldarga,
            (VariableRef::Local(_), false) => OpCode::Ldloc,
            (VariableRef::Local(_), true) => OpCode::Ldloca,
        };
        Ok(vec![self.ids.emit(Instruction::new(opcode, operand))])
    }

    fn emit_instruction_expression(
        &mut self,
        expression: &InstructionExpression<'g>,
    ) -> Result<Code<'g>, Error> {
        validate_expression(expression, self.method_returns_value)?;
        let mut code = vec![];
        for argument in &expression.arguments {
            code.extend(self.emit_expression(argument)?);
        }
        for instruction in &expression.instructions {
            code.push(self.ids.emit(instruction.clone()));
        }
        Ok(code)
    }

    fn emit_flags_expression(
        &mut self,
        expression: &InstructionExpression<'g>,
        flags: FlagsUpdate,
    ) -> Result<Code<'g>, Error> {
        validate_expression(expression, self.method_returns_value)?;

        let mask = self.settings.vm_constants.flag_mask(flags.affected);
        let in_expression = |cause: Error| Error::InExpression {
            expression: expression.to_string(),
            cause: Box::new(cause),
        };

        match expression.arguments.as_slice() {
            [argument] => {
                let argument = self.emit_expression(argument)?;
                self.flags_builder
                    .build_unary(&mut self.ids, argument, &expression.instructions, mask)
                    .map_err(in_expression)
            }
            [left, right] => {
                let left = self.emit_expression(left)?;
                let right = self.emit_expression(right)?;
                let options = BinaryFlagsOptions {
                    mask,
                    invert: flags.invert,
                    push_result: expression.result_type.is_some(),
                };
                self.flags_builder
                    .build_binary(&mut self.ids, left, right, &expression.instructions, options)
                    .map_err(in_expression)
            }
            arguments => Err(Error::UnsupportedFlagsArity {
                expression: expression.to_string(),
                arity: arguments.len(),
            }),
        }
    }

    fn emit_unbox_to_host(
        &mut self,
        unbox: &UnboxToHostExpression<'g>,
    ) -> Result<Code<'g>, Error> {
        let settings = self.settings;
        let helpers = &settings.runtime_helpers;
        let call = |method: MethodId<'g>| {
            Instruction::new(OpCode::Call, Operand::Member(MemberRef::Method(method)))
        };

        let mut code = self.emit_expression(&unbox.expression)?;
        if unbox.target_type.full_name == CoreTypes::OBJECT {
            code.push(self.ids.emit(call(helpers.to_object)));
        } else {
            let ldtoken = Instruction::new(
                OpCode::Ldtoken,
                Operand::Member(MemberRef::Type(unbox.target_type)),
            );
            code.push(self.ids.emit(ldtoken));
            code.push(self.ids.emit(call(helpers.get_type_from_handle)));
            code.push(self.ids.emit(call(helpers.to_type)));
        }
        Ok(code)
    }
}
