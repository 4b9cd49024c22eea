use crate::ast::InstructionExpression;
use crate::cil::Pops;
use crate::regen::Error;

/// Check that an instruction expression is well formed
///
/// Returns the stack depth left by the expression, assuming each argument leaves one value.
pub fn validate_expression(
    expression: &InstructionExpression<'_>,
    method_returns_value: bool,
) -> Result<usize, Error> {
    let depth = check_stack_balance(expression, method_returns_value)?;
    check_operands(expression)?;
    Ok(depth)
}

/// Simulate the template on a stack holding the arguments
///
/// The stack must never be popped below empty.
pub fn check_stack_balance(
    expression: &InstructionExpression<'_>,
    method_returns_value: bool,
) -> Result<usize, Error> {
    let mut depth = expression.arguments.len();
    for instruction in &expression.instructions {
        let usage = instruction.stack_usage(method_returns_value);
        depth = match usage.pops {
            Pops::All => 0,
            Pops::Count(pops) if pops <= depth => depth - pops,
            Pops::Count(_) => {
                return Err(Error::StackImbalance {
                    expression: expression.to_string(),
                    instruction: instruction.to_string(),
                    depth,
                })
            }
        };
        depth += usage.pushes;
    }
    Ok(depth)
}

/// Check that every operand has the shape its opcode demands
pub fn check_operands(expression: &InstructionExpression<'_>) -> Result<(), Error> {
    for instruction in &expression.instructions {
        if !instruction.has_valid_operand() {
            return Err(Error::OperandMismatch {
                expression: expression.to_string(),
                instruction: instruction.to_string(),
                expected: instruction.opcode.operand_type(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ast::Expression;
    use crate::cil::{IdGenerator, InsnId, InsnIdGenerator, Instruction, OpCode, Operand, OperandType};

    fn instruction_expression<'g>(
        arguments: usize,
        instructions: Vec<Instruction<'g>>,
    ) -> InstructionExpression<'g> {
        let arguments = (0..arguments)
            .map(|i| {
                Expression::instructions(
                    vec![],
                    vec![Instruction::new(OpCode::LdcI4, Operand::Int32(i as i32))],
                )
            })
            .collect();
        InstructionExpression {
            arguments,
            instructions,
            flags_update: None,
            result_type: None,
        }
    }

    #[test]
    fn balance_adds_net_effect() {
        let expression = instruction_expression(
            3,
            vec![
                Instruction::simple(OpCode::Add),
                Instruction::simple(OpCode::Dup),
                Instruction::simple(OpCode::Mul),
            ],
        );
        assert_eq!(check_stack_balance(&expression, false).unwrap(), 2);
    }

    #[test]
    fn leave_empties_the_stack() {
        let mut ids = InsnIdGenerator::new(InsnId::FIRST);
        let leave = Instruction::new(OpCode::Leave, Operand::Target(ids.fresh_id()));
        let expression = instruction_expression(2, vec![leave]);
        assert_eq!(validate_expression(&expression, false).unwrap(), 0);
    }

    #[test]
    fn underflow_is_reported() {
        let expression = instruction_expression(1, vec![Instruction::simple(OpCode::Add)]);
        let err = check_stack_balance(&expression, false).unwrap_err();
        assert_eq!(
            err.to_string(),
            "add underflows a stack of depth 1 in add(ldc.i4 0())"
        );
        match err {
            Error::StackImbalance {
                expression,
                instruction,
                depth,
            } => {
                assert_eq!(expression, "add(ldc.i4 0())");
                assert_eq!(instruction, "add");
                assert_eq!(depth, 1);
            }
            other => panic!("expected stack imbalance, got {:?}", other),
        }
    }

    #[test]
    fn operand_mismatch_is_reported() {
        let expression = instruction_expression(0, vec![Instruction::new(OpCode::LdcI4, Operand::Int8(1))]);
        let err = check_operands(&expression).unwrap_err();
        assert_eq!(
            err.to_string(),
            "ldc.i4 1 should have an operand of kind InlineI in ldc.i4 1()"
        );
        match err {
            Error::OperandMismatch {
                expression,
                instruction,
                expected,
            } => {
                assert_eq!(expression, "ldc.i4 1()");
                assert_eq!(instruction, "ldc.i4 1");
                assert_eq!(expected, OperandType::InlineI)
            }
            other => panic!("expected operand mismatch, got {:?}", other),
        }
    }
}
