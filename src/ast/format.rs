//! Renderings of the AST, used when reporting errors

use crate::ast::*;
use std::fmt;

impl fmt::Display for VariableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableRef::Local(VariableId(idx)) => write!(f, "var{}", idx),
            VariableRef::Parameter(ParameterId(idx)) => write!(f, "arg{}", idx),
        }
    }
}

impl<'g> fmt::Display for Expression<'g> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Instruction(insn) => fmt::Display::fmt(insn, f),
            Expression::Variable(VariableExpression {
                variable,
                is_address: true,
            }) => write!(f, "&{}", variable),
            Expression::Variable(VariableExpression {
                variable,
                is_address: false,
            }) => fmt::Display::fmt(variable, f),
            Expression::UnboxToHost(unbox) => {
                write!(f, "unbox<{}>({})", unbox.target_type, unbox.expression)
            }
        }
    }
}

impl<'g> fmt::Display for InstructionExpression<'g> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.instructions.as_slice() {
            [single] => write!(f, "{}", single)?,
            instructions => {
                f.write_str("[")?;
                for (i, instruction) in instructions.iter().enumerate() {
                    if i > 0 {
                        f.write_str("; ")?;
                    }
                    write!(f, "{}", instruction)?;
                }
                f.write_str("]")?;
            }
        }

        f.write_str("(")?;
        for (i, argument) in self.arguments.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", argument)?;
        }
        f.write_str(")")?;

        if let Some(flags) = self.flags_update {
            write!(f, " updating {:?}", flags.affected)?;
            if flags.invert {
                f.write_str(" (inverted)")?;
            }
        }
        if let Some(result_type) = self.result_type {
            write!(f, " : {}", result_type)?;
        }
        Ok(())
    }
}

impl<'g> fmt::Display for Statement<'g> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Expression(expression) => fmt::Display::fmt(expression, f),
            Statement::Assignment(assignment) => {
                write!(f, "{} = {}", assignment.target, assignment.value)
            }
        }
    }
}

impl<'g> fmt::Display for BasicBlock<'g> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for statement in &self.statements {
            writeln!(f, "{};", statement)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cil::metadata::*;
    use crate::cil::{Instruction, OpCode, Operand};
    use crate::vm::VmFlags;

    #[test]
    fn render_expressions() {
        let arenas = MetadataArenas::new();
        let metadata = Metadata::new(&arenas);
        let int32 = metadata.import_type("System.Int32", true);

        let mut unit = CompilationUnit::new(ControlFlowGraph::new());
        let x = unit.declare_variable("x", int32);
        let this = unit.declare_parameter("this", metadata.core_types().object);

        let sum = Expression::typed_instructions(
            vec![
                Expression::load(x),
                Expression::typed_instructions(
                    vec![],
                    vec![Instruction::new(OpCode::LdcI4, Operand::Int32(2))],
                    int32,
                ),
            ],
            vec![Instruction::simple(OpCode::Add)],
            int32,
        )
        .with_flags(VmFlags::ZERO | VmFlags::SIGN, false);
        assert_eq!(
            sum.to_string(),
            "add(var0, ldc.i4 2() : System.Int32) updating ZERO | SIGN : System.Int32"
        );

        let store = Statement::assign(x, Expression::unbox_to_host(Expression::address_of(this), int32));
        assert_eq!(store.to_string(), "var0 = unbox<System.Int32>(&arg0)");
    }
}
