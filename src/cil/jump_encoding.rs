//! Widen short branches whose displacement doesn't fit in a signed byte
//!
//! Generated code is free to use the short branch forms (`br.s`, `brtrue.s`, `leave.s`, ...).
//! Once all instructions are known, the ones that turned out to jump too far are rewritten into
//! their long forms.
//!
//! ### Termination
//!
//! Widening a branch makes it three bytes longer, which may push some other short branch out of
//! range, so this has to be iterated until nothing changes. It always finishes: instructions only
//! ever grow, and every round either widens at least one of the finitely many short branches or
//! stops.

use crate::cil::{EmittedInstruction, InsnId, Operand, OperandType};
use crate::util::Width;
use std::collections::HashMap;
use std::ops::RangeInclusive;

/// Range of relative branch displacements supported by short branch instructions
pub const SIGNED_8BIT_JUMP_RANGE: RangeInclusive<isize> =
    RangeInclusive::new(i8::MIN as isize, i8::MAX as isize);

/// Rewrite out-of-range short branches into long branches, in place
///
/// Returns the number of branches that were widened. Branches whose target is not among the
/// instructions are left alone (they get reported when the body is encoded).
pub fn widen_short_branches(instructions: &mut [EmittedInstruction<'_>]) -> usize {
    let mut widened = 0;
    loop {
        let mut offsets: HashMap<InsnId, isize> = HashMap::new();
        let mut current_offset: isize = 0;
        for insn in instructions.iter() {
            offsets.insert(insn.id, current_offset);
            current_offset += insn.width() as isize;
        }

        let mut widened_this_round = 0;
        for insn in instructions.iter_mut() {
            let instruction = &mut insn.instruction;
            if instruction.opcode.operand_type() != OperandType::ShortInlineBrTarget {
                continue;
            }
            let (long_form, target) = match (instruction.opcode.long_branch_form(), &instruction.operand) {
                (Some(long_form), Operand::Target(target)) => (long_form, *target),
                _ => continue,
            };
            let (start, target_offset) = match (offsets.get(&insn.id), offsets.get(&target)) {
                (Some(start), Some(target_offset)) => (*start, *target_offset),
                _ => continue,
            };

            let displacement = target_offset - (start + instruction.width() as isize);
            if !SIGNED_8BIT_JUMP_RANGE.contains(&displacement) {
                log::trace!(
                    "widening {:?} at {} (displacement {})",
                    instruction.opcode,
                    insn.id,
                    displacement
                );
                instruction.opcode = long_form;
                widened_this_round += 1;
            }
        }

        if widened_this_round == 0 {
            return widened;
        }
        widened += widened_this_round;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cil::{IdGenerator, InsnIdGenerator, Instruction, OpCode};

    fn nops(ids: &mut InsnIdGenerator, count: usize) -> Vec<EmittedInstruction<'static>> {
        (0..count).map(|_| ids.emit(Instruction::anchor())).collect()
    }

    #[test]
    fn near_branches_stay_short() {
        let mut ids = InsnIdGenerator::new(InsnId::FIRST);
        let mut code = nops(&mut ids, 128);
        let back = code[2].id;
        let last = code[127].id;

        // backwards by exactly 128 bytes
        code.push(ids.emit(Instruction::new(OpCode::BrtrueS, Operand::Target(back))));
        code.push(ids.emit(Instruction::new(OpCode::LeaveS, Operand::Target(last))));

        assert_eq!(widen_short_branches(&mut code), 0);
        assert_eq!(code[128].instruction.opcode, OpCode::BrtrueS);
        assert_eq!(code[129].instruction.opcode, OpCode::LeaveS);
    }

    #[test]
    fn far_branches_are_widened() {
        let mut ids = InsnIdGenerator::new(InsnId::FIRST);
        let mut code = nops(&mut ids, 129);
        let first = code[0].id;
        code.push(ids.emit(Instruction::new(OpCode::BltS, Operand::Target(first))));

        assert_eq!(widen_short_branches(&mut code), 1);
        assert_eq!(code[129].instruction.opcode, OpCode::Blt);
    }

    #[test]
    fn widening_can_cascade() {
        let mut ids = InsnIdGenerator::new(InsnId::FIRST);
        let near_id = ids.fresh_id();
        let far_id = ids.fresh_id();

        let mut code = vec![];
        let near_branch = ids.emit(Instruction::new(OpCode::BrS, Operand::Target(near_id)));
        let far_branch = ids.emit(Instruction::new(OpCode::BrfalseS, Operand::Target(far_id)));
        code.push(near_branch);
        code.push(far_branch);
        code.extend(nops(&mut ids, 124));
        code.push(EmittedInstruction {
            id: near_id,
            instruction: Instruction::anchor(),
        });
        code.extend(nops(&mut ids, 200));
        code.push(EmittedInstruction {
            id: far_id,
            instruction: Instruction::simple(OpCode::Ret),
        });

        // only the second branch is out of range at first, but widening it pushes the first
        // branch's target to a displacement of 129
        assert_eq!(widen_short_branches(&mut code), 2);
        assert_eq!(code[0].instruction.opcode, OpCode::Br);
        assert_eq!(code[1].instruction.opcode, OpCode::Brfalse);
    }

    #[test]
    fn unknown_targets_are_left_alone() {
        let mut ids = InsnIdGenerator::new(InsnId::FIRST);
        let dangling = ids.fresh_id();
        let mut code = vec![ids.emit(Instruction::new(OpCode::BrS, Operand::Target(dangling)))];
        assert_eq!(widen_short_branches(&mut code), 0);
        assert_eq!(code[0].instruction.opcode, OpCode::BrS);
    }
}
