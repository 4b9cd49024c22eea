use crate::cil::{Error, HandlerKind, InsnId, MethodBody, OpCode, Pops};

/// Compute the maximum depth of the evaluation stack over a method body
///
/// This walks every path through the body, starting from the first instruction (with an empty
/// stack) and from every handler. Catch and filter handlers, along with filter blocks, start with
/// the exception object on the stack. Every instruction must always be reached with the same
/// stack depth, and `ret` must leave nothing but the return value behind.
pub fn max_stack_depth(body: &MethodBody<'_>, method_returns_value: bool) -> Result<u16, Error> {
    let instruction_count = body.instructions.len();
    let mut depths: Vec<Option<usize>> = vec![None; instruction_count];
    let mut max_depth: usize = 0;

    let position = |id: InsnId| body.position(id).ok_or(Error::UnknownInstruction(id));
    let mut worklist: Vec<(usize, usize)> = vec![];
    if instruction_count > 0 {
        worklist.push((0, 0));
    }
    for handler in &body.exception_handlers {
        let handler_depth = match handler.kind {
            HandlerKind::Catch | HandlerKind::Filter => 1,
            HandlerKind::Fault | HandlerKind::Finally => 0,
        };
        worklist.push((position(handler.handler_start)?, handler_depth));
        if let Some(filter_start) = handler.filter_start {
            worklist.push((position(filter_start)?, 1));
        }
    }

    while let Some((start, start_depth)) = worklist.pop() {
        let mut idx = start;
        let mut depth = start_depth;
        max_depth = max_depth.max(start_depth);

        while idx < instruction_count {
            let (_, insn) = body
                .instructions
                .get_index(idx)
                .ok_or(Error::MethodCodeOverflow(body.code_size()))?;

            match depths[idx] {
                Some(expected) if expected == depth => break,
                Some(expected) => {
                    return Err(Error::InconsistentStackDepth {
                        instruction: insn.id,
                        expected,
                        found: depth,
                    })
                }
                None => depths[idx] = Some(depth),
            }

            let usage = insn.instruction.stack_usage(method_returns_value);
            depth = match usage.pops {
                Pops::All => 0,
                Pops::Count(n) => depth
                    .checked_sub(n)
                    .ok_or(Error::StackUnderflow(insn.id))?,
            };
            if insn.instruction.opcode == OpCode::Ret && depth != 0 {
                return Err(Error::NonEmptyStackAtReturn {
                    instruction: insn.id,
                    depth,
                });
            }
            depth += usage.pushes;
            max_depth = max_depth.max(depth);

            for target in insn.instruction.operand.targets() {
                worklist.push((position(*target)?, depth));
            }
            if !insn.instruction.opcode.flow_control().falls_through() {
                break;
            }
            idx += 1;
        }
    }

    u16::try_from(max_depth).map_err(|_| Error::MaxStackOverflow(max_depth))
}
