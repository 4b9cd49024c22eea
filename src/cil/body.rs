use crate::cil::metadata::TypeId;
use crate::cil::{EmittedInstruction, Error, InsnId, Operand, OperandType};
use crate::util::{Offset, OffsetVec, Width};
use byteorder::{LittleEndian, WriteBytesExt};
use std::collections::HashMap;
use std::fmt;

/// Kind of exception handler clause
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    Catch,
    Filter,
    Fault,
    Finally,
}

impl HandlerKind {
    /// Clause flags in the method body exception section
    pub fn clause_flags(self) -> u32 {
        match self {
            HandlerKind::Catch => 0x0,
            HandlerKind::Filter => 0x1,
            HandlerKind::Finally => 0x2,
            HandlerKind::Fault => 0x4,
        }
    }
}

/// Exception handler clause
///
/// All of the boundaries are instruction identities. Ends are exclusive: they name the first
/// instruction _after_ the protected or handler range.
#[derive(Clone, PartialEq, Eq)]
pub struct ExceptionHandler<'g> {
    pub kind: HandlerKind,
    pub try_start: InsnId,
    pub try_end: InsnId,

    /// Start of the filter block (only for [`HandlerKind::Filter`])
    pub filter_start: Option<InsnId>,

    pub handler_start: InsnId,
    pub handler_end: InsnId,

    /// Exception type caught (only for [`HandlerKind::Catch`])
    pub catch_type: Option<TypeId<'g>>,
}

impl<'g> fmt::Debug for ExceptionHandler<'g> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} try [{}, {}) ",
            self.kind, self.try_start, self.try_end
        )?;
        if let Some(filter_start) = self.filter_start {
            write!(f, "filter {} ", filter_start)?;
        }
        write!(f, "handler [{}, {})", self.handler_start, self.handler_end)?;
        if let Some(catch_type) = self.catch_type {
            write!(f, " catching {}", catch_type)?;
        }
        Ok(())
    }
}

/// Regenerated method body
///
/// Instructions have their final offsets. Everything else (branch operands, exception handlers)
/// refers to instructions by identity, so it can be resolved to offsets with [`Self::offset_of`].
pub struct MethodBody<'g> {
    /// Instructions, at their encoded offsets
    pub instructions: OffsetVec<EmittedInstruction<'g>>,

    /// Index of each instruction in `instructions`
    positions: HashMap<InsnId, usize>,

    pub exception_handlers: Vec<ExceptionHandler<'g>>,

    /// Maximum evaluation stack depth (zero until computed)
    pub max_stack: u16,
}

impl<'g> MethodBody<'g> {
    /// Lay out the instructions in order, assigning offsets
    pub fn new(instructions: Vec<EmittedInstruction<'g>>) -> MethodBody<'g> {
        let positions = instructions
            .iter()
            .enumerate()
            .map(|(idx, insn)| (insn.id, idx))
            .collect();
        MethodBody {
            instructions: instructions.into_iter().collect(),
            positions,
            exception_handlers: vec![],
            max_stack: 0,
        }
    }

    /// Total encoded size of the instructions
    pub fn code_size(&self) -> Offset {
        self.instructions.offset_len()
    }

    /// Index of an instruction in the body
    pub fn position(&self, id: InsnId) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    /// Instruction and its offset
    pub fn get(&self, id: InsnId) -> Option<(Offset, &EmittedInstruction<'g>)> {
        self.position(id)
            .and_then(|idx| self.instructions.get_index(idx))
    }

    pub fn offset_of(&self, id: InsnId) -> Option<Offset> {
        self.get(id).map(|(offset, _)| offset)
    }

    /// Instruction encoded immediately after the given one
    ///
    /// This is found by offset: the next instruction starts where the given one ends. Returns
    /// `None` if the given instruction is unknown or is the last in the body.
    pub fn following(&self, id: InsnId) -> Option<InsnId> {
        let (offset, insn) = self.get(id)?;
        let next_offset = Offset(offset.0 + insn.width());
        self.instructions
            .get_offset(next_offset)
            .ok()
            .map(|next| next.id)
    }

    /// Encode the instruction stream
    ///
    /// Member and signature operands are encoded with their metadata tokens. Strings need a
    /// user-string heap token, which is provided by `user_string_token`.
    pub fn encode_code(
        &self,
        user_string_token: &mut dyn FnMut(&str) -> u32,
    ) -> Result<Vec<u8>, Error> {
        if u32::try_from(self.code_size().0).is_err() {
            return Err(Error::MethodCodeOverflow(self.code_size()));
        }

        let mut code: Vec<u8> = Vec::with_capacity(self.code_size().0);
        for (offset, _, emitted) in &self.instructions {
            let id = emitted.id;
            let opcode = emitted.instruction.opcode;
            let next_offset = Offset(offset.0 + emitted.width());
            let displacement = |target: InsnId| -> Result<isize, Error> {
                let target_offset = self
                    .offset_of(target)
                    .ok_or(Error::UnknownInstruction(target))?;
                Ok(target_offset - next_offset)
            };
            let out_of_range = |displacement: isize| Error::BranchOutOfRange {
                instruction: id,
                displacement,
            };

            let value = opcode.value();
            if value > 0xFF {
                code.write_u8((value >> 8) as u8)?;
            }
            code.write_u8(value as u8)?;

            match (opcode.operand_type(), &emitted.instruction.operand) {
                (OperandType::InlineNone, Operand::None) => (),
                (OperandType::ShortInlineBrTarget, Operand::Target(target)) => {
                    let disp = displacement(*target)?;
                    code.write_i8(i8::try_from(disp).map_err(|_| out_of_range(disp))?)?;
                }
                (OperandType::InlineBrTarget, Operand::Target(target)) => {
                    let disp = displacement(*target)?;
                    code.write_i32::<LittleEndian>(
                        i32::try_from(disp).map_err(|_| out_of_range(disp))?,
                    )?;
                }
                (OperandType::InlineSwitch, Operand::Switch(targets)) => {
                    code.write_u32::<LittleEndian>(targets.len() as u32)?;
                    for target in targets {
                        let disp = displacement(*target)?;
                        code.write_i32::<LittleEndian>(
                            i32::try_from(disp).map_err(|_| out_of_range(disp))?,
                        )?;
                    }
                }
                (OperandType::ShortInlineI, Operand::Int8(value)) => code.write_i8(*value)?,
                (OperandType::InlineI, Operand::Int32(value)) => {
                    code.write_i32::<LittleEndian>(*value)?
                }
                (OperandType::InlineI8, Operand::Int64(value)) => {
                    code.write_i64::<LittleEndian>(*value)?
                }
                (OperandType::ShortInlineR, Operand::Float32(value)) => {
                    code.write_f32::<LittleEndian>(*value)?
                }
                (OperandType::InlineR, Operand::Float64(value)) => {
                    code.write_f64::<LittleEndian>(*value)?
                }
                (OperandType::InlineString, Operand::String(string)) => {
                    code.write_u32::<LittleEndian>(user_string_token(string))?
                }
                (
                    OperandType::InlineField
                    | OperandType::InlineMethod
                    | OperandType::InlineType
                    | OperandType::InlineTok,
                    Operand::Member(member),
                ) => code.write_u32::<LittleEndian>(member.token())?,
                (OperandType::InlineSig, Operand::Signature(signature)) => {
                    code.write_u32::<LittleEndian>(signature.token)?
                }
                (OperandType::InlineVar, Operand::Local(index))
                | (OperandType::InlineArg, Operand::Argument(index)) => {
                    code.write_u16::<LittleEndian>(*index)?
                }
                (OperandType::ShortInlineVar, Operand::Local(index))
                | (OperandType::ShortInlineArg, Operand::Argument(index)) => {
                    let index = u8::try_from(*index).map_err(|_| Error::OperandOutOfRange {
                        instruction: id,
                        opcode,
                    })?;
                    code.write_u8(index)?
                }
                _ => {
                    return Err(Error::InvalidOperand {
                        instruction: id,
                        opcode,
                    })
                }
            }
        }

        Ok(code)
    }

    /// Encode the exception handlers as a fat exception section
    ///
    /// Returns an empty vector if there are no exception handlers.
    pub fn encode_exception_section(&self) -> Result<Vec<u8>, Error> {
        if self.exception_handlers.is_empty() {
            return Ok(vec![]);
        }

        let data_size = fat_section_size(self.exception_handlers.len())?;
        let mut section: Vec<u8> = Vec::with_capacity(data_size as usize);
        section.write_u8(SECT_EH_TABLE | SECT_FAT_FORMAT)?;
        section.write_u24::<LittleEndian>(data_size)?;

        let offset = |id: InsnId| -> Result<u32, Error> {
            let offset = self.offset_of(id).ok_or(Error::UnknownInstruction(id))?;
            u32::try_from(offset.0).map_err(|_| Error::MethodCodeOverflow(offset))
        };
        let length = |start: InsnId, end: InsnId| -> Result<u32, Error> {
            offset(end)?
                .checked_sub(offset(start)?)
                .ok_or(Error::InvertedRange { start, end })
        };
        for handler in &self.exception_handlers {
            section.write_u32::<LittleEndian>(handler.kind.clause_flags())?;
            section.write_u32::<LittleEndian>(offset(handler.try_start)?)?;
            section.write_u32::<LittleEndian>(length(handler.try_start, handler.try_end)?)?;
            section.write_u32::<LittleEndian>(offset(handler.handler_start)?)?;
            section.write_u32::<LittleEndian>(length(handler.handler_start, handler.handler_end)?)?;
            let class_token_or_filter = match (handler.kind, handler.filter_start, handler.catch_type) {
                (HandlerKind::Filter, Some(filter_start), _) => offset(filter_start)?,
                (HandlerKind::Catch, _, Some(catch_type)) => catch_type.token,
                _ => 0,
            };
            section.write_u32::<LittleEndian>(class_token_or_filter)?;
        }

        Ok(section)
    }
}

const SECT_EH_TABLE: u8 = 0x01;
const SECT_FAT_FORMAT: u8 = 0x40;
const FAT_CLAUSE_SIZE: usize = 24;

/// Size of a fat exception section, which must fit in 24 bits
fn fat_section_size(handler_count: usize) -> Result<u32, Error> {
    handler_count
        .checked_mul(FAT_CLAUSE_SIZE)
        .and_then(|clauses| clauses.checked_add(4))
        .filter(|size| *size <= 0xFF_FFFF)
        .map(|size| size as u32)
        .ok_or(Error::ExceptionSectionOverflow(handler_count))
}

impl<'g> fmt::Debug for MethodBody<'g> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodBody")
            .field("max_stack", &self.max_stack)
            .field("instructions", &self.instructions)
            .field("exception_handlers", &self.exception_handlers)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cil::metadata::*;
    use crate::cil::{IdGenerator, InsnIdGenerator, Instruction, OpCode};

    #[test]
    fn following_instruction_by_offset() {
        let mut ids = InsnIdGenerator::new(InsnId::FIRST);
        let a = ids.emit(Instruction::anchor());
        let b = ids.emit(Instruction::new(OpCode::LdcI4, Operand::Int32(1)));
        let c = ids.emit(Instruction::simple(OpCode::Ret));
        let (a_id, b_id, c_id) = (a.id, b.id, c.id);

        let body = MethodBody::new(vec![a, b, c]);
        assert_eq!(body.offset_of(c_id), Some(Offset(6)));
        assert_eq!(body.following(a_id), Some(b_id));
        assert_eq!(body.following(b_id), Some(c_id));
        assert_eq!(body.following(c_id), None);
        assert_eq!(body.following(ids.fresh_id()), None);
    }

    #[test]
    fn encode_branches_and_operands() {
        let mut ids = InsnIdGenerator::new(InsnId::FIRST);
        let target = ids.emit(Instruction::anchor());
        let target_id = target.id;
        let body = MethodBody::new(vec![
            target,
            ids.emit(Instruction::new(OpCode::LdcI4S, Operand::Int8(-2))),
            ids.emit(Instruction::new(OpCode::Stloc, Operand::Local(260))),
            ids.emit(Instruction::new(OpCode::Ldstr, Operand::String("hi".to_owned()))),
            ids.emit(Instruction::new(OpCode::BrS, Operand::Target(target_id))),
        ]);

        let mut strings = vec![];
        let code = body
            .encode_code(&mut |s| {
                strings.push(s.to_owned());
                0x7000_0001
            })
            .unwrap();
        assert_eq!(
            code,
            vec![
                0x00, // nop
                0x1F, 0xFE, // ldc.i4.s -2
                0xFE, 0x0E, 0x04, 0x01, // stloc 260
                0x72, 0x01, 0x00, 0x00, 0x70, // ldstr
                0x2B, 0xF2, // br.s -14
            ]
        );
        assert_eq!(strings, vec!["hi".to_owned()]);
    }

    #[test]
    fn encode_rejects_bad_operands() {
        let mut ids = InsnIdGenerator::new(InsnId::FIRST);
        let body = MethodBody::new(vec![ids.emit(Instruction::new(OpCode::LdlocS, Operand::Local(300)))]);
        assert!(matches!(
            body.encode_code(&mut |_| 0),
            Err(Error::OperandOutOfRange { opcode: OpCode::LdlocS, .. })
        ));

        let body = MethodBody::new(vec![ids.emit(Instruction::new(OpCode::Add, Operand::Int32(0)))]);
        assert!(matches!(
            body.encode_code(&mut |_| 0),
            Err(Error::InvalidOperand { opcode: OpCode::Add, .. })
        ));

        let dangling = ids.fresh_id();
        let body = MethodBody::new(vec![ids.emit(Instruction::new(OpCode::Br, Operand::Target(dangling)))]);
        assert!(matches!(
            body.encode_code(&mut |_| 0),
            Err(Error::UnknownInstruction(id)) if id == dangling
        ));
    }

    #[test]
    fn encode_catch_clause() {
        let arenas = MetadataArenas::new();
        let metadata = Metadata::new(&arenas);
        let exception = metadata.core_types().exception;

        let mut ids = InsnIdGenerator::new(InsnId::FIRST);
        let insns: Vec<_> = (0..4).map(|_| ids.emit(Instruction::anchor())).collect();
        let (start, handler, end) = (insns[0].id, insns[2].id, insns[3].id);
        let mut body = MethodBody::new(insns);
        body.exception_handlers.push(ExceptionHandler {
            kind: HandlerKind::Catch,
            try_start: start,
            try_end: handler,
            filter_start: None,
            handler_start: handler,
            handler_end: end,
            catch_type: Some(exception),
        });

        let section = body.encode_exception_section().unwrap();
        assert_eq!(section.len(), 28);
        assert_eq!(&section[0..4], &[0x41, 28, 0, 0]);
        assert_eq!(&section[4..8], &[0, 0, 0, 0]); // catch
        assert_eq!(&section[8..12], &[0, 0, 0, 0]); // try offset
        assert_eq!(&section[12..16], &[2, 0, 0, 0]); // try length
        assert_eq!(&section[16..20], &[2, 0, 0, 0]); // handler offset
        assert_eq!(&section[20..24], &[1, 0, 0, 0]); // handler length
        assert_eq!(&section[24..28], &exception.token.to_le_bytes());
    }

    #[test]
    fn exception_section_size_limit() {
        assert_eq!(fat_section_size(1).unwrap(), 28);
        assert_eq!(fat_section_size(699_050).unwrap(), 0xFF_FFF4);
        assert!(matches!(
            fat_section_size(699_051),
            Err(Error::ExceptionSectionOverflow(699_051))
        ));
        assert!(matches!(
            fat_section_size(usize::MAX),
            Err(Error::ExceptionSectionOverflow(_))
        ));
    }

    #[test]
    fn inverted_handler_range_is_rejected() {
        let mut ids = InsnIdGenerator::new(InsnId::FIRST);
        let insns: Vec<_> = (0..3).map(|_| ids.emit(Instruction::anchor())).collect();
        let (first, second, third) = (insns[0].id, insns[1].id, insns[2].id);
        let mut body = MethodBody::new(insns);
        body.exception_handlers.push(ExceptionHandler {
            kind: HandlerKind::Fault,
            try_start: second,
            try_end: first,
            filter_start: None,
            handler_start: second,
            handler_end: third,
            catch_type: None,
        });
        assert!(matches!(
            body.encode_exception_section(),
            Err(Error::InvertedRange { start, end }) if start == second && end == first
        ));
    }
}
