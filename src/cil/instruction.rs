use crate::cil::metadata::{MemberRef, SignatureId};
use crate::cil::{OpCode, OperandType, StackBehaviour};
use crate::util::Width;
use std::fmt::{self, Debug};

/// Opaque identity of an emitted instruction
///
/// Branch operands and exception handlers refer to instructions through this identity, so they
/// stay valid while instructions are still being generated, and after offsets are assigned.
#[derive(Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct InsnId(usize);

impl InsnId {
    /// First identity handed out by a fresh generator
    pub const FIRST: InsnId = InsnId(0);

    /// Get the next fresh identity
    pub fn next(&self) -> InsnId {
        InsnId(self.0 + 1)
    }
}

impl fmt::Debug for InsnId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_fmt(format_args!("L{}", self.0))
    }
}

impl fmt::Display for InsnId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_fmt(format_args!("L{}", self.0))
    }
}

/// Generates new identities
pub trait IdGenerator<Id> {
    /// Generate a fresh identity
    fn fresh_id(&mut self) -> Id;
}

/// Identity generator for [`InsnId`]
///
/// Cloning does not split the generator source - the cloned generator will produce the same
/// sequence of identities as the original.
#[derive(Clone, Debug)]
pub struct InsnIdGenerator(InsnId);

impl InsnIdGenerator {
    pub fn new(start: InsnId) -> InsnIdGenerator {
        InsnIdGenerator(start)
    }

    /// Wrap an instruction with a fresh identity
    pub fn emit<'g>(&mut self, instruction: Instruction<'g>) -> EmittedInstruction<'g> {
        EmittedInstruction {
            id: self.fresh_id(),
            instruction,
        }
    }
}

impl IdGenerator<InsnId> for InsnIdGenerator {
    fn fresh_id(&mut self) -> InsnId {
        let to_return = self.0;
        self.0 = self.0.next();
        to_return
    }
}

/// Instruction operand
///
/// Each [`OperandType`] has exactly one accepted representation (see [`Operand::fits`]).
#[derive(Clone, PartialEq)]
pub enum Operand<'g> {
    None,
    Target(InsnId),
    Switch(Vec<InsnId>),
    Int8(i8),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    String(String),
    Member(MemberRef<'g>),
    Signature(SignatureId<'g>),
    Local(u16),
    Argument(u16),
}

impl<'g> Operand<'g> {
    /// Is this operand the representation demanded by the operand type?
    pub fn fits(&self, operand_type: OperandType) -> bool {
        match operand_type {
            OperandType::InlineNone => matches!(self, Operand::None),
            OperandType::InlineBrTarget | OperandType::ShortInlineBrTarget => {
                matches!(self, Operand::Target(_))
            }
            OperandType::InlineField
            | OperandType::InlineMethod
            | OperandType::InlineType
            | OperandType::InlineTok => matches!(self, Operand::Member(_)),
            OperandType::InlineSig => matches!(self, Operand::Signature(_)),
            OperandType::InlineI => matches!(self, Operand::Int32(_)),
            OperandType::InlineI8 => matches!(self, Operand::Int64(_)),
            OperandType::ShortInlineI => matches!(self, Operand::Int8(_)),
            OperandType::InlineR => matches!(self, Operand::Float64(_)),
            OperandType::ShortInlineR => matches!(self, Operand::Float32(_)),
            OperandType::InlineString => matches!(self, Operand::String(_)),
            OperandType::InlineSwitch => matches!(self, Operand::Switch(_)),
            OperandType::InlineVar | OperandType::ShortInlineVar => {
                matches!(self, Operand::Local(_))
            }
            OperandType::InlineArg | OperandType::ShortInlineArg => {
                matches!(self, Operand::Argument(_))
            }
        }
    }

    /// Instructions this operand may transfer control to
    pub fn targets(&self) -> &[InsnId] {
        match self {
            Operand::Target(target) => std::slice::from_ref(target),
            Operand::Switch(targets) => targets,
            _ => &[],
        }
    }
}

impl<'g> fmt::Debug for Operand<'g> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::None => Ok(()),
            Operand::Target(target) => target.fmt(f),
            Operand::Switch(targets) => {
                f.write_str("(")?;
                for (i, target) in targets.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    target.fmt(f)?;
                }
                f.write_str(")")
            }
            Operand::Int8(value) => value.fmt(f),
            Operand::Int32(value) => value.fmt(f),
            Operand::Int64(value) => value.fmt(f),
            Operand::Float32(value) => value.fmt(f),
            Operand::Float64(value) => value.fmt(f),
            Operand::String(value) => value.fmt(f),
            Operand::Member(member) => member.fmt(f),
            Operand::Signature(signature) => signature.fmt(f),
            Operand::Local(index) => write!(f, "V_{}", index),
            Operand::Argument(index) => write!(f, "A_{}", index),
        }
    }
}

/// Stack slots consumed by an instruction
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Pops {
    Count(usize),

    /// The whole evaluation stack is emptied
    All,
}

/// Effect of one instruction on the evaluation stack
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StackUsage {
    pub pops: Pops,
    pub pushes: usize,
}

/// CIL instruction: an opcode and its operand
#[derive(Clone, PartialEq)]
pub struct Instruction<'g> {
    pub opcode: OpCode,
    pub operand: Operand<'g>,
}

impl<'g> Instruction<'g> {
    pub fn new(opcode: OpCode, operand: Operand<'g>) -> Instruction<'g> {
        Instruction { opcode, operand }
    }

    /// Instruction without an operand
    pub fn simple(opcode: OpCode) -> Instruction<'g> {
        Instruction {
            opcode,
            operand: Operand::None,
        }
    }

    /// Placeholder instruction that anchors the start of a block
    pub fn anchor() -> Instruction<'g> {
        Instruction::simple(OpCode::Nop)
    }

    /// Does the operand have the shape required by the opcode?
    pub fn has_valid_operand(&self) -> bool {
        self.operand.fits(self.opcode.operand_type())
    }

    /// Stack slots consumed and produced by this instruction
    ///
    /// Opcodes whose stack effect depends on a signature look it up in the operand (calls) or
    /// use `method_returns_value` (`ret`). If the operand doesn't have the expected shape, the
    /// variable part of the effect is taken to be zero.
    pub fn stack_usage(&self, method_returns_value: bool) -> StackUsage {
        let pops = match self.opcode.stack_pop() {
            StackBehaviour::Fixed(n) => Pops::Count(n),
            StackBehaviour::All => Pops::All,
            StackBehaviour::Variable => Pops::Count(self.variable_pops(method_returns_value)),
        };
        let pushes = match self.opcode.stack_push() {
            StackBehaviour::Fixed(n) => n,
            StackBehaviour::All => 0,
            StackBehaviour::Variable => self.variable_pushes(),
        };
        StackUsage { pops, pushes }
    }

    fn variable_pops(&self, method_returns_value: bool) -> usize {
        match (self.opcode, &self.operand) {
            (OpCode::Ret, _) => method_returns_value as usize,
            (OpCode::Newobj, Operand::Member(MemberRef::Method(method))) => {
                method.signature.parameters.len()
            }
            (OpCode::Call | OpCode::Callvirt, Operand::Member(MemberRef::Method(method))) => {
                method.signature.parameters.len() + method.signature.has_this as usize
            }
            (OpCode::Calli, Operand::Signature(signature)) => {
                signature.signature.parameters.len() + signature.signature.has_this as usize + 1
            }
            _ => 0,
        }
    }

    fn variable_pushes(&self) -> usize {
        match &self.operand {
            Operand::Member(MemberRef::Method(method)) => {
                method.signature.return_type.is_some() as usize
            }
            Operand::Signature(signature) => signature.signature.return_type.is_some() as usize,
            _ => 0,
        }
    }
}

impl<'g> Width for Instruction<'g> {
    fn width(&self) -> usize {
        let operand_width = match (&self.operand, self.opcode.operand_type()) {
            (Operand::Switch(targets), OperandType::InlineSwitch) => 4 + 4 * targets.len(),
            (_, operand_type) => operand_type.fixed_width(),
        };
        self.opcode.size() + operand_width
    }
}

impl<'g> fmt::Debug for Instruction<'g> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.operand {
            Operand::None => f.write_str(self.opcode.name()),
            _ => write!(f, "{} {:?}", self.opcode.name(), self.operand),
        }
    }
}

impl<'g> fmt::Display for Instruction<'g> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Instruction along with its identity in the generated method body
#[derive(Clone, PartialEq)]
pub struct EmittedInstruction<'g> {
    pub id: InsnId,
    pub instruction: Instruction<'g>,
}

impl<'g> Width for EmittedInstruction<'g> {
    fn width(&self) -> usize {
        self.instruction.width()
    }
}

impl<'g> fmt::Debug for EmittedInstruction<'g> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {:?}", self.id, self.instruction)
    }
}
