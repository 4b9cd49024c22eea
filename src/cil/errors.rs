use super::{InsnId, OpCode};
use crate::util::Offset;
use std::fmt;

/// Errors from finalizing or encoding a method body
#[derive(Debug)]
pub enum Error {
    IoError(std::io::Error),

    /// More locals than can be indexed
    LocalsOverflow,

    /// An instruction refers to an instruction that is not in the method body
    UnknownInstruction(InsnId),

    /// The operand doesn't have the shape the opcode requires
    InvalidOperand { instruction: InsnId, opcode: OpCode },

    /// The operand has the right shape but doesn't fit in its encoding
    OperandOutOfRange { instruction: InsnId, opcode: OpCode },

    /// Branch displacement doesn't fit in the branch encoding
    BranchOutOfRange {
        instruction: InsnId,
        displacement: isize,
    },

    /// Instruction pops more than there is on the stack
    StackUnderflow(InsnId),

    /// Instruction is reachable with two different stack depths
    InconsistentStackDepth {
        instruction: InsnId,
        expected: usize,
        found: usize,
    },

    /// `ret` leaves more than the return value on the stack
    NonEmptyStackAtReturn { instruction: InsnId, depth: usize },

    MaxStackOverflow(usize),
    MethodCodeOverflow(Offset),

    /// Too many exception handlers for a fat exception section
    ExceptionSectionOverflow(usize),

    /// Exception handler range ends before it starts
    InvertedRange { start: InsnId, end: InsnId },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::IoError(err) => write!(f, "I/O error: {}", err),
            Error::LocalsOverflow => f.write_str("too many local variables"),
            Error::UnknownInstruction(id) => write!(f, "reference to unknown instruction {}", id),
            Error::InvalidOperand {
                instruction,
                opcode,
            } => write!(f, "invalid operand for {} at {}", opcode, instruction),
            Error::OperandOutOfRange {
                instruction,
                opcode,
            } => write!(f, "operand of {} at {} is out of range", opcode, instruction),
            Error::BranchOutOfRange {
                instruction,
                displacement,
            } => write!(
                f,
                "branch at {} cannot encode displacement {}",
                instruction, displacement
            ),
            Error::StackUnderflow(id) => write!(f, "evaluation stack underflow at {}", id),
            Error::InconsistentStackDepth {
                instruction,
                expected,
                found,
            } => write!(
                f,
                "instruction {} reached with stack depth {} and {}",
                instruction, expected, found
            ),
            Error::NonEmptyStackAtReturn { instruction, depth } => write!(
                f,
                "return at {} leaves {} values on the stack",
                instruction, depth
            ),
            Error::MaxStackOverflow(depth) => write!(f, "maximum stack depth {} overflows", depth),
            Error::MethodCodeOverflow(offset) => {
                write!(f, "method code size {} overflows", offset.0)
            }
            Error::ExceptionSectionOverflow(count) => {
                write!(f, "{} exception handlers overflow the exception section", count)
            }
            Error::InvertedRange { start, end } => {
                write!(f, "exception handler range [{}, {}) is inverted", start, end)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::IoError(err)
    }
}
