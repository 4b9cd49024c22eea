use crate::ast::{NodeId, ParameterId, VariableRef};
use crate::cil;
use crate::cil::OperandType;
use std::fmt;

/// Part of an exception region
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RegionPart {
    Try,
    Handler,
    Filter,
}

impl fmt::Display for RegionPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RegionPart::Try => "try",
            RegionPart::Handler => "handler",
            RegionPart::Filter => "filter",
        })
    }
}

/// Reasons regeneration of a method body can fail
///
/// Expressions are carried in their rendered form.
#[derive(Debug)]
pub enum Error {
    Bytecode(cil::Error),

    /// Declared parameter has no physical counterpart
    MissingPhysicalParameter {
        parameter: ParameterId,
        available: usize,
    },

    /// Variable or parameter is used but was never bound
    UnboundVariable(VariableRef),

    /// Only unary and binary flag-affecting expressions are supported
    UnsupportedFlagsArity { expression: String, arity: usize },

    /// Instruction in an expression template pops more than is on the stack
    StackImbalance {
        expression: String,
        instruction: String,
        depth: usize,
    },

    /// Instruction in an expression template has an operand of the wrong shape
    OperandMismatch {
        expression: String,
        instruction: String,
        expected: OperandType,
    },

    /// Untyped expression statement leaves values on the stack
    ResidualValue { expression: String, depth: usize },

    UnsupportedRegionKind { sub_graph: usize, tag: u8 },
    MissingFilterBody(usize),
    EmptyRegion { sub_graph: usize, part: RegionPart },
    UnknownNode(NodeId),

    /// There is no instruction following the end of a region
    RegionEndNotFound {
        sub_graph: usize,
        part: RegionPart,
        node: NodeId,
    },

    /// Nodes of a region aren't laid out next to each other
    NonContiguousRegion { sub_graph: usize, part: RegionPart },

    /// Error while lowering an expression
    InExpression { expression: String, cause: Box<Error> },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Bytecode(err) => write!(f, "bytecode error: {}", err),
            Error::MissingPhysicalParameter {
                parameter,
                available,
            } => write!(
                f,
                "parameter {} has no physical counterpart (method has {} parameters)",
                parameter.0, available
            ),
            Error::UnboundVariable(variable) => write!(f, "{} is not bound", variable),
            Error::UnsupportedFlagsArity { expression, arity } => write!(
                f,
                "flag-affecting expression with {} arguments: {}",
                arity, expression
            ),
            Error::StackImbalance {
                expression,
                instruction,
                depth,
            } => write!(
                f,
                "{} underflows a stack of depth {} in {}",
                instruction, depth, expression
            ),
            Error::OperandMismatch {
                expression,
                instruction,
                expected,
            } => write!(
                f,
                "{} should have an operand of kind {:?} in {}",
                instruction, expected, expression
            ),
            Error::ResidualValue { expression, depth } => write!(
                f,
                "statement leaves {} values on the stack: {}",
                depth, expression
            ),
            Error::UnsupportedRegionKind { sub_graph, tag } => write!(
                f,
                "exception region {} has unsupported kind {:#04x}",
                sub_graph, tag
            ),
            Error::MissingFilterBody(sub_graph) => {
                write!(f, "filter region {} has no filter body", sub_graph)
            }
            Error::EmptyRegion { sub_graph, part } => {
                write!(f, "exception region {} has an empty {} block", sub_graph, part)
            }
            Error::UnknownNode(node) => write!(f, "unknown node {}", node),
            Error::RegionEndNotFound {
                sub_graph,
                part,
                node,
            } => write!(
                f,
                "no instruction follows {} (end of {} block of exception region {})",
                node, part, sub_graph
            ),
            Error::NonContiguousRegion { sub_graph, part } => write!(
                f,
                "{} block of exception region {} is not contiguous",
                part, sub_graph
            ),
            Error::InExpression { expression, cause } => {
                write!(f, "{} (in {})", cause, expression)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Bytecode(err) => Some(err),
            Error::InExpression { cause, .. } => Some(cause.as_ref()),
            _ => None,
        }
    }
}

impl From<cil::Error> for Error {
    fn from(err: cil::Error) -> Error {
        Error::Bytecode(err)
    }
}
