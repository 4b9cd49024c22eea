use crate::ast::{ControlFlowGraph, NodeId};
use crate::cil::{EmittedInstruction, InsnId};
use crate::regen::{Error, GenerationContext};
use std::ops::Range;

/// Where the code of one node ended up in the flattened instructions
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeCode {
    pub node: NodeId,

    /// First instruction (always the anchor of the node)
    pub first: InsnId,

    /// Last instruction
    pub last: InsnId,

    /// Positions of the instructions in the flattened code
    pub range: Range<usize>,
}

/// Code of every node, laid out in node enumeration order
#[derive(Debug)]
pub struct FlattenedCode<'g> {
    pub instructions: Vec<EmittedInstruction<'g>>,

    /// Code of each node, indexed by [`NodeId`]
    pub node_code: Vec<NodeCode>,
}

impl<'a, 'g> GenerationContext<'a, 'g> {
    /// Lower every node and concatenate the results
    ///
    /// Nodes are neither reordered nor dropped, even if they are unreachable.
    pub fn flatten(&mut self, graph: &ControlFlowGraph<'g>) -> Result<FlattenedCode<'g>, Error> {
        let mut instructions: Vec<EmittedInstruction<'g>> = vec![];
        let mut node_code = Vec::with_capacity(graph.nodes().len());

        for node in graph.nodes() {
            let code = self.emit_block(node)?;
            let start = instructions.len();
            let last = code.last().map_or(node.anchor, |insn| insn.id);
            instructions.extend(code);

            log::trace!(
                "{} (VM offset {:#x}) lowered to {} instructions",
                node.id,
                node.original_offset,
                instructions.len() - start
            );
            node_code.push(NodeCode {
                node: node.id,
                first: node.anchor,
                last,
                range: start..instructions.len(),
            });
        }

        Ok(FlattenedCode {
            instructions,
            node_code,
        })
    }
}
