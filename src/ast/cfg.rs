use crate::ast::BasicBlock;
use crate::cil::metadata::TypeId;
use crate::cil::{IdGenerator, InsnId, InsnIdGenerator};
use std::collections::BTreeSet;
use std::fmt;

/// Index of a node in a [`ControlFlowGraph`]
#[derive(Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "B{}", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "B{}", self.0)
    }
}

#[derive(Debug)]
pub struct Node<'g> {
    pub id: NodeId,

    /// Identity of the placeholder instruction starting this node's code
    pub anchor: InsnId,

    /// Offset of the block in the VM bytecode
    ///
    /// This only orders nodes: it doesn't correspond to anything in the output.
    pub original_offset: u64,

    pub block: BasicBlock<'g>,
}

/// Nodes making up one exception handling region
#[derive(Clone, Debug)]
pub struct ExceptionSubGraph<'g> {
    /// Region kind, as encoded by the VM (see [`crate::vm::VmConstants::handler_kind`])
    pub kind_tag: u8,

    pub try_nodes: BTreeSet<NodeId>,
    pub handler_nodes: BTreeSet<NodeId>,

    /// Nodes of the filter block (only for filter regions)
    pub filter_nodes: BTreeSet<NodeId>,

    /// Type caught (only for catch regions)
    pub catch_type: Option<TypeId<'g>>,
}

impl<'g> ExceptionSubGraph<'g> {
    pub fn new(
        kind_tag: u8,
        try_nodes: impl IntoIterator<Item = NodeId>,
        handler_nodes: impl IntoIterator<Item = NodeId>,
    ) -> ExceptionSubGraph<'g> {
        ExceptionSubGraph {
            kind_tag,
            try_nodes: try_nodes.into_iter().collect(),
            handler_nodes: handler_nodes.into_iter().collect(),
            filter_nodes: BTreeSet::new(),
            catch_type: None,
        }
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.try_nodes.contains(&node)
            || self.handler_nodes.contains(&node)
            || self.filter_nodes.contains(&node)
    }
}

/// Recovered control-flow graph
///
/// Nodes are enumerated in the order they were added, which is also the order in which their
/// code is laid out. Every node gets an anchor identity as soon as it is added, so statements of
/// any node can branch to any other node.
pub struct ControlFlowGraph<'g> {
    nodes: Vec<Node<'g>>,
    sub_graphs: Vec<ExceptionSubGraph<'g>>,
    anchor_ids: InsnIdGenerator,
}

impl<'g> ControlFlowGraph<'g> {
    pub fn new() -> ControlFlowGraph<'g> {
        ControlFlowGraph {
            nodes: vec![],
            sub_graphs: vec![],
            anchor_ids: InsnIdGenerator::new(InsnId::FIRST),
        }
    }

    /// Add a node with an empty block
    pub fn add_node(&mut self, original_offset: u64) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            id,
            anchor: self.anchor_ids.fresh_id(),
            original_offset,
            block: BasicBlock::default(),
        });
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&Node<'g>> {
        self.nodes.get(id.0)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node<'g>> {
        self.nodes.get_mut(id.0)
    }

    /// Nodes in enumeration order
    pub fn nodes(&self) -> &[Node<'g>] {
        &self.nodes
    }

    /// Branch target for jumping to the start of a node
    pub fn anchor(&self, id: NodeId) -> Option<InsnId> {
        self.node(id).map(|node| node.anchor)
    }

    pub fn add_sub_graph(&mut self, sub_graph: ExceptionSubGraph<'g>) -> usize {
        self.sub_graphs.push(sub_graph);
        self.sub_graphs.len() - 1
    }

    pub fn sub_graphs(&self) -> &[ExceptionSubGraph<'g>] {
        &self.sub_graphs
    }

    /// Exception sub-graphs (and their indices) which the node belongs to
    pub fn sub_graphs_of(
        &self,
        node: NodeId,
    ) -> impl Iterator<Item = (usize, &ExceptionSubGraph<'g>)> + '_ {
        self.sub_graphs
            .iter()
            .enumerate()
            .filter(move |(_, sub_graph)| sub_graph.contains(node))
    }

    /// Generator for instruction identities that won't clash with any anchor
    pub fn instruction_ids(&self) -> InsnIdGenerator {
        self.anchor_ids.clone()
    }
}

impl<'g> Default for ControlFlowGraph<'g> {
    fn default() -> Self {
        ControlFlowGraph::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn anchors_are_distinct_from_generated_ids() {
        let mut graph = ControlFlowGraph::new();
        let first = graph.add_node(0x10);
        let second = graph.add_node(0x20);

        let anchors: Vec<InsnId> = [first, second]
            .iter()
            .filter_map(|node| graph.anchor(*node))
            .collect();
        assert_eq!(anchors.len(), 2);
        assert_ne!(anchors[0], anchors[1]);

        let mut ids = graph.instruction_ids();
        let fresh = ids.fresh_id();
        assert!(!anchors.contains(&fresh));
        assert_eq!(graph.anchor(NodeId(2)), None);
    }

    #[test]
    fn sub_graph_membership() {
        let mut graph = ControlFlowGraph::new();
        let entry = graph.add_node(0);
        let body = graph.add_node(4);
        let handler = graph.add_node(8);
        graph.add_sub_graph(ExceptionSubGraph::new(0, [body], [handler]));

        assert_eq!(graph.sub_graphs_of(entry).count(), 0);
        assert_eq!(graph.sub_graphs_of(body).count(), 1);
        assert_eq!(graph.sub_graphs_of(handler).map(|(idx, _)| idx).collect::<Vec<_>>(), vec![0]);
    }
}
