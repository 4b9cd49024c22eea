//! Exception handlers from exception sub-graphs
//!
//! Regions are described by the nodes they contain, but exception handlers need instruction
//! boundaries. The start of a region is the anchor of its first node. The end is exclusive, so
//! it is the instruction _after_ the last instruction of the last node. That instruction only
//! exists once code is flattened and laid out, which is why this runs on the finished
//! [`MethodBody`].
//!
//! "First" and "last" are by VM offset of the nodes, not by enumeration order. Unless contiguity
//! checking is disabled, the two orders must agree and the nodes must be adjacent in the layout.

use crate::ast::{ControlFlowGraph, ExceptionSubGraph, NodeId};
use crate::cil::{ExceptionHandler, HandlerKind, InsnId, MethodBody};
use crate::regen::{Error, NodeCode, RegionPart, Settings};
use std::collections::BTreeSet;

/// Build the exception handlers of every sub-graph, in sub-graph order
pub fn build_exception_handlers<'g>(
    graph: &ControlFlowGraph<'g>,
    node_code: &[NodeCode],
    body: &MethodBody<'g>,
    settings: &Settings<'g>,
) -> Result<Vec<ExceptionHandler<'g>>, Error> {
    let mut handlers = Vec::with_capacity(graph.sub_graphs().len());
    for (idx, sub_graph) in graph.sub_graphs().iter().enumerate() {
        let region = RegionResolver {
            graph,
            node_code,
            body,
            settings,
            sub_graph: idx,
        };
        let handler = region.resolve(sub_graph)?;
        log::trace!("exception region {}: {:?}", idx, handler);
        handlers.push(handler);
    }
    Ok(handlers)
}

struct RegionResolver<'a, 'g> {
    graph: &'a ControlFlowGraph<'g>,
    node_code: &'a [NodeCode],
    body: &'a MethodBody<'g>,
    settings: &'a Settings<'g>,
    sub_graph: usize,
}

impl<'a, 'g> RegionResolver<'a, 'g> {
    fn resolve(&self, sub_graph: &ExceptionSubGraph<'g>) -> Result<ExceptionHandler<'g>, Error> {
        let kind = self
            .settings
            .vm_constants
            .handler_kind(sub_graph.kind_tag)
            .ok_or(Error::UnsupportedRegionKind {
                sub_graph: self.sub_graph,
                tag: sub_graph.kind_tag,
            })?;

        let (try_start, try_end) = self.interval(RegionPart::Try, &sub_graph.try_nodes)?;
        let (handler_start, handler_end) =
            self.interval(RegionPart::Handler, &sub_graph.handler_nodes)?;

        let filter_start = if kind == HandlerKind::Filter {
            if sub_graph.filter_nodes.is_empty() {
                return Err(Error::MissingFilterBody(self.sub_graph));
            }
            let (first, _) = self.boundary_nodes(RegionPart::Filter, &sub_graph.filter_nodes)?;
            Some(self.code(first)?.first)
        } else {
            None
        };

        let catch_type = if kind == HandlerKind::Catch {
            sub_graph.catch_type
        } else {
            None
        };

        Ok(ExceptionHandler {
            kind,
            try_start,
            try_end,
            filter_start,
            handler_start,
            handler_end,
            catch_type,
        })
    }

    /// Start (inclusive) and end (exclusive) instructions of a set of nodes
    fn interval(&self, part: RegionPart, nodes: &BTreeSet<NodeId>) -> Result<(InsnId, InsnId), Error> {
        let (first, last) = self.boundary_nodes(part, nodes)?;
        let start = self.code(first)?.first;
        let end = self
            .body
            .following(self.code(last)?.last)
            .ok_or(Error::RegionEndNotFound {
                sub_graph: self.sub_graph,
                part,
                node: last,
            })?;
        Ok((start, end))
    }

    /// Nodes with the smallest and largest VM offsets
    fn boundary_nodes(
        &self,
        part: RegionPart,
        nodes: &BTreeSet<NodeId>,
    ) -> Result<(NodeId, NodeId), Error> {
        let mut by_offset: Vec<(u64, NodeId)> = nodes
            .iter()
            .map(|id| {
                self.graph
                    .node(*id)
                    .map(|node| (node.original_offset, *id))
                    .ok_or(Error::UnknownNode(*id))
            })
            .collect::<Result<_, _>>()?;
        by_offset.sort_unstable();

        let (first, last) = match (by_offset.first(), by_offset.last()) {
            (Some((_, first)), Some((_, last))) => (*first, *last),
            _ => {
                return Err(Error::EmptyRegion {
                    sub_graph: self.sub_graph,
                    part,
                })
            }
        };

        if self.settings.check_region_contiguity {
            // Node sets iterate in enumeration order
            let lowest = nodes.iter().next().copied();
            let highest = nodes.iter().next_back().copied();
            let contiguous = lowest == Some(first)
                && highest == Some(last)
                && last.0 - first.0 + 1 == nodes.len();
            if !contiguous {
                return Err(Error::NonContiguousRegion {
                    sub_graph: self.sub_graph,
                    part,
                });
            }
        }

        Ok((first, last))
    }

    fn code(&self, node: NodeId) -> Result<&'a NodeCode, Error> {
        self.node_code.get(node.0).ok_or(Error::UnknownNode(node))
    }
}
