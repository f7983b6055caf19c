use std::collections::HashMap;

use tracing::debug;

use crate::layout::Rect;
use crate::{Edge, EditorConfig, Node, NodeId, Position, Workflow, fresh_id};

/// Nodes and the edges running between them, captured by a copy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Clipboard {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Clipboard {
    /// Capture the selected nodes. Edges that cross the selection boundary
    /// are left behind.
    pub fn copy(workflow: &Workflow, selection: &[NodeId]) -> Self {
        let nodes = workflow
            .nodes
            .iter()
            .filter(|n| selection.contains(&n.id))
            .cloned()
            .collect();
        let edges = workflow
            .edges
            .iter()
            .filter(|e| selection.contains(&e.source) && selection.contains(&e.target))
            .cloned()
            .collect();
        Self { nodes, edges }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Insert fresh copies of the clipboard into `workflow` and return their
    /// ids in clipboard order.
    pub fn paste_into(&self, workflow: &mut Workflow, config: &EditorConfig) -> Vec<NodeId> {
        let mut occupied: Vec<Rect> = workflow
            .nodes
            .iter()
            .map(|n| Rect::at(n.position, config))
            .collect();
        let mut id_map: HashMap<&str, NodeId> = HashMap::new();
        let mut pasted = Vec::with_capacity(self.nodes.len());

        for node in &self.nodes {
            let start = node.position.offset(config.paste_offset, config.paste_offset);
            let position = find_open_position(start, &occupied, config);
            occupied.push(Rect::at(position, config));

            let id = fresh_id("node");
            id_map.insert(node.id.as_str(), id.clone());
            workflow.nodes.push(Node {
                id: id.clone(),
                position,
                warnings: Vec::new(),
                ..node.clone()
            });
            pasted.push(id);
        }

        for edge in &self.edges {
            let (Some(source), Some(target)) = (
                id_map.get(edge.source.as_str()),
                id_map.get(edge.target.as_str()),
            ) else {
                continue;
            };
            workflow.add_edge(Edge::new(source, target, edge.source_handle));
        }

        debug!(nodes = pasted.len(), "Pasted clipboard");
        pasted
    }
}

/// Nudge `start` diagonally by a quarter node until it overlaps nothing in
/// `occupied`. Gives up after `paste_search_limit` nudges and drops the node
/// below everything instead.
pub fn find_open_position(start: Position, occupied: &[Rect], config: &EditorConfig) -> Position {
    let mut candidate = start;
    for _ in 0..=config.paste_search_limit {
        let rect = Rect::at(candidate, config);
        if !occupied.iter().any(|other| rect.overlaps(other)) {
            return candidate;
        }
        candidate = candidate.offset(config.node_width / 4.0, config.node_height / 4.0);
    }

    let lowest = occupied
        .iter()
        .map(Rect::bottom)
        .fold(f32::NEG_INFINITY, f32::max);
    Position::new(start.x, lowest + config.paste_offset)
}
