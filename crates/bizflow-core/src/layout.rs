//! Interactive drag and collision resolution.
//!
//! A [`DragSession`] captures where every moving item started. Each pointer
//! update translates those items rigidly by the pointer delta, then a few
//! relaxation passes push overlapping stationary nodes out of the way.
//! Dragged nodes are never displaced by the relaxation.

use std::collections::{HashMap, HashSet};

use crate::{EditorConfig, Node, NodeId, Position, Workflow};

/// Axis-aligned rectangle in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn at(position: Position, config: &EditorConfig) -> Self {
        Self {
            x: position.x,
            y: position.y,
            width: config.node_width,
            height: config.node_height,
        }
    }

    /// True only for a positive-area intersection; touching edges do not count.
    pub fn overlaps(&self, other: &Rect) -> bool {
        let overlap_x = (self.x + self.width).min(other.x + other.width) - self.x.max(other.x);
        let overlap_y = (self.y + self.height).min(other.y + other.height) - self.y.max(other.y);
        overlap_x > 0.0 && overlap_y > 0.0
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragTarget {
    Node(NodeId),
    Group(String),
}

/// Start positions captured when a drag begins.
#[derive(Debug, Clone)]
pub struct DragSession {
    target: DragTarget,
    anchor: Position,
    node_starts: HashMap<NodeId, Position>,
    group_start: Option<(String, Position)>,
}

impl DragSession {
    /// Begin dragging a node. If it is part of `selection`, the whole
    /// selection moves with it. Nodes hidden inside a collapsed group cannot
    /// be dragged.
    pub fn for_node(workflow: &Workflow, node_id: &str, selection: &[NodeId]) -> Option<Self> {
        let node = workflow.find_node(node_id)?;
        if workflow.is_hidden(node_id) {
            return None;
        }

        let moving: Vec<&NodeId> = if selection.iter().any(|id| id == node_id) {
            selection.iter().collect()
        } else {
            vec![&node.id]
        };
        let node_starts = moving
            .into_iter()
            .filter_map(|id| workflow.find_node(id).map(|n| (n.id.clone(), n.position)))
            .collect();

        Some(Self {
            target: DragTarget::Node(node.id.clone()),
            anchor: node.position,
            node_starts,
            group_start: None,
        })
    }

    /// Begin dragging a group together with all of its member nodes.
    pub fn for_group(workflow: &Workflow, group_id: &str) -> Option<Self> {
        let group = workflow.find_group(group_id)?;
        let node_starts = group
            .node_ids
            .iter()
            .filter_map(|id| workflow.find_node(id).map(|n| (n.id.clone(), n.position)))
            .collect();

        Some(Self {
            target: DragTarget::Group(group.id.clone()),
            anchor: group.position,
            node_starts,
            group_start: Some((group.id.clone(), group.position)),
        })
    }

    pub fn target(&self) -> &DragTarget {
        &self.target
    }

    pub fn is_dragging(&self, node_id: &str) -> bool {
        self.node_starts.contains_key(node_id)
    }

    pub fn dragged_nodes(&self) -> impl Iterator<Item = &NodeId> {
        self.node_starts.keys()
    }

    /// Move the primary item to `pointer` and everything captured with it by
    /// the same delta, then de-overlap stationary nodes.
    pub fn apply(&self, workflow: &mut Workflow, pointer: Position, config: &EditorConfig) {
        let dx = pointer.x - self.anchor.x;
        let dy = pointer.y - self.anchor.y;

        for node in &mut workflow.nodes {
            if let Some(start) = self.node_starts.get(&node.id) {
                node.position = start.offset(dx, dy);
            }
        }
        if let Some((group_id, start)) = &self.group_start
            && let Some(group) = workflow.find_group_mut(group_id)
        {
            group.position = start.offset(dx, dy);
        }

        let pinned: HashSet<&str> = self.node_starts.keys().map(String::as_str).collect();
        resolve_overlaps(&mut workflow.nodes, &pinned, config);
    }

    /// Snap every dragged item onto the grid. Called once when the drag ends.
    pub fn finish(&self, workflow: &mut Workflow, config: &EditorConfig) {
        for node in &mut workflow.nodes {
            if self.node_starts.contains_key(&node.id) {
                node.position = node.position.snapped(config.grid_size);
            }
        }
        if let Some((group_id, _)) = &self.group_start
            && let Some(group) = workflow.find_group_mut(group_id)
        {
            group.position = group.position.snapped(config.grid_size);
        }
    }
}

/// Push overlapping node pairs apart along their axis of least overlap.
///
/// Pinned nodes never move. When one side of a pair is pinned the other side
/// takes the whole displacement; otherwise both move half of it.
pub fn resolve_overlaps(nodes: &mut [Node], pinned: &HashSet<&str>, config: &EditorConfig) {
    let width = config.node_width;
    let height = config.node_height;
    let padding = config.repulsion_padding;
    let pinned_flags: Vec<bool> = nodes
        .iter()
        .map(|n| pinned.contains(n.id.as_str()))
        .collect();

    for _ in 0..config.repulsion_iterations {
        for j in 0..nodes.len() {
            for k in (j + 1)..nodes.len() {
                let a_pinned = pinned_flags[j];
                let b_pinned = pinned_flags[k];
                if a_pinned && b_pinned {
                    continue;
                }

                let a = nodes[j].position;
                let b = nodes[k].position;
                // Same-size rectangles: center deltas equal corner deltas.
                let delta_x = a.x - b.x;
                let delta_y = a.y - b.y;
                let overlap_x = width - delta_x.abs();
                let overlap_y = height - delta_y.abs();
                if overlap_x <= 0.0 || overlap_y <= 0.0 {
                    continue;
                }

                let share = |amount: f32, me_pinned: bool, other_pinned: bool| -> f32 {
                    if me_pinned {
                        0.0
                    } else if other_pinned {
                        amount
                    } else {
                        amount / 2.0
                    }
                };

                if overlap_x < overlap_y {
                    let push = overlap_x + padding;
                    let direction = if delta_x > 0.0 { 1.0 } else { -1.0 };
                    nodes[j].position.x += share(push, a_pinned, b_pinned) * direction;
                    nodes[k].position.x -= share(push, b_pinned, a_pinned) * direction;
                } else {
                    let push = overlap_y + padding;
                    let direction = if delta_y > 0.0 { 1.0 } else { -1.0 };
                    nodes[j].position.y += share(push, a_pinned, b_pinned) * direction;
                    nodes[k].position.y -= share(push, b_pinned, a_pinned) * direction;
                }
            }
        }
    }
}
