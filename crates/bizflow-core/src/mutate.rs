//! Structural edit operations.
//!
//! All of these are total: unknown ids are ignored rather than reported. The
//! editor applies them to a copy of the current snapshot, never in place.

use std::collections::HashSet;

use serde_json::Value;

use crate::{
    Edge, EditorConfig, Group, Node, NodeData, NodeId, NodeKind, Position, Size, Workflow,
    fresh_id,
};

/// Partial node update. `data` is shallow-merged into the existing map.
#[derive(Debug, Clone, Default)]
pub struct NodeUpdate {
    pub label: Option<String>,
    pub data: Option<NodeData>,
}

impl NodeUpdate {
    pub fn label(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            data: None,
        }
    }

    pub fn data(data: NodeData) -> Self {
        Self {
            label: None,
            data: Some(data),
        }
    }
}

impl Workflow {
    /// Add a node seeded with its kind's default data.
    pub fn add_node(&mut self, kind: NodeKind, label: Option<&str>, position: Position) -> NodeId {
        let id = fresh_id("node");
        self.nodes.push(Node {
            id: id.clone(),
            kind,
            label: label.unwrap_or(kind.default_label()).to_string(),
            position,
            data: kind.default_data(),
            warnings: Vec::new(),
        });
        id
    }

    /// Insert `edge`, replacing any edge already leaving the same output handle.
    pub fn add_edge(&mut self, edge: Edge) {
        self.edges
            .retain(|e| !(e.source == edge.source && e.source_handle == edge.source_handle));
        self.edges.push(edge);
    }

    pub fn remove_edge(&mut self, edge_id: &str) {
        self.edges.retain(|e| e.id != edge_id);
    }

    pub fn update_node(&mut self, id: &str, update: NodeUpdate) {
        let Some(node) = self.find_node_mut(id) else {
            return;
        };
        if let Some(label) = update.label {
            node.label = label;
        }
        if let Some(data) = update.data {
            node.data.extend(data);
        }
    }

    /// Remove nodes, every edge touching them, and their group memberships.
    /// Groups left without members are pruned.
    pub fn delete_nodes(&mut self, ids: &[NodeId]) {
        let doomed: HashSet<&str> = ids.iter().map(String::as_str).collect();
        self.nodes.retain(|n| !doomed.contains(n.id.as_str()));
        self.edges.retain(|e| {
            !doomed.contains(e.source.as_str()) && !doomed.contains(e.target.as_str())
        });
        for group in &mut self.groups {
            group.node_ids.retain(|id| !doomed.contains(id.as_str()));
        }
        self.groups.retain(|g| !g.node_ids.is_empty());
    }

    /// Wrap the given nodes in a new group sized to their bounding box.
    /// Needs at least two existing nodes; returns the new group id.
    pub fn group_nodes(&mut self, ids: &[NodeId], config: &EditorConfig) -> Option<String> {
        let mut members: Vec<NodeId> = Vec::new();
        for id in ids {
            if self.find_node(id).is_some() && !members.contains(id) {
                members.push(id.clone());
            }
        }
        if members.len() < 2 {
            return None;
        }

        let mut min_x = f32::INFINITY;
        let mut min_y = f32::INFINITY;
        let mut max_x = f32::NEG_INFINITY;
        let mut max_y = f32::NEG_INFINITY;
        for node in self.nodes.iter().filter(|n| members.contains(&n.id)) {
            min_x = min_x.min(node.position.x);
            min_y = min_y.min(node.position.y);
            max_x = max_x.max(node.position.x + config.node_width);
            max_y = max_y.max(node.position.y + config.node_height);
        }

        let padding = config.group_padding;
        let group = Group {
            id: fresh_id("group"),
            label: "New Group".to_string(),
            position: Position::new(min_x - padding, min_y - padding),
            size: Size {
                width: max_x - min_x + padding * 2.0,
                height: max_y - min_y + padding * 2.0,
            },
            node_ids: members,
            is_collapsed: false,
            color: config.group_color(self.groups.len()),
        };
        let id = group.id.clone();
        self.groups.push(group);
        Some(id)
    }

    pub fn toggle_group_collapse(&mut self, group_id: &str) {
        if let Some(group) = self.find_group_mut(group_id) {
            group.is_collapsed = !group.is_collapsed;
        }
    }

    pub fn rename_group(&mut self, group_id: &str, label: impl Into<String>) {
        if let Some(group) = self.find_group_mut(group_id) {
            group.label = label.into();
        }
    }

    /// Blank out `credentialId` on every node that references `credential_id`.
    /// Returns how many nodes were touched.
    pub fn clear_credential_refs(&mut self, credential_id: &str) -> usize {
        let mut cleared = 0;
        for node in &mut self.nodes {
            let references = node
                .data
                .get("credentialId")
                .and_then(Value::as_str)
                .is_some_and(|id| id == credential_id);
            if references {
                node.data
                    .insert("credentialId".to_string(), Value::String(String::new()));
                cleared += 1;
            }
        }
        cleared
    }
}
