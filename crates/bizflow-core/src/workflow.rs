use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::NodeKind;

/// Opaque node identifier. Unique within a workflow and never reused.
pub type NodeId = String;

/// Free-form node parameters. Which keys matter depends on the node kind.
pub type NodeData = Map<String, Value>;

/// One immutable version of the whole graph: the unit of undo/redo history
/// and the shape of the import/export document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub groups: Vec<Group>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub label: String,
    pub position: Position,
    #[serde(default)]
    pub data: NodeData,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Round both coordinates to the nearest multiple of `grid`.
    pub fn snapped(self, grid: f32) -> Self {
        if grid <= 0.0 {
            return self;
        }
        Self {
            x: (self.x / grid).round() * grid,
            y: (self.y / grid).round() * grid,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

/// Named output port on a branching node. Edges without a handle leave the
/// node's default output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceHandle {
    #[serde(rename = "true")]
    True,
    #[serde(rename = "false")]
    False,
    #[serde(rename = "loopBody")]
    LoopBody,
    #[serde(rename = "afterLoop")]
    AfterLoop,
}

impl SourceHandle {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceHandle::True => "true",
            SourceHandle::False => "false",
            SourceHandle::LoopBody => "loopBody",
            SourceHandle::AfterLoop => "afterLoop",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: String,
    pub source: NodeId,
    pub target: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<SourceHandle>,
}

impl Edge {
    pub fn new(
        source: impl Into<NodeId>,
        target: impl Into<NodeId>,
        source_handle: Option<SourceHandle>,
    ) -> Self {
        let source = source.into();
        let target = target.into();
        Self {
            id: Self::derive_id(&source, source_handle, &target),
            source,
            target,
            source_handle,
        }
    }

    /// Stable edge id for a `(source, handle, target)` triple.
    pub fn derive_id(source: &str, source_handle: Option<SourceHandle>, target: &str) -> String {
        let handle = source_handle.map_or("default", |h| h.as_str());
        format!("edge_{}_{}-{}", source, handle, target)
    }
}

/// Visual container for a set of nodes. Has no effect on execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    pub label: String,
    pub position: Position,
    pub size: Size,
    pub node_ids: Vec<NodeId>,
    #[serde(default)]
    pub is_collapsed: bool,
    pub color: String,
}

impl Group {
    pub fn contains(&self, node_id: &str) -> bool {
        self.node_ids.iter().any(|id| id == node_id)
    }
}

/// Generate a fresh opaque id such as `node_3f2a...`.
pub fn fresh_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4().simple())
}

impl Workflow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty() && self.groups.is_empty()
    }

    pub fn find_node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn find_node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub fn find_group(&self, id: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.id == id)
    }

    pub fn find_group_mut(&mut self, id: &str) -> Option<&mut Group> {
        self.groups.iter_mut().find(|g| g.id == id)
    }

    /// The first node of the given kind, in document order.
    pub fn first_of_kind(&self, kind: NodeKind) -> Option<&Node> {
        self.nodes.iter().find(|n| n.kind == kind)
    }

    /// Follow the edge leaving `from` through `handle` (`None` = default output).
    pub fn follow_edge(&self, from: &str, handle: Option<SourceHandle>) -> Option<&Edge> {
        self.edges
            .iter()
            .find(|e| e.source == from && e.source_handle == handle)
    }

    pub fn has_incoming(&self, id: &str) -> bool {
        self.edges.iter().any(|e| e.target == id)
    }

    pub fn has_outgoing(&self, id: &str) -> bool {
        self.edges.iter().any(|e| e.source == id)
    }

    /// Whether the node is hidden inside a collapsed group.
    pub fn is_hidden(&self, node_id: &str) -> bool {
        self.groups
            .iter()
            .any(|g| g.is_collapsed && g.contains(node_id))
    }
}
