//! Editing session: graph history, selection, clipboard, drag state and the
//! credential store, wired together.
//!
//! Every structural edit appends one history entry and then refreshes node
//! warnings with an overwrite, so warnings never cost an undo step.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::clipboard::Clipboard;
use crate::credentials::{Credential, CredentialKind, CredentialStore};
use crate::document::{self, DocumentError};
use crate::history::{Commit, History};
use crate::layout::DragSession;
use crate::oracle::GeneratedNode;
use crate::persistence::PersistencePort;
use crate::validation::refresh_warnings;
use crate::{Edge, EditorConfig, NodeId, NodeKind, NodeUpdate, Position, SourceHandle, Workflow};

/// A drag in progress plus the graph as it was before the first move.
struct ActiveDrag {
    session: DragSession,
    origin: Workflow,
}

pub struct Editor {
    history: History,
    credentials: CredentialStore,
    selection: Vec<NodeId>,
    clipboard: Clipboard,
    drag: Option<ActiveDrag>,
    config: EditorConfig,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl Editor {
    pub fn new(config: EditorConfig) -> Self {
        let history = History::new(Workflow::default(), config.max_history);
        Self::from_parts(history, CredentialStore::default(), config)
    }

    /// Restore both stores from their ports and keep saving through them.
    pub fn with_ports(
        config: EditorConfig,
        workflow_port: Box<dyn PersistencePort<Workflow>>,
        credential_port: Box<dyn PersistencePort<Vec<Credential>>>,
    ) -> Self {
        let history = History::with_port(workflow_port, config.max_history);
        let credentials = CredentialStore::with_port(credential_port);
        let mut editor = Self::from_parts(history, credentials, config);
        editor.revalidate();
        editor
    }

    fn from_parts(history: History, credentials: CredentialStore, config: EditorConfig) -> Self {
        Self {
            history,
            credentials,
            selection: Vec::new(),
            clipboard: Clipboard::default(),
            drag: None,
            config,
        }
    }

    pub fn workflow(&self) -> &Workflow {
        self.history.current()
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn selection(&self) -> &[NodeId] {
        &self.selection
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Recompute warnings, committing only when they changed.
    pub fn revalidate(&mut self) {
        if let Some(next) = refresh_warnings(self.history.current()) {
            self.history.set(next, Commit::Overwrite);
        }
    }

    /// Every graph change first commits a drag that is still in flight.
    fn edit(&mut self, edit: impl FnOnce(&mut Workflow)) {
        self.end_drag();
        self.history.update(Commit::Append, edit);
        self.revalidate();
    }

    // -- structure ---------------------------------------------------------

    /// Add a node at the next tile slot and select it.
    pub fn add_node(&mut self, kind: NodeKind, label: Option<&str>) -> NodeId {
        let position = self.config.tile_position(self.workflow().nodes.len());
        let mut id = NodeId::new();
        self.edit(|w| id = w.add_node(kind, label, position));
        debug!(node_id = %id, %kind, "Node added");
        self.selection = vec![id.clone()];
        id
    }

    /// Connect two existing nodes. Returns the edge id, or `None` when either
    /// endpoint is unknown.
    pub fn add_edge(
        &mut self,
        source: &str,
        target: &str,
        handle: Option<SourceHandle>,
    ) -> Option<String> {
        let w = self.workflow();
        if w.find_node(source).is_none() || w.find_node(target).is_none() {
            warn!(source, target, "Ignoring edge with unknown endpoint");
            return None;
        }
        let edge = Edge::new(source, target, handle);
        let id = edge.id.clone();
        self.edit(|w| w.add_edge(edge));
        Some(id)
    }

    pub fn remove_edge(&mut self, edge_id: &str) {
        if self.workflow().edges.iter().any(|e| e.id == edge_id) {
            self.edit(|w| w.remove_edge(edge_id));
        }
    }

    pub fn update_node(&mut self, node_id: &str, update: NodeUpdate) {
        if self.workflow().find_node(node_id).is_some() {
            self.edit(|w| w.update_node(node_id, update));
        }
    }

    pub fn delete_nodes(&mut self, ids: &[NodeId]) {
        if ids.is_empty() {
            return;
        }
        self.edit(|w| w.delete_nodes(ids));
        self.selection.clear();
    }

    pub fn delete_selected(&mut self) {
        let selected = std::mem::take(&mut self.selection);
        self.delete_nodes(&selected);
    }

    // -- selection ---------------------------------------------------------

    /// Plain click selects only `node_id`; shift-click toggles it.
    pub fn click_node(&mut self, node_id: &str, shift: bool) {
        if shift {
            if let Some(pos) = self.selection.iter().position(|id| id == node_id) {
                self.selection.remove(pos);
            } else {
                self.selection.push(node_id.to_string());
            }
        } else {
            self.selection = vec![node_id.to_string()];
        }
    }

    /// Marquee selection. Replaces the selection, or unions with it on shift.
    pub fn select_nodes(&mut self, ids: &[NodeId], shift: bool) {
        if !shift {
            self.selection.clear();
        }
        for id in ids {
            if !self.selection.contains(id) {
                self.selection.push(id.clone());
            }
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    // -- groups ------------------------------------------------------------

    /// Group the current selection. Needs at least two selected nodes.
    pub fn group_selected(&mut self) -> Option<String> {
        if self.selection.len() < 2 {
            return None;
        }
        self.end_drag();
        let mut next = self.workflow().clone();
        let group_id = next.group_nodes(&self.selection, &self.config)?;
        self.history.set(next, Commit::Append);
        self.revalidate();
        self.selection.clear();
        Some(group_id)
    }

    pub fn toggle_group_collapse(&mut self, group_id: &str) {
        if self.workflow().find_group(group_id).is_some() {
            self.edit(|w| w.toggle_group_collapse(group_id));
        }
    }

    pub fn rename_group(&mut self, group_id: &str, label: &str) {
        if self.workflow().find_group(group_id).is_some() {
            self.edit(|w| w.rename_group(group_id, label));
        }
    }

    // -- drag --------------------------------------------------------------

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Start dragging a node (with the selection, if it is part of it).
    /// Returns `false` for unknown nodes and members of collapsed groups.
    pub fn begin_node_drag(&mut self, node_id: &str) -> bool {
        self.end_drag();
        let session = DragSession::for_node(self.workflow(), node_id, &self.selection);
        self.start_drag(session)
    }

    pub fn begin_group_drag(&mut self, group_id: &str) -> bool {
        self.end_drag();
        let session = DragSession::for_group(self.workflow(), group_id);
        self.start_drag(session)
    }

    fn start_drag(&mut self, session: Option<DragSession>) -> bool {
        let Some(session) = session else {
            return false;
        };
        self.drag = Some(ActiveDrag {
            session,
            origin: self.workflow().clone(),
        });
        true
    }

    /// Move the dragged item so its top-left corner sits at `pointer`.
    pub fn drag_to(&mut self, pointer: Position) {
        let Some(drag) = &self.drag else {
            return;
        };
        let config = &self.config;
        self.history
            .update(Commit::Overwrite, |w| drag.session.apply(w, pointer, config));
    }

    /// Snap the dragged items and commit the whole drag as one undo step.
    /// A drag that ends where it started leaves history untouched.
    pub fn end_drag(&mut self) {
        let Some(ActiveDrag { session, origin }) = self.drag.take() else {
            return;
        };
        let mut finished = self.history.current().clone();
        session.finish(&mut finished, &self.config);

        // In-progress moves overwrote the pre-drag entry; put it back first.
        let moved = finished != origin;
        self.history.set(origin, Commit::Overwrite);
        if moved {
            self.history.set(finished, Commit::Append);
            self.revalidate();
        }
    }

    // -- clipboard ---------------------------------------------------------

    /// Copy the selection. Returns how many nodes were captured.
    pub fn copy(&mut self) -> usize {
        if self.selection.is_empty() {
            return 0;
        }
        self.clipboard = Clipboard::copy(self.workflow(), &self.selection);
        self.clipboard.nodes.len()
    }

    /// Paste the clipboard and select the pasted nodes.
    pub fn paste(&mut self) -> Vec<NodeId> {
        if self.clipboard.is_empty() {
            return Vec::new();
        }
        self.end_drag();
        let clipboard = &self.clipboard;
        let config = &self.config;
        let mut pasted = Vec::new();
        self.history.update(Commit::Append, |w| {
            pasted = clipboard.paste_into(w, config);
        });
        self.revalidate();
        self.selection = pasted.clone();
        pasted
    }

    // -- history -----------------------------------------------------------

    pub fn undo(&mut self) -> bool {
        self.end_drag();
        let moved = self.history.undo();
        if moved {
            self.revalidate();
        }
        moved
    }

    pub fn redo(&mut self) -> bool {
        self.end_drag();
        let moved = self.history.redo();
        if moved {
            self.revalidate();
        }
        moved
    }

    // -- documents ---------------------------------------------------------

    /// Replace the graph with an imported document. On error the graph is
    /// left untouched.
    pub fn import_document(&mut self, text: &str) -> Result<(), DocumentError> {
        let workflow = document::parse_document(text)?;
        info!(
            nodes = workflow.nodes.len(),
            edges = workflow.edges.len(),
            "Workflow imported"
        );
        self.end_drag();
        self.history.set(workflow, Commit::Append);
        self.revalidate();
        self.selection.clear();
        Ok(())
    }

    pub fn export_document(&self) -> Result<String, DocumentError> {
        document::to_document(self.workflow())
    }

    pub fn summary(&self) -> String {
        document::workflow_summary(self.workflow())
    }

    // -- credentials -------------------------------------------------------

    pub fn add_credential(
        &mut self,
        name: &str,
        kind: CredentialKind,
        data: HashMap<String, String>,
    ) -> String {
        self.credentials.add(name, kind, data)
    }

    /// Remove a credential and clear every node reference to it. The graph
    /// change is an overwrite, so it is not an undo step of its own.
    pub fn delete_credential(&mut self, credential_id: &str) -> bool {
        if !self.credentials.remove(credential_id) {
            return false;
        }
        self.end_drag();
        let mut cleared = 0;
        self.history.update(Commit::Overwrite, |w| {
            cleared = w.clear_credential_refs(credential_id);
        });
        debug!(credential_id, cleared, "Cleared credential references");
        self.revalidate();
        true
    }

    // -- AI generation -----------------------------------------------------

    pub fn apply_generated_node(&mut self, node: &GeneratedNode) -> NodeId {
        self.add_node(node.kind, Some(&node.label))
    }

    /// Replace the graph with a left-to-right chain of the generated steps.
    pub fn apply_generated_workflow(&mut self, steps: &[GeneratedNode]) {
        let mut workflow = Workflow::new();
        let mut previous: Option<(NodeId, NodeKind)> = None;
        for (i, step) in steps.iter().enumerate() {
            let position = Position::new(
                self.config.tile_origin.x + i as f32 * self.config.tile_spacing.width,
                200.0,
            );
            let id = workflow.add_node(step.kind, Some(&step.label), position);
            if let Some((prev_id, prev_kind)) = &previous {
                let handle = match prev_kind {
                    NodeKind::IfCondition => Some(SourceHandle::True),
                    NodeKind::LoopStart => Some(SourceHandle::LoopBody),
                    _ => None,
                };
                workflow.add_edge(Edge::new(prev_id, &id, handle));
            }
            previous = Some((id, step.kind));
        }

        info!(steps = steps.len(), "Applied generated workflow");
        self.end_drag();
        self.history.set(workflow, Commit::Append);
        self.revalidate();
        self.selection.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Rect;
    use crate::persistence::MemoryPort;
    use crate::validation::{NO_CREDENTIAL, NO_INPUT};
    use crate::{NodeData, oracle};
    use serde_json::json;

    fn chain() -> (Editor, NodeId, NodeId) {
        let mut editor = Editor::default();
        let t = editor.add_node(NodeKind::Trigger, None);
        let l = editor.add_node(NodeKind::Logger, None);
        editor.add_edge(&t, &l, None);
        (editor, t, l)
    }

    #[test]
    fn add_node_tiles_and_selects() {
        let mut editor = Editor::default();
        let ids: Vec<_> = (0..6)
            .map(|_| editor.add_node(NodeKind::Wait, None))
            .collect();
        let w = editor.workflow();
        assert_eq!(w.find_node(&ids[1]).unwrap().position, Position::new(350.0, 100.0));
        assert_eq!(w.find_node(&ids[5]).unwrap().position, Position::new(100.0, 250.0));
        assert_eq!(editor.selection(), &[ids[5].clone()]);
    }

    #[test]
    fn warnings_follow_edits_without_extra_undo_steps() {
        let mut editor = Editor::default();
        let l = editor.add_node(NodeKind::Logger, None);
        assert_eq!(editor.history().len(), 2);
        assert_eq!(editor.workflow().find_node(&l).unwrap().warnings, vec![NO_INPUT]);

        let t = editor.add_node(NodeKind::Trigger, None);
        editor.add_edge(&t, &l, None);
        assert_eq!(editor.history().len(), 4);
        assert!(editor.workflow().nodes.iter().all(|n| n.warnings.is_empty()));

        editor.undo();
        assert_eq!(editor.workflow().find_node(&l).unwrap().warnings, vec![NO_INPUT]);
    }

    #[test]
    fn undo_redo_round_trip() {
        let (mut editor, t, _) = chain();
        editor.update_node(&t, NodeUpdate::label("Signup"));
        let w1 = editor.add_node(NodeKind::Wait, None);
        editor.delete_nodes(&[w1]);
        let tip = editor.workflow().clone();
        let steps = editor.history().index();

        for _ in 0..steps {
            assert!(editor.undo());
        }
        assert!(editor.workflow().is_empty());
        for _ in 0..steps {
            assert!(editor.redo());
        }
        assert_eq!(editor.workflow(), &tip);
    }

    #[test]
    fn selection_rules() {
        let mut editor = Editor::default();
        let a = editor.add_node(NodeKind::Trigger, None);
        let b = editor.add_node(NodeKind::Logger, None);
        let c = editor.add_node(NodeKind::Wait, None);

        editor.click_node(&a, false);
        editor.click_node(&b, true);
        assert_eq!(editor.selection(), &[a.clone(), b.clone()]);
        editor.click_node(&a, true);
        assert_eq!(editor.selection(), &[b.clone()]);

        editor.select_nodes(&[c.clone()], true);
        assert_eq!(editor.selection(), &[b.clone(), c.clone()]);
        editor.select_nodes(&[a.clone()], false);
        assert_eq!(editor.selection(), &[a.clone()]);

        editor.select_nodes(&[a, b], false);
        editor.delete_selected();
        assert!(editor.selection().is_empty());
        assert_eq!(editor.workflow().nodes.len(), 1);
    }

    #[test]
    fn whole_drag_is_one_undo_step() {
        let (mut editor, t, l) = chain();
        let before = editor.workflow().clone();
        let len = editor.history().len();

        assert!(editor.begin_node_drag(&t));
        for step in 1..=5 {
            editor.drag_to(Position::new(100.0 + step as f32 * 7.0, 100.0 + step as f32 * 30.0));
        }
        assert_eq!(editor.history().len(), len);
        editor.end_drag();

        assert_eq!(editor.history().len(), len + 1);
        let moved = editor.workflow().find_node(&t).unwrap().position;
        assert_eq!(moved, Position::new(140.0, 260.0));
        assert_eq!(editor.workflow().find_node(&l).unwrap().position, Position::new(350.0, 100.0));

        assert!(editor.undo());
        assert_eq!(editor.workflow(), &before);
    }

    #[test]
    fn editing_mid_drag_commits_the_drag_first() {
        let (mut editor, t, l) = chain();
        let before = editor.workflow().clone();
        let len = editor.history().len();

        assert!(editor.begin_node_drag(&t));
        editor.drag_to(Position::new(500.0, 500.0));
        editor.delete_nodes(&[l.clone()]);

        assert!(!editor.is_dragging());
        assert_eq!(editor.history().len(), len + 2);
        assert!(editor.workflow().find_node(&l).is_none());
        editor.end_drag();
        assert_eq!(editor.history().len(), len + 2);

        assert!(editor.undo());
        let w = editor.workflow();
        assert_eq!(w.find_node(&t).unwrap().position, Position::new(500.0, 500.0));
        assert!(w.find_node(&l).is_some());

        assert!(editor.undo());
        assert_eq!(editor.workflow(), &before);
    }

    #[test]
    fn drag_without_movement_adds_nothing() {
        let (mut editor, t, _) = chain();
        let len = editor.history().len();
        editor.begin_node_drag(&t);
        editor.drag_to(Position::new(100.0, 100.0));
        editor.end_drag();
        assert_eq!(editor.history().len(), len);
    }

    #[test]
    fn group_drag_and_collapse() {
        let (mut editor, t, l) = chain();
        editor.select_nodes(&[t.clone(), l.clone()], false);
        let group_id = editor.group_selected().unwrap();
        assert!(editor.selection().is_empty());

        let start = editor.workflow().find_group(&group_id).unwrap().position;
        assert!(editor.begin_group_drag(&group_id));
        editor.drag_to(start.offset(0.0, 400.0));
        editor.end_drag();
        assert_eq!(editor.workflow().find_node(&t).unwrap().position, Position::new(100.0, 500.0));

        editor.toggle_group_collapse(&group_id);
        assert!(!editor.begin_node_drag(&t));
        assert!(!editor.is_dragging());
    }

    #[test]
    fn group_needs_two_selected() {
        let (mut editor, t, _) = chain();
        editor.click_node(&t, false);
        let len = editor.history().len();
        assert!(editor.group_selected().is_none());
        assert_eq!(editor.history().len(), len);
    }

    #[test]
    fn paste_selects_fresh_non_overlapping_nodes() {
        let (mut editor, t, l) = chain();
        let config = editor.config().clone();
        editor.select_nodes(&[t.clone(), l.clone()], false);
        assert_eq!(editor.copy(), 2);

        let pasted = editor.paste();
        assert_eq!(pasted.len(), 2);
        assert_eq!(editor.selection(), pasted.as_slice());

        let w = editor.workflow();
        assert_eq!(w.nodes.len(), 4);
        assert_eq!(w.edges.len(), 2);
        let edge = w.edges.iter().find(|e| e.source == pasted[0]).unwrap();
        assert_eq!(edge.target, pasted[1]);

        let originals = [t, l];
        for id in &pasted {
            let rect = Rect::at(w.find_node(id).unwrap().position, &config);
            for other in &originals {
                assert!(!rect.overlaps(&Rect::at(w.find_node(other).unwrap().position, &config)));
            }
        }
    }

    #[test]
    fn deleting_credential_clears_refs_in_place() {
        let mut editor = Editor::default();
        let api = editor.add_node(NodeKind::ConnectApi, None);
        let cred = editor.add_credential("CRM", CredentialKind::ApiKey, HashMap::new());
        let mut data = NodeData::new();
        data.insert("credentialId".into(), json!(cred));
        editor.update_node(&api, NodeUpdate::data(data));
        assert!(!editor.workflow().nodes[0].warnings.contains(&NO_CREDENTIAL.to_string()));

        let len = editor.history().len();
        assert!(editor.delete_credential(&cred));
        assert_eq!(editor.history().len(), len);
        let node = editor.workflow().find_node(&api).unwrap();
        assert_eq!(node.data["credentialId"], "");
        assert!(node.warnings.contains(&NO_CREDENTIAL.to_string()));
        assert!(editor.credentials().is_empty());
    }

    #[test]
    fn failed_import_leaves_graph_alone() {
        let (mut editor, _, _) = chain();
        let before = editor.workflow().clone();
        assert!(editor.import_document(r#"{"nodes": []}"#).is_err());
        assert_eq!(editor.workflow(), &before);

        let exported = editor.export_document().unwrap();
        let mut other = Editor::default();
        other.import_document(&exported).unwrap();
        assert_eq!(other.workflow(), &before);
        assert!(other.can_undo());
    }

    #[test]
    fn generated_workflow_builds_a_chain() {
        let steps = oracle::validate_workflow(&json!([
            { "type": "TRIGGER", "label": "Signup" },
            { "type": "IF_CONDITION", "label": "Subscribed?" },
            { "type": "LOOP_START", "label": "Each item" },
            { "type": "LOGGER", "label": "Done" },
        ]))
        .unwrap();

        let (mut editor, _, _) = chain();
        editor.apply_generated_workflow(&steps);
        let w = editor.workflow();
        assert_eq!(w.nodes.len(), 4);
        assert_eq!(w.nodes[2].position, Position::new(600.0, 200.0));
        let handles: Vec<_> = w.edges.iter().map(|e| e.source_handle).collect();
        assert_eq!(
            handles,
            vec![None, Some(SourceHandle::True), Some(SourceHandle::LoopBody)]
        );

        assert!(editor.undo());
        assert_eq!(editor.workflow().nodes.len(), 2);
    }

    #[test]
    fn generated_node_uses_given_label() {
        let mut editor = Editor::default();
        let node = oracle::validate_node(&json!({ "type": "HIRE_EMPLOYEE", "label": "Hire a dev" }))
            .unwrap();
        let id = editor.apply_generated_node(&node);
        assert_eq!(editor.workflow().find_node(&id).unwrap().label, "Hire a dev");
    }

    #[test]
    fn ports_restore_and_persist_state() {
        let workflow_port: MemoryPort<Workflow> = MemoryPort::new();
        let credential_port: MemoryPort<Vec<Credential>> = MemoryPort::new();
        let saved_workflow = workflow_port.clone();

        let mut editor = Editor::with_ports(
            EditorConfig::default(),
            Box::new(workflow_port.clone()),
            Box::new(credential_port.clone()),
        );
        editor.add_node(NodeKind::Trigger, None);
        editor.add_credential("DB", CredentialKind::Database, HashMap::new());
        assert_eq!(saved_workflow.saved().unwrap().nodes.len(), 1);

        let restored = Editor::with_ports(
            EditorConfig::default(),
            Box::new(workflow_port),
            Box::new(credential_port),
        );
        assert_eq!(restored.workflow().nodes.len(), 1);
        assert_eq!(restored.credentials().len(), 1);
    }
}
