use serde::{Deserialize, Serialize};

use crate::{Position, Size};

/// Geometry and history tuning for the editor.
///
/// Every field has a default, so a partial JSON object is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Fixed on-canvas node footprint used for collision and bounding boxes.
    pub node_width: f32,
    pub node_height: f32,
    /// Drag results snap to this cell size when the drag is committed.
    pub grid_size: f32,
    /// Margin around member nodes when a group is created.
    pub group_padding: f32,
    /// Colors assigned to new groups, cycled by group count.
    pub group_palette: Vec<String>,
    /// Relaxation passes run by the drag de-overlap step.
    pub repulsion_iterations: usize,
    /// Extra separation added when two nodes are pushed apart.
    pub repulsion_padding: f32,
    /// Offset applied to pasted nodes relative to their source.
    pub paste_offset: f32,
    /// Maximum nudges tried while searching a free paste position.
    pub paste_search_limit: usize,
    /// Nodes per row when tiling newly added nodes.
    pub tile_columns: usize,
    pub tile_origin: Position,
    pub tile_spacing: Size,
    /// Oldest snapshots are dropped once history grows past this.
    pub max_history: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            node_width: 208.0,
            node_height: 80.0,
            grid_size: 20.0,
            group_padding: 40.0,
            group_palette: vec![
                "#4f46e5".to_string(),
                "#db2777".to_string(),
                "#16a34a".to_string(),
                "#d97706".to_string(),
            ],
            repulsion_iterations: 5,
            repulsion_padding: 5.0,
            paste_offset: 20.0,
            paste_search_limit: 200,
            tile_columns: 5,
            tile_origin: Position::new(100.0, 100.0),
            tile_spacing: Size {
                width: 250.0,
                height: 150.0,
            },
            max_history: 200,
        }
    }
}

impl EditorConfig {
    pub fn node_size(&self) -> Size {
        Size {
            width: self.node_width,
            height: self.node_height,
        }
    }

    /// Deterministic slot for the `index`-th node when tiling new nodes.
    pub fn tile_position(&self, index: usize) -> Position {
        let columns = self.tile_columns.max(1);
        Position {
            x: self.tile_origin.x + (index % columns) as f32 * self.tile_spacing.width,
            y: self.tile_origin.y + (index / columns) as f32 * self.tile_spacing.height,
        }
    }

    pub fn group_color(&self, group_count: usize) -> String {
        if self.group_palette.is_empty() {
            return "#4f46e5".to_string();
        }
        self.group_palette[group_count % self.group_palette.len()].clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiles_wrap_after_five_columns() {
        let config = EditorConfig::default();
        assert_eq!(config.tile_position(0), Position::new(100.0, 100.0));
        assert_eq!(config.tile_position(4), Position::new(1100.0, 100.0));
        assert_eq!(config.tile_position(5), Position::new(100.0, 250.0));
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: EditorConfig = serde_json::from_str(r#"{"grid_size": 10.0}"#).unwrap();
        assert_eq!(config.grid_size, 10.0);
        assert_eq!(config.node_width, 208.0);
        assert_eq!(config.group_palette.len(), 4);
    }

    #[test]
    fn group_colors_cycle() {
        let config = EditorConfig::default();
        assert_eq!(config.group_color(0), "#4f46e5");
        assert_eq!(config.group_color(4), "#4f46e5");
        assert_eq!(config.group_color(3), "#d97706");
    }
}
