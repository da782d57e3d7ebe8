//! Data extracted from a loaded board.
//!
//! Nothing here parses native board files; an external extractor dumps the
//! title block, the layer table and the graphic drawings as JSON.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Board internal units per millimeter (nanometer resolution).
pub const IU_PER_MM: f64 = 1_000_000.0;

pub fn iu_to_mm(iu: i64) -> f64 {
    iu as f64 / IU_PER_MM
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Point {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Segment,
    Rectangle,
    Arc,
    Circle,
    Polygon,
    Bezier,
}

/// A graphic drawing on the board, in board internal units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawingPrimitive {
    pub layer: i32,
    pub shape: ShapeKind,
    pub start: Point,
    pub end: Point,
}

impl DrawingPrimitive {
    pub fn new(layer: i32, shape: ShapeKind, start: Point, end: Point) -> Self {
        Self {
            layer,
            shape,
            start,
            end,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TitleBlock {
    pub title: String,
    pub date: String,
    pub revision: String,
    pub company: String,
    pub comments: Vec<String>,
}

impl TitleBlock {
    /// Comment by zero-based index; missing comments are empty.
    pub fn comment(&self, index: usize) -> &str {
        self.comments.get(index).map(String::as_str).unwrap_or("")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardData {
    /// Path of the board file, used for naming and git lookups.
    pub file: PathBuf,
    pub title_block: TitleBlock,
    /// Layer id -> human readable layer name (e.g. `F.Silkscreen`).
    pub layers: BTreeMap<i32, String>,
    pub drawings: Vec<DrawingPrimitive>,
}

impl BoardData {
    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn layer_name(&self, layer: i32) -> Option<&str> {
        self.layers.get(&layer).map(String::as_str)
    }

    /// Board name without directory and `.kicad_pcb` extension.
    pub fn board_name(&self) -> String {
        board_name(&self.file)
    }
}

pub fn board_name(board_file: &Path) -> String {
    board_file
        .file_name()
        .map(|name| name.to_string_lossy().replace(".kicad_pcb", ""))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_board_name_strips_extension() {
        assert_eq!(board_name(Path::new("/work/demo/demo.kicad_pcb")), "demo");
        assert_eq!(board_name(Path::new("plain")), "plain");
    }

    #[test]
    fn test_board_data_from_json() {
        let json = r#"{
            "file": "demo.kicad_pcb",
            "title_block": {"title": "Demo", "revision": "B"},
            "layers": {"37": "F.Silkscreen"},
            "drawings": [
                {"layer": 37, "shape": "rectangle",
                 "start": {"x": 0, "y": 0}, "end": {"x": 5000000, "y": 5000000}}
            ]
        }"#;
        let board: BoardData = serde_json::from_str(json).unwrap();
        assert_eq!(board.layer_name(37), Some("F.Silkscreen"));
        assert_eq!(board.title_block.revision, "B");
        assert_eq!(board.title_block.comment(3), "");
        assert_eq!(board.drawings[0].shape, ShapeKind::Rectangle);
        assert_eq!(iu_to_mm(board.drawings[0].end.x), 5.0);
    }
}
