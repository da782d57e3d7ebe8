//! Detection of QR-code placement marks drawn on silkscreen.
//!
//! A mark is a square rectangle of one of a few standard sizes. Layers are
//! matched by display name, so numeric layer ids may change between board
//! format revisions without breaking detection.

use serde::Serialize;

use crate::board::{BoardData, DrawingPrimitive, IU_PER_MM, ShapeKind, iu_to_mm};

/// Standard QR mark sizes in millimeters.
pub const QR_TARGET_SIZES_MM: [f64; 3] = [5.0, 8.0, 10.0];
/// Allowed deviation of width and height from a target size.
pub const QR_TOLERANCE_MM: f64 = 0.1;

// Absorbs float noise from the nanometer -> mm conversion.
const EPS: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QrSquare {
    pub size_mm: f64,
    pub layer: String,
    pub center_mm: (f64, f64),
}

impl std::fmt::Display for QrSquare {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "QR code mark {}mm on {} at ({:.3}, {:.3}) mm",
            self.size_mm, self.layer, self.center_mm.0, self.center_mm.1
        )
    }
}

#[derive(Debug, Clone)]
pub struct QrMarkDetector {
    sizes: Vec<f64>,
    tolerance: f64,
}

impl Default for QrMarkDetector {
    fn default() -> Self {
        Self::new(QR_TARGET_SIZES_MM.to_vec(), QR_TOLERANCE_MM)
    }
}

impl QrMarkDetector {
    pub fn new(sizes: Vec<f64>, tolerance: f64) -> Self {
        Self { sizes, tolerance }
    }

    /// Find all QR marks on the silkscreen layers of `board`.
    pub fn detect(&self, board: &BoardData) -> Vec<QrSquare> {
        board
            .drawings
            .iter()
            .filter_map(|drawing| {
                let layer = board.layer_name(drawing.layer)?;
                if !is_silkscreen(layer) {
                    return None;
                }
                self.match_drawing(drawing, layer)
            })
            .collect()
    }

    fn match_drawing(&self, drawing: &DrawingPrimitive, layer: &str) -> Option<QrSquare> {
        if drawing.shape != ShapeKind::Rectangle {
            return None;
        }

        // Coordinates come from extracted JSON; keep the arithmetic overflow free.
        let width = drawing.end.x.abs_diff(drawing.start.x) as f64 / IU_PER_MM;
        let height = drawing.end.y.abs_diff(drawing.start.y) as f64 / IU_PER_MM;

        // Width and height must both fit the same target.
        let size = self.sizes.iter().copied().find(|target| {
            (width - target).abs() <= self.tolerance + EPS
                && (height - target).abs() <= self.tolerance + EPS
        })?;

        let center_x = (iu_to_mm(drawing.start.x) + iu_to_mm(drawing.end.x)) / 2.0;
        let center_y = (iu_to_mm(drawing.start.y) + iu_to_mm(drawing.end.y)) / 2.0;

        Some(QrSquare {
            size_mm: size,
            layer: layer.to_string(),
            center_mm: (center_x, center_y),
        })
    }
}

fn is_silkscreen(layer_name: &str) -> bool {
    layer_name.to_lowercase().contains("silk")
}
