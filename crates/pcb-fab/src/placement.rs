//! Placement (pick-and-place) records, vendor corrections and the CSV
//! vendors consume.

use std::collections::{BTreeSet, HashMap};
use std::io::Write;
use std::path::Path;

use log::{debug, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::component::Component;
use crate::natural_string::sort_by_designator;
use crate::{FabError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Top,
    Bottom,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Top => "top",
            Side::Bottom => "bottom",
        }
    }

    pub fn from_layer_name(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "top" | "front" | "f.cu" => Some(Side::Top),
            "bottom" | "back" | "b.cu" => Some(Side::Bottom),
            _ => None,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pick-and-place data for one footprint, in millimeters and degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementRecord {
    pub reference: String,
    pub x: f64,
    pub y: f64,
    pub rotation: f64,
    pub side: Side,
    #[serde(default)]
    pub value: String,
    /// Footprint identifier, `Resistor_SMD:R_0603_1608Metric` or the bare
    /// item name when the source does not record the library.
    #[serde(default)]
    pub footprint: String,
}

/// Produces placement records for the footprints of a board.
///
/// Only references in `references` need to be collected.
pub trait PlacementCollector {
    fn collect(&self, references: &BTreeSet<String>) -> anyhow::Result<Vec<PlacementRecord>>;
}

/// A placement offset applied on top of the footprint origin.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Correction {
    pub x: f64,
    pub y: f64,
    pub rotation: f64,
}

impl Correction {
    /// Parse `x;y;rotation` as stored in a component field.
    pub fn parse(value: &str) -> Option<Self> {
        let mut parts = value.split(';').map(|p| p.trim().parse::<f64>());
        let correction = Correction {
            x: parts.next()?.ok()?,
            y: parts.next()?.ok()?,
            rotation: parts.next()?.ok()?,
        };
        if parts.next().is_some() {
            return None;
        }
        Some(correction)
    }
}

#[derive(Debug, Clone)]
pub struct CorrectionPattern {
    pub pattern: Regex,
    pub correction: Correction,
}

#[derive(Debug, Deserialize)]
struct CorrectionRow {
    #[serde(rename = "Pattern")]
    pattern: String,
    #[serde(rename = "X correction")]
    x: f64,
    #[serde(rename = "Y correction")]
    y: f64,
    #[serde(rename = "Rotation")]
    rotation: f64,
}

/// Parse a correction table (`Pattern,X correction,Y correction,Rotation`).
pub fn parse_correction_patterns(content: &str) -> Result<Vec<CorrectionPattern>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());
    let mut patterns = Vec::new();
    for row in reader.deserialize::<CorrectionRow>() {
        let row = row?;
        let pattern = Regex::new(&row.pattern)
            .map_err(|e| FabError::Correction(format!("bad pattern '{}': {e}", row.pattern)))?;
        patterns.push(CorrectionPattern {
            pattern,
            correction: Correction {
                x: row.x,
                y: row.y,
                rotation: row.rotation,
            },
        });
    }
    Ok(patterns)
}

pub fn load_correction_patterns(path: &Path) -> Result<Vec<CorrectionPattern>> {
    parse_correction_patterns(&std::fs::read_to_string(path)?)
}

/// Correction sources, in precedence order: component fields first, then
/// footprint patterns.
#[derive(Debug, Clone, Default)]
pub struct CorrectionConfig {
    pub fields: Vec<String>,
    pub patterns: Vec<CorrectionPattern>,
}

impl CorrectionConfig {
    fn lookup(&self, record: &PlacementRecord, component: Option<&Component>) -> Option<Correction> {
        if let Some(value) = component.and_then(|c| c.first_non_empty(&self.fields)) {
            match Correction::parse(value) {
                Some(correction) => return Some(correction),
                None => warn!(
                    "Ignoring malformed correction '{value}' on {}",
                    record.reference
                ),
            }
        }
        self.patterns
            .iter()
            .find(|p| p.pattern.is_match(&record.footprint))
            .map(|p| p.correction)
    }

    /// Apply corrections to `records` in place. `components` supplies the
    /// per-component correction fields.
    pub fn apply(&self, records: &mut [PlacementRecord], components: &[Component]) {
        if self.fields.is_empty() && self.patterns.is_empty() {
            return;
        }
        let by_reference: HashMap<&str, &Component> = components
            .iter()
            .map(|c| (c.reference.as_str(), c))
            .collect();
        for record in records.iter_mut() {
            let component = by_reference.get(record.reference.as_str()).copied();
            if let Some(correction) = self.lookup(record, component) {
                debug!("Correcting {} by {correction:?}", record.reference);
                apply_correction(record, correction);
            }
        }
    }
}

fn apply_correction(record: &mut PlacementRecord, correction: Correction) {
    let x_offset = match record.side {
        Side::Top => correction.x,
        Side::Bottom => -correction.x,
    };
    // Offsets are given in footprint coordinates; rotate them with the part.
    let (sin, cos) = record.rotation.to_radians().sin_cos();
    record.x += x_offset * cos - correction.y * sin;
    record.y += x_offset * sin + correction.y * cos;
    record.rotation = normalize_rotation(record.rotation + correction.rotation);
}

fn normalize_rotation(rotation: f64) -> f64 {
    let normalized = rotation.rem_euclid(360.0);
    // rem_euclid may round up to exactly 360 for tiny negative inputs
    if normalized >= 360.0 { 0.0 } else { normalized }
}

/// Give bare footprint names their `library:name` form.
///
/// Position exports only carry the footprint name, while removal lists and
/// correction patterns are written against `library:name`. The library is
/// taken from the component with the same reference, provided its footprint
/// names the same item.
pub fn qualify_footprints(records: &mut [PlacementRecord], components: &[Component]) {
    let by_reference: HashMap<&str, &str> = components
        .iter()
        .map(|c| (c.reference.as_str(), c.footprint.as_str()))
        .collect();
    for record in records.iter_mut() {
        if record.footprint.contains(':') {
            continue;
        }
        let Some(&full) = by_reference.get(record.reference.as_str()) else {
            continue;
        };
        let Some((_, item)) = full.split_once(':') else {
            continue;
        };
        if record.footprint.is_empty() || record.footprint == item {
            record.footprint = full.to_string();
        }
    }
}

pub const PLACEMENT_CSV_HEADER: [&str; 5] = ["Designator", "Mid X", "Mid Y", "Rotation", "Layer"];

/// Write the placement CSV, naturally sorted by designator.
pub fn write_placement_csv<W: Write>(records: &[PlacementRecord], writer: W) -> Result<()> {
    let mut sorted: Vec<&PlacementRecord> = records.iter().collect();
    sort_by_designator(&mut sorted, |r| r.reference.as_str());

    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(PLACEMENT_CSV_HEADER)?;
    for record in sorted {
        csv.write_record([
            record.reference.clone(),
            format!("{:.4}", record.x),
            format!("{:.4}", record.y),
            format!("{:.4}", record.rotation),
            record.side.to_string(),
        ])?;
    }
    csv.flush()?;
    Ok(())
}
