use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use log::debug;
use pcb_fab::{PlacementCollector, PlacementRecord, Side};
use serde::Deserialize;
use tempfile::NamedTempFile;

use crate::{KiCadCliBuilder, path_arg};

/// Row of `kicad-cli pcb export pos --format csv`.
#[derive(Debug, Deserialize)]
struct PositionRow {
    #[serde(rename = "Ref")]
    reference: String,
    #[serde(rename = "Val")]
    value: String,
    #[serde(rename = "Package")]
    package: String,
    #[serde(rename = "PosX")]
    x: f64,
    #[serde(rename = "PosY")]
    y: f64,
    #[serde(rename = "Rot")]
    rotation: f64,
    #[serde(rename = "Side")]
    side: String,
}

/// Parse a KiCad position CSV (millimeters).
pub fn parse_position_csv(content: &str) -> Result<Vec<PlacementRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());
    let mut records = Vec::new();
    for row in reader.deserialize::<PositionRow>() {
        let row = row.context("Malformed position file row")?;
        let side = Side::from_layer_name(&row.side)
            .ok_or_else(|| anyhow!("Unknown side '{}' for {}", row.side, row.reference))?;
        records.push(PlacementRecord {
            reference: row.reference,
            x: row.x,
            y: row.y,
            rotation: row.rotation,
            side,
            value: row.value,
            footprint: row.package,
        });
    }
    Ok(records)
}

/// Collects footprint positions from a board with `kicad-cli`.
#[derive(Debug, Clone)]
pub struct KiCadPlacementCollector {
    pcb: PathBuf,
}

impl KiCadPlacementCollector {
    pub fn new(pcb: impl Into<PathBuf>) -> Self {
        Self { pcb: pcb.into() }
    }
}

impl PlacementCollector for KiCadPlacementCollector {
    fn collect(&self, references: &BTreeSet<String>) -> Result<Vec<PlacementRecord>> {
        let temp_file =
            NamedTempFile::new().context("Failed to create temporary file for position data")?;

        KiCadCliBuilder::new()
            .command("pcb")
            .subcommand("export")
            .subcommand("pos")
            .args(["--format", "csv", "--units", "mm", "--side", "both"])
            .arg("--output")
            .arg(path_arg(temp_file.path()))
            .arg(path_arg(&self.pcb))
            .run()
            .context("Failed to generate pick-and-place file")?;

        let content = std::fs::read_to_string(temp_file.path())
            .context("Failed to read pick-and-place file")?;
        let mut records = parse_position_csv(&content)?;
        let total = records.len();
        records.retain(|r| references.contains(&r.reference));
        debug!(
            "Collected {} of {total} footprint positions",
            records.len()
        );
        Ok(records)
    }
}
