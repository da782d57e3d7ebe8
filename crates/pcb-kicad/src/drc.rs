use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, warn};
use pcb_fab::FabError;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::{KiCadCliBuilder, check_kicad_installed, path_arg};

/// KiCad DRC report structure matching the JSON schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrcReport {
    #[serde(default)]
    pub coordinate_units: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub kicad_version: String,
    #[serde(default)]
    pub source: String,
    pub violations: Vec<DrcViolation>,
    #[serde(default)]
    pub unconnected_items: Vec<serde_json::Value>,
}

/// A single DRC violation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrcViolation {
    #[serde(rename = "type")]
    pub violation_type: String,
    pub severity: String,
    pub description: String,
    #[serde(default)]
    pub items: Vec<DrcItem>,
    /// Whether this violation has been excluded by the user in KiCad
    #[serde(default)]
    pub excluded: bool,
}

/// An item involved in a DRC violation (track, via, pad, etc.)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrcItem {
    pub description: String,
    pub pos: DrcPosition,
    #[serde(default)]
    pub uuid: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrcPosition {
    pub x: f64,
    pub y: f64,
}

impl DrcReport {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse DRC JSON report")
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents =
            std::fs::read_to_string(path.as_ref()).context("Failed to read DRC report file")?;
        Self::from_json(&contents)
    }

    /// Error-level violations the user has not excluded.
    pub fn blocking_errors(&self) -> impl Iterator<Item = &DrcViolation> {
        self.violations
            .iter()
            .filter(|v| v.severity == "error" && !v.excluded)
    }

    /// Get count of violations by severity
    pub fn violation_counts(&self) -> (usize, usize) {
        let errors = self
            .violations
            .iter()
            .filter(|v| v.severity == "error")
            .count();
        let warnings = self
            .violations
            .iter()
            .filter(|v| v.severity == "warning")
            .count();
        (errors, warnings)
    }
}

impl DrcViolation {
    /// One line per violation, followed by an indented line per item.
    pub fn message(&self) -> String {
        let mut message = format!("[{}] {}", self.violation_type, self.description);
        for item in self.items.iter().filter(|i| !i.description.is_empty()) {
            message.push_str(&format!(
                "\n  - {} at ({:.3}, {:.3})",
                item.description, item.pos.x, item.pos.y
            ));
        }
        message
    }
}

/// Run KiCad DRC checks and return the parsed JSON report.
pub fn run_drc_report(pcb_path: &Path) -> Result<DrcReport> {
    check_kicad_installed()?;

    if !pcb_path.exists() {
        anyhow::bail!("PCB file not found: {}", pcb_path.display());
    }

    let temp_file =
        NamedTempFile::new().context("Failed to create temporary file for DRC output")?;
    let temp_path = temp_file.path();

    KiCadCliBuilder::new()
        .command("pcb")
        .subcommand("drc")
        .arg("--format")
        .arg("json")
        .arg("--severity-all")
        .arg("--severity-exclusions")
        .arg("--refill-zones")
        .arg("--output")
        .arg(path_arg(temp_path))
        .arg(path_arg(pcb_path))
        .run()
        .context("Failed to run KiCad DRC")?;

    DrcReport::from_file(temp_path).context("Failed to parse DRC report")
}

/// Check a report for blocking violations.
pub fn check_report(report: &DrcReport) -> pcb_fab::Result<()> {
    let blocking: Vec<String> = report.blocking_errors().map(DrcViolation::message).collect();
    let (errors, warnings) = report.violation_counts();
    debug!("DRC finished with {errors} errors and {warnings} warnings");
    if warnings > 0 {
        warn!("DRC reported {warnings} warnings");
    }
    if blocking.is_empty() {
        return Ok(());
    }
    Err(FabError::UpstreamValidation(format!(
        "DRC found {} errors:\n{}",
        blocking.len(),
        blocking.join("\n")
    )))
}

/// Fail unless the board passes DRC.
pub fn ensure_passing_drc(pcb_path: &Path) -> Result<()> {
    let report = run_drc_report(pcb_path)?;
    check_report(&report)?;
    Ok(())
}
