//! Component records from `kicad-cli sch export bom`.

use std::path::Path;

use anyhow::{Context, Result, bail};
use log::debug;
use pcb_fab::{AssemblyFlags, Component};
use tempfile::NamedTempFile;

use crate::{KiCadCliBuilder, path_arg};

/// Columns requested ahead of the user fields, in order.
const FIXED_FIELDS: [&str; 6] = [
    "Reference",
    "Value",
    "Footprint",
    "${DNP}",
    "${EXCLUDE_FROM_BOM}",
    "${EXCLUDE_FROM_BOARD}",
];

fn field_list(fields: &[String]) -> String {
    FIXED_FIELDS
        .iter()
        .map(|f| f.to_string())
        .chain(fields.iter().cloned())
        .collect::<Vec<_>>()
        .join(",")
}

/// Parse the CSV written with [`FIXED_FIELDS`] followed by `fields`.
pub fn parse_bom_export(content: &str, fields: &[String]) -> Result<Vec<Component>> {
    let mut reader = csv::ReaderBuilder::new().from_reader(content.as_bytes());
    let expected = FIXED_FIELDS.len() + fields.len();
    let mut components = Vec::new();
    for record in reader.records() {
        let record = record.context("Malformed schematic BOM row")?;
        if record.len() != expected {
            bail!(
                "Expected {expected} columns in schematic BOM export, found {}",
                record.len()
            );
        }
        let column = |i: usize| record.get(i).unwrap_or("").trim();
        let flags = AssemblyFlags {
            dnp: !column(3).is_empty(),
            in_bom: column(4).is_empty(),
            on_board: column(5).is_empty(),
        };
        let mut component =
            Component::new(column(0), column(1), column(2)).with_flags(flags);
        for (i, name) in fields.iter().enumerate() {
            let value = column(FIXED_FIELDS.len() + i);
            if !value.is_empty() {
                component = component.with_field(name.as_str(), value);
            }
        }
        components.push(component);
    }
    Ok(components)
}

/// Extract components with their `fields` from a schematic.
pub fn extract_components(schematic: &Path, fields: &[String]) -> Result<Vec<Component>> {
    if !schematic.exists() {
        bail!("Schematic file not found: {}", schematic.display());
    }
    let temp_file =
        NamedTempFile::new().context("Failed to create temporary file for schematic BOM")?;

    KiCadCliBuilder::new()
        .command("sch")
        .subcommand("export")
        .subcommand("bom")
        .arg("--fields")
        .arg(field_list(fields))
        .arg("--output")
        .arg(path_arg(temp_file.path()))
        .arg(path_arg(schematic))
        .run()
        .context("Failed to export schematic BOM")?;

    let content =
        std::fs::read_to_string(temp_file.path()).context("Failed to read schematic BOM")?;
    let components = parse_bom_export(&content, fields)?;
    debug!(
        "Extracted {} components from {}",
        components.len(),
        schematic.display()
    );
    Ok(components)
}
