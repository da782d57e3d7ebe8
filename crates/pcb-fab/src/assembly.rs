//! Assembly outputs: BOM, placement and unassigned-parts report.

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::bom::{Bom, BomConfig, collect_bom, write_bom_csv, write_unassigned_report};
use crate::component::Component;
use crate::placement::{
    CorrectionConfig, PlacementCollector, qualify_footprints, write_placement_csv,
};
use crate::template::{TemplateVars, expand_name_template};
use crate::vendor::VendorProfile;
use crate::{FabError, Result};

#[derive(Debug, Clone)]
pub struct AssemblyConfig {
    pub bom: BomConfig,
    pub corrections: CorrectionConfig,
    /// Fail after reporting when a placed component has no order code.
    pub missing_order_code_fatal: bool,
    pub footprint_replacements: &'static [(&'static str, &'static str)],
    /// Footprints (`library:name`) left off the placement data entirely.
    pub remove_footprints: BTreeSet<String>,
    pub name_template: String,
}

impl AssemblyConfig {
    pub fn for_vendor(vendor: &VendorProfile, name_template: impl Into<String>) -> Self {
        Self {
            bom: BomConfig {
                order_code_fields: vendor
                    .default_order_code_fields
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                ignore_field: vendor.ignore_field.to_string(),
                ..BomConfig::default()
            },
            corrections: CorrectionConfig {
                fields: vendor
                    .default_correction_fields
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                patterns: Vec::new(),
            },
            missing_order_code_fatal: false,
            footprint_replacements: vendor.footprint_replacements,
            remove_footprints: BTreeSet::new(),
            name_template: name_template.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AssemblyReport {
    /// BOM after reconciliation with placement data.
    pub bom: Bom,
    pub bom_path: PathBuf,
    pub placement_path: PathBuf,
    pub unassigned_path: PathBuf,
    /// Placed references without an order code, in BOM order.
    pub missing_order_codes: Vec<String>,
}

fn output_path(
    output_dir: &Path,
    config: &AssemblyConfig,
    kind: &str,
    extension: &str,
    vars: &TemplateVars,
) -> Result<PathBuf> {
    let name = expand_name_template(&config.name_template, kind, vars)?;
    Ok(output_dir.join(format!("{name}.{extension}")))
}

/// Produce the assembly files for `components` into `output_dir`.
///
/// When order codes are missing and `missing_order_code_fatal` is set, the
/// unassigned report is still written and the call fails with
/// [`FabError::MissingOrderCodes`] before the BOM and placement files are.
pub fn export_assembly(
    components: &[Component],
    collector: &dyn PlacementCollector,
    config: &AssemblyConfig,
    output_dir: &Path,
    vars: &TemplateVars,
) -> Result<AssemblyReport> {
    fs::create_dir_all(output_dir)?;

    let bom = collect_bom(components, &config.bom);
    let bom_references: BTreeSet<String> =
        bom.references().into_iter().map(str::to_string).collect();
    debug!("BOM has {} groups, {} references", bom.len(), bom_references.len());

    let mut records = collector
        .collect(&bom_references)
        .map_err(FabError::Placement)?;
    qualify_footprints(&mut records, components);
    records.retain(|r| {
        bom_references.contains(&r.reference) && !config.remove_footprints.contains(&r.footprint)
    });
    config.corrections.apply(&mut records, components);

    let placed: BTreeSet<&str> = records.iter().map(|r| r.reference.as_str()).collect();
    let bom = bom.retain_placed(&placed);

    let missing = bom.missing_order_code_references();
    for reference in &missing {
        debug!("Component {reference} is missing ordercode");
    }

    let unassigned = collect_bom(
        components,
        &BomConfig {
            skip_missing: false,
            ..config.bom.clone()
        },
    )
    .missing_order_code();
    let unassigned_path = output_path(output_dir, config, "unassigned", "txt", vars)?;
    write_unassigned_report(&unassigned, BufWriter::new(File::create(&unassigned_path)?))?;
    info!("Wrote {}", unassigned_path.display());

    if config.missing_order_code_fatal && !missing.is_empty() {
        return Err(FabError::MissingOrderCodes {
            references: missing,
        });
    }

    let placement_path = output_path(output_dir, config, "pos", "csv", vars)?;
    let final_references = bom.references();
    records.retain(|r| final_references.contains(r.reference.as_str()));
    write_placement_csv(&records, File::create(&placement_path)?)?;
    info!("Wrote {}", placement_path.display());

    let bom_path = output_path(output_dir, config, "bom", "csv", vars)?;
    write_bom_csv(&bom, config.footprint_replacements, File::create(&bom_path)?)?;
    info!("Wrote {}", bom_path.display());

    Ok(AssemblyReport {
        bom,
        bom_path,
        placement_path,
        unassigned_path,
        missing_order_codes: missing,
    })
}
