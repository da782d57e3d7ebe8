use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use comfy_table::Table;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use pcb_fab::component::load_components;
use pcb_fab::placement::load_correction_patterns;
use pcb_fab::{AssemblyConfig, Bom, Component, FabError, JLCPCB, export_assembly};
use pcb_kicad::{KiCadPlacementCollector, extract_components};

use crate::common::{FabArgs, split_list};

#[derive(Args, Debug, Clone)]
#[command(about = "Prepare fabrication files for JLCPCB including their assembly service")]
pub struct JlcpcbArgs {
    #[command(flatten)]
    pub fab: FabArgs,

    /// Also produce BOM and placement files for assembly
    #[arg(long)]
    pub assembly: bool,

    /// Schematic the components are read from (defaults to the board's .kicad_sch)
    #[arg(long, value_name = "FILE", conflicts_with = "components")]
    pub schematic: Option<PathBuf>,

    /// JSON component list used instead of the schematic
    #[arg(long, value_name = "JSON")]
    pub components: Option<PathBuf>,

    /// Comma separated references to leave out of the BOM
    #[arg(long, default_value = "")]
    pub ignore: String,

    /// Comma separated order code fields, in priority order
    #[arg(long, default_value = "LCSC")]
    pub field: String,

    /// Comma separated fields holding `x;y;rotation` placement corrections
    #[arg(long, default_value = "JLCPCB_CORRECTION")]
    pub corrections: String,

    /// CSV with footprint regex based placement corrections
    #[arg(long = "correctionpatterns", value_name = "CSV")]
    pub correction_patterns: Option<PathBuf>,

    /// Fail if a placed component has no order code
    #[arg(long = "missing-error")]
    pub missing_error: bool,

    /// Footprint (`library:name`) to drop from the placement data
    #[arg(long = "remove-footprint", value_name = "FOOTPRINT")]
    pub remove_footprints: Vec<String>,

    /// Leave components without an order code out of the BOM
    #[arg(long = "skip-missing")]
    pub skip_missing: bool,

    /// Active build variant
    #[arg(long)]
    pub variant: Option<String>,

    /// Print the final BOM as a table
    #[arg(long = "show-bom")]
    pub show_bom: bool,
}

impl JlcpcbArgs {
    fn assembly_config(&self) -> Result<AssemblyConfig> {
        let mut config = AssemblyConfig::for_vendor(&JLCPCB, self.fab.name_template.as_str());
        config.bom.order_code_fields = split_list(&self.field);
        config.bom.ignore = split_list(&self.ignore).into_iter().collect();
        config.bom.skip_missing = self.skip_missing;
        config.bom.variant = self.variant.clone();
        config.corrections.fields = split_list(&self.corrections);
        if let Some(path) = &self.correction_patterns {
            config.corrections.patterns = load_correction_patterns(path).with_context(|| {
                format!("Failed to load correction patterns from {}", path.display())
            })?;
        }
        config.missing_order_code_fatal = self.missing_error;
        config.remove_footprints = self.remove_footprints.iter().cloned().collect();
        Ok(config)
    }

    fn load_components(&self, config: &AssemblyConfig) -> Result<Vec<Component>> {
        if let Some(path) = &self.components {
            return load_components(path)
                .with_context(|| format!("Failed to load components from {}", path.display()));
        }

        let schematic = self
            .schematic
            .clone()
            .unwrap_or_else(|| self.fab.board.with_extension("kicad_sch"));
        let fields: BTreeSet<String> = config
            .bom
            .order_code_fields
            .iter()
            .chain(&config.corrections.fields)
            .chain([&config.bom.ignore_field, &config.bom.variant_dnp_field])
            .cloned()
            .collect();
        let fields: Vec<String> = fields.into_iter().collect();
        extract_components(&schematic, &fields)
    }
}

fn warn_missing(references: &[String]) {
    for reference in references {
        eprintln!(
            "{} Component {reference} is missing ordercode",
            "Warning:".yellow()
        );
    }
}

fn print_bom_table(bom: &Bom) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(comfy_table::ContentArrangement::DynamicFullWidth);
    table.set_header(vec!["Comment", "Designators", "Footprint", "LCSC"]);
    for group in bom.groups() {
        table.add_row(vec![
            group.key.value.as_str(),
            group.references.join(",").as_str(),
            group.key.footprint.as_str(),
            group.key.order_code.as_deref().unwrap_or_default(),
        ]);
    }
    println!("{table}");
}

pub fn execute(args: JlcpcbArgs) -> Result<()> {
    let fab = &args.fab;
    fab.check_drc()?;

    let board = fab.load_board()?;
    let vars = fab.template_vars(&board);
    fab.archive_gerbers(&JLCPCB, &board, &vars)?;

    if !args.assembly {
        return Ok(());
    }

    let config = args.assembly_config()?;
    let components = args.load_components(&config)?;
    let collector = KiCadPlacementCollector::new(&fab.board);

    let report = match export_assembly(&components, &collector, &config, &fab.output_dir, &vars)
    {
        Ok(report) => report,
        Err(e) => {
            if let FabError::MissingOrderCodes { references } = &e {
                warn_missing(references);
            }
            return Err(e.into());
        }
    };
    warn_missing(&report.missing_order_codes);

    if args.show_bom {
        print_bom_table(&report.bom);
    }
    Ok(())
}
