use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use clap::Args;
use pcb_fab::template::DEFAULT_NAME_TEMPLATE;
use pcb_fab::{ArchiveConfig, BoardData, TemplateVars, VendorProfile, build_archive};
use pcb_kicad::{KiCadPlotter, ensure_passing_drc};

/// Arguments shared by every manufacturer command.
#[derive(Args, Debug, Clone)]
pub struct FabArgs {
    /// Board file (.kicad_pcb)
    #[arg(value_name = "BOARD", value_hint = clap::ValueHint::FilePath)]
    pub board: PathBuf,

    /// Directory the outputs are written to
    #[arg(value_name = "OUTPUT_DIR", value_hint = clap::ValueHint::DirPath)]
    pub output_dir: PathBuf,

    /// Template for output file names; `{}` is replaced by the file kind
    #[arg(long = "nametemplate", default_value = DEFAULT_NAME_TEMPLATE)]
    pub name_template: String,

    /// Skip the design rule check
    #[arg(long = "no-drc")]
    pub no_drc: bool,

    /// Extracted board data (title block, layers, drawings) as JSON
    #[arg(long = "board-data", value_name = "JSON")]
    pub board_data: Option<PathBuf>,

    /// Project variable available to name templates as `user-NAME`
    #[arg(long = "var", value_name = "NAME=VALUE", value_parser = parse_var)]
    pub vars: Vec<(String, String)>,
}

fn parse_var(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{s}'"))?;
    if name.is_empty() {
        return Err(format!("empty variable name in '{s}'"));
    }
    Ok((name.to_string(), value.to_string()))
}

/// Split a comma separated option into trimmed, non-empty items.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl FabArgs {
    pub fn load_board(&self) -> Result<BoardData> {
        let mut board = match &self.board_data {
            Some(path) => BoardData::load(path)
                .with_context(|| format!("Failed to load board data from {}", path.display()))?,
            None => BoardData::default(),
        };
        board.file = self.board.clone();
        Ok(board)
    }

    pub fn template_vars(&self, board: &BoardData) -> TemplateVars {
        let vars: BTreeMap<String, String> = self.vars.iter().cloned().collect();
        TemplateVars::for_board(board, vars, Local::now())
    }

    pub fn check_drc(&self) -> Result<()> {
        if self.no_drc {
            log::debug!("Skipping DRC");
            return Ok(());
        }
        ensure_passing_drc(&self.board)
            .with_context(|| format!("{} did not pass DRC", self.board.display()))
    }

    /// Plot, rename and package the gerbers, then report the archive.
    pub fn archive_gerbers(
        &self,
        vendor: &VendorProfile,
        board: &BoardData,
        vars: &TemplateVars,
    ) -> Result<PathBuf> {
        let mut config = ArchiveConfig::for_vendor(
            vendor,
            &self.output_dir,
            board.board_name(),
            self.name_template.as_str(),
        );
        if let Some(sidecar) = vendor.sidecar_file {
            let path = board_dir(&self.board).join(sidecar);
            if path.exists() {
                config.extra_files.push(path);
            }
        }

        let plotter = KiCadPlotter::new(&self.board, vendor.plot.clone());
        let report = build_archive(&config, &plotter, vars)
            .with_context(|| format!("Failed to prepare {} gerbers", vendor.name))?;

        println!(
            "Gerber files archived in {} (creation time {})",
            report.path.display(),
            report.created.format("%Y-%m-%d %H:%M:%S")
        );
        Ok(report.path)
    }
}

pub fn board_dir(board: &Path) -> PathBuf {
    board
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}
