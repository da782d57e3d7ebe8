use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use pcb_fab::{BoardData, QrMarkDetector};

#[derive(Args, Debug, Clone)]
#[command(about = "Find square QR code marks on silkscreen layers")]
pub struct QrArgs {
    /// Extracted board data as JSON
    #[arg(value_name = "BOARD_DATA", value_hint = clap::ValueHint::FilePath)]
    pub board_data: PathBuf,
}

pub fn execute(args: QrArgs) -> Result<()> {
    let board = BoardData::load(&args.board_data)
        .with_context(|| format!("Failed to load board data from {}", args.board_data.display()))?;

    let marks = QrMarkDetector::default().detect(&board);
    if marks.is_empty() {
        println!("No QR code marks found");
        return Ok(());
    }
    for mark in &marks {
        println!("{mark}");
    }
    Ok(())
}
