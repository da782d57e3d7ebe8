use anyhow::Result;
use clap::Args;
use pcb_fab::GATEMA;

use crate::common::FabArgs;

#[derive(Args, Debug, Clone)]
#[command(about = "Prepare fabrication files for Gatema")]
pub struct GatemaArgs {
    #[command(flatten)]
    pub fab: FabArgs,
}

pub fn execute(args: GatemaArgs) -> Result<()> {
    let fab = &args.fab;
    fab.check_drc()?;

    let board = fab.load_board()?;
    let vars = fab.template_vars(&board);
    fab.archive_gerbers(&GATEMA, &board, &vars)?;
    Ok(())
}
