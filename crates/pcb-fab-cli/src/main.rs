use clap::{Parser, Subcommand};
use colored::Colorize;
use env_logger::Env;

mod common;
mod gatema;
mod jlcpcb;
mod qr;

#[derive(Parser)]
#[command(name = "pcb-fab")]
#[command(about = "Prepare fabrication and assembly files for PCB manufacturers", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short = 'd', long = "debug", global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Gerbers, BOM and placement files for JLCPCB
    Jlcpcb(jlcpcb::JlcpcbArgs),

    /// Gerbers with Gatema layer naming
    Gatema(gatema::GatemaArgs),

    /// Locate QR code marks on the silkscreen
    Qr(qr::QrArgs),
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{} {e}", "Error:".red());
        for cause in e.chain().skip(1) {
            eprintln!("  {cause}");
        }
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let env = if cli.debug {
        Env::default().default_filter_or("debug")
    } else {
        Env::default().default_filter_or("warn")
    };
    env_logger::Builder::from_env(env).init();

    match cli.command {
        Commands::Jlcpcb(args) => jlcpcb::execute(args),
        Commands::Gatema(args) => gatema::execute(args),
        Commands::Qr(args) => qr::execute(args),
    }
}
