use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use pcb_fab::Plotter;
use pcb_fab::vendor::{DrillLayout, PlotSettings};

use crate::{KiCadCliBuilder, dir_arg, path_arg};

/// Plots gerber and drill files with `kicad-cli pcb export`.
#[derive(Debug, Clone)]
pub struct KiCadPlotter {
    pcb: PathBuf,
    settings: PlotSettings,
}

impl KiCadPlotter {
    pub fn new(pcb: impl Into<PathBuf>, settings: PlotSettings) -> Self {
        Self {
            pcb: pcb.into(),
            settings,
        }
    }

    fn gerbers(&self, output_dir: &Path) -> KiCadCliBuilder {
        let settings = &self.settings;
        KiCadCliBuilder::new()
            .command("pcb")
            .subcommand("export")
            .subcommand("gerbers")
            .arg("--output")
            .arg(dir_arg(output_dir))
            .arg("--layers")
            .arg(settings.layers.join(","))
            .flag("--no-protel-ext", !settings.protel_extensions)
            .flag("--subtract-soldermask", settings.subtract_mask_from_silk)
            .flag("--use-drill-file-origin", settings.use_aux_origin)
            .arg(path_arg(&self.pcb))
    }

    fn drill(&self, output_dir: &Path) -> KiCadCliBuilder {
        let settings = &self.settings;
        let zeros = if settings.decimal_drill_format {
            "decimal"
        } else {
            "suppressleading"
        };
        let origin = if settings.use_aux_origin {
            "plot"
        } else {
            "absolute"
        };
        KiCadCliBuilder::new()
            .command("pcb")
            .subcommand("export")
            .subcommand("drill")
            .arg("--output")
            .arg(dir_arg(output_dir))
            .args(["--format", "excellon", "--excellon-units", "mm"])
            .args(["--excellon-zeros-format", zeros])
            .args(["--drill-origin", origin])
            .flag(
                "--excellon-separate-th",
                settings.drill == DrillLayout::Separate,
            )
            .arg(path_arg(&self.pcb))
    }
}

impl Plotter for KiCadPlotter {
    fn plot(&self, output_dir: &Path) -> Result<()> {
        self.gerbers(output_dir)
            .run()
            .with_context(|| format!("Failed to plot gerbers for {}", self.pcb.display()))?;
        self.drill(output_dir)
            .run()
            .with_context(|| format!("Failed to export drill files for {}", self.pcb.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcb_fab::{GATEMA, JLCPCB};

    #[test]
    fn test_gatema_drill_is_split_and_decimal() {
        let plotter = KiCadPlotter::new("demo.kicad_pcb", GATEMA.plot);
        let args = plotter.drill(Path::new("out")).args;
        assert!(args.iter().any(|a| a == "--excellon-separate-th"));
        assert!(args.windows(2).any(|w| w == ["--excellon-zeros-format", "decimal"]));
        assert!(args.windows(2).any(|w| w == ["--drill-origin", "plot"]));
        assert_eq!(args.last().map(String::as_str), Some("demo.kicad_pcb"));
    }

    #[test]
    fn test_jlcpcb_gerbers() {
        let plotter = KiCadPlotter::new("demo.kicad_pcb", JLCPCB.plot);
        let args = plotter.gerbers(Path::new("out")).args;
        assert!(!args.iter().any(|a| a == "--no-protel-ext"));
        assert!(!args.iter().any(|a| a == "--use-drill-file-origin"));
        assert!(args.iter().any(|a| a.starts_with("F.Cu,B.Cu,")));

        let drill = plotter.drill(Path::new("out")).args;
        assert!(!drill.iter().any(|a| a == "--excellon-separate-th"));
    }
}
