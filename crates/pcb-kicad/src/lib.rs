pub mod drc;
pub mod plot;
pub mod position;
pub mod schematic;

use anyhow::{Context, Result, bail};
use log::debug;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

pub use drc::{DrcReport, ensure_passing_drc, run_drc_report};
pub use plot::KiCadPlotter;
pub use position::KiCadPlacementCollector;
pub use schematic::extract_components;

#[cfg(target_os = "macos")]
const DEFAULT_KICAD_CLI: &str = "/Applications/KiCad/KiCad.app/Contents/MacOS/kicad-cli";
#[cfg(target_os = "windows")]
const DEFAULT_KICAD_CLI: &str = r"C:\Program Files\KiCad\9.0\bin\kicad-cli.exe";
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const DEFAULT_KICAD_CLI: &str = "/usr/bin/kicad-cli";

/// kicad-cli location: `KICAD_CLI` if set, else the platform install path.
/// A leading `~` expands to the home directory.
pub fn kicad_cli_path() -> PathBuf {
    let configured = std::env::var("KICAD_CLI").unwrap_or_else(|_| DEFAULT_KICAD_CLI.to_string());
    match configured.strip_prefix('~') {
        Some(rest) => dirs::home_dir()
            .unwrap_or_default()
            .join(rest.trim_start_matches(['/', '\\'])),
        None => PathBuf::from(configured),
    }
}

fn check_kicad_installed() -> Result<()> {
    let kicad_path = kicad_cli_path();
    if !kicad_path.exists() {
        bail!(
            "kicad-cli not found at {}\n\
             Install KiCad from https://www.kicad.org/ or point KICAD_CLI at the executable.",
            kicad_path.display()
        );
    }
    let version = Command::new(&kicad_path)
        .arg("--version")
        .output()
        .with_context(|| format!("Failed to execute kicad-cli at {}", kicad_path.display()))?;
    if !version.status.success() {
        bail!(
            "kicad-cli at {} failed to report its version; check the KiCad installation",
            kicad_path.display()
        );
    }
    Ok(())
}

/// Builder for KiCad CLI commands
#[derive(Debug, Default)]
pub struct KiCadCliBuilder {
    args: Vec<String>,
}

impl KiCadCliBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a command (e.g., "pcb", "sch")
    pub fn command(mut self, cmd: &str) -> Self {
        self.args.push(cmd.to_string());
        self
    }

    /// Add a subcommand (e.g., "export", "drc")
    pub fn subcommand(mut self, subcmd: &str) -> Self {
        self.args.push(subcmd.to_string());
        self
    }

    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// Add `arg` only when `enabled` is set
    pub fn flag(self, arg: &str, enabled: bool) -> Self {
        if enabled { self.arg(arg) } else { self }
    }

    /// Execute the KiCad CLI command
    pub fn run(self) -> Result<()> {
        let output = self.output()?;

        if !output.status.success() {
            let mut stderr = std::io::stderr();
            stderr.write_all(&output.stdout)?;
            stderr.write_all(&output.stderr)?;
            bail!("kicad-cli execution failed");
        }

        Ok(())
    }

    /// Execute the KiCad CLI command and return the output
    fn output(&self) -> Result<std::process::Output> {
        check_kicad_installed()?;
        debug!("Running kicad-cli {}", self.args.join(" "));
        Command::new(kicad_cli_path())
            .args(&self.args)
            .output()
            .context("Failed to execute kicad-cli")
    }
}

/// Path as a `String` argument for kicad-cli.
pub(crate) fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Directory argument with a trailing separator; kicad-cli treats a path
/// without one as a file name.
pub(crate) fn dir_arg(path: &Path) -> String {
    let mut dir = path_arg(path);
    if !dir.ends_with(std::path::MAIN_SEPARATOR) {
        dir.push(std::path::MAIN_SEPARATOR);
    }
    dir
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_collects_arguments() {
        let builder = KiCadCliBuilder::new()
            .command("pcb")
            .subcommand("export")
            .subcommand("gerbers")
            .flag("--no-protel-ext", false)
            .flag("--subtract-soldermask", true)
            .args(["--layers", "F.Cu,B.Cu"]);
        assert_eq!(
            builder.args,
            vec![
                "pcb",
                "export",
                "gerbers",
                "--subtract-soldermask",
                "--layers",
                "F.Cu,B.Cu"
            ]
        );
    }

    #[test]
    fn test_dir_arg_has_trailing_separator() {
        let dir = dir_arg(Path::new("out/gerber"));
        assert!(dir.ends_with(std::path::MAIN_SEPARATOR));
        assert_eq!(dir_arg(Path::new(&dir)), dir);
    }
}
