//! Plot, rename and package fabrication files into a zip archive.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use log::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{DateTime as ZipDateTime, ZipWriter};

use crate::archive_name::sanitize_archive_name;
use crate::rename::{RenameRule, apply_renames};
use crate::template::{TemplateVars, expand_name_template};
use crate::vendor::VendorProfile;
use crate::{FabError, Result};

/// Name of the intermediate directory plotted files are written to.
pub const DEFAULT_PLOT_DIR: &str = "gerber";

/// Writes the fabrication layer files for a board into a directory.
pub trait Plotter {
    fn plot(&self, output_dir: &Path) -> anyhow::Result<()>;
}

impl<F> Plotter for F
where
    F: Fn(&Path) -> anyhow::Result<()>,
{
    fn plot(&self, output_dir: &Path) -> anyhow::Result<()> {
        self(output_dir)
    }
}

#[derive(Debug, Clone)]
pub struct ArchiveConfig {
    pub output_dir: PathBuf,
    pub plot_dir_name: String,
    /// Board name; the archive kind is `<board_name>-gerbers`.
    pub board_name: String,
    pub name_template: String,
    pub rename_rules: &'static [RenameRule],
    pub name_replacements: &'static [(&'static str, &'static str)],
    /// Files copied next to the plotted layers before packaging.
    pub extra_files: Vec<PathBuf>,
}

impl ArchiveConfig {
    pub fn for_vendor(
        vendor: &VendorProfile,
        output_dir: impl Into<PathBuf>,
        board_name: impl Into<String>,
        name_template: impl Into<String>,
    ) -> Self {
        Self {
            output_dir: output_dir.into(),
            plot_dir_name: DEFAULT_PLOT_DIR.to_string(),
            board_name: board_name.into(),
            name_template: name_template.into(),
            rename_rules: vendor.rename_rules,
            name_replacements: vendor.archive_name_replacements,
            extra_files: Vec::new(),
        }
    }

    pub fn plot_dir(&self) -> PathBuf {
        self.output_dir.join(&self.plot_dir_name)
    }
}

/// Result of a successful archive build.
#[derive(Debug, Clone)]
pub struct ArchiveReport {
    pub path: PathBuf,
    pub created: DateTime<Local>,
    /// Archive entry names, in archive order.
    pub manifest: Vec<String>,
}

/// Build the fabrication archive.
///
/// The plot directory is wiped before plotting and any archive at the target
/// path is replaced. A plotting or rename failure leaves no new archive.
pub fn build_archive(
    config: &ArchiveConfig,
    plotter: &dyn Plotter,
    vars: &TemplateVars,
) -> Result<ArchiveReport> {
    fs::create_dir_all(&config.output_dir)?;

    let plot_dir = config.plot_dir();
    if plot_dir.exists() {
        debug!("Clearing {}", plot_dir.display());
        fs::remove_dir_all(&plot_dir)?;
    }
    fs::create_dir_all(&plot_dir)?;

    plotter.plot(&plot_dir).map_err(FabError::Plot)?;
    apply_renames(&plot_dir, config.rename_rules)?;

    for extra in &config.extra_files {
        if let Some(name) = extra.file_name() {
            debug!("Adding {} to archive", extra.display());
            fs::copy(extra, plot_dir.join(name))?;
        }
    }

    let kind = format!("{}-gerbers", config.board_name);
    let name = expand_name_template(&config.name_template, &kind, vars)?;
    let name = sanitize_archive_name(&name, config.name_replacements);
    let path = config.output_dir.join(format!("{name}.zip"));

    if path.exists() {
        debug!("Removing previous archive {}", path.display());
        fs::remove_file(&path)?;
    }

    let manifest = write_zip(&plot_dir, &config.plot_dir_name, &path)?;
    info!("Wrote {} ({} entries)", path.display(), manifest.len());

    let metadata = fs::metadata(&path)?;
    let created = metadata.created().or_else(|_| metadata.modified())?;

    Ok(ArchiveReport {
        path,
        created: DateTime::from(created),
        manifest,
    })
}

/// Files under `dir`, sorted, as paths relative to `dir`.
fn collect_files(dir: &Path, base: &Path, files: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, base, files)?;
        } else if let Ok(relative) = path.strip_prefix(base) {
            files.push(relative.to_path_buf());
        }
    }
    Ok(())
}

/// Package `dir` into `zip_path` with every entry below `prefix/`.
///
/// Entries are sorted and carry a fixed timestamp so identical inputs give
/// identical archives.
fn write_zip(dir: &Path, prefix: &str, zip_path: &Path) -> Result<Vec<String>> {
    let mut files = Vec::new();
    collect_files(dir, dir, &mut files)?;
    files.sort();

    let options = SimpleFileOptions::default().last_modified_time(ZipDateTime::default());
    let mut zip = ZipWriter::new(fs::File::create(zip_path)?);
    let mut manifest = Vec::with_capacity(files.len() + 1);

    let root = format!("{prefix}/");
    zip.add_directory(root.as_str(), options)?;
    manifest.push(root);

    for relative in files {
        let name = format!(
            "{prefix}/{}",
            relative.to_string_lossy().replace('\\', "/")
        );
        zip.start_file(name.as_str(), options)?;
        zip.write_all(&fs::read(dir.join(&relative))?)?;
        manifest.push(name);
    }
    zip.finish()?;
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vendor::{GATEMA, JLCPCB};
    use std::io::Read;
    use tempfile::TempDir;

    fn gatema_plotter(dir: &Path) -> anyhow::Result<()> {
        for name in ["demo-F_Cu.gtl", "demo-B_Cu.gbl", "demo-PTH.drl", "demo-NPTH.drl"] {
            fs::write(dir.join(name), format!("G04 {name}*"))?;
        }
        Ok(())
    }

    fn entries(path: &Path) -> Vec<(String, String)> {
        let mut archive = zip::ZipArchive::new(fs::File::open(path).unwrap()).unwrap();
        (0..archive.len())
            .map(|i| {
                let mut file = archive.by_index(i).unwrap();
                let mut content = String::new();
                file.read_to_string(&mut content).unwrap();
                (file.name().to_string(), content)
            })
            .collect()
    }

    #[test]
    fn test_gatema_archive() {
        let out = TempDir::new().unwrap();
        let config = ArchiveConfig::for_vendor(&GATEMA, out.path(), "demo", "{}");
        let report = build_archive(&config, &gatema_plotter, &TemplateVars::default()).unwrap();

        assert_eq!(report.path, out.path().join("demo-gerbers.zip"));
        assert_eq!(
            report.manifest,
            vec![
                "gerber/",
                "gerber/demo-B_Cu.bot",
                "gerber/demo-F_Cu.top",
                "gerber/demo.mill",
                "gerber/demo.pth",
            ]
        );
        let entries = entries(&report.path);
        assert_eq!(entries[4], ("gerber/demo.pth".into(), "G04 demo-PTH.drl*".into()));
    }

    #[test]
    fn test_rebuild_is_byte_identical_and_drops_stale_files() {
        let out = TempDir::new().unwrap();
        let config = ArchiveConfig::for_vendor(&GATEMA, out.path(), "demo", "{}");
        let vars = TemplateVars::default();

        let first = build_archive(&config, &gatema_plotter, &vars).unwrap();
        let first_bytes = fs::read(&first.path).unwrap();

        fs::write(config.plot_dir().join("stale.txt"), "old").unwrap();
        let second = build_archive(&config, &gatema_plotter, &vars).unwrap();
        assert_eq!(fs::read(&second.path).unwrap(), first_bytes);
        assert!(!config.plot_dir().join("stale.txt").exists());
    }

    #[test]
    fn test_plot_failure_produces_no_archive() {
        let out = TempDir::new().unwrap();
        let config = ArchiveConfig::for_vendor(&JLCPCB, out.path(), "demo", "{}");
        let failing = |_: &Path| -> anyhow::Result<()> { anyhow::bail!("kicad-cli crashed") };

        let err = build_archive(&config, &failing, &TemplateVars::default()).unwrap_err();
        assert!(matches!(err, FabError::Plot(_)));
        assert!(!out.path().join("demo-gerbers.zip").exists());
    }

    #[test]
    fn test_ambiguous_rename_produces_no_archive() {
        let out = TempDir::new().unwrap();
        let config = ArchiveConfig::for_vendor(&GATEMA, out.path(), "demo", "{}");
        let plotter = |dir: &Path| -> anyhow::Result<()> {
            fs::write(dir.join("a.gtl"), "")?;
            fs::write(dir.join("b.gtl"), "")?;
            Ok(())
        };

        let err = build_archive(&config, &plotter, &TemplateVars::default()).unwrap_err();
        assert!(matches!(err, FabError::AmbiguousRename { .. }));
        assert!(!out.path().join("demo-gerbers.zip").exists());
    }

    #[test]
    fn test_jlcpcb_name_sanitized_and_sidecar_packaged() {
        let out = TempDir::new().unwrap();
        let board_dir = TempDir::new().unwrap();
        let sidecar = board_dir.path().join("jlcpcb.json");
        fs::write(&sidecar, "{}").unwrap();

        let mut config = ArchiveConfig::for_vendor(&JLCPCB, out.path(), "eval-copy", "{}");
        config.extra_files.push(sidecar);
        let plotter = |dir: &Path| -> anyhow::Result<()> {
            fs::write(dir.join("eval-copy-F_Cu.gtl"), "")?;
            Ok(())
        };

        let report = build_archive(&config, &plotter, &TemplateVars::default()).unwrap();
        assert_eq!(report.path, out.path().join("evl-cp-gerbers.zip"));
        assert!(report.manifest.contains(&"gerber/jlcpcb.json".to_string()));
        // Layer files keep their plotted names
        assert!(report.manifest.contains(&"gerber/eval-copy-F_Cu.gtl".to_string()));
    }

    #[test]
    fn test_invalid_template_is_rejected() {
        let out = TempDir::new().unwrap();
        let config = ArchiveConfig::for_vendor(&JLCPCB, out.path(), "demo", "fixed");
        let err = build_archive(&config, &gatema_plotter, &TemplateVars::default()).unwrap_err();
        assert!(matches!(err, FabError::Template(_)));
    }
}
