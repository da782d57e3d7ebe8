//! Vendor file naming for plotted layer files.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::Serialize;

use crate::{FabError, Result};

/// Maps a plotter file suffix to the suffix a vendor expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RenameRule {
    pub old_suffix: &'static str,
    pub new_suffix: &'static str,
}

impl RenameRule {
    pub const fn new(old_suffix: &'static str, new_suffix: &'static str) -> Self {
        Self {
            old_suffix,
            new_suffix,
        }
    }

    fn renamed(&self, file_name: &str) -> Option<String> {
        file_name
            .strip_suffix(self.old_suffix)
            .map(|stem| format!("{stem}{}", self.new_suffix))
    }
}

/// A single planned rename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rename {
    pub from: PathBuf,
    pub to: PathBuf,
}

/// Work out the renames `rules` imply for the files in `dir`.
///
/// A rule without a matching file is skipped (e.g. inner layers on a
/// two-layer board). A rule matching more than one file is an error, as the
/// vendor mapping assumes one file per suffix.
pub fn plan_renames(dir: &Path, rules: &[RenameRule]) -> Result<Vec<Rename>> {
    let mut file_names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            file_names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    file_names.sort();

    let mut renames = Vec::new();
    for rule in rules {
        let matches: Vec<(&String, String)> = file_names
            .iter()
            .filter_map(|name| rule.renamed(name).map(|new_name| (name, new_name)))
            .collect();

        match matches.as_slice() {
            [] => debug!("No file matches {}", rule.old_suffix),
            [(name, new_name)] => renames.push(Rename {
                from: dir.join(name),
                to: dir.join(new_name),
            }),
            _ => {
                return Err(FabError::AmbiguousRename {
                    suffix: rule.old_suffix.to_string(),
                    matches: matches.iter().map(|(name, _)| dir.join(name)).collect(),
                })
            }
        }
    }

    Ok(renames)
}

/// Apply `rules` to the files in `dir`. Nothing is renamed if any rule is
/// ambiguous.
pub fn apply_renames(dir: &Path, rules: &[RenameRule]) -> Result<Vec<Rename>> {
    let renames = plan_renames(dir, rules)?;
    for rename in &renames {
        debug!(
            "Renaming {} -> {}",
            rename.from.display(),
            rename.to.display()
        );
        fs::rename(&rename.from, &rename.to)?;
    }
    Ok(renames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vendor::GATEMA;
    use tempfile::TempDir;

    fn touch(dir: &Path, names: &[&str]) {
        for name in names {
            fs::write(dir.join(name), name.as_bytes()).unwrap();
        }
    }

    fn listing(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_two_layer_board_renames() {
        let dir = TempDir::new().unwrap();
        touch(
            dir.path(),
            &[
                "board-F_Cu.gtl",
                "board-B_Cu.gbl",
                "board-PTH.drl",
                "board-NPTH.drl",
                "board-Edge_Cuts.gm1",
                "board-F_Silkscreen.gto",
            ],
        );

        let renames = apply_renames(dir.path(), GATEMA.rename_rules).unwrap();
        assert_eq!(renames.len(), 6);
        assert_eq!(
            listing(dir.path()),
            vec![
                "board-B_Cu.bot",
                "board-Edge_Cuts.dim",
                "board-F_Cu.top",
                "board-F_Silkscreen.plt",
                "board.mill",
                "board.pth",
            ]
        );
        // Content follows the file
        assert_eq!(
            fs::read_to_string(dir.path().join("board.pth")).unwrap(),
            "board-PTH.drl"
        );
    }

    #[test]
    fn test_ambiguous_suffix_aborts_without_renaming() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), &["a-F_Cu.gtl", "b-F_Cu.gtl", "board-B_Cu.gbl"]);

        let err = apply_renames(dir.path(), GATEMA.rename_rules).unwrap_err();
        match err {
            FabError::AmbiguousRename { suffix, matches } => {
                assert_eq!(suffix, ".gtl");
                assert_eq!(matches.len(), 2);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(
            listing(dir.path()),
            vec!["a-F_Cu.gtl", "b-F_Cu.gtl", "board-B_Cu.gbl"]
        );
    }

    #[test]
    fn test_unmatched_files_untouched() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), &["board-job.gbrjob", "jlcpcb.json"]);
        let renames = apply_renames(dir.path(), GATEMA.rename_rules).unwrap();
        assert!(renames.is_empty());
        assert_eq!(listing(dir.path()), vec!["board-job.gbrjob", "jlcpcb.json"]);
    }

    #[test]
    fn test_directories_are_ignored() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("nested.gtl")).unwrap();
        touch(dir.path(), &["board-F_Cu.gtl"]);
        let renames = apply_renames(dir.path(), GATEMA.rename_rules).unwrap();
        assert_eq!(renames.len(), 1);
        assert!(dir.path().join("board-F_Cu.top").exists());
    }
}
