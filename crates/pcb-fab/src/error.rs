use std::path::PathBuf;

use thiserror::Error;

use crate::template::TemplateError;

/// Errors produced while assembling fabrication outputs
#[derive(Debug, Error)]
pub enum FabError {
    #[error("Multiple files found for extension {suffix}: {}", format_paths(.matches))]
    AmbiguousRename {
        suffix: String,
        matches: Vec<PathBuf>,
    },

    #[error("There are components with missing ordercode ({}), aborting", .references.join(", "))]
    MissingOrderCodes { references: Vec<String> },

    #[error("Board failed validation: {0}")]
    UpstreamValidation(String),

    #[error("Plotting failed: {0:#}")]
    Plot(anyhow::Error),

    #[error("Placement collection failed: {0:#}")]
    Placement(anyhow::Error),

    #[error("Invalid correction pattern file: {0}")]
    Correction(String),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to write CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to write archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
}

fn format_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T, E = FabError> = std::result::Result<T, E>;
