//! Turn plotted board data into the file set a PCB manufacturer expects.
//!
//! The crate never talks to a board design tool directly. Plotting and
//! placement extraction go through the [`Plotter`] and
//! [`PlacementCollector`] traits; everything else works on plain data.

pub mod archive;
pub mod archive_name;
pub mod assembly;
pub mod board;
pub mod bom;
pub mod component;
pub mod error;
pub mod natural_string;
pub mod placement;
pub mod qr;
pub mod rename;
pub mod template;
pub mod vendor;

pub use archive::{ArchiveConfig, ArchiveReport, Plotter, build_archive};
pub use assembly::{AssemblyConfig, AssemblyReport, export_assembly};
pub use board::BoardData;
pub use bom::{Bom, BomConfig, BomGroup, BomKey, collect_bom};
pub use component::{AssemblyFlags, Component};
pub use error::{FabError, Result};
pub use placement::{PlacementCollector, PlacementRecord, Side};
pub use qr::{QrMarkDetector, QrSquare};
pub use template::{TemplateVars, expand_name_template};
pub use vendor::{GATEMA, JLCPCB, VendorProfile};
