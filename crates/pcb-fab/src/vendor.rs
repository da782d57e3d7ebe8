//! Per-manufacturer output conventions.

use crate::rename::RenameRule;

/// How drill files are split when plotting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrillLayout {
    /// Plated and non-plated holes in one file.
    Merged,
    /// `-PTH` and `-NPTH` files.
    Separate,
}

/// Options handed to the plotting collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotSettings {
    /// Layers to plot, by their untranslated board names.
    pub layers: &'static [&'static str],
    pub protel_extensions: bool,
    pub use_aux_origin: bool,
    pub subtract_mask_from_silk: bool,
    pub drill: DrillLayout,
    /// Excellon zeros written as decimal numbers.
    pub decimal_drill_format: bool,
}

const STANDARD_LAYERS: &[&str] = &[
    "F.Cu",
    "B.Cu",
    "In1.Cu",
    "In2.Cu",
    "In3.Cu",
    "In4.Cu",
    "F.Paste",
    "B.Paste",
    "F.Silkscreen",
    "B.Silkscreen",
    "F.Mask",
    "B.Mask",
    "Edge.Cuts",
];

#[derive(Debug, Clone, PartialEq)]
pub struct VendorProfile {
    pub name: &'static str,
    pub rename_rules: &'static [RenameRule],
    pub archive_name_replacements: &'static [(&'static str, &'static str)],
    pub footprint_replacements: &'static [(&'static str, &'static str)],
    /// Field that, when non-empty, drops a component from this vendor's BOM.
    pub ignore_field: &'static str,
    pub default_order_code_fields: &'static [&'static str],
    pub default_correction_fields: &'static [&'static str],
    /// Optional file next to the board that is shipped inside the archive.
    pub sidecar_file: Option<&'static str>,
    pub plot: PlotSettings,
}

pub const JLCPCB: VendorProfile = VendorProfile {
    name: "jlcpcb",
    rename_rules: &[],
    archive_name_replacements: &[
        ("eval", "evl"),
        ("copy", "cp"),
        ("convert", "cvt"),
        ("confirm", "cfm"),
        ("Copy", "cp"),
    ],
    // JLC fails to assign parts whose footprint name contains "foot"
    footprint_replacements: &[("foot", "hand")],
    ignore_field: "JLCPCB_IGNORE",
    default_order_code_fields: &["LCSC"],
    default_correction_fields: &["JLCPCB_CORRECTION"],
    sidecar_file: Some("jlcpcb.json"),
    plot: PlotSettings {
        layers: STANDARD_LAYERS,
        protel_extensions: true,
        use_aux_origin: false,
        subtract_mask_from_silk: true,
        drill: DrillLayout::Merged,
        decimal_drill_format: false,
    },
};

/// Layer naming per <https://www.gatemapcb.cz/wp-content/uploads/2023/08/oznaceni-vrstev.pdf>
pub const GATEMA: VendorProfile = VendorProfile {
    name: "gatema",
    rename_rules: &[
        RenameRule::new(".gtl", ".top"),
        RenameRule::new(".gbl", ".bot"),
        RenameRule::new("-PTH.drl", ".pth"),
        RenameRule::new("-NPTH.drl", ".mill"),
        RenameRule::new(".gm1", ".dim"),
        RenameRule::new(".g2", ".in2"),
        RenameRule::new(".g3", ".in3"),
        RenameRule::new(".gbs", ".smb"),
        RenameRule::new(".gts", ".smt"),
        RenameRule::new(".gbp", ".pastebot"),
        RenameRule::new(".gtp", ".pastetop"),
        RenameRule::new(".gbo", ".plb"),
        RenameRule::new(".gto", ".plt"),
    ],
    archive_name_replacements: &[],
    footprint_replacements: &[],
    ignore_field: "GATEMA_IGNORE",
    default_order_code_fields: &[],
    default_correction_fields: &[],
    sidecar_file: None,
    plot: PlotSettings {
        layers: STANDARD_LAYERS,
        protel_extensions: true,
        use_aux_origin: true,
        subtract_mask_from_silk: true,
        drill: DrillLayout::Separate,
        decimal_drill_format: true,
    },
};
