use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use chrono::{Local, TimeZone};
use pcb_fab::board::TitleBlock;
use pcb_fab::{
    ArchiveConfig, AssemblyConfig, BoardData, Component, FabError, GATEMA, JLCPCB,
    PlacementCollector, PlacementRecord, Side, TemplateVars, build_archive, export_assembly,
};
use tempfile::TempDir;

fn plot_two_layer(dir: &Path) -> anyhow::Result<()> {
    for name in [
        "demo-F_Cu.gtl",
        "demo-B_Cu.gbl",
        "demo-F_Mask.gts",
        "demo-B_Mask.gbs",
        "demo-Edge_Cuts.gm1",
        "demo.drl",
    ] {
        fs::write(dir.join(name), format!("%TF.FileFunction,{name}*%"))?;
    }
    Ok(())
}

struct Placements(Vec<PlacementRecord>);

impl PlacementCollector for Placements {
    fn collect(&self, references: &BTreeSet<String>) -> anyhow::Result<Vec<PlacementRecord>> {
        Ok(self
            .0
            .iter()
            .filter(|r| references.contains(&r.reference))
            .cloned()
            .collect())
    }
}

fn placed(reference: &str, footprint: &str) -> PlacementRecord {
    PlacementRecord {
        reference: reference.into(),
        x: 100.0,
        y: 50.0,
        rotation: 90.0,
        side: Side::Top,
        value: String::new(),
        footprint: footprint.into(),
    }
}

fn demo_vars() -> TemplateVars {
    let board = BoardData {
        file: "demo.kicad_pcb".into(),
        title_block: TitleBlock {
            revision: "C".into(),
            ..Default::default()
        },
        ..Default::default()
    };
    let now = Local.with_ymd_and_hms(2025, 1, 31, 12, 0, 0).unwrap();
    TemplateVars::for_board(&board, BTreeMap::new(), now)
}

#[test]
fn jlcpcb_run_with_missing_order_code_keeps_archive() {
    let out = TempDir::new().unwrap();
    let vars = demo_vars();

    let archive_config = ArchiveConfig::for_vendor(&JLCPCB, out.path(), "demo", "{}-rev{boardRevision}");
    let archive = build_archive(&archive_config, &plot_two_layer, &vars).unwrap();
    assert_eq!(archive.path, out.path().join("demo-gerbers-revC.zip"));
    let archive_bytes = fs::read(&archive.path).unwrap();

    let components = vec![
        Component::new("C1", "100n", "C_0402").with_field("LCSC", "C1525"),
        Component::new("J1", "USB_C", "USB_C_Receptacle"),
    ];
    let placements = Placements(vec![
        placed("C1", "Capacitor_SMD:C_0402"),
        placed("J1", "Connector_USB:USB_C_Receptacle"),
    ]);
    let mut assembly_config = AssemblyConfig::for_vendor(&JLCPCB, "{}-rev{boardRevision}");
    assembly_config.missing_order_code_fatal = true;

    let err = export_assembly(&components, &placements, &assembly_config, out.path(), &vars)
        .unwrap_err();
    match &err {
        FabError::MissingOrderCodes { references } => assert_eq!(references, &vec!["J1"]),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(
        err.to_string(),
        "There are components with missing ordercode (J1), aborting"
    );

    let unassigned = fs::read_to_string(out.path().join("unassigned-revC.txt")).unwrap();
    assert!(unassigned.starts_with("USB_C"));
    assert!(unassigned.trim_end().ends_with("J1"));
    assert!(!out.path().join("bom-revC.csv").exists());
    assert_eq!(fs::read(&archive.path).unwrap(), archive_bytes);
}

#[test]
fn gatema_archive_twice_is_identical() {
    let out = TempDir::new().unwrap();
    let vars = demo_vars();
    let config = ArchiveConfig::for_vendor(&GATEMA, out.path(), "demo", "{}");

    let first = build_archive(&config, &plot_two_layer, &vars).unwrap();
    let first_bytes = fs::read(&first.path).unwrap();
    let second = build_archive(&config, &plot_two_layer, &vars).unwrap();

    assert_eq!(first.path, second.path);
    assert_eq!(fs::read(&second.path).unwrap(), first_bytes);
    assert_eq!(
        second.manifest,
        vec![
            "gerber/",
            "gerber/demo-B_Cu.bot",
            "gerber/demo-B_Mask.smb",
            "gerber/demo-Edge_Cuts.dim",
            "gerber/demo-F_Cu.top",
            "gerber/demo-F_Mask.smt",
            "gerber/demo.drl",
        ]
    );
}

#[test]
fn jlcpcb_assembly_with_corrections() {
    let out = TempDir::new().unwrap();
    let mut config = AssemblyConfig::for_vendor(&JLCPCB, "{}");
    config.corrections.patterns = pcb_fab::placement::parse_correction_patterns(
        "Pattern,X correction,Y correction,Rotation\n^Connector_USB:,0,0,180\n",
    )
    .unwrap();

    let components = vec![
        Component::new("J1", "USB_C", "USB_C_Receptacle").with_field("LCSC", "C165948"),
        Component::new("C2", "100n", "C_0402").with_field("LCSC", "C1525"),
        Component::new("C10", "100n", "C_0402").with_field("LCSC", "C1525"),
        Component::new("#PWR01", "GND", ""),
    ];
    let placements = Placements(vec![
        placed("J1", "Connector_USB:USB_C_Receptacle"),
        placed("C2", "Capacitor_SMD:C_0402"),
        placed("C10", "Capacitor_SMD:C_0402"),
    ]);

    let report =
        export_assembly(&components, &placements, &config, out.path(), &demo_vars()).unwrap();
    assert!(report.missing_order_codes.is_empty());
    assert_eq!(
        fs::read_to_string(&report.bom_path).unwrap(),
        "Comment,Designator,Footprint,LCSC\n\
         USB_C,J1,USB_C_Receptacle,C165948\n\
         100n,\"C2,C10\",C_0402,C1525\n"
    );
    assert_eq!(
        fs::read_to_string(&report.placement_path).unwrap(),
        "Designator,Mid X,Mid Y,Rotation,Layer\n\
         C2,100.0000,50.0000,90.0000,top\n\
         C10,100.0000,50.0000,90.0000,top\n\
         J1,100.0000,50.0000,270.0000,top\n"
    );
    assert_eq!(fs::read_to_string(&report.unassigned_path).unwrap(), "");
}
