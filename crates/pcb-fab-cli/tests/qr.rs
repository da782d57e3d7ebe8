use assert_cmd::Command;
use assert_fs::TempDir;
use assert_fs::prelude::*;

const BOARD_JSON: &str = r#"{
    "file": "demo.kicad_pcb",
    "layers": {"0": "F.Cu", "37": "F.Silkscreen", "36": "B.Silkscreen"},
    "drawings": [
        {"layer": 37, "shape": "rectangle",
         "start": {"x": 10000000, "y": 20000000}, "end": {"x": 15000000, "y": 25000000}},
        {"layer": 36, "shape": "rectangle",
         "start": {"x": 0, "y": 0}, "end": {"x": 8050000, "y": 7980000}},
        {"layer": 37, "shape": "rectangle",
         "start": {"x": 0, "y": 0}, "end": {"x": 5000000, "y": 5200000}},
        {"layer": 0, "shape": "rectangle",
         "start": {"x": 0, "y": 0}, "end": {"x": 5000000, "y": 5000000}},
        {"layer": 37, "shape": "circle",
         "start": {"x": 0, "y": 0}, "end": {"x": 10000000, "y": 10000000}}
    ]
}"#;

fn pcb_fab() -> Command {
    Command::cargo_bin("pcb-fab").unwrap()
}

#[test]
fn qr_marks_are_listed() {
    let temp = TempDir::new().unwrap();
    let board = temp.child("demo.json");
    board.write_str(BOARD_JSON).unwrap();

    let output = pcb_fab().arg("qr").arg(board.path()).output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(
        stdout,
        "QR code mark 5mm on F.Silkscreen at (12.500, 22.500) mm\n\
         QR code mark 8mm on B.Silkscreen at (4.025, 3.990) mm\n"
    );
}

#[test]
fn board_without_marks() {
    let temp = TempDir::new().unwrap();
    let board = temp.child("empty.json");
    board.write_str(r#"{"layers": {"37": "F.Silkscreen"}}"#).unwrap();

    let output = pcb_fab().arg("qr").arg(board.path()).output().unwrap();
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8(output.stdout).unwrap(),
        "No QR code marks found\n"
    );
}

#[test]
fn missing_board_data_fails() {
    let temp = TempDir::new().unwrap();
    let output = pcb_fab()
        .arg("qr")
        .arg(temp.path().join("missing.json"))
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("Failed to load board data"));
}

#[test]
fn gatema_requires_output_dir() {
    let output = pcb_fab().args(["gatema", "demo.kicad_pcb"]).output().unwrap();
    assert!(!output.status.success());
}
