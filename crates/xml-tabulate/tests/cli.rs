mod common;

use std::process::Command;

use xml_tabulate::workbook::Workbook;

fn xml_tabulate() -> Command {
    Command::new(env!("CARGO_BIN_EXE_xml_tabulate"))
}

#[test]
fn run_appends_rows_and_prints_summary() {
    let dir = tempfile::tempdir().unwrap();
    common::write_layout(
        dir.path(),
        &[("a.xml", common::invoice("AAA", "1", &["1.00", "2.00"]))],
    );

    let output = xml_tabulate()
        .arg("run")
        .arg("--base-dir")
        .arg(dir.path())
        .output()
        .expect("run xml_tabulate");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        output.status.success(),
        "stdout:\n{stdout}\nstderr:\n{}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(stdout.contains("a.xml -> row 4"), "{stdout}");
    assert!(stdout.contains("Finished processing 1 XML files (0 skipped)"), "{stdout}");

    let sheet = Workbook::open(&dir.path().join("hierarchical_mapping_populated_json.xlsx"))
        .unwrap()
        .active_sheet()
        .unwrap();
    assert_eq!(sheet.text(4, 4), Some(r#"["1.00","2.00"]"#));
}

#[test]
fn keep_going_reports_skips_in_json_and_exits_non_zero() {
    let dir = tempfile::tempdir().unwrap();
    common::write_layout(
        dir.path(),
        &[
            ("a.xml", common::invoice("AAA", "1", &[])),
            ("b.xml", "<broken".to_string()),
        ],
    );

    let output = xml_tabulate()
        .args(["run", "--keep-going", "--format", "json", "--base-dir"])
        .arg(dir.path())
        .output()
        .expect("run xml_tabulate");

    assert!(!output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["discovered"], 2);
    assert_eq!(report["failure_policy"], "skip");
    assert_eq!(report["appended"].as_array().unwrap().len(), 1);
    assert_eq!(report["appended"][0]["row"], 4);
    assert_eq!(report["skipped"].as_array().unwrap().len(), 1);
}

#[test]
fn failing_document_aborts_by_default() {
    let dir = tempfile::tempdir().unwrap();
    common::write_layout(dir.path(), &[("a.xml", "<broken".to_string())]);

    let output = xml_tabulate()
        .arg("run")
        .arg("--base-dir")
        .arg(dir.path())
        .output()
        .expect("run xml_tabulate");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("is not valid XML"), "{stderr}");
}

#[test]
fn inspect_prints_each_column_as_json() {
    let dir = tempfile::tempdir().unwrap();
    common::write_layout(dir.path(), &[]);
    let document = dir.path().join("sample.xml");
    std::fs::write(&document, common::invoice("ZZZ", "42", &["9.99"])).unwrap();

    let output = xml_tabulate()
        .args(["inspect", "--format", "json", "--base-dir"])
        .arg(dir.path())
        .arg(&document)
        .output()
        .expect("run xml_tabulate");

    assert!(
        output.status.success(),
        "stderr:\n{}",
        String::from_utf8_lossy(&output.stderr)
    );
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let columns = report["columns"].as_array().unwrap();
    assert_eq!(columns.len(), 4);
    assert_eq!(columns[0]["leaf"], "1.1.4");
    assert_eq!(
        columns[0]["path"],
        serde_json::json!(["FatturaElettronicaHeader", "DatiTrasmissione", "CodiceDestinatario"])
    );
    assert_eq!(columns[0]["value"]["kind"], "single");
    assert_eq!(columns[0]["value"]["value"], "ZZZ");
    assert_eq!(columns[2]["leaf"], serde_json::Value::Null);
    assert_eq!(columns[2]["value"]["kind"], "empty");
    assert_eq!(columns[3]["value"]["value"], "9.99");
}
