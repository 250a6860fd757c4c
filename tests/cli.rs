mod common;

use assert_cmd::Command;
use common::{FULL_HEADER, TestWorkspace, VENDOR_HEADER, csv, row};
use predicates::str::contains;

fn intake() -> Command {
    Command::cargo_bin("supply-chain-intake").expect("binary exists")
}

#[test]
fn required_lists_every_field() {
    intake()
        .arg("required")
        .assert()
        .success()
        .stdout(contains("Product Category"))
        .stdout(contains("On-Time Delivery Rate"))
        .stdout(contains("COGS (Cost of Goods Sold)"))
        .stdout(contains("percent"));
}

#[test]
fn check_reports_a_clean_upload() {
    let workspace = TestWorkspace::new();
    let input = workspace.write(
        "ops.csv",
        &csv(
            FULL_HEADER,
            &[
                row("Widgets", "Acme", "2024-01-15", "40"),
                row("Gadgets", "Beta", "2024-01-10", "30"),
            ],
        ),
    );
    intake()
        .args(["check", "-i", input.to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains("Cleaned: 2 row(s)"));
}

#[test]
fn check_reads_semicolon_uploads() {
    let workspace = TestWorkspace::new();
    let contents = csv(FULL_HEADER, &[row("Widgets", "Acme", "2024-01-15", "40")])
        .replace(',', ";");
    let input = workspace.write("ops.csv", &contents);
    intake()
        .args(["check", "-i", input.to_str().unwrap(), "--delimiter", ";"])
        .assert()
        .success()
        .stdout(contains("Cleaned: 1 row(s)"));
}

#[test]
fn check_asks_for_a_mapping_when_columns_are_missing() {
    let workspace = TestWorkspace::new();
    let input = workspace.write(
        "ops.csv",
        &csv(VENDOR_HEADER, &[row("Widgets", "Acme", "2024-01-15", "40")]),
    );
    intake()
        .args(["check", "-i", input.to_str().unwrap()])
        .assert()
        .failure()
        .stdout(contains("The following required columns are missing:"))
        .stdout(contains("supplier"))
        .stderr(contains("--map FIELD=COLUMN"));
}

#[test]
fn check_applies_mappings_from_flags_and_files() {
    let workspace = TestWorkspace::new();
    let input = workspace.write(
        "ops.csv",
        &csv(VENDOR_HEADER, &[row("Widgets", "Acme", "2024-01-15", "40")]),
    );
    intake()
        .args(["check", "-i", input.to_str().unwrap(), "--map", "Supplier=Vendor"])
        .assert()
        .success()
        .stdout(contains("Cleaned: 1 row(s)"));

    let mapping = workspace.write("mapping.yaml", "mappings:\n  supplier: vendor\n");
    intake()
        .args([
            "check",
            "-i",
            input.to_str().unwrap(),
            "--mapping",
            mapping.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(contains("Cleaned: 1 row(s)"));
}

#[test]
fn check_fails_when_the_mapping_names_an_absent_column() {
    let workspace = TestWorkspace::new();
    let input = workspace.write(
        "ops.csv",
        &csv(VENDOR_HEADER, &[row("Widgets", "Acme", "2024-01-15", "40")]),
    );
    intake()
        .args(["check", "-i", input.to_str().unwrap(), "--map", "supplier=partner"])
        .assert()
        .failure()
        .stderr(contains("still missing after mapping: supplier"));
}

#[test]
fn check_rejects_unknown_fields_in_mappings() {
    let workspace = TestWorkspace::new();
    let input = workspace.write(
        "ops.csv",
        &csv(VENDOR_HEADER, &[row("Widgets", "Acme", "2024-01-15", "40")]),
    );
    intake()
        .args(["check", "-i", input.to_str().unwrap(), "--map", "colour=vendor"])
        .assert()
        .failure()
        .stderr(contains("Unknown required field"));
}

#[test]
fn check_fails_on_an_unparseable_date() {
    let workspace = TestWorkspace::new();
    let input = workspace.write(
        "ops.csv",
        &csv(
            FULL_HEADER,
            &[
                row("Widgets", "Acme", "2024-01-15", "40"),
                row("Gadgets", "Beta", "someday", "30"),
            ],
        ),
    );
    intake()
        .args(["check", "-i", input.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(contains("row 2 has 'someday'"));
}

#[test]
fn check_waits_for_a_missing_value_decision() {
    let workspace = TestWorkspace::new();
    let input = workspace.write(
        "ops.csv",
        &csv(
            FULL_HEADER,
            &[
                row("Widgets", "Acme", "2024-01-15", "40"),
                row("Gadgets", "", "2024-01-16", "30"),
            ],
        ),
    );
    let path = input.to_str().unwrap();

    intake()
        .args(["check", "-i", path])
        .assert()
        .failure()
        .stdout(contains("supplier: 1"))
        .stderr(contains("--confirm-missing"));

    intake()
        .args(["check", "-i", path, "--confirm-missing"])
        .assert()
        .success()
        .stdout(contains("Cleaned: 1 row(s)"));

    intake()
        .args(["check", "-i", path, "--decline-missing"])
        .assert()
        .success()
        .stdout(contains("Stopped"));
}

#[test]
fn check_show_raw_prints_the_uploaded_table() {
    let workspace = TestWorkspace::new();
    let input = workspace.write(
        "ops.csv",
        &csv(FULL_HEADER, &[row("Widgets", "Acme", "2024-01-15", "40")]),
    );
    intake()
        .args(["check", "-i", input.to_str().unwrap(), "--show-raw"])
        .assert()
        .success()
        .stdout(contains("Raw Data"))
        .stdout(contains("warehouse/location"));
}

#[test]
fn dashboard_renders_json() {
    let workspace = TestWorkspace::new();
    let input = workspace.write(
        "ops.csv",
        &csv(
            FULL_HEADER,
            &[
                row("Widgets", "Acme", "2024-01-15", "40"),
                row("Gadgets", "Beta", "2024-01-16", "30"),
            ],
        ),
    );
    let output = intake()
        .args(["dashboard", "-i", input.to_str().unwrap(), "--format", "json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let payload: serde_json::Value = serde_json::from_slice(&output).expect("json payload");
    assert_eq!(payload["row_count"], 2);
    assert_eq!(payload["records"][0]["supplier"], "Acme");
    assert_eq!(payload["records"][1]["date"], "2024-01-16");
    assert_eq!(payload["rows"].as_array().map(Vec::len), Some(2));
}

#[test]
fn dashboard_renders_tables() {
    let workspace = TestWorkspace::new();
    let input = workspace.write(
        "ops.csv",
        &csv(FULL_HEADER, &[row("Widgets", "Acme", "2024-01-15", "40")]),
    );
    intake()
        .args(["dashboard", "-i", input.to_str().unwrap(), "--rows", "1"])
        .assert()
        .success()
        .stdout(contains("Rows analysed: 1"))
        .stdout(contains("Key Performance Indicators"))
        .stdout(contains("Cleaned Data"));
}

#[test]
fn interactive_prompts_for_mapping_and_missing_values() {
    let workspace = TestWorkspace::new();
    let input = workspace.write(
        "ops.csv",
        &csv(
            VENDOR_HEADER,
            &[
                row("Widgets", "Acme", "2024-01-15", "40"),
                row("Gadgets", "Beta", "2024-01-16", "NA"),
            ],
        ),
    );
    let output = intake()
        .args(["interactive", "-i", input.to_str().unwrap(), "--format", "json"])
        .write_stdin("3\ny\n")
        .assert()
        .success()
        .stderr(contains("Select column for Supplier"))
        .get_output()
        .stdout
        .clone();
    let payload: serde_json::Value = serde_json::from_slice(&output).expect("json payload");
    assert_eq!(payload["row_count"], 1);
    assert_eq!(payload["records"][0]["supplier"], "Acme");
}
