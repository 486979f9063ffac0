use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const SALES: &str = "\
Particulars,,Vch_date,Qty,Scm_disc,Amount
Apollo Pharmacy,Paracetamol 500,2025-01-05,10,5,\"1,000\"
City Chemist,Cetirizine 10,2025-01-20,4,20,400
Apollo Pharmacy,Cetirizine 10,2025-02-02,6,60,600
Wellness Store,Paracetamol 500,2025-02-15,2,0,200
";

fn sandbox() -> TempDir {
    tempfile::tempdir().unwrap()
}

fn write(dir: &TempDir, name: &str, content: &str) -> String {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path.to_string_lossy().into_owned()
}

/// The binary with HOME and the working directory pointed at `dir`, so no
/// user settings leak in and default exports land in the sandbox.
fn smartmed(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("smartmed").unwrap();
    cmd.env("HOME", dir.path()).current_dir(dir.path());
    cmd
}

fn report_json(dir: &TempDir, args: &[&str]) -> serde_json::Value {
    let out = smartmed(dir).arg("report").args(args).arg("--json").output().unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    serde_json::from_slice(&out.stdout).unwrap()
}

#[test]
fn preview_lists_cleaned_columns() {
    let dir = sandbox();
    let file = write(&dir, "sales.csv", SALES);
    smartmed(&dir)
        .args(["preview", &file])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleaned columns:"))
        .stdout(predicate::str::contains("Unnamed_1"))
        .stdout(predicate::str::contains("Scm_disc"))
        .stdout(predicate::str::contains("4 rows loaded"));
}

#[test]
fn report_json_totals_and_missing_views() {
    let dir = sandbox();
    let file = write(&dir, "sales.csv", SALES);
    let json = report_json(&dir, &[&file]);
    assert_eq!(json["record_count"], 4);
    assert_eq!(json["total_amount"], 2200.0);
    assert_eq!(json["total_qty"], 22);
    assert_eq!(json["top_customers"][0]["name"], "Apollo Pharmacy");
    assert_eq!(json["top_customers"][0]["total"], 1600.0);
    assert_eq!(json["monthly_trend"].as_array().unwrap().len(), 2);
    assert!(json.get("expiring_batches").is_none());
    assert!(json.get("expiring_soon").is_none());
}

#[test]
fn report_filters_by_customer_and_dates() {
    let dir = sandbox();
    let file = write(&dir, "sales.csv", SALES);

    let json = report_json(&dir, &[&file, "--customer", "Apollo Pharmacy"]);
    assert_eq!(json["record_count"], 2);
    assert_eq!(json["total_amount"], 1600.0);

    let json = report_json(&dir, &[&file, "--from", "2025-01-20", "--to", "2025-02-02"]);
    assert_eq!(json["record_count"], 2);
    assert_eq!(json["total_amount"], 1000.0);
}

#[test]
fn report_one_sided_range_past_the_data_is_empty() {
    let dir = sandbox();
    let file = write(&dir, "sales.csv", SALES);

    let json = report_json(&dir, &[&file, "--from", "2025-06-01"]);
    assert_eq!(json["record_count"], 0);
    assert_eq!(json["total_amount"], 0.0);

    let json = report_json(&dir, &[&file, "--to", "2024-12-31"]);
    assert_eq!(json["record_count"], 0);

    let json = report_json(&dir, &[&file, "--from", "2025-02-01"]);
    assert_eq!(json["record_count"], 2);
}

#[test]
fn report_rejects_reversed_range() {
    let dir = sandbox();
    let file = write(&dir, "sales.csv", SALES);
    smartmed(&dir)
        .args(["report", &file, "--from", "2025-02-01", "--to", "2025-01-01"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("is after end date"));
}

#[test]
fn report_tables_show_sections() {
    let dir = sandbox();
    let file = write(&dir, "sales.csv", SALES);
    smartmed(&dir)
        .args(["report", &file])
        .env("NO_COLOR", "1")
        .assert()
        .success()
        .stdout(predicate::str::contains("Showing 4 records"))
        .stdout(predicate::str::contains("Monthly Sales Trend"))
        .stdout(predicate::str::contains("Discount Effectiveness"))
        .stdout(predicate::str::contains("Nearing Expiry").not());
}

#[test]
fn missing_date_column_is_reported() {
    let dir = sandbox();
    let file = write(&dir, "sales.csv", "Particulars,,Amount\nA,P1,10\n");
    smartmed(&dir)
        .args(["report", &file])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Missing expected column: Vch_date"));
}

#[test]
fn unsupported_extension_is_rejected() {
    let dir = sandbox();
    let file = write(&dir, "sales.pdf", SALES);
    smartmed(&dir)
        .args(["preview", &file])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported file type"));
}

#[test]
fn invalid_date_flag_is_rejected() {
    let dir = sandbox();
    let file = write(&dir, "sales.csv", SALES);
    smartmed(&dir)
        .args(["report", &file, "--from", "05/01/2025"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("YYYY-MM-DD"));
}

#[test]
fn export_writes_filtered_rows() {
    let dir = sandbox();
    let file = write(&dir, "sales.csv", SALES);
    let out = dir.path().join("out").join("apollo.csv");
    smartmed(&dir)
        .args(["export", &file, "--customer", "Apollo Pharmacy", "--output"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 2 records"));

    let written = std::fs::read_to_string(&out).unwrap();
    let mut lines = written.lines();
    assert_eq!(
        lines.next(),
        Some("Particulars,Unnamed_1,Vch_date,Qty,Scm_disc,Amount,Scm_qty")
    );
    assert_eq!(written.lines().count(), 3);
    assert!(!written.contains("City Chemist"));
}

#[test]
fn export_defaults_to_working_directory() {
    let dir = sandbox();
    let file = write(&dir, "sales.csv", SALES);
    smartmed(&dir).args(["export", &file]).assert().success();
    assert!(dir.path().join("filtered_sales_data.csv").exists());
}

#[test]
fn config_set_changes_product_column() {
    let dir = sandbox();
    let file = write(
        &dir,
        "items.csv",
        "Vch_date,Particulars,Item Name,Qty,Amount\n2025-01-01,A,Zinc,3,30\n",
    );
    smartmed(&dir)
        .args(["config", "set", "product_column", "Item_Name"])
        .assert()
        .success();
    smartmed(&dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Item_Name"));

    let json = report_json(&dir, &[&file]);
    assert_eq!(json["top_products"][0]["name"], "Zinc");
}

#[test]
fn config_set_rejects_out_of_range_values() {
    let dir = sandbox();
    smartmed(&dir)
        .args(["config", "set", "expiry_window_days", "100000000"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("between 1 and 36500"));
    smartmed(&dir)
        .args(["config", "set", "top_n", "65534"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("between 1 and 100"));
}

#[test]
fn config_set_rejects_unknown_key() {
    let dir = sandbox();
    smartmed(&dir)
        .args(["config", "set", "colour", "blue"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown setting"));
}
