use assert_cmd::prelude::*;
use predicates::prelude::*;
use rust_decimal_macros::dec;
use tempfile::TempDir;

use cli_helpers::{
    base_cmd, config_root_for_home, db_path_for_home, import_sample, json_decimal, run_cmd,
    run_cmd_json, SAMPLE_CSV,
};

fn setup_temp_home() -> TempDir {
    TempDir::new().expect("failed to create temp home")
}

#[test]
fn dashboard_empty_db_no_color_when_piped() {
    let home = setup_temp_home();

    base_cmd(&home)
        .arg("dashboard")
        .assert()
        .success()
        .stdout(predicate::str::contains("No sales found"))
        .stdout(predicate::str::contains("\u{001b}[").not());
}

#[test]
fn import_dry_run_does_not_create_db() {
    let home = setup_temp_home();
    let db_path = db_path_for_home(&home);
    assert!(!db_path.exists(), "db should start absent");

    base_cmd(&home)
        .args(["--role", "admin", "import", SAMPLE_CSV, "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("7 rows read, 6 valid"))
        .stdout(predicate::str::contains("Dry run"))
        .stdout(predicate::str::contains("\u{001b}[").not());

    assert!(!db_path.exists(), "dry-run should not create db");
}

#[test]
fn viewer_cannot_import() {
    let home = setup_temp_home();

    base_cmd(&home)
        .args(["import", SAMPLE_CSV])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not allowed"));

    assert!(!db_path_for_home(&home).exists());
}

#[test]
fn import_reports_counts_and_batches() {
    let home = setup_temp_home();

    base_cmd(&home)
        .args(["--role", "admin", "import", SAMPLE_CSV])
        .assert()
        .success()
        .stdout(predicate::str::contains("Import complete!"))
        .stdout(predicate::str::contains("Batches: 6"));

    let summary = import_sample(&home).expect("second import");
    assert_eq!(summary["valid_rows"], 6);
    assert_eq!(summary["dropped_rows"], 1);
    assert_eq!(summary["deleted"], 6);
    assert_eq!(summary["batch_sizes"], serde_json::json!([6]));
}

#[test]
fn dashboard_kpis_after_import() {
    let home = setup_temp_home();
    import_sample(&home).expect("import");

    let dashboard = run_cmd_json(&home, &["dashboard"]).expect("dashboard");
    let kpis = &dashboard["kpis"];
    assert_eq!(json_decimal(&kpis["total_revenue"]), dec!(565000));
    assert_eq!(json_decimal(&kpis["total_margin"]), dec!(53000));
    assert_eq!(kpis["completed_sales"], 4);
    assert_eq!(kpis["distinct_models"], 4);
    assert_eq!(kpis["stock_units"], 1);
    assert_eq!(json_decimal(&kpis["stock_value"]), dec!(290000));
    assert_eq!(kpis["financed_plan_sales"], 1);
    assert_eq!(json_decimal(&kpis["financed_plan_revenue"]), dec!(150000));

    let pct = json_decimal(&kpis["average_margin_pct"]);
    assert!(pct > dec!(9.38) && pct < dec!(9.39), "got {pct}");

    let recent = dashboard["recent_sales"].as_array().expect("array");
    assert_eq!(recent[0]["model"], "5090E");

    // 9.38% sits in the yellow band
    assert_eq!(dashboard["margin_band"], "yellow");
    assert_eq!(dashboard["margin_color"], "#FDD835");
}

#[test]
fn dashboard_options_cover_the_whole_store() {
    let home = setup_temp_home();
    import_sample(&home).expect("import");

    let dashboard = run_cmd_json(&home, &["dashboard", "--fy", "2026"]).expect("dashboard");
    let options = &dashboard["options"];
    assert_eq!(options["fiscal_years"], serde_json::json!([2026, 2025]));
    assert_eq!(
        options["sellers"],
        serde_json::json!(["ANA GÓMEZ", "JUAN PÉREZ", "LUIS DÍAZ"])
    );
    assert_eq!(
        options["clients"],
        serde_json::json!(["Agro Sur", "Campo Verde", "Estancia La Paz", "No especificado"])
    );
    assert_eq!(options["product_types"].as_array().unwrap().len(), 3);
    // the KPIs still follow the filter
    assert_eq!(json_decimal(&dashboard["kpis"]["total_revenue"]), dec!(50000));
}

#[test]
fn dashboard_fiscal_year_filter_groups_by_type() {
    let home = setup_temp_home();
    import_sample(&home).expect("import");

    let dashboard = run_cmd_json(&home, &["dashboard", "--fy", "2025"]).expect("dashboard");
    assert_eq!(json_decimal(&dashboard["kpis"]["total_revenue"]), dec!(515000));

    let participation = dashboard["participation"].as_array().expect("array");
    let labels: Vec<&str> = participation
        .iter()
        .map(|e| e["label"].as_str().unwrap())
        .collect();
    assert_eq!(labels, vec!["COSECHADORA", "TRACTOR", "PULVERIZADORA"]);

    // FY2025 trend has one bucket per month, November first
    let months = dashboard["sales_trend"].as_array().expect("array");
    assert_eq!(months.len(), 12);
}

#[test]
fn dashboard_single_type_groups_by_model() {
    let home = setup_temp_home();
    import_sample(&home).expect("import");

    let dashboard = run_cmd_json(&home, &["dashboard", "--type", "tractor"]).expect("dashboard");
    assert_eq!(dashboard["participation_group"], "model");
    let labels: Vec<&str> = dashboard["participation"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["label"].as_str().unwrap())
        .collect();
    assert_eq!(labels, vec!["6110J", "5090E"]);
}

#[test]
fn models_ranked_by_margin() {
    let home = setup_temp_home();
    import_sample(&home).expect("import");

    let models = run_cmd_json(&home, &["models"]).expect("models");
    let rows = models.as_array().expect("array");
    assert_eq!(rows[0]["model"], "S700");
    assert_eq!(json_decimal(&rows[0]["total_margin"]), dec!(30000));
    assert_eq!(rows[1]["model"], "6110J");
    assert_eq!(rows[1]["units"], 2);

    base_cmd(&home)
        .args(["models", "--sort", "units"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Profitability by model"))
        .stdout(predicate::str::contains("S700"));
}

#[test]
fn seller_spellings_merge_in_ranking() {
    let home = setup_temp_home();
    import_sample(&home).expect("import");

    let sellers = run_cmd_json(&home, &["sellers"]).expect("sellers");
    let rows = sellers.as_array().expect("array");
    let names: Vec<&str> = rows.iter().map(|r| r["seller"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["ANA GÓMEZ", "JUAN PÉREZ", "LUIS DÍAZ"]);
    assert_eq!(rows[1]["operations"], 2);
    assert_eq!(json_decimal(&rows[1]["average_ticket"]), dec!(102500));

    let detail = run_cmd_json(&home, &["sellers", "--seller", "juan pérez"]).expect("detail");
    assert_eq!(detail["seller"], "JUAN PÉREZ");
    assert_eq!(json_decimal(&detail["summary"]["total_revenue"]), dec!(205000));
}

#[test]
fn cargador_adds_sale_with_incentives() {
    let home = setup_temp_home();

    let added = run_cmd_json(
        &home,
        &[
            "--role", "cargador", "add", "--type", "tractor", "--model", "6130m", "--cost",
            "100000", "--sale", "120000", "--date", "2025-06-01", "--seller", "Ana Gómez",
            "--client", "Campo Verde", "--branch", "Central", "--incentive", "RETAIL=5",
        ],
    )
    .expect("add");

    assert_eq!(added["record"]["product_type"], "TRACTOR");
    assert_eq!(added["record"]["model"], "6130M");
    assert_eq!(json_decimal(&added["record"]["net_cost_usd"]), dec!(95000));
    assert_eq!(json_decimal(&added["record"]["total_incentives_usd"]), dec!(5000));

    let dashboard = run_cmd_json(&home, &["dashboard"]).expect("dashboard");
    assert_eq!(json_decimal(&dashboard["kpis"]["total_margin"]), dec!(25000));
}

#[test]
fn add_with_missing_fields_fails() {
    let home = setup_temp_home();

    base_cmd(&home)
        .args(["--role", "cargador", "add", "--model", "6110J"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("please complete all main fields"));
}

#[test]
fn viewer_cannot_add() {
    let home = setup_temp_home();

    base_cmd(&home)
        .args(["add", "--type", "TRACTOR", "--model", "6110J", "--cost", "1", "--sale", "2"])
        .args(["--date", "2025-01-01", "--seller", "Ana"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not allowed"));
}

#[test]
fn incentives_registered_and_listed() {
    let home = setup_temp_home();

    run_cmd(&home, &["--role", "cargador", "incentives", "add", "bono feria"]).expect("add");
    let again =
        run_cmd_json(&home, &["--role", "cargador", "incentives", "add", "BONO FERIA"]).expect("again");
    assert_eq!(again["added"], false);

    let names = run_cmd_json(&home, &["incentives", "list"]).expect("list");
    let names: Vec<&str> = names
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert!(names.contains(&"RETAIL"));
    assert!(names.contains(&"BONO FERIA"));
}

#[test]
fn export_csv_honours_filters() {
    let home = setup_temp_home();
    import_sample(&home).expect("import");
    let out = home.path().join("fy2026.csv");
    let out_str = out.to_str().unwrap();

    let result = run_cmd_json(&home, &["export", "csv", out_str, "--fy", "2026"]).expect("export");
    assert_eq!(result["rows"], 1);

    let content = std::fs::read_to_string(&out).expect("exported file");
    assert!(content.contains("5090E"));
    assert!(!content.contains("S700"));
}

#[test]
fn export_pdf_writes_a_document() {
    let home = setup_temp_home();
    import_sample(&home).expect("import");
    let out = home.path().join("ventas.pdf");

    base_cmd(&home)
        .args(["export", "pdf", out.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 6 rows"));

    let bytes = std::fs::read(&out).expect("pdf");
    assert!(bytes.starts_with(b"%PDF"));
}

#[test]
fn role_comes_from_config_file_and_env() {
    let home = setup_temp_home();
    let config_dir = config_root_for_home(&home).join("salesboard");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(config_dir.join("config.toml"), "role = \"admin\"\n").unwrap();

    run_cmd(&home, &["import", SAMPLE_CSV]).expect("admin from config");

    // env overrides the file
    base_cmd(&home)
        .env("SALESBOARD_ROLE", "viewer")
        .args(["import", SAMPLE_CSV])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not allowed"));
}

#[test]
fn db_flag_points_at_another_store() {
    let home = setup_temp_home();
    let custom = home.path().join("other.db");

    run_cmd(
        &home,
        &["--role", "admin", "--db", custom.to_str().unwrap(), "import", SAMPLE_CSV],
    )
    .expect("import");

    assert!(custom.exists());
    assert!(!db_path_for_home(&home).exists());
}
