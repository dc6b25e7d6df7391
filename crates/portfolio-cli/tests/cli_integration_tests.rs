//! CLI integration tests for portfolio
//!
//! Tests the portfolio CLI commands end-to-end using assert_cmd, each against
//! its own temporary config directory and database in mock mode.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

/// Command isolated from the user's config, database and environment
#[allow(deprecated)]
fn portfolio_cmd(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("portfolio").unwrap();
    cmd.current_dir(home.path());
    cmd.env("PORTFOLIO_CONFIG_DIR", home.path().join("config"));
    cmd.env_remove("PORTFOLIO_TOKEN_AUTH");
    cmd.env_remove("RUST_LOG");
    cmd.arg("--db").arg(home.path().join("portfolio.db"));
    cmd
}

fn json(home: &TempDir, args: &[&str]) -> Value {
    let output = portfolio_cmd(home)
        .args(args)
        .args(["--format", "json"])
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "command {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

fn create_project(home: &TempDir, name: &str) -> i64 {
    let project = json(
        home,
        &[
            "projects",
            "create",
            name,
            "--start",
            "2026-01-01",
            "--end",
            "2026-12-31",
            "--budget",
            "120000",
            "--consumed",
            "30000",
            "--progress",
            "25",
        ],
    );
    project["id"].as_i64().unwrap()
}

#[test]
fn test_help_command() {
    let home = TempDir::new().unwrap();
    portfolio_cmd(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("projects"))
        .stdout(predicate::str::contains("tasks"))
        .stdout(predicate::str::contains("dashboard"));
}

#[test]
fn test_version_output() {
    let home = TempDir::new().unwrap();
    portfolio_cmd(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("portfolio"));
}

#[test]
fn test_projects_list_empty() {
    let home = TempDir::new().unwrap();
    portfolio_cmd(&home)
        .args(["projects", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No projects found."));
}

#[test]
fn test_project_create_runs_local_analysis() {
    let home = TempDir::new().unwrap();
    let id = create_project(&home, "Portal Clientes");

    let project = json(&home, &["projects", "show", &id.to_string()]);
    assert_eq!(project["name"], "Portal Clientes");
    assert!(project["code"].as_str().unwrap().ends_with("-2026-001"));
    assert_eq!(project["aiAnalysis"]["synthetic"], true);
    assert!(project["aiRiskLevel"].is_string());

    let analysis = json(&home, &["projects", "analyze", &id.to_string()]);
    assert!(analysis["healthScore"].is_number());
}

#[test]
fn test_project_text_output() {
    let home = TempDir::new().unwrap();
    portfolio_cmd(&home)
        .args(["projects", "create", "Intranet"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Project created successfully"))
        .stdout(predicate::str::contains("Code:"));

    portfolio_cmd(&home)
        .args(["projects", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Intranet"));
}

#[test]
fn test_project_create_quiet_prints_id() {
    let home = TempDir::new().unwrap();
    portfolio_cmd(&home)
        .args(["projects", "create", "Intranet", "--quiet"])
        .assert()
        .success()
        .stdout("1\n");
}

#[test]
fn test_project_update_records_history() {
    let home = TempDir::new().unwrap();
    let id = create_project(&home, "Data Lake").to_string();

    portfolio_cmd(&home)
        .args(["projects", "update", &id, "--status", "in_progress", "--changed-by", "Ana"])
        .assert()
        .success()
        .stdout(predicate::str::contains("updated"));

    portfolio_cmd(&home)
        .args(["projects", "history", &id, "--note", "Revisión trimestral"])
        .assert()
        .success();

    let history = json(&home, &["projects", "history", &id]);
    let entries = history.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["description"], "Revisión trimestral");
    assert_eq!(entries[1]["fieldChanged"], "status");
    assert_eq!(entries[1]["changedBy"], "Ana");
}

#[test]
fn test_project_list_filters_by_status() {
    let home = TempDir::new().unwrap();
    create_project(&home, "Uno");
    let two = create_project(&home, "Dos").to_string();
    portfolio_cmd(&home)
        .args(["projects", "update", &two, "--status", "Activo"])
        .assert()
        .success();

    let active = json(&home, &["projects", "list", "--status", "in_progress"]);
    let active = active.as_array().unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0]["name"], "Dos");
}

#[test]
fn test_delete_requires_force() {
    let home = TempDir::new().unwrap();
    let id = create_project(&home, "Temporal").to_string();

    portfolio_cmd(&home)
        .args(["projects", "delete", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("--force"));
    json(&home, &["projects", "show", &id]);

    portfolio_cmd(&home)
        .args(["projects", "delete", &id, "--force"])
        .assert()
        .success();
    portfolio_cmd(&home)
        .args(["projects", "show", &id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E001"));
}

#[test]
fn test_missing_project_reports_code_and_suggestion() {
    let home = TempDir::new().unwrap();
    portfolio_cmd(&home)
        .args(["projects", "show", "99"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error [E001]"))
        .stderr(predicate::str::contains("portfolio projects list"));
}

#[test]
fn test_task_workflow() {
    let home = TempDir::new().unwrap();
    let id = create_project(&home, "Migración ERP").to_string();

    let task = json(
        &home,
        &["tasks", "create", &id, "Cargar maestros", "--status", "Bloqueada"],
    );
    let code = task["taskCode"].as_str().unwrap().to_string();
    assert!(code.ends_with("-T001"));
    assert_eq!(task["aiRiskLevel"], "medium");

    let second = json(&home, &["tasks", "create", &id, "Capacitación"]);
    assert!(second["taskCode"].as_str().unwrap().ends_with("-T002"));

    let score = json(&home, &["tasks", "score", &code]);
    assert_eq!(score["riskScore"], 40);

    portfolio_cmd(&home)
        .args([
            "tasks",
            "update",
            &code,
            "--status",
            "Completada",
            "--progress",
            "100",
            "--responsible",
            "Luis",
        ])
        .assert()
        .success();

    let blocked = json(&home, &["tasks", "list", &id, "--status", "Bloqueada"]);
    assert!(blocked.as_array().unwrap().is_empty());

    let stats = json(&home, &["tasks", "stats", &id]);
    assert_eq!(stats["total"], 2);
    assert_eq!(stats["byStatus"]["Completada"], 1);
    assert_eq!(stats["completionRate"], 50);

    portfolio_cmd(&home)
        .args(["tasks", "delete", &code])
        .assert()
        .success()
        .stdout(predicate::str::contains("deleted"));
    portfolio_cmd(&home)
        .args(["tasks", "show", &code])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E002"));
}

#[test]
fn test_task_create_requires_project() {
    let home = TempDir::new().unwrap();
    portfolio_cmd(&home)
        .args(["tasks", "create", "7", "Huérfana"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E001"));
}

#[test]
fn test_dashboard() {
    let home = TempDir::new().unwrap();
    let id = create_project(&home, "CRM").to_string();
    create_project(&home, "BI");
    json(&home, &["tasks", "create", &id, "Diseño", "--status", "Completada"]);

    let stats = json(&home, &["dashboard"]);
    assert_eq!(stats["overview"]["totalProjects"], 2);
    assert_eq!(stats["overview"]["totalTasks"], 1);
    assert_eq!(stats["overview"]["completionRate"], 100.0);
    assert_eq!(stats["overview"]["totalBudget"], 240000.0);
    assert_eq!(stats["tasks"]["completed"], 1);

    portfolio_cmd(&home)
        .arg("dashboard")
        .assert()
        .success()
        .stdout(predicate::str::contains("Portfolio Dashboard"));
}

#[test]
fn test_config_set_get_reset() {
    let home = TempDir::new().unwrap();

    portfolio_cmd(&home)
        .args(["config", "get", "llm.mock_mode"])
        .assert()
        .success()
        .stdout("true\n");

    portfolio_cmd(&home)
        .args(["config", "set", "llm.timeout_secs", "30"])
        .assert()
        .success();
    assert!(home.path().join("config").join("config.toml").exists());

    portfolio_cmd(&home)
        .args(["config", "get", "llm.timeout_secs"])
        .assert()
        .success()
        .stdout("30\n");

    portfolio_cmd(&home)
        .args(["config", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("analysis.fallback_on_error = true"));

    portfolio_cmd(&home)
        .args(["config", "reset"])
        .assert()
        .success();
    portfolio_cmd(&home)
        .args(["config", "get", "llm.timeout_secs"])
        .assert()
        .success()
        .stdout("60\n");
}

#[test]
fn test_config_refuses_secrets_and_unknown_keys() {
    let home = TempDir::new().unwrap();
    portfolio_cmd(&home)
        .args(["config", "set", "llm.token.auth", "secret"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("PORTFOLIO_TOKEN_AUTH"));

    portfolio_cmd(&home)
        .args(["config", "get", "llm.nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown configuration key"));
}

#[test]
fn test_doctor_command() {
    let home = TempDir::new().unwrap();
    portfolio_cmd(&home)
        .arg("doctor")
        .assert()
        .success()
        .stdout(predicate::str::contains("[OK] Database: Connected"))
        .stdout(predicate::str::contains("Mock mode"));
}
