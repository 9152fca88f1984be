use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

/// A `stw` invocation isolated to its own data and config directories.
fn stw(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("stw").unwrap();
    cmd.current_dir(dir.path())
        .env("DATA_PATH", dir.path().join("data"))
        .env("CONFIGURATION_PATH", dir.path().join("config"))
        .env("NO_COLOR", "1")
        .env_remove("DATABASE_PATH")
        .env_remove("API_PORT")
        .env_remove("LOG_LEVEL")
        .env_remove("OPERATION_TIMEOUT_MS")
        .env_remove("RUST_LOG");
    cmd
}

fn json_output(cmd: &mut Command) -> Value {
    let output = cmd.output().unwrap();
    assert!(
        output.status.success(),
        "stw failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

struct Seeded {
    admin: i64,
    alice: i64,
    project: i64,
}

fn seed(dir: &TempDir) -> Seeded {
    let admin = json_output(stw(dir).args(["bootstrap", "Root", "--format", "json"]));
    let alice = json_output(stw(dir).args(["actor", "create", "Alice", "--format", "json"]));
    let project = json_output(stw(dir).args(["project", "create", "Census", "--format", "json"]));
    let project_id = project["id"].as_i64().unwrap();
    json_output(stw(dir).args([
        "form",
        "create",
        &project_id.to_string(),
        "household",
        "--format",
        "json",
    ]));

    Seeded {
        admin: admin["actor"]["id"].as_i64().unwrap(),
        alice: alice["id"].as_i64().unwrap(),
        project: project_id,
    }
}

#[test]
fn test_cli_help() {
    let dir = TempDir::new().unwrap();
    stw(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Steward"))
        .stdout(predicate::str::contains("grant"));
}

#[test]
fn test_cli_version() {
    let dir = TempDir::new().unwrap();
    stw(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("stw"));
}

#[test]
fn test_roles_lists_catalog() {
    let dir = TempDir::new().unwrap();
    stw(&dir)
        .arg("roles")
        .assert()
        .success()
        .stdout(predicate::str::contains("admin"))
        .stdout(predicate::str::contains("manager"))
        .stdout(predicate::str::contains("assignment.create"));

    let roles = json_output(stw(&dir).args(["roles", "--format", "json"]));
    assert_eq!(roles.as_array().unwrap().len(), 6);
    assert_eq!(roles[0]["system"], "admin");
}

#[test]
fn test_bootstrap_prints_token() {
    let dir = TempDir::new().unwrap();
    stw(&dir)
        .args(["bootstrap", "Root Admin"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Token:"))
        .stdout(predicate::str::contains("admin"));

    assert!(dir.path().join("data/steward.db").exists());
    assert!(dir.path().join("data/logs").is_dir());
}

#[test]
fn test_grant_list_revoke_flow() {
    let dir = TempDir::new().unwrap();
    let seeded = seed(&dir);
    let admin = seeded.admin.to_string();
    let alice = seeded.alice.to_string();
    let project = seeded.project.to_string();

    stw(&dir)
        .args(["grant", "--as", &admin, "--project", &project, "viewer", &alice])
        .assert()
        .success()
        .stdout(predicate::str::contains("Granted"));

    let listed = json_output(stw(&dir).args([
        "list", "--as", &admin, "--project", &project, "--format", "json",
    ]));
    assert_eq!(listed[0]["actorId"], seeded.alice);
    assert_eq!(listed[0]["roleId"], 4);

    let by_role = json_output(stw(&dir).args([
        "list", "--as", &admin, "--project", &project, "--role", "viewer", "--format", "json",
    ]));
    assert_eq!(by_role[0]["displayName"], "Alice");

    stw(&dir)
        .args(["revoke", "--as", &admin, "--project", &project, "viewer", &alice])
        .assert()
        .success()
        .stdout(predicate::str::contains("Revoked"));

    stw(&dir)
        .args(["revoke", "--as", &admin, "--project", &project, "viewer", &alice])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not hold role"));

    // bootstrap, grant, revoke and the no-op revoke
    let records = json_output(stw(&dir).args(["audit", "list", "--format", "json"]));
    assert_eq!(records.as_array().unwrap().len(), 4);
    assert_eq!(records[0]["action"], "assignment.delete");
    assert_eq!(records[0]["details"]["changed"], false);

    stw(&dir)
        .args(["audit", "verify"])
        .assert()
        .success()
        .stdout(predicate::str::contains("intact"));
}

#[test]
fn test_form_grant_shows_in_summary() {
    let dir = TempDir::new().unwrap();
    let seeded = seed(&dir);
    let admin = seeded.admin.to_string();
    let alice = seeded.alice.to_string();
    let project = seeded.project.to_string();

    stw(&dir)
        .args([
            "grant", "--as", &admin, "--project", &project, "--form", "household", "app-user",
            &alice,
        ])
        .assert()
        .success();

    let summary = json_output(stw(&dir).args([
        "summary", "--as", &admin, &project, "--format", "json",
    ]));
    assert_eq!(summary[0]["xmlFormId"], "household");
    assert_eq!(summary[0]["roles"]["2"][0]["id"], seeded.alice);

    let by_role = json_output(stw(&dir).args([
        "summary", "--as", &admin, &project, "--role", "2", "--format", "json",
    ]));
    assert_eq!(by_role[0]["actors"][0]["displayName"], "Alice");
}

#[test]
fn test_acting_actor_required_and_checked() {
    let dir = TempDir::new().unwrap();
    let seeded = seed(&dir);
    let alice = seeded.alice.to_string();

    stw(&dir)
        .args(["grant", "viewer", &alice])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--as"));

    stw(&dir)
        .args(["grant", "--as", "9999", "viewer", &alice])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));

    // Alice holds nothing, so she may not grant herself anything.
    stw(&dir)
        .args(["grant", "--as", &alice, "admin", &alice])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Permission denied"));
}

#[test]
fn test_form_requires_project() {
    let dir = TempDir::new().unwrap();
    stw(&dir)
        .args(["list", "--as", "1", "--form", "household"])
        .assert()
        .failure();
}

#[test]
fn test_config_file_sets_database_path() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("config")).unwrap();
    fs::write(
        dir.path().join("config/steward.yaml"),
        "database:\n  path: store/custom.db\nlogging:\n  level: warn\n",
    )
    .unwrap();

    stw(&dir).arg("roles").assert().success();
    assert!(dir.path().join("store/custom.db").exists());
    assert!(!dir.path().join("data/steward.db").exists());
}

#[test]
fn test_database_flag_and_env_override() {
    let dir = TempDir::new().unwrap();

    stw(&dir)
        .args(["roles", "--database", "flag.db"])
        .assert()
        .success();
    assert!(dir.path().join("flag.db").exists());

    stw(&dir)
        .env("DATABASE_PATH", "env.db")
        .arg("roles")
        .assert()
        .success();
    assert!(dir.path().join("env.db").exists());
}

#[test]
fn test_invalid_env_override_fails() {
    let dir = TempDir::new().unwrap();
    stw(&dir)
        .env("API_PORT", "not-a-port")
        .arg("roles")
        .assert()
        .failure()
        .stderr(predicate::str::contains("API_PORT"));
}

#[test]
fn test_form_list_shows_live_forms() {
    let dir = TempDir::new().unwrap();
    let seeded = seed(&dir);
    let project = seeded.project.to_string();

    stw(&dir)
        .args(["form", "create", &project, "agriculture", "--name", "Agriculture"])
        .assert()
        .success();

    let forms = json_output(stw(&dir).args(["form", "list", &project, "--format", "json"]));
    let ids: Vec<&str> = forms
        .as_array()
        .unwrap()
        .iter()
        .map(|form| form["xmlFormId"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["agriculture", "household"]);

    stw(&dir)
        .args(["form", "list", &project])
        .assert()
        .success()
        .stdout(predicate::str::contains("Agriculture"));
}
