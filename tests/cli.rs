// ABOUTME: Integration tests for the verity CLI commands.
// ABOUTME: Validates --help, init, plan, and end-to-end validate runs against script fixtures.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tempfile::TempDir;

const PROJECT: &str = r#"
project: shop
retry:
  base_delay: 10ms
  max_delay: 20ms
  max_attempts: 2
resources:
  - { id: db, type: postgres, template: infra/db.bicep }
  - { id: cache, type: redis, template: infra/cache.bicep }
  - { id: api, type: web-app, template: infra/api.bicep, depends_on: [db, cache] }
endpoints:
  - path: /health
  - method: POST
    path: /orders
"#;

fn verity_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("verity"))
}

fn create_script(dir: &Path, name: &str, script: &str) {
    let scripts = dir.join(".verity").join("scripts");
    fs::create_dir_all(&scripts).unwrap();

    let path = scripts.join(name);
    fs::write(&path, script).unwrap();

    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
}

/// Project whose provision script records each resource it deploys.
fn project(test_script: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("verity.yml"), PROJECT).unwrap();
    create_script(
        dir.path(),
        "provision",
        "#!/bin/sh\necho \"$VERITY_RESOURCE_ID\" >> \"$(dirname \"$0\")/deployed.log\"\necho '{\"url\": \"https://'\"$VERITY_RESOURCE_ID\"'.example.com\"}'\n",
    );
    create_script(dir.path(), "delete", "#!/bin/sh\nexit 0\n");
    create_script(dir.path(), "test", test_script);
    dir
}

#[test]
fn help_shows_commands() {
    verity_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("plan"))
        .stdout(predicate::str::contains("validate"));
}

#[test]
fn init_creates_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("verity.yml");

    verity_cmd()
        .current_dir(temp_dir.path())
        .args(["init", "--project", "shop"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created verity.yml"));

    let content = fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("project: shop"));
    assert!(content.contains("resources:"));
}

#[test]
fn init_refuses_to_overwrite_existing_config() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("verity.yml");
    fs::write(&config_path, "project: existing\n").unwrap();

    verity_cmd()
        .current_dir(temp_dir.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    assert_eq!(fs::read_to_string(&config_path).unwrap(), "project: existing\n");
}

#[test]
fn plan_prints_order_and_batches() {
    let dir = project("#!/bin/sh\necho 200\n");

    verity_cmd()
        .current_dir(dir.path())
        .arg("plan")
        .assert()
        .success()
        .stdout(predicate::str::contains("Project: shop"))
        .stdout(predicate::str::contains("  Batch 1: cache, db"))
        .stdout(predicate::str::contains("  Batch 2: api"))
        .stdout(predicate::str::contains("POST /orders"));
}

#[test]
fn plan_rejects_cycles() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("loop.yml"),
        r#"
project: loop
resources:
  - { id: a, type: x, template: a.bicep, depends_on: [b] }
  - { id: b, type: x, template: b.bicep, depends_on: [a] }
"#,
    )
    .unwrap();

    verity_cmd()
        .current_dir(dir.path())
        .args(["plan", "--config", "loop.yml"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("circular dependency"));
}

#[test]
fn missing_config_is_an_error() {
    let dir = TempDir::new().unwrap();

    verity_cmd()
        .current_dir(dir.path())
        .arg("plan")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("configuration file not found"));
}

#[test]
fn validate_passes_and_writes_report() {
    let dir = project("#!/bin/sh\necho 200\n");

    verity_cmd()
        .current_dir(dir.path())
        .args(["validate", "--report", "report.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Validation passed"))
        .stdout(predicate::str::contains("3 deployed, 0 error(s)"));

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("report.json")).unwrap()).unwrap();
    assert_eq!(report["success"], true);
    assert_eq!(report["resources_deployed"], 3);
    assert_eq!(report["tests_passed"], 2);
    assert_eq!(report["current_stage"], "completed");

    let deployed = fs::read_to_string(dir.path().join(".verity/scripts/deployed.log")).unwrap();
    let deployed: Vec<&str> = deployed.lines().collect();
    assert_eq!(deployed.len(), 3);
    assert_eq!(deployed[2], "api");
}

#[test]
fn validate_json_prints_summary() {
    let dir = project("#!/bin/sh\necho 204\n");

    let output = verity_cmd()
        .current_dir(dir.path())
        .args(["validate", "--json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["success"], true);
    assert_eq!(summary["endpoints_tested"], 2);
}

#[test]
fn failing_endpoints_exit_with_one() {
    let dir = project("#!/bin/sh\necho 500\n");

    verity_cmd()
        .current_dir(dir.path())
        .args(["validate", "--max-fix-attempts", "1"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("2 failed"))
        .stderr(predicate::str::contains("Validation failed"));
}

#[test]
fn missing_test_script_exits_with_two() {
    let dir = project("#!/bin/sh\necho 200\n");
    fs::remove_file(dir.path().join(".verity/scripts/test")).unwrap();

    verity_cmd()
        .current_dir(dir.path())
        .args(["validate", "--quiet"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("no test script"));
}

#[test]
fn no_fixes_conflicts_with_max_fix_attempts() {
    verity_cmd()
        .args(["validate", "--no-fixes", "--max-fix-attempts", "2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}
