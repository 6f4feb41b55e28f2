//! CLI tests. Commands that need the API run against a local mock server.

use assert_cmd::Command;
use mockito::Matcher;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

const VALID_TF: &str = r#"
resource "ibm_database" "redis" {
  service  = "databases-for-redis"
  plan     = "standard"
  location = "us-south"
  version  = "7.2"

  users {
    name     = "app"
    password = "Password12345"
    role     = "-@all +@read"
  }
}
"#;

const INVALID_TF: &str = r#"
resource "ibm_database" "redis" {
  service = "databases-for-redis"

  users {
    name     = "app"
    password = "pizzapizzapizza"
    role     = "+@catfood"
  }
}
"#;

fn icd_cmd(config: &Path) -> Command {
    let mut cmd = assert_cmd::cargo_bin_cmd!("icd-provider");
    cmd.arg("-c")
        .arg(config)
        .env("NO_COLOR", "1")
        .env("ICD_STATE_FILE", config.join("icd-state.json"))
        .env_remove("IC_REGION")
        .env_remove("IBMCLOUD_REGION")
        .env_remove("IBMCLOUD_DATABASES_API_ENDPOINT")
        .env_remove("IBMCLOUD_GT_API_ENDPOINT")
        .env_remove("IBMCLOUD_IAM_API_ENDPOINT");
    cmd
}

fn write_config(dir: &TempDir, tf: &str) {
    std::fs::write(dir.path().join("main.tf"), tf).unwrap();
}

#[test]
fn test_validate_accepts_valid_users() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, VALID_TF);

    icd_cmd(dir.path())
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 resource(s) valid."));
}

#[test]
fn test_validate_reports_every_violation() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, INVALID_TF);

    icd_cmd(dir.path())
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid database user"))
        .stderr(predicate::str::contains("ibm_database.redis"))
        .stderr(predicate::str::contains("database user (app) validation error:"))
        .stderr(predicate::str::contains("password must contain at least one number"))
        .stderr(predicate::str::contains(
            "role must contain only allowed categories: all, admin, read, write",
        ));
}

#[test]
fn test_validate_checks_admin_password_and_allowlist() {
    let dir = TempDir::new().unwrap();
    write_config(
        &dir,
        r#"
resource "ibm_database" "pg" {
  service       = "databases-for-postgresql"
  adminpassword = "short"

  allowlist {
    address     = "10.0.0.0/33"
    description = "office"
  }
}
"#,
    );

    icd_cmd(dir.path())
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "expected length of adminpassword to be in the range (10 - 32)",
        ))
        .stderr(predicate::str::contains(
            "allowlist address 10.0.0.0/33 must be an IP address or CIDR range",
        ));
}

#[test]
fn test_validate_without_tf_files() {
    let dir = TempDir::new().unwrap();

    icd_cmd(dir.path())
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No .tf files found"));
}

#[test]
fn test_plan_rejects_invalid_upgrade() {
    let mut server = mockito::Server::new();
    server
        .mock("GET", "/v5/ibm/deployments/deployment-1")
        .with_status(200)
        .with_body(r#"{"deployment": {"id": "deployment-1", "name": "redis", "type": "redis", "version": "6.2"}}"#)
        .create();
    server
        .mock("GET", "/v5/ibm/deployments/deployment-1/capability/versions")
        .match_query(Matcher::UrlEncoded("target_location".into(), "us-south".into()))
        .with_status(200)
        .with_body(
            r#"{"capability": {"versions": [{"version": "6.2", "transitions": [
                {"method": "in-place", "to_version": "7.0"},
                {"method": "restore", "to_version": "7.2"}
            ]}]}}"#,
        )
        .create();

    let dir = TempDir::new().unwrap();
    write_config(&dir, VALID_TF);
    let settings = dir.path().join("icd.yaml");
    std::fs::write(
        &settings,
        format!(
            "endpoints:\n  databases: {url}\n  tagging: {url}\n  iam: {url}\n\
             retry:\n  max_retries: 0\n\
             instances:\n  ibm_database.redis: deployment-1\n",
            url = server.url()
        ),
    )
    .unwrap();

    icd_cmd(dir.path())
        .arg("-s")
        .arg(&settings)
        .arg("plan")
        .env("IC_IAM_TOKEN", "test-token")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid version upgrade"))
        .stderr(predicate::str::contains(
            "7.2 is not a valid upgrade version. Allowed versions: 7.0",
        ));
}

#[test]
fn test_plan_requires_credentials() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, VALID_TF);

    icd_cmd(dir.path())
        .arg("plan")
        .env_remove("IC_IAM_TOKEN")
        .env_remove("IC_API_KEY")
        .env_remove("IBMCLOUD_API_KEY")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No IBM Cloud credentials found"));
}
