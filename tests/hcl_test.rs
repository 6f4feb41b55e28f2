use std::path::Path;

use icd_provider::capability::AllowlistEntry;
use icd_provider::hcl::{parse_directory, parser::parse_hcl};
use tempfile::TempDir;

const REDIS_TF: &str = r#"
provider "ibm" {
  region = "us-south"
}

resource "ibm_database" "redis" {
  service  = "databases-for-redis"
  plan     = "standard"
  location = "us-south"
  version  = "7.2"
  tags     = ["team:data", "env:prod"]

  version_upgrade_skip_backup = true

  users {
    name     = "app"
    password = "Password12345"
    role     = "-@all +@read"
  }

  users {
    name     = "ops"
    password = "Password12345$"
    type     = "ops_manager"
  }

  group {
    group_id = "member"
    members {
      allocation_count = 3
    }
    memory {
      allocation_mb = 4096
    }
    disk {
      allocation_mb = 10240
    }
    host_flavor {
      id = "b3c.4x16.encrypted"
    }
  }
}

resource "ibm_resource_group" "ignored" {
  name = "prod"
}
"#;

fn write_tf(dir: &TempDir, name: &str, content: &str) {
    std::fs::write(dir.path().join(name), content).unwrap();
}

#[test]
fn test_parse_database_resource() {
    let resources = parse_hcl(REDIS_TF, Path::new("main.tf")).unwrap();
    assert_eq!(resources.len(), 1);

    let redis = &resources[0];
    assert_eq!(redis.name, "redis");
    assert_eq!(redis.address(), "ibm_database.redis");
    assert_eq!(redis.service.as_deref(), Some("databases-for-redis"));
    assert_eq!(redis.plan.as_deref(), Some("standard"));
    assert_eq!(redis.location.as_deref(), Some("us-south"));
    assert_eq!(redis.version.as_deref(), Some("7.2"));
    assert!(redis.version_upgrade_skip_backup);
    assert_eq!(
        redis.tags,
        Some(vec!["team:data".to_string(), "env:prod".to_string()])
    );
    assert_eq!(redis.source_file, "main.tf");
    assert!(redis.unknown_attributes.is_empty());
}

#[test]
fn test_parse_users_blocks() {
    let resources = parse_hcl(REDIS_TF, Path::new("main.tf")).unwrap();
    let users = &resources[0].users;
    assert_eq!(users.len(), 2);

    assert_eq!(users[0].name, "app");
    assert_eq!(users[0].user_type, "database");
    assert_eq!(users[0].role.as_deref(), Some("-@all +@read"));

    assert_eq!(users[1].name, "ops");
    assert_eq!(users[1].user_type, "ops_manager");
    assert_eq!(users[1].role, None);
}

#[test]
fn test_parse_group_block() {
    let resources = parse_hcl(REDIS_TF, Path::new("main.tf")).unwrap();
    let groups = &resources[0].groups;
    assert_eq!(groups.len(), 1);

    let member = &groups[0];
    assert_eq!(member.group_id, "member");
    assert_eq!(member.members, Some(3));
    assert_eq!(member.memory_mb, Some(4096));
    assert_eq!(member.disk_mb, Some(10240));
    assert_eq!(member.cpu_count, None);
    assert_eq!(member.host_flavor.as_deref(), Some("b3c.4x16.encrypted"));
}

#[test]
fn test_missing_tags_are_unmanaged() {
    let tf = r#"
resource "ibm_database" "pg" {
  service = "databases-for-postgresql"
}
"#;
    let resources = parse_hcl(tf, Path::new("pg.tf")).unwrap();
    assert_eq!(resources[0].tags, None);
    assert!(!resources[0].version_upgrade_skip_backup);
}

#[test]
fn test_non_literal_values_are_recorded_as_unknown() {
    let tf = r#"
resource "ibm_database" "pg" {
  service = "databases-for-postgresql"
  version = var.pg_version

  users {
    name     = "admin"
    password = var.admin_password
  }

  group {
    group_id = "member"
    memory {
      allocation_mb = local.memory
    }
  }
}
"#;
    let resources = parse_hcl(tf, Path::new("pg.tf")).unwrap();
    let pg = &resources[0];

    assert_eq!(pg.version, None);
    assert!(pg.users.is_empty());
    assert_eq!(pg.groups.len(), 1);
    assert_eq!(pg.groups[0].memory_mb, None);
    assert_eq!(
        pg.unknown_attributes,
        vec!["version", "users.password", "group.memory.allocation_mb"]
    );
}

const ACCESS_TF: &str = r#"
resource "ibm_database" "pg" {
  service       = "databases-for-postgresql"
  adminpassword = "AdminPassword123"

  allowlist {
    address     = "10.0.0.0/24"
    description = "office"
  }

  whitelist {
    address     = "192.168.1.5"
    description = "vpn"
  }

  auto_scaling {
    disk {
      capacity_enabled             = true
      free_space_less_than_percent = 15
      io_enabled                   = true
      io_over_period               = "15m"
      io_above_percent             = 85
      rate_increase_percent        = 15
      rate_period_seconds          = 900
      rate_limit_mb_per_member     = 3670016
      rate_units                   = "mb"
    }
    cpu {
      rate_limit_count_per_member = 20
    }
  }
}
"#;

#[test]
fn test_parse_admin_password_and_allowlist() {
    let resources = parse_hcl(ACCESS_TF, Path::new("pg.tf")).unwrap();
    let pg = &resources[0];

    assert_eq!(pg.admin_password.as_deref(), Some("AdminPassword123"));
    assert_eq!(
        pg.allowlist,
        Some(vec![
            AllowlistEntry::new("10.0.0.0/24", "office"),
            AllowlistEntry::new("192.168.1.5", "vpn"),
        ])
    );
    assert!(pg.unknown_attributes.is_empty());
}

#[test]
fn test_parse_auto_scaling_block() {
    let resources = parse_hcl(ACCESS_TF, Path::new("pg.tf")).unwrap();
    let scaling = resources[0].auto_scaling.as_ref().unwrap();

    let disk = scaling.disk.as_ref().unwrap();
    assert_eq!(disk.capacity_enabled, Some(true));
    assert_eq!(disk.free_space_less_than_percent, Some(15));
    assert_eq!(disk.io_over_period.as_deref(), Some("15m"));
    assert_eq!(disk.rate_limit_mb_per_member, Some(3670016));
    assert_eq!(disk.rate_units.as_deref(), Some("mb"));
    assert!(scaling.memory.is_none());
    assert_eq!(scaling.cpu.as_ref().unwrap().rate_limit_count_per_member, Some(20));
    assert_eq!(scaling.cpu.as_ref().unwrap().rate_units, None);
}

#[test]
fn test_unset_allowlist_is_unmanaged() {
    let resources = parse_hcl(REDIS_TF, Path::new("main.tf")).unwrap();
    assert_eq!(resources[0].allowlist, None);
    assert_eq!(resources[0].auto_scaling, None);
    assert_eq!(resources[0].admin_password, None);
}

#[test]
fn test_non_literal_access_values_are_unknown() {
    let tf = r#"
resource "ibm_database" "pg" {
  adminpassword = var.admin_password

  allowlist {
    address     = var.office_cidr
    description = "office"
  }

  auto_scaling {
    memory {
      io_above_percent = local.threshold
      io_enabled       = true
    }
  }
}
"#;
    let resources = parse_hcl(tf, Path::new("pg.tf")).unwrap();
    let pg = &resources[0];

    assert_eq!(pg.admin_password, None);
    assert_eq!(pg.allowlist, Some(Vec::new()));
    let memory = pg.auto_scaling.as_ref().unwrap().memory.as_ref().unwrap();
    assert_eq!(memory.io_enabled, Some(true));
    assert_eq!(memory.io_above_percent, None);
    assert_eq!(
        pg.unknown_attributes,
        vec![
            "adminpassword",
            "allowlist.address",
            "auto_scaling.memory.io_above_percent",
        ]
    );
}

#[test]
fn test_invalid_hcl_is_an_error() {
    let err = parse_hcl("resource \"ibm_database\" {", Path::new("broken.tf")).unwrap_err();
    assert!(err.to_string().contains("broken.tf"));
}

#[test]
fn test_parse_directory_reads_all_tf_files() {
    let dir = TempDir::new().unwrap();
    write_tf(&dir, "b.tf", REDIS_TF);
    write_tf(
        &dir,
        "a.tf",
        r#"
resource "ibm_database" "pg" {
  service = "databases-for-postgresql"
}
"#,
    );
    write_tf(&dir, "notes.txt", "not terraform");

    let resources = parse_directory(dir.path()).unwrap();
    let names: Vec<&str> = resources.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["pg", "redis"]);
}

#[test]
fn test_parse_directory_accepts_single_file() {
    let dir = TempDir::new().unwrap();
    write_tf(&dir, "main.tf", REDIS_TF);

    let resources = parse_directory(&dir.path().join("main.tf")).unwrap();
    assert_eq!(resources.len(), 1);
}

#[test]
fn test_parse_directory_without_tf_files() {
    let dir = TempDir::new().unwrap();
    let err = parse_directory(dir.path()).unwrap_err();
    assert!(err.to_string().contains("No .tf files found"));
}
