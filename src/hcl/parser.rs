use std::path::Path;

use anyhow::{Context, Result};

use crate::capability::{AllowlistEntry, AutoScaling, AutoScalingRule};
use crate::config::types::{DatabaseResourceConfig, GroupConfig, UserConfig};

/// Parse a single HCL file and return every `ibm_database` resource in it.
pub fn parse_hcl(content: &str, file_path: &Path) -> Result<Vec<DatabaseResourceConfig>> {
    let body: hcl::Body = hcl::from_str(content)
        .with_context(|| format!("Failed to parse HCL in: {}", file_path.display()))?;

    let file_str = file_path.to_string_lossy().to_string();
    let mut resources = Vec::new();

    for structure in body.into_inner() {
        match structure {
            hcl::Structure::Block(block) => {
                if block.identifier() != "resource" {
                    tracing::debug!("Ignoring block type: {}", block.identifier());
                    continue;
                }
                let labels: Vec<&str> = block.labels().iter().map(|l| l.as_str()).collect();
                if labels.len() < 2 || labels[0] != DatabaseResourceConfig::RESOURCE_TYPE {
                    continue;
                }
                resources.push(parse_database_block(&block, labels[1], &file_str));
            }
            hcl::Structure::Attribute(attr) => {
                tracing::debug!("Ignoring top-level attribute: {}", attr.key);
            }
        }
    }

    Ok(resources)
}

// ─── Block Parsers ───────────────────────────────────────────────────────────

fn parse_database_block(block: &hcl::Block, name: &str, file: &str) -> DatabaseResourceConfig {
    let mut resource = DatabaseResourceConfig {
        name: name.to_string(),
        source_file: file.to_string(),
        ..Default::default()
    };

    for structure in block.body().iter() {
        match structure {
            hcl::Structure::Attribute(attr) => {
                let key: &str = &attr.key;
                let unknown = match key {
                    "service" => set_string(&mut resource.service, &attr.expr),
                    "plan" => set_string(&mut resource.plan, &attr.expr),
                    "location" => set_string(&mut resource.location, &attr.expr),
                    "version" => set_string(&mut resource.version, &attr.expr),
                    "adminpassword" => set_string(&mut resource.admin_password, &attr.expr),
                    "version_upgrade_skip_backup" => match expr_to_bool(&attr.expr) {
                        Some(b) => {
                            resource.version_upgrade_skip_backup = b;
                            false
                        }
                        None => true,
                    },
                    "tags" => match expr_to_string_list(&attr.expr) {
                        Some(tags) => {
                            resource.tags = Some(tags);
                            false
                        }
                        None => true,
                    },
                    _ => false,
                };
                if unknown {
                    resource.unknown_attributes.push(key.to_string());
                }
            }
            hcl::Structure::Block(inner) => match inner.identifier() {
                "users" => {
                    if let Some(user) = parse_users_block(inner, &mut resource.unknown_attributes) {
                        resource.users.push(user);
                    }
                }
                "group" => {
                    if let Some(group) = parse_group_block(inner, &mut resource.unknown_attributes) {
                        resource.groups.push(group);
                    }
                }
                "allowlist" | "whitelist" => {
                    let entries = resource.allowlist.get_or_insert_with(Vec::new);
                    let unknown = &mut resource.unknown_attributes;
                    if let Some(entry) = parse_allowlist_block(inner, unknown) {
                        entries.push(entry);
                    }
                }
                "auto_scaling" => {
                    resource.auto_scaling =
                        Some(parse_auto_scaling_block(inner, &mut resource.unknown_attributes));
                }
                other => tracing::debug!("Ignoring nested block: {}", other),
            },
        }
    }

    resource
}

/// Users with a non-literal name or password cannot be checked before apply
/// and are left out.
fn parse_users_block(block: &hcl::Block, unknown: &mut Vec<String>) -> Option<UserConfig> {
    let mut user = UserConfig {
        user_type: "database".to_string(),
        ..Default::default()
    };
    let mut complete = true;

    for structure in block.body().iter() {
        if let hcl::Structure::Attribute(attr) = structure {
            let key: &str = &attr.key;
            let value = expr_to_string(&attr.expr);
            match (key, value) {
                ("name", Some(v)) => user.name = v,
                ("password", Some(v)) => user.password = v,
                ("type", Some(v)) => user.user_type = v,
                ("role", Some(v)) => user.role = Some(v),
                ("name" | "password" | "type" | "role", None) => {
                    unknown.push(format!("users.{}", key));
                    complete = false;
                }
                _ => {}
            }
        }
    }

    complete.then_some(user)
}

fn parse_group_block(block: &hcl::Block, unknown: &mut Vec<String>) -> Option<GroupConfig> {
    let mut group = GroupConfig::default();

    for structure in block.body().iter() {
        match structure {
            hcl::Structure::Attribute(attr) => {
                let key: &str = &attr.key;
                if key == "group_id" {
                    match expr_to_string(&attr.expr) {
                        Some(id) => group.group_id = id,
                        None => unknown.push("group.group_id".to_string()),
                    }
                }
            }
            hcl::Structure::Block(inner) => {
                let ident = inner.identifier();
                let (target, field) = match ident {
                    "members" => (&mut group.members, "allocation_count"),
                    "memory" => (&mut group.memory_mb, "allocation_mb"),
                    "disk" => (&mut group.disk_mb, "allocation_mb"),
                    "cpu" => (&mut group.cpu_count, "allocation_count"),
                    "host_flavor" => {
                        group.host_flavor = block_attribute(inner, "id").and_then(expr_to_string);
                        continue;
                    }
                    _ => continue,
                };
                if let Some(expr) = block_attribute(inner, field) {
                    match expr_to_i64(expr) {
                        Some(v) => *target = Some(v),
                        None => unknown.push(format!("group.{}.{}", ident, field)),
                    }
                }
            }
        }
    }

    if group.group_id.is_empty() {
        return None;
    }
    Some(group)
}

fn parse_allowlist_block(block: &hcl::Block, unknown: &mut Vec<String>) -> Option<AllowlistEntry> {
    let ident = block.identifier();
    let mut read = |field: &str| match block_attribute(block, field) {
        Some(expr) => {
            let value = expr_to_string(expr);
            if value.is_none() {
                unknown.push(format!("{}.{}", ident, field));
            }
            value
        }
        None => Some(String::new()),
    };
    let address = read("address")?;
    let description = read("description")?;
    Some(AllowlistEntry { address, description })
}

fn parse_auto_scaling_block(block: &hcl::Block, unknown: &mut Vec<String>) -> AutoScaling {
    let mut scaling = AutoScaling::default();

    for structure in block.body().iter() {
        let hcl::Structure::Block(inner) = structure else {
            continue;
        };
        let ident = inner.identifier();
        let target = match ident {
            "disk" => &mut scaling.disk,
            "memory" => &mut scaling.memory,
            "cpu" => &mut scaling.cpu,
            other => {
                tracing::debug!("Ignoring auto_scaling block: {}", other);
                continue;
            }
        };
        *target = Some(parse_auto_scaling_rule(inner, unknown));
    }

    scaling
}

fn parse_auto_scaling_rule(block: &hcl::Block, unknown: &mut Vec<String>) -> AutoScalingRule {
    let mut rule = AutoScalingRule::default();
    let ident = block.identifier();

    for structure in block.body().iter() {
        let hcl::Structure::Attribute(attr) = structure else {
            continue;
        };
        let key: &str = &attr.key;
        let known = match key {
            "capacity_enabled" => set(&mut rule.capacity_enabled, expr_to_bool(&attr.expr)),
            "io_enabled" => set(&mut rule.io_enabled, expr_to_bool(&attr.expr)),
            "io_over_period" => set(&mut rule.io_over_period, expr_to_string(&attr.expr)),
            "rate_units" => set(&mut rule.rate_units, expr_to_string(&attr.expr)),
            "free_space_less_than_percent" => {
                set(&mut rule.free_space_less_than_percent, expr_to_i64(&attr.expr))
            }
            "io_above_percent" => set(&mut rule.io_above_percent, expr_to_i64(&attr.expr)),
            "rate_increase_percent" => {
                set(&mut rule.rate_increase_percent, expr_to_i64(&attr.expr))
            }
            "rate_period_seconds" => set(&mut rule.rate_period_seconds, expr_to_i64(&attr.expr)),
            "rate_limit_mb_per_member" => {
                set(&mut rule.rate_limit_mb_per_member, expr_to_i64(&attr.expr))
            }
            "rate_limit_count_per_member" => {
                set(&mut rule.rate_limit_count_per_member, expr_to_i64(&attr.expr))
            }
            _ => true,
        };
        if !known {
            unknown.push(format!("auto_scaling.{}.{}", ident, key));
        }
    }

    rule
}

// ─── Helper Functions ────────────────────────────────────────────────────────

fn block_attribute<'a>(block: &'a hcl::Block, name: &str) -> Option<&'a hcl::Expression> {
    block.body().iter().find_map(|s| match s {
        hcl::Structure::Attribute(attr) if &*attr.key == name => Some(&attr.expr),
        _ => None,
    })
}

/// Returns false when the value is not a literal.
fn set<T>(target: &mut Option<T>, value: Option<T>) -> bool {
    let known = value.is_some();
    if known {
        *target = value;
    }
    known
}

/// Returns true when the value is not a literal.
fn set_string(target: &mut Option<String>, expr: &hcl::Expression) -> bool {
    match expr_to_string(expr) {
        Some(s) => {
            *target = Some(s);
            false
        }
        None => true,
    }
}

fn expr_to_string(expr: &hcl::Expression) -> Option<String> {
    match expr {
        hcl::Expression::String(s) => Some(s.clone()),
        hcl::Expression::Number(n) => Some(n.to_string()),
        hcl::Expression::Bool(b) => Some(b.to_string()),
        hcl::Expression::Parenthesis(inner) => expr_to_string(inner),
        _ => None,
    }
}

fn expr_to_i64(expr: &hcl::Expression) -> Option<i64> {
    match expr {
        hcl::Expression::Number(n) => n.as_i64(),
        hcl::Expression::String(s) => s.parse().ok(),
        hcl::Expression::Parenthesis(inner) => expr_to_i64(inner),
        _ => None,
    }
}

fn expr_to_bool(expr: &hcl::Expression) -> Option<bool> {
    match expr {
        hcl::Expression::Bool(b) => Some(*b),
        hcl::Expression::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn expr_to_string_list(expr: &hcl::Expression) -> Option<Vec<String>> {
    match expr {
        hcl::Expression::Array(arr) => arr.iter().map(expr_to_string).collect(),
        _ => None,
    }
}
