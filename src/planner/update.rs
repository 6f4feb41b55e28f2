use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, info};

use super::plan::{DiagnosticKind, Diagnostic, DimensionChange, PlannedChange, ResourcePlan};
use crate::capability::{AllowlistEntry, AutoScaling, Group, GroupResourceKind};
use crate::client::{CloudDatabasesClient, Deployment, GlobalTaggingClient, GroupScaling, TagType};
use crate::config::types::{DatabaseResourceConfig, GroupConfig};
use crate::state::{fingerprint, ResourceState, UserRecord};
use crate::validation::{
    validate_group_scaling, UpgradeError, UpgradeValidator, UserType, VersionSource,
};

/// Auto-scaling settings apply to this group.
pub const AUTOSCALING_GROUP: &str = "member";

const ADMIN_PASSWORD_LEN: std::ops::RangeInclusive<usize> = 10..=32;

/// Read access to the live deployment, used while planning.
#[async_trait]
pub trait DeploymentReader: VersionSource {
    async fn deployment(&self, instance_id: &str) -> Result<Deployment>;
    async fn groups(&self, instance_id: &str) -> Result<Vec<Group>>;
    async fn attached_tags(&self, instance_id: &str) -> Result<Vec<String>>;
    async fn allowlist(&self, instance_id: &str) -> Result<Vec<AllowlistEntry>>;
    async fn autoscaling(&self, instance_id: &str, group_id: &str) -> Result<AutoScaling>;
}

/// Live reader backed by the Cloud Databases and Global Tagging clients.
pub struct LiveDeployment<'a> {
    pub databases: &'a CloudDatabasesClient,
    pub tagging: &'a GlobalTaggingClient,
}

#[async_trait]
impl VersionSource for LiveDeployment<'_> {
    async fn fetch_deployment_version(
        &self,
        instance_id: &str,
        location: &str,
    ) -> Result<Option<crate::capability::Version>> {
        self.databases.fetch_deployment_version(instance_id, location).await
    }
}

#[async_trait]
impl DeploymentReader for LiveDeployment<'_> {
    async fn deployment(&self, instance_id: &str) -> Result<Deployment> {
        self.databases.get_deployment(instance_id).await
    }

    async fn groups(&self, instance_id: &str) -> Result<Vec<Group>> {
        self.databases.list_groups(instance_id).await
    }

    async fn attached_tags(&self, instance_id: &str) -> Result<Vec<String>> {
        self.tagging.list_attached(instance_id, TagType::User).await
    }

    async fn allowlist(&self, instance_id: &str) -> Result<Vec<AllowlistEntry>> {
        self.databases.list_allowlist(instance_id).await
    }

    async fn autoscaling(&self, instance_id: &str, group_id: &str) -> Result<AutoScaling> {
        self.databases.get_autoscaling(instance_id, group_id).await
    }
}

/// Run every credential check on the resource's users. Needs no API access.
pub fn validate_users(resource: &DatabaseResourceConfig) -> Vec<Diagnostic> {
    let address = resource.address();
    resource
        .users
        .iter()
        .filter_map(|u| u.to_user().validate().err())
        .map(|e| Diagnostic::new(&address, DiagnosticKind::User, e))
        .collect()
}

/// Every check that needs no API access: users, admin password and allowlist entries.
pub fn validate_offline(resource: &DatabaseResourceConfig) -> Vec<Diagnostic> {
    let address = resource.address();
    let mut diagnostics = validate_users(resource);

    if let Some(password) = &resource.admin_password {
        if !ADMIN_PASSWORD_LEN.contains(&password.chars().count()) {
            diagnostics.push(Diagnostic::new(
                &address,
                DiagnosticKind::User,
                format!(
                    "expected length of adminpassword to be in the range ({} - {})",
                    ADMIN_PASSWORD_LEN.start(),
                    ADMIN_PASSWORD_LEN.end()
                ),
            ));
        }
    }

    for entry in resource.allowlist.iter().flatten() {
        diagnostics.extend(
            entry
                .violations()
                .into_iter()
                .map(|v| Diagnostic::new(&address, DiagnosticKind::Config, v)),
        );
    }

    diagnostics
}

/// Compare desired group blocks with live groups and validate every changed dimension.
pub fn plan_groups(
    address: &str,
    desired: &[GroupConfig],
    live: &[Group],
) -> (Vec<PlannedChange>, Vec<Diagnostic>) {
    let mut changes = Vec::new();
    let mut diagnostics = Vec::new();
    let mut seen = HashSet::new();

    for wanted in desired {
        if !seen.insert(wanted.group_id.as_str()) {
            diagnostics.push(Diagnostic::new(
                address,
                DiagnosticKind::Config,
                format!("group {} is configured more than once", wanted.group_id),
            ));
            continue;
        }
        let Some(current) = live.iter().find(|g| g.id == wanted.group_id) else {
            diagnostics.push(Diagnostic::new(
                address,
                DiagnosticKind::Scaling,
                format!("{} is not a valid group for this deployment", wanted.group_id),
            ));
            continue;
        };

        let normalized = current.per_member();
        // Replaced by the requested member count once that change validates.
        let mut node_count = current.member_count();
        let mut dimension_changes = Vec::new();

        for kind in GroupResourceKind::ALL {
            let Some(requested) = wanted.requested(kind) else {
                continue;
            };
            let Some(resource) = normalized.resource(kind) else {
                diagnostics.push(Diagnostic::new(
                    address,
                    DiagnosticKind::Scaling,
                    format!("{} group does not support {} scaling", wanted.group_id, kind),
                ));
                continue;
            };
            if requested == resource.allocation {
                continue;
            }

            match validate_group_scaling(&wanted.group_id, kind.name(), requested, resource, node_count) {
                Ok(()) => {
                    if kind == GroupResourceKind::Members {
                        node_count = requested;
                    }
                    dimension_changes.push(DimensionChange {
                        kind,
                        from: resource.allocation,
                        to: requested,
                    });
                }
                Err(e) => diagnostics.push(Diagnostic::new(address, DiagnosticKind::Scaling, e)),
            }
        }

        let flavor_change = wanted
            .host_flavor
            .as_ref()
            .filter(|f| current.host_flavor.as_ref().map(|h| &h.id) != Some(*f))
            .cloned();

        if dimension_changes.is_empty() && flavor_change.is_none() {
            continue;
        }

        let mut overflowed = false;
        let mut total = |kind: GroupResourceKind| {
            let change = dimension_changes.iter().find(|c| c.kind == kind)?;
            let value = change.to.checked_mul(node_count);
            if value.is_none() {
                overflowed = true;
                diagnostics.push(Diagnostic::new(
                    address,
                    DiagnosticKind::Scaling,
                    format!(
                        "{} group {} total for {} members is out of range",
                        wanted.group_id, kind, node_count
                    ),
                ));
            }
            value
        };
        let memory_mb = total(GroupResourceKind::Memory);
        let disk_mb = total(GroupResourceKind::Disk);
        let cpu_count = total(GroupResourceKind::Cpu);
        if overflowed {
            continue;
        }
        let scaling = GroupScaling {
            members: dimension_changes
                .iter()
                .find(|c| c.kind == GroupResourceKind::Members)
                .map(|c| c.to),
            memory_mb,
            disk_mb,
            cpu_count,
            host_flavor: flavor_change,
        };
        changes.push(PlannedChange::ScaleGroup {
            group_id: wanted.group_id.clone(),
            scaling,
            changes: dimension_changes,
        });
    }

    (changes, diagnostics)
}

/// Tags to attach and detach, in desired and attached order respectively.
pub fn diff_tags(desired: &[String], attached: &[String]) -> (Vec<String>, Vec<String>) {
    let attached_set: HashSet<&str> = attached.iter().map(String::as_str).collect();
    let desired_set: HashSet<&str> = desired.iter().map(String::as_str).collect();

    let mut seen = HashSet::new();
    let attach = desired
        .iter()
        .filter(|t| !attached_set.contains(t.as_str()) && seen.insert(t.as_str()))
        .cloned()
        .collect();
    let detach = attached
        .iter()
        .filter(|t| !desired_set.contains(t.as_str()))
        .cloned()
        .collect();
    (attach, detach)
}

/// Allowlist entries to remove and to add. Entries are matched on address and description.
pub fn diff_allowlist(
    desired: &[AllowlistEntry],
    live: &[AllowlistEntry],
) -> (Vec<AllowlistEntry>, Vec<AllowlistEntry>) {
    let live_set: HashSet<&AllowlistEntry> = live.iter().collect();
    let desired_set: HashSet<&AllowlistEntry> = desired.iter().collect();

    let remove = live
        .iter()
        .filter(|e| !desired_set.contains(e))
        .cloned()
        .collect();
    let mut seen = HashSet::new();
    let add = desired
        .iter()
        .filter(|e| !live_set.contains(e) && seen.insert(*e))
        .cloned()
        .collect();
    (remove, add)
}

/// User changes against the recorded fingerprints, plus the record to save after apply.
///
/// Users whose fingerprint is unchanged are skipped. Recorded users absent from
/// the configuration are deleted, unless some user block could not be read.
pub fn plan_users(
    resource: &DatabaseResourceConfig,
    recorded: Option<&ResourceState>,
) -> (Vec<PlannedChange>, Vec<UserRecord>) {
    let mut changes = Vec::new();
    let mut records = Vec::new();

    for config in &resource.users {
        let user = config.to_user();
        let record = UserRecord::from_user(&user);
        let unchanged = recorded
            .and_then(|r| r.user(&record.user_type, &record.name))
            .is_some_and(|r| r.fingerprint == record.fingerprint);
        if !unchanged {
            changes.push(PlannedChange::UpsertUser(user));
        }
        records.push(record);
    }

    let Some(recorded) = recorded else {
        return (changes, records);
    };
    if resource.has_unknown_users() {
        // Keep records for users that may still be configured.
        for old in &recorded.users {
            if !records.iter().any(|r| r.user_type == old.user_type && r.name == old.name) {
                records.push(old.clone());
            }
        }
        return (changes, records);
    }
    for old in &recorded.users {
        let configured = resource
            .users
            .iter()
            .any(|u| u.user_type == old.user_type && u.name == old.name);
        if !configured {
            changes.push(PlannedChange::DeleteUser {
                user_type: UserType::from(old.user_type.as_str()),
                username: old.name.clone(),
            });
        }
    }
    (changes, records)
}

/// Build the plan for one resource against its live deployment.
///
/// Rejected changes become diagnostics. Errors reading the deployment,
/// including a failed capability fetch, abort planning instead.
///
/// `recorded` holds the credentials saved by the last apply. It is ignored
/// when it was recorded for a different deployment.
pub async fn plan_resource<R: DeploymentReader>(
    reader: &R,
    resource: &DatabaseResourceConfig,
    instance_id: &str,
    default_location: &str,
    recorded: Option<&ResourceState>,
) -> Result<ResourcePlan> {
    let address = resource.address();
    let mut plan = ResourcePlan::new(&address, Some(instance_id));
    let recorded = recorded.filter(|r| r.instance_id == instance_id);

    for attr in &resource.unknown_attributes {
        debug!(resource = %address, attribute = %attr, "Value not known until apply, skipping");
    }

    plan.diagnostics.extend(validate_offline(resource));

    let deployment = reader.deployment(instance_id).await?;
    info!(resource = %address, version = %deployment.version, "Read deployment");

    if let Some(version) = resource.version.as_deref() {
        if version != deployment.version {
            let location = resource
                .location
                .as_deref()
                .or_else(|| deployment.location())
                .unwrap_or(default_location);
            let validator = UpgradeValidator::new(reader);
            match validator
                .validate_upgrade_version(
                    instance_id,
                    location,
                    &deployment.version,
                    version,
                    resource.version_upgrade_skip_backup,
                )
                .await
            {
                Ok(()) => plan.changes.push(PlannedChange::UpgradeVersion {
                    from: deployment.version.clone(),
                    to: version.to_string(),
                    skip_backup: resource.version_upgrade_skip_backup,
                }),
                Err(UpgradeError::Fetch(e)) => return Err(e),
                Err(e) => plan
                    .diagnostics
                    .push(Diagnostic::new(&address, DiagnosticKind::Upgrade, e)),
            }
        }
    }

    if !resource.groups.is_empty() {
        let live = reader.groups(instance_id).await?;
        let (changes, diagnostics) = plan_groups(&address, &resource.groups, &live);
        plan.changes.extend(changes);
        plan.diagnostics.extend(diagnostics);
    }

    if let Some(wanted) = &resource.auto_scaling {
        let live = reader.autoscaling(instance_id, AUTOSCALING_GROUP).await?;
        let autoscaling = wanted.changes_from(&live);
        if !autoscaling.is_empty() {
            plan.changes.push(PlannedChange::SetAutoScaling {
                group_id: AUTOSCALING_GROUP.to_string(),
                autoscaling,
            });
        }
    }

    let mut next_state = ResourceState {
        instance_id: instance_id.to_string(),
        ..Default::default()
    };

    if let Some(password) = &resource.admin_password {
        let username = deployment.admin_username();
        let print = fingerprint(&[username, password.as_str()]);
        let applied = recorded.and_then(|r| r.admin_password.as_deref());
        if applied != Some(print.as_str()) {
            plan.changes.push(PlannedChange::UpdateAdminPassword {
                username: username.to_string(),
                password: password.clone(),
            });
        }
        next_state.admin_password = Some(print);
    }

    let (user_changes, records) = plan_users(resource, recorded);
    plan.changes.extend(user_changes);
    next_state.users = records;
    plan.next_state = Some(next_state);

    let allowlist_unknown = resource
        .unknown_attributes
        .iter()
        .any(|a| a.starts_with("allowlist.") || a.starts_with("whitelist."));
    if let Some(entries) = &resource.allowlist {
        let live = reader.allowlist(instance_id).await?;
        let (remove, add) = diff_allowlist(entries, &live);
        if !allowlist_unknown {
            plan.changes
                .extend(remove.into_iter().map(PlannedChange::RemoveAllowlistEntry));
        }
        plan.changes
            .extend(add.into_iter().map(PlannedChange::AddAllowlistEntry));
    }

    if let Some(tags) = &resource.tags {
        let attached = reader.attached_tags(instance_id).await?;
        let (attach, detach) = diff_tags(tags, &attached);
        if !detach.is_empty() {
            plan.changes.push(PlannedChange::DetachTags(detach));
        }
        if !attach.is_empty() {
            plan.changes.push(PlannedChange::AttachTags(attach));
        }
    }

    plan.changes.sort_by_key(PlannedChange::order);
    Ok(plan)
}
