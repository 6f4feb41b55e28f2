use anyhow::{bail, Context, Result};
use tracing::info;

use super::plan::{PlannedChange, ResourcePlan};
use crate::client::{is_not_found, CloudDatabasesClient, GlobalTaggingClient, TagType, Task};
use crate::config::types::TimeoutSettings;
use crate::validation::DatabaseUser;

/// Outcome of applying one resource plan.
#[derive(Debug, Default)]
pub struct ApplySummary {
    pub applied: usize,
}

/// Execute a clean plan in order, waiting for each backend task to finish.
pub async fn apply_plan(
    databases: &CloudDatabasesClient,
    tagging: &GlobalTaggingClient,
    plan: &ResourcePlan,
    timeouts: &TimeoutSettings,
) -> Result<ApplySummary> {
    if !plan.is_clean() {
        bail!(
            "Refusing to apply {}: plan has {} diagnostic(s)",
            plan.address,
            plan.diagnostics.len()
        );
    }
    let Some(instance_id) = plan.instance_id.as_deref() else {
        bail!("No deployment bound to {}", plan.address);
    };

    let wait = |task: Option<Task>| {
        databases.wait_for_task(task, timeouts.poll_interval(), timeouts.update_timeout())
    };
    let mut summary = ApplySummary::default();

    for change in &plan.changes {
        match change {
            PlannedChange::UpgradeVersion { to, skip_backup, .. } => {
                info!(resource = %plan.address, version = %to, "Upgrading version");
                let task = databases.upgrade_version(instance_id, to, *skip_backup).await?;
                wait(task)
                    .await
                    .with_context(|| format!("Version upgrade of {} to {} failed", plan.address, to))?;
            }
            PlannedChange::ScaleGroup { group_id, scaling, .. } => {
                info!(resource = %plan.address, group = %group_id, "Scaling group");
                let task = databases
                    .set_deployment_scaling_group(instance_id, group_id, scaling)
                    .await?;
                wait(task)
                    .await
                    .with_context(|| format!("Scaling {} group {} failed", plan.address, group_id))?;
            }
            PlannedChange::SetAutoScaling { group_id, autoscaling } => {
                info!(resource = %plan.address, group = %group_id, "Updating auto-scaling");
                let task = databases
                    .set_autoscaling(instance_id, group_id, autoscaling)
                    .await?;
                wait(task).await.with_context(|| {
                    format!("Updating auto-scaling of {} failed", plan.address)
                })?;
            }
            PlannedChange::UpdateAdminPassword { username, password } => {
                info!(resource = %plan.address, user = %username, "Updating admin password");
                let admin = DatabaseUser {
                    username: username.clone(),
                    password: password.clone(),
                    ..Default::default()
                };
                let task = databases.update_user(instance_id, &admin).await?;
                wait(task).await.with_context(|| {
                    format!("Updating admin password of {} failed", plan.address)
                })?;
            }
            PlannedChange::UpsertUser(user) => {
                info!(resource = %plan.address, user = %user.username, "Updating user");
                let task = match databases.update_user(instance_id, user).await {
                    Ok(task) => task,
                    Err(e) if is_not_found(&e) => {
                        info!(user = %user.username, "User does not exist, creating");
                        databases.create_user(instance_id, user).await?
                    }
                    Err(e) => return Err(e),
                };
                wait(task)
                    .await
                    .with_context(|| format!("Updating user {} failed", user.username))?;
            }
            PlannedChange::DeleteUser { user_type, username } => {
                info!(resource = %plan.address, user = %username, "Deleting user");
                let task = match databases.delete_user(instance_id, user_type, username).await {
                    Ok(task) => task,
                    Err(e) if is_not_found(&e) => {
                        info!(user = %username, "User already removed");
                        None
                    }
                    Err(e) => return Err(e),
                };
                wait(task)
                    .await
                    .with_context(|| format!("Deleting user {} failed", username))?;
            }
            PlannedChange::RemoveAllowlistEntry(entry) => {
                info!(
                    resource = %plan.address,
                    address = %entry.address,
                    "Removing allowlist entry"
                );
                let removed = databases
                    .delete_allowlist_entry(instance_id, &entry.address)
                    .await;
                let task = match removed {
                    Ok(task) => task,
                    Err(e) if is_not_found(&e) => None,
                    Err(e) => return Err(e),
                };
                wait(task)
                    .await
                    .with_context(|| format!("Removing allowlist entry {} failed", entry.address))?;
            }
            PlannedChange::AddAllowlistEntry(entry) => {
                info!(resource = %plan.address, address = %entry.address, "Adding allowlist entry");
                let task = databases.add_allowlist_entry(instance_id, entry).await?;
                wait(task)
                    .await
                    .with_context(|| format!("Adding allowlist entry {} failed", entry.address))?;
            }
            PlannedChange::DetachTags(tags) => {
                tagging.detach(instance_id, tags, TagType::User).await?;
            }
            PlannedChange::AttachTags(tags) => {
                tagging.attach(instance_id, tags, TagType::User).await?;
            }
        }
        summary.applied += 1;
    }

    Ok(summary)
}
