use std::collections::HashMap;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use super::http::ApiTransport;
use crate::capability::{AllowlistEntry, AutoScaling, Group, Version};
use crate::validation::{DatabaseUser, UserType, VersionSource};

const VERSIONS_CAPABILITY: &str = "versions";
const DEFAULT_ADMIN_USERNAME: &str = "admin";

/// A deployment as returned by `GET /deployments/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Deployment {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub deployment_type: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub platform_options: Option<Value>,
    #[serde(default)]
    pub admin_usernames: HashMap<String, String>,
}

impl Deployment {
    /// The region, read from the deployment CRN (`crn:v1:<cloud>:<type>:<service>:<location>:...`).
    pub fn location(&self) -> Option<&str> {
        self.id.split(':').nth(5).filter(|s| !s.is_empty())
    }

    /// The built-in administrator's name for the database user type.
    pub fn admin_username(&self) -> &str {
        self.admin_usernames
            .get("database")
            .map(String::as_str)
            .unwrap_or(DEFAULT_ADMIN_USERNAME)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Queued,
    Running,
    Completed,
    Failed,
    #[serde(other)]
    Unknown,
}

/// An asynchronous control-plane operation.
#[derive(Debug, Clone, Deserialize)]
pub struct Task {
    pub id: String,
    #[serde(default)]
    pub description: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub deployment_id: Option<String>,
    #[serde(default)]
    pub progress_percent: Option<i64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Requested group totals. Omitted dimensions are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupScaling {
    pub members: Option<i64>,
    pub memory_mb: Option<i64>,
    pub disk_mb: Option<i64>,
    pub cpu_count: Option<i64>,
    pub host_flavor: Option<String>,
}

impl GroupScaling {
    fn to_body(&self) -> Value {
        let mut group = Map::new();
        if let Some(n) = self.members {
            group.insert("members".into(), json!({ "allocation_count": n }));
        }
        if let Some(mb) = self.memory_mb {
            group.insert("memory".into(), json!({ "allocation_mb": mb }));
        }
        if let Some(mb) = self.disk_mb {
            group.insert("disk".into(), json!({ "allocation_mb": mb }));
        }
        if let Some(n) = self.cpu_count {
            group.insert("cpu".into(), json!({ "allocation_count": n }));
        }
        if let Some(flavor) = &self.host_flavor {
            group.insert("host_flavor".into(), json!({ "id": flavor }));
        }
        json!({ "group": group })
    }
}

#[derive(Debug, Deserialize)]
struct DeploymentEnvelope {
    deployment: Deployment,
}

#[derive(Debug, Deserialize)]
struct CapabilityEnvelope {
    capability: Option<VersionsCapability>,
}

#[derive(Debug, Deserialize)]
struct VersionsCapability {
    #[serde(default)]
    versions: Vec<Version>,
}

#[derive(Debug, Deserialize)]
struct GroupsEnvelope {
    #[serde(default)]
    groups: Vec<Group>,
}

#[derive(Debug, Deserialize)]
struct AutoScalingEnvelope {
    #[serde(default)]
    autoscaling: AutoScaling,
}

#[derive(Debug, Deserialize)]
struct AllowlistEnvelope {
    #[serde(default)]
    ip_addresses: Vec<AllowlistEntry>,
}

#[derive(Debug, Deserialize)]
struct TaskEnvelope {
    task: Option<Task>,
}

/// Client for the Cloud Databases v5 API.
#[derive(Debug, Clone)]
pub struct CloudDatabasesClient {
    transport: ApiTransport,
    base_url: String,
}

impl CloudDatabasesClient {
    /// `endpoint` is the regional API host, e.g. `https://api.us-south.databases.cloud.ibm.com`.
    pub fn new(transport: ApiTransport, endpoint: &str) -> Self {
        Self {
            transport,
            base_url: format!("{}/v5/ibm", endpoint.trim_end_matches('/')),
        }
    }

    pub async fn get_deployment(&self, id: &str) -> Result<Deployment> {
        let url = ApiTransport::url(&self.base_url, &["deployments", id])?;
        let env: DeploymentEnvelope = self
            .transport
            .send(Method::GET, url, &[], None, "get deployment")
            .await?;
        Ok(env.deployment)
    }

    /// The deployment's current version and its transitions. Only the first
    /// entry of the capability response describes the running version.
    pub async fn get_deployment_version(&self, id: &str, location: &str) -> Result<Option<Version>> {
        let url =
            ApiTransport::url(&self.base_url, &["deployments", id, "capability", VERSIONS_CAPABILITY])?;
        let mut query = Vec::new();
        if !location.is_empty() {
            query.push(("target_location", location.to_string()));
        }
        let env: CapabilityEnvelope = self
            .transport
            .send(Method::GET, url, &query, None, "get deployment capability")
            .await?;

        Ok(env
            .capability
            .and_then(|c| c.versions.into_iter().next()))
    }

    pub async fn list_groups(&self, id: &str) -> Result<Vec<Group>> {
        let url = ApiTransport::url(&self.base_url, &["deployments", id, "groups"])?;
        let env: GroupsEnvelope = self
            .transport
            .send(Method::GET, url, &[], None, "list deployment groups")
            .await?;
        Ok(env.groups)
    }

    pub async fn set_deployment_scaling_group(
        &self,
        id: &str,
        group_id: &str,
        scaling: &GroupScaling,
    ) -> Result<Option<Task>> {
        let url = ApiTransport::url(&self.base_url, &["deployments", id, "groups", group_id])?;
        let body = scaling.to_body();
        let env: TaskEnvelope = self
            .transport
            .send(Method::PATCH, url, &[], Some(&body), "set deployment scaling group")
            .await?;
        Ok(env.task)
    }

    pub async fn upgrade_version(
        &self,
        id: &str,
        version: &str,
        skip_backup: bool,
    ) -> Result<Option<Task>> {
        let url = ApiTransport::url(&self.base_url, &["deployments", id])?;
        let body = json!({ "version": version, "skip_backup": skip_backup });
        let env: TaskEnvelope = self
            .transport
            .send(Method::PATCH, url, &[], Some(&body), "upgrade deployment version")
            .await?;
        Ok(env.task)
    }

    pub async fn create_user(&self, id: &str, user: &DatabaseUser) -> Result<Option<Task>> {
        let url = ApiTransport::url(
            &self.base_url,
            &["deployments", id, "users", user.user_type.as_str()],
        )?;
        let mut fields = Map::new();
        fields.insert("username".into(), json!(user.username));
        fields.insert("password".into(), json!(user.password));
        if let Some(role) = &user.role {
            fields.insert("role".into(), json!(role));
        }
        let body = json!({ "user": fields });
        let env: TaskEnvelope = self
            .transport
            .send(Method::POST, url, &[], Some(&body), "create database user")
            .await?;
        Ok(env.task)
    }

    pub async fn update_user(&self, id: &str, user: &DatabaseUser) -> Result<Option<Task>> {
        let url = ApiTransport::url(
            &self.base_url,
            &["deployments", id, "users", user.user_type.as_str(), user.username.as_str()],
        )?;
        let mut fields = Map::new();
        fields.insert("password".into(), json!(user.password));
        if let Some(role) = &user.role {
            fields.insert("role".into(), json!(role));
        }
        let body = json!({ "user": fields });
        let env: TaskEnvelope = self
            .transport
            .send(Method::PATCH, url, &[], Some(&body), "update database user")
            .await?;
        Ok(env.task)
    }

    pub async fn delete_user(
        &self,
        id: &str,
        user_type: &UserType,
        username: &str,
    ) -> Result<Option<Task>> {
        let url = ApiTransport::url(
            &self.base_url,
            &["deployments", id, "users", user_type.as_str(), username],
        )?;
        let env: TaskEnvelope = self
            .transport
            .send(Method::DELETE, url, &[], None, "delete database user")
            .await?;
        Ok(env.task)
    }

    pub async fn get_autoscaling(&self, id: &str, group_id: &str) -> Result<AutoScaling> {
        let url = self.autoscaling_url(id, group_id)?;
        let env: AutoScalingEnvelope = self
            .transport
            .send(Method::GET, url, &[], None, "get autoscaling")
            .await?;
        Ok(env.autoscaling)
    }

    /// Only the dimensions present in `autoscaling` are sent.
    pub async fn set_autoscaling(
        &self,
        id: &str,
        group_id: &str,
        autoscaling: &AutoScaling,
    ) -> Result<Option<Task>> {
        let url = self.autoscaling_url(id, group_id)?;
        let body = autoscaling.to_body();
        let env: TaskEnvelope = self
            .transport
            .send(Method::PATCH, url, &[], Some(&body), "set autoscaling")
            .await?;
        Ok(env.task)
    }

    fn autoscaling_url(&self, id: &str, group_id: &str) -> Result<reqwest::Url> {
        ApiTransport::url(
            &self.base_url,
            &["deployments", id, "groups", group_id, "autoscaling"],
        )
    }

    pub async fn list_allowlist(&self, id: &str) -> Result<Vec<AllowlistEntry>> {
        let url = ApiTransport::url(&self.base_url, &["deployments", id, "allowlists"])?;
        let env: AllowlistEnvelope = self
            .transport
            .send(Method::GET, url, &[], None, "list allowlist")
            .await?;
        Ok(env.ip_addresses)
    }

    pub async fn add_allowlist_entry(
        &self,
        id: &str,
        entry: &AllowlistEntry,
    ) -> Result<Option<Task>> {
        let url = ApiTransport::url(&self.base_url, &["deployments", id, "allowlists"])?;
        let body = json!({
            "ip_address": { "address": entry.address, "description": entry.description }
        });
        let env: TaskEnvelope = self
            .transport
            .send(Method::POST, url, &[], Some(&body), "add allowlist entry")
            .await?;
        Ok(env.task)
    }

    pub async fn delete_allowlist_entry(&self, id: &str, address: &str) -> Result<Option<Task>> {
        let url = ApiTransport::url(&self.base_url, &["deployments", id, "allowlists", address])?;
        let env: TaskEnvelope = self
            .transport
            .send(Method::DELETE, url, &[], None, "delete allowlist entry")
            .await?;
        Ok(env.task)
    }

    pub async fn get_task(&self, task_id: &str) -> Result<Task> {
        let url = ApiTransport::url(&self.base_url, &["tasks", task_id])?;
        let env: TaskEnvelope = self
            .transport
            .send(Method::GET, url, &[], None, "get task")
            .await?;
        match env.task {
            Some(task) => Ok(task),
            None => bail!("Task {} not found", task_id),
        }
    }

    /// Poll a task until it completes, fails, or `timeout` elapses.
    /// `None` means the API started no work and returns immediately.
    pub async fn wait_for_task(
        &self,
        task: Option<Task>,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Result<Option<Task>> {
        let Some(mut task) = task else {
            return Ok(None);
        };
        let started = tokio::time::Instant::now();

        loop {
            match task.status {
                TaskStatus::Completed => {
                    info!(task = %task.id, "Task completed: {}", task.description);
                    return Ok(Some(task));
                }
                TaskStatus::Failed => {
                    bail!("Task '{}' ({}) failed", task.description, task.id);
                }
                _ => {}
            }

            if started.elapsed() >= timeout {
                bail!(
                    "Timed out after {}s waiting for task '{}' ({})",
                    timeout.as_secs(),
                    task.description,
                    task.id
                );
            }

            debug!(
                task = %task.id,
                progress = task.progress_percent.unwrap_or(0),
                "Waiting for task"
            );
            tokio::time::sleep(poll_interval).await;
            task = self.get_task(&task.id).await?;
        }
    }
}

#[async_trait]
impl VersionSource for CloudDatabasesClient {
    async fn fetch_deployment_version(
        &self,
        instance_id: &str,
        location: &str,
    ) -> Result<Option<Version>> {
        self.get_deployment_version(instance_id, location).await
    }
}
