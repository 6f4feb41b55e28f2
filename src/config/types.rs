use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::capability::{AllowlistEntry, AutoScaling, GroupResourceKind};
use crate::validation::{DatabaseUser, UserType};

// ─── Provider Settings ──────────────────────────────────────────────────────

/// Provider-level settings, read from `icd.yaml` and overlaid with environment variables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub region: String,
    /// Name of the environment variable holding the IAM API key.
    pub api_key_env: String,
    pub endpoints: Endpoints,
    pub retry: RetrySettings,
    pub timeouts: TimeoutSettings,
    /// Resource address (e.g. `ibm_database.postgres`) to deployment CRN.
    pub instances: HashMap<String, String>,
    /// Local file recording user and admin password fingerprints after apply.
    pub state_file: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            region: "us-south".to_string(),
            api_key_env: "IC_API_KEY".to_string(),
            endpoints: Endpoints::default(),
            retry: RetrySettings::default(),
            timeouts: TimeoutSettings::default(),
            instances: HashMap::new(),
            state_file: "icd-state.json".to_string(),
        }
    }
}

impl Settings {
    /// The Cloud Databases endpoint, derived from the region unless configured.
    pub fn databases_endpoint(&self) -> String {
        match &self.endpoints.databases {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://api.{}.databases.cloud.ibm.com", self.region),
        }
    }

    pub fn instance_id(&self, address: &str) -> Option<&str> {
        self.instances.get(address).map(|s| s.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub databases: Option<String>,
    pub tagging: String,
    pub iam: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            databases: None,
            tagging: "https://tags.global-search-tagging.cloud.ibm.com".to_string(),
            iam: "https://iam.cloud.ibm.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub base_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimeoutSettings {
    pub task_poll_interval_secs: u64,
    pub update_timeout_secs: u64,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            task_poll_interval_secs: 10,
            update_timeout_secs: 7200,
        }
    }
}

impl TimeoutSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.task_poll_interval_secs)
    }

    pub fn update_timeout(&self) -> Duration {
        Duration::from_secs(self.update_timeout_secs)
    }
}

// ─── Desired State (parsed from .tf files) ──────────────────────────────────

/// Desired state of one `ibm_database` resource.
#[derive(Debug, Clone, Default)]
pub struct DatabaseResourceConfig {
    pub name: String,
    pub service: Option<String>,
    pub plan: Option<String>,
    pub location: Option<String>,
    pub version: Option<String>,
    pub version_upgrade_skip_backup: bool,
    pub admin_password: Option<String>,
    pub users: Vec<UserConfig>,
    pub groups: Vec<GroupConfig>,
    /// `None` when the configuration does not manage the allowlist.
    pub allowlist: Option<Vec<AllowlistEntry>>,
    /// Auto-scaling for the `member` group.
    pub auto_scaling: Option<AutoScaling>,
    /// `None` when the configuration does not manage tags at all.
    pub tags: Option<Vec<String>>,
    /// Attributes whose value is not a literal and cannot be known before apply.
    pub unknown_attributes: Vec<String>,
    pub source_file: String,
}

impl DatabaseResourceConfig {
    pub const RESOURCE_TYPE: &'static str = "ibm_database";

    pub fn address(&self) -> String {
        format!("{}.{}", Self::RESOURCE_TYPE, self.name)
    }

    /// True when some `users` block could not be read, so the full user set is unknown.
    pub fn has_unknown_users(&self) -> bool {
        self.unknown_attributes.iter().any(|a| a.starts_with("users."))
    }
}

/// A `users {}` block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserConfig {
    pub name: String,
    pub password: String,
    pub user_type: String,
    pub role: Option<String>,
}

impl UserConfig {
    pub fn to_user(&self) -> DatabaseUser {
        DatabaseUser {
            username: self.name.clone(),
            password: self.password.clone(),
            user_type: UserType::from(self.user_type.as_str()),
            role: self.role.clone(),
        }
    }
}

/// A `group {}` block. Memory, disk and cpu are per-member values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupConfig {
    pub group_id: String,
    pub members: Option<i64>,
    pub memory_mb: Option<i64>,
    pub disk_mb: Option<i64>,
    pub cpu_count: Option<i64>,
    pub host_flavor: Option<String>,
}

impl GroupConfig {
    pub fn requested(&self, kind: GroupResourceKind) -> Option<i64> {
        match kind {
            GroupResourceKind::Members => self.members,
            GroupResourceKind::Memory => self.memory_mb,
            GroupResourceKind::Disk => self.disk_mb,
            GroupResourceKind::Cpu => self.cpu_count,
        }
    }
}
