use std::fmt;

use crate::capability::{AllowlistEntry, AutoScaling, GroupResourceKind};
use crate::client::GroupScaling;
use crate::state::ResourceState;
use crate::validation::{DatabaseUser, UserType};

/// A per-member change to one group dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionChange {
    pub kind: GroupResourceKind,
    pub from: i64,
    pub to: i64,
}

/// One API operation the apply step will perform.
#[derive(Debug, Clone, PartialEq)]
pub enum PlannedChange {
    UpgradeVersion {
        from: String,
        to: String,
        skip_backup: bool,
    },
    ScaleGroup {
        group_id: String,
        scaling: GroupScaling,
        changes: Vec<DimensionChange>,
    },
    /// Only the dimensions that differ from the live settings.
    SetAutoScaling {
        group_id: String,
        autoscaling: AutoScaling,
    },
    UpdateAdminPassword {
        username: String,
        password: String,
    },
    UpsertUser(DatabaseUser),
    DeleteUser {
        user_type: UserType,
        username: String,
    },
    RemoveAllowlistEntry(AllowlistEntry),
    AddAllowlistEntry(AllowlistEntry),
    AttachTags(Vec<String>),
    DetachTags(Vec<String>),
}

impl PlannedChange {
    /// Apply order: upgrade, scaling, credentials, allowlist, tags.
    /// Removals run before additions within each kind.
    pub fn order(&self) -> u8 {
        match self {
            PlannedChange::UpgradeVersion { .. } => 0,
            PlannedChange::ScaleGroup { .. } => 1,
            PlannedChange::SetAutoScaling { .. } => 2,
            PlannedChange::UpdateAdminPassword { .. } => 3,
            PlannedChange::UpsertUser(_) => 4,
            PlannedChange::DeleteUser { .. } => 5,
            PlannedChange::RemoveAllowlistEntry(_) => 6,
            PlannedChange::AddAllowlistEntry(_) => 7,
            PlannedChange::DetachTags(_) => 8,
            PlannedChange::AttachTags(_) => 9,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    Upgrade,
    Scaling,
    User,
    Config,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DiagnosticKind::Upgrade => "version upgrade",
            DiagnosticKind::Scaling => "group scaling",
            DiagnosticKind::User => "database user",
            DiagnosticKind::Config => "configuration",
        };
        f.write_str(label)
    }
}

/// A rejected change, reported to the user instead of being applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub address: String,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn new(address: &str, kind: DiagnosticKind, message: impl fmt::Display) -> Self {
        Self {
            address: address.to_string(),
            kind,
            message: message.to_string(),
        }
    }
}

/// The plan for one `ibm_database` resource.
#[derive(Debug, Clone, Default)]
pub struct ResourcePlan {
    pub address: String,
    pub instance_id: Option<String>,
    pub changes: Vec<PlannedChange>,
    pub diagnostics: Vec<Diagnostic>,
    /// Credential record to save once every change has been applied.
    pub next_state: Option<ResourceState>,
}

impl ResourcePlan {
    pub fn new(address: &str, instance_id: Option<&str>) -> Self {
        Self {
            address: address.to_string(),
            instance_id: instance_id.map(str::to_string),
            ..Default::default()
        }
    }

    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }
}
