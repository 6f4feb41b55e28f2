use serde::{Deserialize, Deserializer};

/// How the backend moves a deployment from one version to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum TransitionMethod {
    #[serde(rename = "in_place", alias = "in-place")]
    InPlace,
    #[serde(rename = "restore")]
    Restore,
    #[serde(other)]
    Unknown,
}

/// Whether a transition may bypass the pre-upgrade backup.
///
/// The capability API reports this as an optional boolean. An absent value
/// is kept as `Unknown` and is never treated as permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SkipBackup {
    #[default]
    Unknown,
    Supported,
    NotSupported,
}

impl SkipBackup {
    pub fn is_supported(self) -> bool {
        matches!(self, SkipBackup::Supported)
    }
}

impl From<Option<bool>> for SkipBackup {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(true) => SkipBackup::Supported,
            Some(false) => SkipBackup::NotSupported,
            None => SkipBackup::Unknown,
        }
    }
}

fn deserialize_skip_backup<'de, D>(deserializer: D) -> Result<SkipBackup, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<bool>::deserialize(deserializer).map(SkipBackup::from)
}

/// One legal move away from the deployment's current version.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VersionTransition {
    pub method: TransitionMethod,
    pub to_version: String,
    #[serde(
        default,
        rename = "skip_backup_supported",
        deserialize_with = "deserialize_skip_backup"
    )]
    pub skip_backup: SkipBackup,
}

impl VersionTransition {
    pub fn new(method: TransitionMethod, to_version: &str, skip_backup: SkipBackup) -> Self {
        Self {
            method,
            to_version: to_version.to_string(),
            skip_backup,
        }
    }

    fn is_in_place(&self) -> bool {
        self.method == TransitionMethod::InPlace
    }
}

/// An in-place upgrade target, projected from a version's transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedUpgrade {
    pub to_version: String,
    pub skip_backup: SkipBackup,
}

/// A database engine version as reported by the `versions` capability,
/// together with the transitions available from it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Version {
    pub version: String,
    #[serde(default)]
    pub transitions: Vec<VersionTransition>,
}

impl Version {
    pub fn new(version: &str, transitions: Vec<VersionTransition>) -> Self {
        Self {
            version: version.to_string(),
            transitions,
        }
    }

    /// In-place upgrade targets in the order the backend listed them.
    pub fn allowed_upgrades(&self) -> Vec<AllowedUpgrade> {
        self.transitions
            .iter()
            .filter(|t| t.is_in_place())
            .map(|t| AllowedUpgrade {
                to_version: t.to_version.clone(),
                skip_backup: t.skip_backup,
            })
            .collect()
    }

    pub fn has_upgrade_versions(&self) -> bool {
        self.transitions.iter().any(VersionTransition::is_in_place)
    }

    pub fn allowed_versions(&self) -> Vec<String> {
        self.allowed_upgrades()
            .into_iter()
            .map(|u| u.to_version)
            .collect()
    }

    /// Restore transitions never count, even when their target matches.
    pub fn is_version_upgrade_allowed(&self, target: &str) -> bool {
        self.transitions
            .iter()
            .any(|t| t.is_in_place() && t.to_version == target)
    }

    /// Uses the first in-place transition to `target` when the backend lists duplicates.
    pub fn is_skip_backup_upgrade_allowed(&self, target: &str) -> bool {
        self.transitions
            .iter()
            .find(|t| t.is_in_place() && t.to_version == target)
            .map(|t| t.skip_backup.is_supported())
            .unwrap_or(false)
    }
}
