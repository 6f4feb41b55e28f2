use async_trait::async_trait;
use thiserror::Error;

use crate::capability::Version;

/// Supplies the version and transition graph the backend reports for a deployment.
#[async_trait]
pub trait VersionSource: Send + Sync {
    /// Returns `Ok(None)` when the backend reports no version entry at all.
    async fn fetch_deployment_version(
        &self,
        instance_id: &str,
        location: &str,
    ) -> anyhow::Result<Option<Version>>;
}

#[derive(Debug, Error)]
pub enum UpgradeError {
    #[error("no available upgrade versions for version {old_version}")]
    NoUpgradeVersions { old_version: String },

    #[error("{new_version} is not a valid upgrade version. Allowed versions: {}", .allowed.join(", "))]
    InvalidVersion {
        new_version: String,
        allowed: Vec<String>,
    },

    #[error("skipping backup is not allowed when upgrading to version {new_version}")]
    SkipBackupNotAllowed { new_version: String },

    /// Eligibility could not be determined. Carries the source error unchanged.
    #[error(transparent)]
    Fetch(anyhow::Error),
}

impl UpgradeError {
    /// True when the deployment was inspected and the request was rejected.
    pub fn is_validation_failure(&self) -> bool {
        !matches!(self, UpgradeError::Fetch(_))
    }
}

/// Check an upgrade request against an already fetched version.
pub fn check_upgrade(
    version: Option<&Version>,
    old_version: &str,
    new_version: &str,
    skip_backup: bool,
) -> Result<(), UpgradeError> {
    let version = match version {
        Some(v) if v.has_upgrade_versions() => v,
        _ => {
            return Err(UpgradeError::NoUpgradeVersions {
                old_version: old_version.to_string(),
            })
        }
    };

    if !version.is_version_upgrade_allowed(new_version) {
        return Err(UpgradeError::InvalidVersion {
            new_version: new_version.to_string(),
            allowed: version.allowed_versions(),
        });
    }

    if skip_backup && !version.is_skip_backup_upgrade_allowed(new_version) {
        return Err(UpgradeError::SkipBackupNotAllowed {
            new_version: new_version.to_string(),
        });
    }

    Ok(())
}

/// Gates version upgrades on the capability data of the live deployment.
pub struct UpgradeValidator<S> {
    source: S,
}

impl<S: VersionSource> UpgradeValidator<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub async fn validate_upgrade_version(
        &self,
        instance_id: &str,
        location: &str,
        old_version: &str,
        new_version: &str,
        skip_backup: bool,
    ) -> Result<(), UpgradeError> {
        let version = self
            .source
            .fetch_deployment_version(instance_id, location)
            .await
            .map_err(UpgradeError::Fetch)?;

        check_upgrade(version.as_ref(), old_version, new_version, skip_backup)
    }
}

#[async_trait]
impl<T: VersionSource + ?Sized> VersionSource for std::sync::Arc<T> {
    async fn fetch_deployment_version(
        &self,
        instance_id: &str,
        location: &str,
    ) -> anyhow::Result<Option<Version>> {
        (**self).fetch_deployment_version(instance_id, location).await
    }
}

#[async_trait]
impl<T: VersionSource + ?Sized> VersionSource for &T {
    async fn fetch_deployment_version(
        &self,
        instance_id: &str,
        location: &str,
    ) -> anyhow::Result<Option<Version>> {
        (**self).fetch_deployment_version(instance_id, location).await
    }
}
