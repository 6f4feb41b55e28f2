use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::validation::DatabaseUser;

pub const STATE_VERSION: u32 = 1;

/// Everything recorded across resources, keyed by resource address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateFile {
    pub version: u32,
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceState>,
}

impl Default for StateFile {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            resources: BTreeMap::new(),
        }
    }
}

/// Credentials last applied to one deployment. Secrets are stored only as fingerprints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceState {
    #[serde(default)]
    pub instance_id: String,
    #[serde(default)]
    pub users: Vec<UserRecord>,
    #[serde(default)]
    pub admin_password: Option<String>,
    #[serde(default)]
    pub updated_at: String,
}

impl ResourceState {
    pub fn user(&self, user_type: &str, name: &str) -> Option<&UserRecord> {
        self.users
            .iter()
            .find(|u| u.user_type == user_type && u.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub name: String,
    pub user_type: String,
    pub fingerprint: String,
}

impl UserRecord {
    pub fn from_user(user: &DatabaseUser) -> Self {
        Self {
            name: user.username.clone(),
            user_type: user.user_type.as_str().to_string(),
            fingerprint: user_fingerprint(user),
        }
    }
}

/// Hex SHA-256 of the parts, NUL separated.
pub fn fingerprint(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            hasher.update([0u8]);
        }
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}

fn user_fingerprint(user: &DatabaseUser) -> String {
    fingerprint(&[
        user.user_type.as_str(),
        user.username.as_str(),
        user.password.as_str(),
        user.role.as_deref().unwrap_or(""),
    ])
}
