use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

pub const SPECIAL_CHARACTERS: &str = "~!@#$%^&*()=+[]{}|;:,.<>/?_-";

pub const RBAC_CATEGORIES: [&str; 4] = ["all", "admin", "read", "write"];

pub const OPS_MANAGER_ROLES: [&str; 2] = ["group_read_only", "group_data_access_admin"];

static RBAC_GRAMMAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([+-]@[A-Za-z0-9_]+\s?)+$").expect("static pattern"));

static RBAC_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[+-]@([A-Za-z0-9_]+)").expect("static pattern"));

/// The kind of credential a deployment user holds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum UserType {
    #[default]
    Database,
    OpsManager,
    Other(String),
}

impl UserType {
    pub fn as_str(&self) -> &str {
        match self {
            UserType::Database => "database",
            UserType::OpsManager => "ops_manager",
            UserType::Other(name) => name,
        }
    }
}

impl From<&str> for UserType {
    fn from(value: &str) -> Self {
        match value {
            "database" => UserType::Database,
            "ops_manager" => UserType::OpsManager,
            other => UserType::Other(other.to_string()),
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// All rule violations found for one user, reported together.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("database user ({username}) validation error:\n{}", .violations.join("\n"))]
pub struct UserValidationError {
    pub username: String,
    pub violations: Vec<String>,
}

/// A credential for a deployment, built from desired state right before use.
///
/// `role` distinguishes "not specified" (`None`) from "explicitly cleared" (`Some("")`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DatabaseUser {
    pub username: String,
    pub password: String,
    pub user_type: UserType,
    pub role: Option<String>,
}

fn is_special(c: char) -> bool {
    SPECIAL_CHARACTERS.contains(c)
}

impl DatabaseUser {
    pub fn new(username: &str, password: &str, user_type: UserType) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
            user_type,
            role: None,
        }
    }

    pub fn with_role(mut self, role: &str) -> Self {
        self.role = Some(role.to_string());
        self
    }

    fn result(&self, violations: Vec<String>) -> Result<(), UserValidationError> {
        if violations.is_empty() {
            return Ok(());
        }
        Err(UserValidationError {
            username: self.username.clone(),
            violations,
        })
    }

    /// Non-empty role, if any.
    fn role(&self) -> Option<&str> {
        self.role.as_deref().filter(|r| !r.is_empty())
    }

    pub fn validate_password(&self) -> Result<(), UserValidationError> {
        let password = &self.password;
        let mut violations = Vec::new();

        if self.user_type == UserType::OpsManager && !password.chars().any(is_special) {
            violations.push(format!(
                "password must contain at least one special character ({})",
                SPECIAL_CHARACTERS
            ));
        }

        if self.user_type == UserType::Database && password.chars().next().is_some_and(is_special) {
            violations.push(format!(
                "password must not begin with a special character ({})",
                SPECIAL_CHARACTERS
            ));
        }

        let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
        if !(has_lower || has_upper) {
            violations.push("password must contain at least one letter".to_string());
        }

        if !password.chars().any(|c| c.is_ascii_digit()) {
            violations.push("password must contain at least one number".to_string());
        }

        if !password
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || is_special(c))
        {
            violations.push("password must not contain invalid characters".to_string());
        }

        self.result(violations)
    }

    /// Redis ACL categories, e.g. `-@all +@read`.
    pub fn validate_rbac_role(&self) -> Result<(), UserValidationError> {
        let Some(role) = self.role() else {
            return Ok(());
        };

        if self.user_type != UserType::Database {
            return self.result(vec!["role is only allowed for the database user".to_string()]);
        }

        if !RBAC_GRAMMAR.is_match(role) {
            return self.result(vec![
                "role must be in the format +@category or -@category".to_string()
            ]);
        }

        let unknown_category = RBAC_TOKEN
            .captures_iter(role)
            .any(|cap| !RBAC_CATEGORIES.contains(&&cap[1]));
        if unknown_category {
            return self.result(vec![format!(
                "role must contain only allowed categories: {}",
                RBAC_CATEGORIES.join(", ")
            )]);
        }

        Ok(())
    }

    pub fn validate_ops_manager_role(&self) -> Result<(), UserValidationError> {
        if self.user_type != UserType::OpsManager {
            return Ok(());
        }
        let Some(role) = self.role() else {
            return Ok(());
        };

        if OPS_MANAGER_ROLES.contains(&role) {
            return Ok(());
        }
        self.result(vec![format!(
            "role must be one of: {}",
            OPS_MANAGER_ROLES.join(", ")
        )])
    }

    /// Run every credential check and merge the violations into one error.
    pub fn validate(&self) -> Result<(), UserValidationError> {
        let violations: Vec<String> = [
            self.validate_password(),
            self.validate_rbac_role(),
            self.validate_ops_manager_role(),
        ]
        .into_iter()
        .filter_map(Result::err)
        .flat_map(|e| e.violations)
        .collect();

        self.result(violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_type_round_trips_known_names() {
        assert_eq!(UserType::from("database"), UserType::Database);
        assert_eq!(UserType::from("ops_manager"), UserType::OpsManager);
        assert_eq!(
            UserType::from("read_only_replica"),
            UserType::Other("read_only_replica".to_string())
        );
        assert_eq!(UserType::OpsManager.to_string(), "ops_manager");
    }

    #[test]
    fn empty_role_is_treated_as_unset() {
        let user = DatabaseUser::new("ops", "Password1$", UserType::OpsManager).with_role("");
        assert!(user.validate_ops_manager_role().is_ok());
        assert!(user.validate_rbac_role().is_ok());
    }

    #[test]
    fn validate_merges_password_and_role_violations() {
        let user = DatabaseUser::new("redis", "password", UserType::Database).with_role("+@nope");
        let err = user.validate().unwrap_err();
        assert_eq!(
            err.violations,
            vec![
                "password must contain at least one number".to_string(),
                "role must contain only allowed categories: all, admin, read, write".to_string(),
            ]
        );
    }
}
