use std::path::Path;

use anyhow::{bail, Context, Result};

use super::types::Settings;

const DEFAULT_SETTINGS_FILE: &str = "icd.yaml";

/// Parse settings from YAML text. Missing keys take their defaults.
pub fn parse_settings(content: &str) -> Result<Settings> {
    if content.trim().is_empty() {
        return Ok(Settings::default());
    }
    serde_yaml::from_str(content).context("Failed to parse settings YAML")
}

/// Load settings from an explicit file, or from `icd.yaml` in the working
/// directory when present, then apply environment overrides.
pub fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let mut settings = match path {
        Some(p) => {
            if !p.is_file() {
                bail!("Settings file not found: {}", p.display());
            }
            read_settings_file(p)?
        }
        None => {
            let default = Path::new(DEFAULT_SETTINGS_FILE);
            if default.is_file() {
                read_settings_file(default)?
            } else {
                tracing::debug!("No {} found, using default settings", DEFAULT_SETTINGS_FILE);
                Settings::default()
            }
        }
    };

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn read_settings_file(path: &Path) -> Result<Settings> {
    tracing::info!("Loading settings from {}", path.display());
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
    parse_settings(&content).with_context(|| format!("Invalid settings in {}", path.display()))
}

/// Apply environment overrides. Variables take precedence over the file.
pub fn apply_env_overrides<F>(settings: &mut Settings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let first = |keys: &[&str]| keys.iter().find_map(|k| lookup(k).filter(|v| !v.is_empty()));

    if let Some(region) = first(&["IC_REGION", "IBMCLOUD_REGION"]) {
        settings.region = region;
    }
    if let Some(url) = first(&["IBMCLOUD_DATABASES_API_ENDPOINT"]) {
        settings.endpoints.databases = Some(url);
    }
    if let Some(url) = first(&["IBMCLOUD_GT_API_ENDPOINT"]) {
        settings.endpoints.tagging = url;
    }
    if let Some(url) = first(&["IBMCLOUD_IAM_API_ENDPOINT"]) {
        settings.endpoints.iam = url;
    }
    if let Some(path) = first(&["ICD_STATE_FILE"]) {
        settings.state_file = path;
    }
}

/// Resolve credentials: a ready bearer token wins over an API key.
pub fn resolve_credentials<F>(settings: &Settings, lookup: F) -> Result<crate::client::Credentials>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(token) = lookup("IC_IAM_TOKEN").filter(|v| !v.is_empty()) {
        return Ok(crate::client::Credentials::BearerToken(token));
    }
    let key = lookup(&settings.api_key_env)
        .or_else(|| lookup("IBMCLOUD_API_KEY"))
        .filter(|v| !v.is_empty());
    match key {
        Some(api_key) => Ok(crate::client::Credentials::ApiKey(api_key)),
        None => bail!(
            "No IBM Cloud credentials found. Set {} (or IBMCLOUD_API_KEY) or IC_IAM_TOKEN",
            settings.api_key_env
        ),
    }
}
