use std::collections::HashMap;

use icd_provider::client::Credentials;
use icd_provider::config::loader::{apply_env_overrides, load_settings, parse_settings, resolve_credentials};
use tempfile::TempDir;

fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_empty_settings_use_defaults() {
    let settings = parse_settings("").unwrap();
    assert_eq!(settings.region, "us-south");
    assert_eq!(settings.api_key_env, "IC_API_KEY");
    assert_eq!(settings.retry.max_retries, 3);
    assert_eq!(settings.timeouts.task_poll_interval_secs, 10);
    assert_eq!(
        settings.databases_endpoint(),
        "https://api.us-south.databases.cloud.ibm.com"
    );
    assert_eq!(settings.endpoints.iam, "https://iam.cloud.ibm.com");
    assert!(settings.instances.is_empty());
    assert_eq!(settings.state_file, "icd-state.json");
}

#[test]
fn test_parse_settings_file() {
    let yaml = r#"
region: eu-de
endpoints:
  databases: https://api.private.eu-de.databases.cloud.ibm.com/
retry:
  max_retries: 5
timeouts:
  update_timeout_secs: 60
instances:
  ibm_database.redis: "crn:v1:bluemix:public:databases-for-redis:eu-de:a/abc:123::"
"#;
    let settings = parse_settings(yaml).unwrap();
    assert_eq!(settings.region, "eu-de");
    assert_eq!(
        settings.databases_endpoint(),
        "https://api.private.eu-de.databases.cloud.ibm.com"
    );
    assert_eq!(settings.retry.max_retries, 5);
    assert_eq!(settings.retry.base_delay_ms, 500);
    assert_eq!(settings.timeouts.update_timeout().as_secs(), 60);
    assert_eq!(
        settings.instance_id("ibm_database.redis"),
        Some("crn:v1:bluemix:public:databases-for-redis:eu-de:a/abc:123::")
    );
    assert_eq!(settings.instance_id("ibm_database.pg"), None);
}

#[test]
fn test_invalid_settings_are_rejected() {
    assert!(parse_settings("retry: [1, 2").is_err());
}

#[test]
fn test_env_overrides_take_precedence() {
    let mut settings = parse_settings("region: eu-de").unwrap();
    apply_env_overrides(
        &mut settings,
        env(&[
            ("IBMCLOUD_REGION", "jp-tok"),
            ("IBMCLOUD_GT_API_ENDPOINT", "https://tags.test"),
            ("IBMCLOUD_IAM_API_ENDPOINT", ""),
        ]),
    );
    assert_eq!(settings.region, "jp-tok");
    assert_eq!(settings.endpoints.tagging, "https://tags.test");
    assert_eq!(settings.endpoints.iam, "https://iam.cloud.ibm.com");
    assert_eq!(
        settings.databases_endpoint(),
        "https://api.jp-tok.databases.cloud.ibm.com"
    );
}

#[test]
fn test_ic_region_wins_over_ibmcloud_region() {
    let mut settings = parse_settings("").unwrap();
    apply_env_overrides(
        &mut settings,
        env(&[("IC_REGION", "us-east"), ("IBMCLOUD_REGION", "jp-tok")]),
    );
    assert_eq!(settings.region, "us-east");
}

#[test]
fn test_state_file_from_settings_and_env() {
    let mut settings = parse_settings("state_file: state/prod.json").unwrap();
    assert_eq!(settings.state_file, "state/prod.json");

    apply_env_overrides(&mut settings, env(&[("ICD_STATE_FILE", "/tmp/icd.json")]));
    assert_eq!(settings.state_file, "/tmp/icd.json");
}

#[test]
fn test_load_settings_missing_explicit_file() {
    let dir = TempDir::new().unwrap();
    let err = load_settings(Some(&dir.path().join("missing.yaml"))).unwrap_err();
    assert!(err.to_string().contains("Settings file not found"));
}

#[test]
fn test_load_settings_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("icd.yaml");
    std::fs::write(&path, "api_key_env: MY_KEY\n").unwrap();

    let settings = load_settings(Some(&path)).unwrap();
    assert_eq!(settings.api_key_env, "MY_KEY");
}

#[test]
fn test_bearer_token_wins_over_api_key() {
    let settings = parse_settings("").unwrap();
    let creds = resolve_credentials(
        &settings,
        env(&[("IC_IAM_TOKEN", "token"), ("IC_API_KEY", "key")]),
    )
    .unwrap();
    assert!(matches!(creds, Credentials::BearerToken(t) if t == "token"));
}

#[test]
fn test_api_key_from_configured_variable() {
    let settings = parse_settings("api_key_env: MY_KEY").unwrap();
    let creds = resolve_credentials(&settings, env(&[("MY_KEY", "secret")])).unwrap();
    assert!(matches!(creds, Credentials::ApiKey(k) if k == "secret"));

    let creds = resolve_credentials(&settings, env(&[("IBMCLOUD_API_KEY", "fallback")])).unwrap();
    assert!(matches!(creds, Credentials::ApiKey(k) if k == "fallback"));
}

#[test]
fn test_missing_credentials() {
    let settings = parse_settings("").unwrap();
    let err = resolve_credentials(&settings, env(&[])).unwrap_err();
    assert!(err.to_string().contains("No IBM Cloud credentials found"));
}

#[test]
fn test_credentials_debug_is_redacted() {
    let creds = Credentials::ApiKey("super-secret".to_string());
    assert!(!format!("{:?}", creds).contains("super-secret"));
}
