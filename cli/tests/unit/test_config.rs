//! Configuration collection tests

use std::collections::HashMap;

use dockhand::config::{parse_affirmative, DeployConfig, Profile, DEFAULT_BRANCH};

fn base_json() -> &'static str {
    r#"{
        "repo_url": "https://github.com/acme/widget-api.git",
        "credential": "gh-token-123",
        "ssh_user": "deploy",
        "ssh_host": "203.0.113.7",
        "key_path": "/home/me/.ssh/id_ed25519",
        "app_port": 3000,
        "proxy": "Yes"
    }"#
}

#[test]
fn profile_file_resolves_to_a_full_config() {
    let profile: Profile = serde_json::from_str(base_json()).unwrap();
    let config = DeployConfig::from_profile(profile).unwrap();

    assert_eq!(config.branch, DEFAULT_BRANCH);
    assert_eq!(config.remote.user, "deploy");
    assert!(config.remote.needs_sudo());
    assert_eq!(config.app_port, 3000);
    assert!(config.proxy_enabled);
    assert_eq!(config.remote_dir(), "/opt/widget-api");
}

#[test]
fn arguments_override_the_profile() {
    let mut profile: Profile = serde_json::from_str(base_json()).unwrap();
    let mut args = HashMap::new();
    args.insert("branch".to_string(), "hotfix".to_string());
    args.insert("proxy".to_string(), "no".to_string());
    profile.apply_args(&args).unwrap();

    let config = DeployConfig::from_profile(profile).unwrap();
    assert_eq!(config.branch, "hotfix");
    assert!(!config.proxy_enabled);
}

#[test]
fn the_credential_reaches_the_clone_url_and_nothing_else() {
    let profile: Profile = serde_json::from_str(base_json()).unwrap();
    let config = DeployConfig::from_profile(profile).unwrap();

    let clone_url = config.clone_url().unwrap();
    assert_eq!(
        clone_url,
        "https://gh-token-123@github.com/acme/widget-api.git"
    );
    assert_eq!(config.repo_url, "https://github.com/acme/widget-api.git");
    assert!(!format!("{:?}", config).contains("gh-token-123"));
}

#[test]
fn affirmative_matching_is_case_insensitive() {
    assert!(parse_affirmative("YES"));
    assert!(parse_affirmative("y"));
    assert!(!parse_affirmative("yeah"));
    assert!(!parse_affirmative(""));
}

#[test]
fn blank_optional_answers_fall_back_to_defaults() {
    let profile: Profile = serde_json::from_str(
        r#"{
            "repo_url": "https://github.com/acme/widget-api.git",
            "branch": "  ",
            "ssh_host": "203.0.113.7",
            "key_path": "/tmp/key",
            "app_port": 8080
        }"#,
    )
    .unwrap();
    let config = DeployConfig::from_profile(profile).unwrap();

    assert_eq!(config.branch, DEFAULT_BRANCH);
    assert_eq!(config.remote.user, "root");
    assert!(!config.remote.needs_sudo());
    assert!(!config.proxy_enabled);
}
