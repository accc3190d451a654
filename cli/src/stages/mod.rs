//! Pipeline stages

pub mod cleanup;
pub mod preflight;
pub mod provision;
pub mod proxy;
pub mod reachability;
pub mod source;
pub mod transfer;
pub mod validate;

use crate::config::DeployConfig;
use crate::pipeline::Stage;

/// Stage list for a deployment run.
///
/// The proxy stage is present exactly when the proxy flag matched the
/// affirmative pattern at collection time.
pub fn deploy_pipeline(config: &DeployConfig) -> Vec<Box<dyn Stage>> {
    let mut stages: Vec<Box<dyn Stage>> = vec![
        Box::new(source::SourceStage),
        Box::new(preflight::PreflightStage),
        Box::new(reachability::ReachabilityStage),
        Box::new(provision::ProvisionStage),
        Box::new(transfer::TransferStage),
    ];
    if config.proxy_enabled {
        stages.push(Box::new(proxy::ProxyStage));
    }
    stages.push(Box::new(validate::ValidateStage));
    stages
}

/// Stage list for a `--cleanup` run
pub fn cleanup_pipeline() -> Vec<Box<dyn Stage>> {
    vec![
        Box::new(reachability::ReachabilityStage),
        Box::new(cleanup::CleanupStage),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DeployConfig, Profile};
    use crate::pipeline::StageId;

    fn config_with_proxy(answer: &str) -> DeployConfig {
        let profile: Profile = serde_json::from_str(&format!(
            r#"{{
                "repo_url": "https://github.com/acme/widget-api.git",
                "ssh_host": "203.0.113.7",
                "key_path": "/tmp/key",
                "app_port": 3000,
                "proxy": "{}"
            }}"#,
            answer
        ))
        .unwrap();
        DeployConfig::from_profile(profile).unwrap()
    }

    #[test]
    fn proxy_stage_is_planned_iff_flag_is_affirmative() {
        for answer in ["y", "Y", "yes", "YES"] {
            let plan: Vec<StageId> = deploy_pipeline(&config_with_proxy(answer))
                .iter()
                .map(|s| s.id())
                .collect();
            assert!(plan.contains(&StageId::Proxy), "{answer:?}");
        }
        for answer in ["n", "no", "nope", ""] {
            let plan: Vec<StageId> = deploy_pipeline(&config_with_proxy(answer))
                .iter()
                .map(|s| s.id())
                .collect();
            assert!(!plan.contains(&StageId::Proxy), "{answer:?}");
        }
    }

    #[test]
    fn deploy_plan_is_ordered() {
        let plan: Vec<StageId> = deploy_pipeline(&config_with_proxy("yes"))
            .iter()
            .map(|s| s.id())
            .collect();
        assert_eq!(
            plan,
            vec![
                StageId::Source,
                StageId::Preflight,
                StageId::Reachability,
                StageId::Provision,
                StageId::Transfer,
                StageId::Proxy,
                StageId::Validate,
            ]
        );
    }

    #[test]
    fn cleanup_plan_checks_reachability_first() {
        let plan: Vec<StageId> = cleanup_pipeline().iter().map(|s| s.id()).collect();
        assert_eq!(plan, vec![StageId::Reachability, StageId::Cleanup]);
    }
}
