//! Cleanup stage
//!
//! Tears down whatever a previous run left behind: container, deployment
//! directory, proxy site. Every step tolerates absence, so running cleanup
//! twice (or against a host that was never deployed to) is not a failure.

use async_trait::async_trait;
use tracing::info;

use crate::errors::DeployError;
use crate::pipeline::{DeployContext, Stage, StageId, StageReport};
use crate::remote::{PlannedStep, RemoteCommand};
use crate::stages::proxy::{enabled_path, site_path};

/// The teardown steps, all tolerated
pub fn teardown_plan(app: &str, remote_dir: &str) -> Vec<PlannedStep> {
    vec![
        PlannedStep::tolerated(
            "container removal",
            RemoteCommand::new("docker").args(["rm", "-f", app]).privileged(),
        ),
        PlannedStep::tolerated(
            "deployment directory removal",
            RemoteCommand::new("rm").args(["-rf", remote_dir]).privileged(),
        ),
        PlannedStep::tolerated(
            "proxy site removal",
            RemoteCommand::new("rm").arg("-f").arg(site_path(app)).privileged(),
        ),
        PlannedStep::tolerated(
            "proxy link removal",
            RemoteCommand::new("rm").arg("-f").arg(enabled_path(app)).privileged(),
        ),
        PlannedStep::tolerated(
            "proxy reload",
            RemoteCommand::new("systemctl").args(["reload", "nginx"]).privileged(),
        ),
    ]
}

pub struct CleanupStage;

#[async_trait]
impl Stage for CleanupStage {
    fn id(&self) -> StageId {
        StageId::Cleanup
    }

    async fn run(&self, ctx: &mut DeployContext) -> Result<StageReport, DeployError> {
        let app = ctx.config.app_name();
        info!("Tearing down {} on {}", app, ctx.session.login());

        let mut report = StageReport::new(self.id());
        let plan = teardown_plan(&app, &ctx.config.remote_dir());
        ctx.session.run_plan(&plan, &mut report.warnings).await?;
        Ok(report.with_detail(format!("removed {}", app)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_teardown_step_tolerates_absence() {
        let plan = teardown_plan("widget-api", "/opt/widget-api");
        assert!(plan.iter().all(|s| s.tolerated));
        assert_eq!(plan.len(), 5);
    }

    #[test]
    fn teardown_removes_container_tree_and_proxy_files() {
        let plan = teardown_plan("widget-api", "/opt/widget-api");
        let lines: Vec<_> = plan
            .iter()
            .map(|s| s.command.shell_line(false))
            .collect();
        assert!(lines.contains(&"docker rm -f widget-api".to_string()));
        assert!(lines.contains(&"rm -rf /opt/widget-api".to_string()));
        assert!(lines.contains(&"rm -f /etc/nginx/sites-available/widget-api.conf".to_string()));
        assert!(lines.contains(&"rm -f /etc/nginx/sites-enabled/widget-api.conf".to_string()));
    }

    #[test]
    fn proxy_reload_is_last() {
        let plan = teardown_plan("widget-api", "/opt/widget-api");
        assert_eq!(plan.last().unwrap().label, "proxy reload");
    }
}
