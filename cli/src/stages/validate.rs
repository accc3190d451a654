//! Post-deploy validation stage
//!
//! Checks the container service and the running containers, then probes the
//! application endpoint from the remote side. The probe is diagnostic only:
//! its failure is a warning, not a failed deployment.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::errors::DeployError;
use crate::pipeline::{DeployContext, Stage, StageId, StageReport};
use crate::remote::RemoteCommand;

/// The remote-side HTTP probe for the application port
pub fn probe_command(port: u16) -> RemoteCommand {
    RemoteCommand::new("curl")
        .args(["-fsS", "--max-time", "10"])
        .arg(format!("http://127.0.0.1:{}/", port))
}

/// Container listing scoped to the deployed name
pub fn container_listing(name: &str) -> RemoteCommand {
    RemoteCommand::new("docker")
        .args(["ps", "--filter"])
        .arg(format!("name={}", name))
        .args(["--format", "{{.Names}}\t{{.Status}}"])
        .privileged()
}

pub struct ValidateStage;

#[async_trait]
impl Stage for ValidateStage {
    fn id(&self) -> StageId {
        StageId::Validate
    }

    async fn run(&self, ctx: &mut DeployContext) -> Result<StageReport, DeployError> {
        let mut report = StageReport::new(self.id());

        let service = ctx
            .session
            .capture(&RemoteCommand::new("systemctl").args(["is-active", "docker"]))
            .await
            .map_err(|_| {
                DeployError::ValidationError("docker service is not active".to_string())
            })?;
        info!("Docker service: {}", service);

        let listing = ctx
            .session
            .capture(&container_listing(&ctx.config.container_name()))
            .await
            .map_err(|e| DeployError::ValidationError(e.to_string()))?;
        if listing.is_empty() {
            info!("No container matches {}", ctx.config.container_name());
        } else {
            info!("Running containers:\n{}", listing);
        }

        if ctx
            .session
            .run_tolerated(&probe_command(ctx.config.app_port))
            .await
        {
            info!("HTTP probe on port {} succeeded", ctx.config.app_port);
            Ok(report.with_detail("service responding"))
        } else {
            warn!(
                "HTTP probe on port {} failed; the deployment is still considered successful",
                ctx.config.app_port
            );
            report
                .warnings
                .push(format!("HTTP probe on port {} failed (tolerated)", ctx.config.app_port));
            Ok(report.with_detail("deployed, probe failed"))
        }
    }
}
