//! Remote provisioning stage
//!
//! Idempotently install the container runtime and proxy packages and make
//! sure the container service runs. Adding the login user to the docker
//! group is best-effort: the pipeline itself runs docker privileged, so a
//! failure here only affects future unprivileged use.

use async_trait::async_trait;
use tracing::info;

use crate::errors::DeployError;
use crate::pipeline::{DeployContext, Stage, StageId, StageReport};
use crate::remote::{PlannedStep, RemoteCommand};

/// Packages installed on the target host
pub const PACKAGES: [&str; 4] = ["docker.io", "docker-compose", "nginx", "curl"];

/// The provisioning steps, in order
pub fn provisioning_plan(user: &str) -> Vec<PlannedStep> {
    vec![
        PlannedStep::required(
            "package index update",
            RemoteCommand::new("apt-get").args(["update", "-y"]).privileged(),
        ),
        PlannedStep::required(
            "package install",
            RemoteCommand::new("apt-get")
                .args(["install", "-y"])
                .args(PACKAGES)
                .privileged(),
        ),
        PlannedStep::required(
            "container service enable",
            RemoteCommand::new("systemctl")
                .args(["enable", "--now", "docker"])
                .privileged(),
        ),
        PlannedStep::tolerated(
            "docker group membership",
            RemoteCommand::new("usermod")
                .args(["-aG", "docker", user])
                .privileged(),
        ),
    ]
}

pub struct ProvisionStage;

#[async_trait]
impl Stage for ProvisionStage {
    fn id(&self) -> StageId {
        StageId::Provision
    }

    async fn run(&self, ctx: &mut DeployContext) -> Result<StageReport, DeployError> {
        info!("Provisioning {}", ctx.session.login());
        let mut report = StageReport::new(self.id());
        let plan = provisioning_plan(&ctx.config.remote.user);
        ctx.session.run_plan(&plan, &mut report.warnings).await?;
        Ok(report.with_detail("runtime and proxy packages present"))
    }
}
