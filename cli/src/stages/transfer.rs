//! Artifact transfer and build stage
//!
//! Packages the working tree, stages it on the remote host, verifies the
//! shipped bytes, replaces the deployment directory and builds/runs per the
//! strategy the preflight stage selected. Container identity is the remote
//! directory's base name.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::archive::pack_tree;
use crate::errors::DeployError;
use crate::pipeline::{DeployContext, Stage, StageId, StageReport};
use crate::remote::{PlannedStep, RemoteCommand, SshSession};
use crate::stages::preflight::BuildStrategy;

/// Remote staging path for the shipped archive
pub fn staging_path(run_id: &str) -> String {
    format!("/tmp/dockhand-{}.tar.gz", run_id)
}

/// Remote path of the compose descriptor
pub fn compose_file(remote_dir: &str, descriptor: &str) -> String {
    format!("{}/{}", remote_dir, descriptor)
}

/// Replace the deployment tree with the staged archive's contents.
///
/// The stale tree is only removed after the checksum verification that runs
/// before this plan, so a corrupt upload never destroys a working deploy.
pub fn extraction_plan(remote_dir: &str, staging: &str) -> Vec<PlannedStep> {
    vec![
        PlannedStep::required(
            "stale tree removal",
            RemoteCommand::new("rm").args(["-rf", remote_dir]).privileged(),
        ),
        PlannedStep::required(
            "deployment directory create",
            RemoteCommand::new("mkdir").args(["-p", remote_dir]).privileged(),
        ),
        PlannedStep::required(
            "archive extract",
            RemoteCommand::new("tar")
                .args(["-xzf", staging, "-C", remote_dir])
                .privileged(),
        ),
        PlannedStep::tolerated(
            "staging file removal",
            RemoteCommand::new("rm").args(["-f", staging]),
        ),
    ]
}

/// Single-container build: stop/remove whatever is there, rebuild, run fresh
pub fn docker_build_plan(name: &str, remote_dir: &str, port: u16) -> Vec<PlannedStep> {
    let publish = format!("{}:{}", port, port);
    vec![
        PlannedStep::tolerated(
            "container stop",
            RemoteCommand::new("docker").args(["stop", name]).privileged(),
        ),
        PlannedStep::tolerated(
            "container remove",
            RemoteCommand::new("docker").args(["rm", name]).privileged(),
        ),
        PlannedStep::required(
            "image build",
            RemoteCommand::new("docker")
                .args(["build", "-t", name, remote_dir])
                .privileged(),
        ),
        PlannedStep::required(
            "container run",
            RemoteCommand::new("docker")
                .args(["run", "-d", "--name", name])
                .args(["--restart", "unless-stopped"])
                .arg("-p")
                .arg(publish)
                .arg(name)
                .privileged(),
        ),
    ]
}

/// Compose invocation, modern plugin or legacy binary
pub fn compose_command(modern: bool, file: &str, action: &[&str]) -> RemoteCommand {
    let cmd = if modern {
        RemoteCommand::new("docker").arg("compose")
    } else {
        RemoteCommand::new("docker-compose")
    };
    cmd.args(["-f", file]).args(action.iter().copied()).privileged()
}

async fn compose_up(
    session: &SshSession,
    file: &str,
    warnings: &mut Vec<String>,
) -> Result<(), DeployError> {
    // Down first; "nothing running" is not an error.
    if !session.run_tolerated(&compose_command(true, file, &["down"])).await
        && !session.run_tolerated(&compose_command(false, file, &["down"])).await
    {
        warnings.push("compose down failed (tolerated)".to_string());
    }

    // Up with rebuild, modern plugin first, legacy binary as fallback.
    if session
        .run_tolerated(&compose_command(true, file, &["up", "-d", "--build"]))
        .await
    {
        return Ok(());
    }
    warn!("docker compose failed, trying legacy docker-compose...");
    session
        .run(&compose_command(false, file, &["up", "-d", "--build"]))
        .await
        .map_err(|_| DeployError::BuildError("compose up failed".to_string()))
}

async fn verify_checksum(
    session: &SshSession,
    staging: &str,
    expected: &str,
) -> Result<(), DeployError> {
    let output = session
        .capture(&RemoteCommand::new("sha256sum").arg(staging))
        .await?;
    let actual = output.split_whitespace().next().unwrap_or_default();
    if actual != expected {
        return Err(DeployError::ArchiveError(format!(
            "archive checksum mismatch after transfer (expected {}, got {})",
            expected, actual
        )));
    }
    Ok(())
}

pub struct TransferStage;

#[async_trait]
impl Stage for TransferStage {
    fn id(&self) -> StageId {
        StageId::Transfer
    }

    async fn run(&self, ctx: &mut DeployContext) -> Result<StageReport, DeployError> {
        let strategy = ctx.strategy.clone().ok_or_else(|| {
            DeployError::PipelineError("transfer before preflight".to_string())
        })?;
        let mut report = StageReport::new(self.id());

        let archive = pack_tree(&ctx.config.checkout_dir())?;
        info!(
            "Packed {} files ({} bytes) for transfer",
            archive.files,
            archive.bytes.len()
        );

        let staging = staging_path(&ctx.run_id);
        ctx.session
            .run_with_stdin(&RemoteCommand::new("tee").arg(&staging), &archive.bytes)
            .await?;
        verify_checksum(&ctx.session, &staging, &archive.sha256).await?;

        let remote_dir = ctx.config.remote_dir();
        ctx.session
            .run_plan(&extraction_plan(&remote_dir, &staging), &mut report.warnings)
            .await?;

        match &strategy {
            BuildStrategy::Compose { descriptor } => {
                info!("Bringing up compose project in {}", remote_dir);
                let file = compose_file(&remote_dir, descriptor);
                compose_up(&ctx.session, &file, &mut report.warnings).await?;
            }
            BuildStrategy::Docker => {
                let name = ctx.config.container_name();
                info!("Building and running container {}", name);
                let plan = docker_build_plan(&name, &remote_dir, ctx.config.app_port);
                ctx.session.run_plan(&plan, &mut report.warnings).await?;
            }
        }

        Ok(report.with_detail(format!("deployed via {}", strategy)))
    }
}
