//! Source acquisition stage
//!
//! Clone the repository fresh, or update an existing working copy in place
//! (fetch, checkout, pull). Either path failing is fatal.

use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::DeployError;
use crate::pipeline::{DeployContext, Stage, StageId, StageReport};

/// One local git invocation.
///
/// The argument list may carry the credential-bearing clone URL, so logs and
/// error messages only ever use the label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitStep {
    pub label: &'static str,
    pub args: Vec<String>,
}

impl GitStep {
    fn new(label: &'static str, args: Vec<String>) -> Self {
        Self { label, args }
    }
}

/// Plan the acquisition: update in place when a working copy exists,
/// otherwise clone fresh at the target branch.
pub fn acquisition_plan(
    has_checkout: bool,
    branch: &str,
    clone_url: &str,
    dir: &Path,
) -> Vec<GitStep> {
    let dir = dir.display().to_string();
    if has_checkout {
        vec![
            GitStep::new(
                "git fetch",
                vec!["-C".into(), dir.clone(), "fetch".into(), "origin".into()],
            ),
            GitStep::new(
                "git checkout",
                vec!["-C".into(), dir.clone(), "checkout".into(), branch.into()],
            ),
            GitStep::new(
                "git pull",
                vec![
                    "-C".into(),
                    dir,
                    "pull".into(),
                    "origin".into(),
                    branch.into(),
                ],
            ),
        ]
    } else {
        vec![GitStep::new(
            "git clone",
            vec![
                "clone".into(),
                "-b".into(),
                branch.into(),
                clone_url.into(),
                dir,
            ],
        )]
    }
}

async fn run_git(step: &GitStep) -> Result<(), DeployError> {
    debug!("Running {}", step.label);
    let status = Command::new("git")
        .args(&step.args)
        .status()
        .await
        .map_err(|e| DeployError::SourceError(format!("failed to run git: {}", e)))?;

    if !status.success() {
        return Err(DeployError::SourceError(format!("{} failed", step.label)));
    }
    Ok(())
}

pub struct SourceStage;

#[async_trait]
impl Stage for SourceStage {
    fn id(&self) -> StageId {
        StageId::Source
    }

    async fn run(&self, ctx: &mut DeployContext) -> Result<StageReport, DeployError> {
        let dir = ctx.config.checkout_dir();
        let has_checkout = dir.join(".git").is_dir();
        let clone_url = ctx.config.clone_url()?;

        info!(
            "Syncing {} (branch: {}) into {}",
            ctx.config.repo_url,
            ctx.config.branch,
            dir.display()
        );

        let plan = acquisition_plan(has_checkout, &ctx.config.branch, &clone_url, &dir);
        for step in &plan {
            run_git(step).await?;
        }

        let detail = if has_checkout {
            "updated existing checkout"
        } else {
            "cloned fresh checkout"
        };
        Ok(StageReport::new(self.id()).with_detail(detail))
    }
}
