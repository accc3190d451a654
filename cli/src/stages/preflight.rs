//! Preflight check stage
//!
//! The working tree must carry a container build descriptor. A compose file
//! selects the multi-container strategy; a Dockerfile alone selects the
//! single-container strategy; neither is fatal.

use std::path::Path;

use async_trait::async_trait;
use tracing::info;

use crate::errors::DeployError;
use crate::pipeline::{DeployContext, Stage, StageId, StageReport};

/// Compose descriptor names, probed in order
pub const COMPOSE_DESCRIPTORS: [&str; 4] = [
    "docker-compose.yml",
    "docker-compose.yaml",
    "compose.yml",
    "compose.yaml",
];

/// Single-container descriptor name
pub const DOCKERFILE: &str = "Dockerfile";

/// How the shipped tree gets built and run on the remote host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildStrategy {
    /// `docker compose` against the named descriptor
    Compose { descriptor: String },

    /// `docker build` + `docker run` against the Dockerfile
    Docker,
}

impl std::fmt::Display for BuildStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildStrategy::Compose { descriptor } => write!(f, "compose ({})", descriptor),
            BuildStrategy::Docker => write!(f, "single container (Dockerfile)"),
        }
    }
}

/// Select the build strategy from descriptor presence alone
pub fn detect_strategy(tree: &Path) -> Result<BuildStrategy, DeployError> {
    for descriptor in COMPOSE_DESCRIPTORS {
        if tree.join(descriptor).is_file() {
            return Ok(BuildStrategy::Compose {
                descriptor: descriptor.to_string(),
            });
        }
    }

    if tree.join(DOCKERFILE).is_file() {
        return Ok(BuildStrategy::Docker);
    }

    Err(DeployError::PreflightError(format!(
        "no container build descriptor found in {} (expected {} or a compose file)",
        tree.display(),
        DOCKERFILE
    )))
}

pub struct PreflightStage;

#[async_trait]
impl Stage for PreflightStage {
    fn id(&self) -> StageId {
        StageId::Preflight
    }

    async fn run(&self, ctx: &mut DeployContext) -> Result<StageReport, DeployError> {
        let strategy = detect_strategy(&ctx.config.checkout_dir())?;
        info!("Build strategy: {}", strategy);
        let detail = strategy.to_string();
        ctx.strategy = Some(strategy);
        Ok(StageReport::new(self.id()).with_detail(detail))
    }
}
