//! Deployment pipeline
//!
//! Stages implement [`Stage`] and run strictly in order under the
//! [`Sequencer`], which stops on the first fatal failure and aggregates
//! per-stage reports into a final [`DeployReport`].

pub mod fsm;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::config::DeployConfig;
use crate::errors::DeployError;
use crate::remote::SshSession;
use crate::stages::preflight::BuildStrategy;

use fsm::{PipelineEvent, PipelineFsm};

/// Identity of one pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    Source,
    Preflight,
    Reachability,
    Provision,
    Transfer,
    Proxy,
    Validate,
    Cleanup,
}

impl std::fmt::Display for StageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StageId::Source => "source acquisition",
            StageId::Preflight => "preflight check",
            StageId::Reachability => "remote reachability",
            StageId::Provision => "remote provisioning",
            StageId::Transfer => "artifact transfer and build",
            StageId::Proxy => "reverse proxy configuration",
            StageId::Validate => "post-deploy validation",
            StageId::Cleanup => "cleanup",
        };
        write!(f, "{}", name)
    }
}

/// Mutable state threaded through the stages
pub struct DeployContext {
    /// Frozen run configuration
    pub config: DeployConfig,

    /// Unique id for this run, stamped into the report and remote staging path
    pub run_id: String,

    /// SSH session for the configured target
    pub session: SshSession,

    /// Build strategy, discovered by the preflight stage
    pub strategy: Option<BuildStrategy>,
}

impl DeployContext {
    pub fn new(config: DeployConfig) -> Self {
        let session = SshSession::new(&config.remote);
        Self {
            config,
            run_id: uuid::Uuid::new_v4().to_string(),
            session,
            strategy: None,
        }
    }
}

/// Result of a completed stage
#[derive(Debug, Clone)]
pub struct StageReport {
    pub stage: StageId,

    /// Tolerated failures and other non-fatal notes
    pub warnings: Vec<String>,

    /// One-line outcome for the summary
    pub detail: Option<String>,
}

impl StageReport {
    pub fn new(stage: StageId) -> Self {
        Self {
            stage,
            warnings: Vec::new(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// One pipeline stage
#[async_trait]
pub trait Stage: Send + Sync {
    /// Stage identity, used for ordering and reporting
    fn id(&self) -> StageId;

    /// Execute the stage. A returned error is fatal for the whole run.
    async fn run(&self, ctx: &mut DeployContext) -> Result<StageReport, DeployError>;
}

/// Final report for a run
#[derive(Debug)]
pub struct DeployReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    /// Reports of stages that completed, in execution order
    pub completed: Vec<StageReport>,

    /// The failing stage and its error, when the run aborted
    pub failure: Option<(StageId, String)>,
}

impl DeployReport {
    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }

    pub fn warning_count(&self) -> usize {
        self.completed.iter().map(|r| r.warnings.len()).sum()
    }
}

/// Runs stages in order, fail-fast
pub struct Sequencer {
    stages: Vec<Box<dyn Stage>>,
}

impl Sequencer {
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Self {
        Self { stages }
    }

    /// The ordered stage plan
    pub fn plan(&self) -> Vec<StageId> {
        self.stages.iter().map(|s| s.id()).collect()
    }

    /// Execute the pipeline against the context
    pub async fn run(&self, ctx: &mut DeployContext) -> DeployReport {
        let started_at = Utc::now();
        let mut fsm = PipelineFsm::new(self.plan());
        let mut completed = Vec::new();
        let mut failure = None;

        for (index, stage) in self.stages.iter().enumerate() {
            let id = stage.id();
            if let Err(e) = fsm.process(PipelineEvent::StageStarted(id)) {
                failure = Some((id, format!("pipeline state error: {}", e)));
                break;
            }

            info!("[{}/{}] {}", index + 1, self.stages.len(), id);
            match stage.run(ctx).await {
                Ok(report) => {
                    for warning in &report.warnings {
                        info!("{}: {}", id, warning);
                    }
                    if let Err(e) = fsm.process(PipelineEvent::StageCompleted(id)) {
                        failure = Some((id, format!("pipeline state error: {}", e)));
                        break;
                    }
                    completed.push(report);
                }
                Err(e) => {
                    error!("{} failed: {}", id, e);
                    let _ = fsm.process(PipelineEvent::StageFailed(e.to_string()));
                    failure = Some((id, e.to_string()));
                    break;
                }
            }
        }

        if failure.is_none() {
            if let Err(e) = fsm.process(PipelineEvent::Finished) {
                failure = Some((
                    *self.plan().last().expect("non-empty plan"),
                    format!("pipeline state error: {}", e),
                ));
            }
        }

        DeployReport {
            run_id: ctx.run_id.clone(),
            started_at,
            finished_at: Utc::now(),
            completed,
            failure,
        }
    }
}
