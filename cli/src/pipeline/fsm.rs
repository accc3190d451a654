//! Finite state machine for pipeline progression
//!
//! The pipeline is a linear chain: stages run strictly in the planned order,
//! one terminal success state, one terminal failure state reachable from any
//! stage. No retries, no partial rollback.

use serde::{Deserialize, Serialize};

use super::StageId;

/// Pipeline state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineState {
    /// Not started, or between stages
    Pending,

    /// A stage is executing
    #[serde(rename = "in_stage")]
    InStage(StageId),

    /// All planned stages completed
    Succeeded,

    /// A stage failed; the run is over
    Failed,
}

/// Pipeline event
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// The next planned stage begins
    StageStarted(StageId),

    /// The running stage completed
    StageCompleted(StageId),

    /// All planned stages are done
    Finished,

    /// The running stage failed
    StageFailed(String),
}

/// Pipeline FSM over a fixed stage plan
#[derive(Debug, Clone)]
pub struct PipelineFsm {
    plan: Vec<StageId>,
    next: usize,
    state: PipelineState,
    error: Option<String>,
}

impl PipelineFsm {
    /// Create a new FSM for the given stage plan
    pub fn new(plan: Vec<StageId>) -> Self {
        Self {
            plan,
            next: 0,
            state: PipelineState::Pending,
            error: None,
        }
    }

    /// Get current state
    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    /// Get error message if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Number of stages completed so far
    pub fn completed(&self) -> usize {
        match self.state {
            PipelineState::InStage(_) => self.next.saturating_sub(1),
            _ => self.next,
        }
    }

    /// Whether the pipeline reached a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.state,
            PipelineState::Succeeded | PipelineState::Failed
        )
    }

    /// Process an event and transition state
    pub fn process(&mut self, event: PipelineEvent) -> Result<(), String> {
        let new_state = match (&self.state, &event) {
            (PipelineState::Pending, PipelineEvent::StageStarted(stage)) => {
                match self.plan.get(self.next) {
                    Some(planned) if planned == stage => {
                        self.next += 1;
                        PipelineState::InStage(*stage)
                    }
                    Some(planned) => {
                        return Err(format!(
                            "Out-of-order stage: expected {:?}, got {:?}",
                            planned, stage
                        ));
                    }
                    None => {
                        return Err(format!("No stage left in plan, got {:?}", stage));
                    }
                }
            }

            (PipelineState::InStage(current), PipelineEvent::StageCompleted(stage))
                if current == stage =>
            {
                PipelineState::Pending
            }

            (PipelineState::Pending, PipelineEvent::Finished) if self.next == self.plan.len() => {
                PipelineState::Succeeded
            }

            (PipelineState::InStage(_), PipelineEvent::StageFailed(err))
            | (PipelineState::Pending, PipelineEvent::StageFailed(err)) => {
                self.error = Some(err.clone());
                PipelineState::Failed
            }

            // Invalid transitions
            (state, event) => {
                return Err(format!("Invalid transition: {:?} -> {:?}", state, event));
            }
        };

        self.state = new_state;
        Ok(())
    }
}
