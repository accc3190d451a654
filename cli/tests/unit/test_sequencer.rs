//! Sequencer fail-fast tests
//!
//! Stage stubs record their invocations so the tests can assert that a
//! failure in stage N prevents every stage after N from running.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use dockhand::config::{DeployConfig, Profile};
use dockhand::errors::DeployError;
use dockhand::pipeline::{DeployContext, Sequencer, Stage, StageId, StageReport};

fn test_config() -> DeployConfig {
    let profile: Profile = serde_json::from_str(
        r#"{
            "repo_url": "https://github.com/acme/widget-api.git",
            "ssh_host": "203.0.113.7",
            "key_path": "/tmp/test-key",
            "app_port": 3000,
            "proxy": "no"
        }"#,
    )
    .unwrap();
    DeployConfig::from_profile(profile).unwrap()
}

struct StubStage {
    id: StageId,
    fail: bool,
    warnings: Vec<String>,
    calls: Arc<Mutex<Vec<StageId>>>,
}

impl StubStage {
    fn ok(id: StageId, calls: &Arc<Mutex<Vec<StageId>>>) -> Box<dyn Stage> {
        Box::new(Self {
            id,
            fail: false,
            warnings: Vec::new(),
            calls: calls.clone(),
        })
    }

    fn failing(id: StageId, calls: &Arc<Mutex<Vec<StageId>>>) -> Box<dyn Stage> {
        Box::new(Self {
            id,
            fail: true,
            warnings: Vec::new(),
            calls: calls.clone(),
        })
    }

    fn warning(id: StageId, calls: &Arc<Mutex<Vec<StageId>>>, warning: &str) -> Box<dyn Stage> {
        Box::new(Self {
            id,
            fail: false,
            warnings: vec![warning.to_string()],
            calls: calls.clone(),
        })
    }
}

#[async_trait]
impl Stage for StubStage {
    fn id(&self) -> StageId {
        self.id
    }

    async fn run(&self, _ctx: &mut DeployContext) -> Result<StageReport, DeployError> {
        self.calls.lock().unwrap().push(self.id);
        if self.fail {
            return Err(DeployError::PipelineError(format!("{} stub failed", self.id)));
        }
        let mut report = StageReport::new(self.id);
        report.warnings = self.warnings.clone();
        Ok(report)
    }
}

const PLAN: [StageId; 5] = [
    StageId::Source,
    StageId::Preflight,
    StageId::Reachability,
    StageId::Provision,
    StageId::Transfer,
];

#[tokio::test]
async fn all_stages_run_in_order_on_success() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let stages = PLAN.iter().map(|id| StubStage::ok(*id, &calls)).collect();
    let sequencer = Sequencer::new(stages);

    let mut ctx = DeployContext::new(test_config());
    let report = sequencer.run(&mut ctx).await;

    assert!(report.succeeded());
    assert_eq!(*calls.lock().unwrap(), PLAN.to_vec());
    assert_eq!(report.completed.len(), PLAN.len());
    assert_eq!(report.warning_count(), 0);
}

#[tokio::test]
async fn a_failure_in_any_stage_stops_all_later_stages() {
    for fail_at in 0..PLAN.len() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let stages = PLAN
            .iter()
            .enumerate()
            .map(|(i, id)| {
                if i == fail_at {
                    StubStage::failing(*id, &calls)
                } else {
                    StubStage::ok(*id, &calls)
                }
            })
            .collect();
        let sequencer = Sequencer::new(stages);

        let mut ctx = DeployContext::new(test_config());
        let report = sequencer.run(&mut ctx).await;

        assert!(!report.succeeded(), "failure at {fail_at} must fail the run");
        let (stage, error) = report.failure.as_ref().unwrap();
        assert_eq!(*stage, PLAN[fail_at]);
        assert!(error.contains("stub failed"));

        // Stages up to and including the failing one ran; nothing after did.
        assert_eq!(*calls.lock().unwrap(), PLAN[..=fail_at].to_vec());
        assert_eq!(report.completed.len(), fail_at);
    }
}

#[tokio::test]
async fn tolerated_warnings_do_not_fail_the_run() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let stages = vec![
        StubStage::ok(StageId::Reachability, &calls),
        StubStage::warning(
            StageId::Cleanup,
            &calls,
            "container removal failed (tolerated)",
        ),
    ];
    let sequencer = Sequencer::new(stages);

    let mut ctx = DeployContext::new(test_config());
    let report = sequencer.run(&mut ctx).await;

    assert!(report.succeeded());
    assert_eq!(report.warning_count(), 1);
}

#[tokio::test]
async fn the_plan_reflects_stage_order() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let stages = PLAN.iter().map(|id| StubStage::ok(*id, &calls)).collect();
    let sequencer = Sequencer::new(stages);
    assert_eq!(sequencer.plan(), PLAN.to_vec());
}
