//! Pipeline FSM unit tests

use dockhand::pipeline::fsm::{PipelineEvent, PipelineFsm, PipelineState};
use dockhand::pipeline::StageId;

fn deploy_plan() -> Vec<StageId> {
    vec![
        StageId::Source,
        StageId::Preflight,
        StageId::Reachability,
        StageId::Provision,
        StageId::Transfer,
        StageId::Validate,
    ]
}

#[test]
fn test_fsm_initial_state() {
    let fsm = PipelineFsm::new(deploy_plan());
    assert_eq!(fsm.state(), &PipelineState::Pending);
    assert!(fsm.error().is_none());
    assert_eq!(fsm.completed(), 0);
    assert!(!fsm.is_terminal());
}

#[test]
fn test_fsm_success_flow() {
    let mut fsm = PipelineFsm::new(deploy_plan());

    for stage in deploy_plan() {
        fsm.process(PipelineEvent::StageStarted(stage)).unwrap();
        assert_eq!(fsm.state(), &PipelineState::InStage(stage));
        fsm.process(PipelineEvent::StageCompleted(stage)).unwrap();
    }

    fsm.process(PipelineEvent::Finished).unwrap();
    assert_eq!(fsm.state(), &PipelineState::Succeeded);
    assert_eq!(fsm.completed(), deploy_plan().len());
}

#[test]
fn test_fsm_failure_flow() {
    let mut fsm = PipelineFsm::new(deploy_plan());

    fsm.process(PipelineEvent::StageStarted(StageId::Source)).unwrap();
    fsm.process(PipelineEvent::StageCompleted(StageId::Source)).unwrap();
    fsm.process(PipelineEvent::StageStarted(StageId::Preflight)).unwrap();
    fsm.process(PipelineEvent::StageFailed("no descriptor".to_string()))
        .unwrap();

    assert_eq!(fsm.state(), &PipelineState::Failed);
    assert_eq!(fsm.error(), Some("no descriptor"));
    assert!(fsm.is_terminal());
}

#[test]
fn test_fsm_rejects_out_of_order_stages() {
    let mut fsm = PipelineFsm::new(deploy_plan());

    // Skipping straight to provisioning is not a legal transition.
    assert!(fsm
        .process(PipelineEvent::StageStarted(StageId::Provision))
        .is_err());

    // Completing a stage that never started is not either.
    assert!(fsm
        .process(PipelineEvent::StageCompleted(StageId::Source))
        .is_err());
}

#[test]
fn test_fsm_terminal_states_accept_no_events() {
    let mut fsm = PipelineFsm::new(vec![StageId::Cleanup]);
    fsm.process(PipelineEvent::StageStarted(StageId::Cleanup)).unwrap();
    fsm.process(PipelineEvent::StageFailed("host gone".to_string()))
        .unwrap();

    assert!(fsm.process(PipelineEvent::StageStarted(StageId::Cleanup)).is_err());
    assert!(fsm.process(PipelineEvent::Finished).is_err());
}
