mod common;

use common::{plan_in, RecordingEvaluator, RecordingTrainer, BASE_PLAN};
use std::fs;

use solar_sweep::{
    run_dataset_stage, run_evaluation_stage, run_sweep, run_training_stage, CellStatus, FailurePolicy,
};

#[test]
fn abort_stops_at_the_first_collaborator_failure() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let plan = plan_in(dir.path(), BASE_PLAN);
    assert_eq!(plan.on_failure, FailurePolicy::Abort);
    let registry = plan.registry().expect("registry");
    run_dataset_stage(&registry, &plan).expect("datasets");

    let mut trainer = RecordingTrainer {
        fail_on: Some("B".to_string()),
        ..RecordingTrainer::default()
    };
    let err = run_training_stage(&registry, &plan, &mut trainer).expect_err("abort");
    assert_eq!(err.code(), "collab.mock");
    assert_eq!(trainer.jobs.len(), 1, "only A trained before the failure");
    assert_eq!(trainer.releases, 2);
    let combo = registry
        .model_artifacts(&registry.model_keys()[2])
        .expect("combo artifacts");
    assert!(!combo.best_weights.exists());
}

#[test]
fn continue_records_the_failure_and_moves_on() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let plan = plan_in(dir.path(), &format!("{BASE_PLAN}on_failure: continue\n"));
    let registry = plan.registry().expect("registry");
    run_dataset_stage(&registry, &plan).expect("datasets");

    let mut trainer = RecordingTrainer {
        fail_on: Some("B".to_string()),
        ..RecordingTrainer::default()
    };
    let report = run_training_stage(&registry, &plan, &mut trainer).expect("continue");
    assert_eq!(trainer.jobs.len(), 2);
    assert_eq!(trainer.releases, 3);
    match report.status_of("B_resnet34_42_v1") {
        Some(CellStatus::Failed(err)) => assert_eq!(err.code(), "collab.mock"),
        other => panic!("unexpected status {other:?}"),
    }
    assert_eq!(report.status_of("CMB_resnet34_42_v1"), Some(&CellStatus::Completed));
}

#[test]
fn release_happens_on_success_skip_and_failure() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let body = BASE_PLAN.replace("combo_sets:\n  CMB: [A, B]\n", "");
    let plan = plan_in(dir.path(), &format!("{body}on_failure: continue\n"));
    let registry = plan.registry().expect("registry");
    run_dataset_stage(&registry, &plan).expect("datasets");

    let mut trainer = RecordingTrainer::default();
    run_training_stage(&registry, &plan, &mut trainer).expect("first");
    assert_eq!(trainer.releases, 3);

    let mut trainer = RecordingTrainer::default();
    let report = run_training_stage(&registry, &plan, &mut trainer).expect("second");
    assert_eq!(report.counts().skipped, 2);
    match report.status_of("CMB_resnet34_42_v1") {
        Some(CellStatus::Failed(err)) => assert_eq!(err.code(), "dataset.missing_split"),
        other => panic!("unexpected status {other:?}"),
    }
    assert_eq!(trainer.releases, 3);
}

#[test]
fn sweep_requires_collaborators_only_for_enabled_stages() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let plan = plan_in(dir.path(), BASE_PLAN);
    let registry = plan.registry().expect("registry");
    let err = run_sweep(&registry, &plan, None, Some(&mut RecordingEvaluator::default()))
        .expect_err("no trainer");
    assert_eq!(err.code(), "config.missing_collaborator");

    let plan = plan_in(
        dir.path(),
        &format!("{BASE_PLAN}stages:\n  train: false\n  eval: false\n"),
    );
    let report = run_sweep(&registry, &plan, None, None).expect("datasets only");
    assert_eq!(report.stages.len(), 1);
}

#[test]
fn missing_weights_abort_evaluation() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let plan = plan_in(dir.path(), BASE_PLAN);
    let registry = plan.registry().expect("registry");
    run_dataset_stage(&registry, &plan).expect("datasets");
    run_training_stage(&registry, &plan, &mut RecordingTrainer::default()).expect("train");
    let first = registry.model_artifacts(&registry.model_keys()[0]).expect("artifacts");
    fs::remove_file(&first.best_weights).expect("drop weights");

    let mut evaluator = RecordingEvaluator::default();
    let err = run_evaluation_stage(&registry, &plan, &mut evaluator).expect_err("abort");
    assert_eq!(err.code(), "collab.missing_weights");
    assert!(evaluator.jobs.is_empty());
    assert_eq!(evaluator.releases, 1);
}

#[test]
fn missing_weights_fail_only_their_cells_under_continue() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let plan = plan_in(dir.path(), &format!("{BASE_PLAN}on_failure: continue
"));
    let registry = plan.registry().expect("registry");
    run_dataset_stage(&registry, &plan).expect("datasets");
    run_training_stage(&registry, &plan, &mut RecordingTrainer::default()).expect("train");
    let first = registry.model_artifacts(&registry.model_keys()[0]).expect("artifacts");
    fs::remove_file(&first.best_weights).expect("drop weights");

    let mut evaluator = RecordingEvaluator::default();
    let report = run_evaluation_stage(&registry, &plan, &mut evaluator).expect("continue");
    assert_eq!(report.counts().failed, 2);
    assert_eq!(report.counts().completed, 4);
    match report.status_of("A_resnet34_42_v1_predicting_B") {
        Some(CellStatus::Failed(err)) => assert_eq!(err.code(), "collab.missing_weights"),
        other => panic!("unexpected status {other:?}"),
    }
}
