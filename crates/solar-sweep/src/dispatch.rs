use std::path::Path;

use solar_core::errors::{ErrorInfo, SweepError};
use solar_data::{compose_combo_set, fresh_split};
use solar_registry::{EvalKey, ModelKey, Registry, SetLayout, SplitKey};
use tracing::{error, info, warn};

use crate::collab::{CellScope, EvalJob, Evaluator, TrainJob, Trainer};
use crate::guard::{prepare, GuardDecision, OutputLocation};
use crate::plan::{FailurePolicy, SweepPlan, WeightSelector};
use crate::report::{CellStatus, Stage, StageReport, SweepReport};

/// Files the outcome of a cell into `report`.
///
/// Configuration conditions are recorded as reported and never stop the
/// stage; any other error is recorded as failed and, under
/// [`FailurePolicy::Abort`], returned.
fn settle(
    report: &mut StageReport,
    cell: String,
    outcome: Result<CellStatus, SweepError>,
    policy: FailurePolicy,
) -> Result<(), SweepError> {
    let status = match outcome {
        Ok(status) => status,
        Err(SweepError::Config(info)) => {
            warn!(stage = %report.stage, %cell, code = %info.code, "{}, skipping cell", info.message);
            CellStatus::Reported(info)
        }
        Err(err) => {
            error!(stage = %report.stage, %cell, code = err.code(), "{err}");
            if policy == FailurePolicy::Abort {
                return Err(err);
            }
            CellStatus::Failed(err)
        }
    };
    report.record(cell, status);
    Ok(())
}

fn stage_done(report: &StageReport) {
    let counts = report.counts();
    info!(
        stage = %report.stage,
        completed = counts.completed,
        skipped = counts.skipped,
        reported = counts.reported,
        failed = counts.failed,
        "stage finished"
    );
}

/// Builds the dataset lists of every `(train_set, seed)` pair.
///
/// Plain sets get a fresh split of their tiles; combo sets are composed from
/// the train and validation lists of their constituents, which must come
/// earlier in `train_sets`.
pub fn run_dataset_stage(registry: &Registry, plan: &SweepPlan) -> Result<StageReport, SweepError> {
    let mut report = StageReport::new(Stage::Datasets);
    let dims = registry.dims();
    info!(stage = %report.stage, cells = dims.train_sets.len() * dims.seeds.len(), "starting stage");
    for train_set in &dims.train_sets {
        for &seed in &dims.seeds {
            let key = SplitKey::new(train_set.as_str(), seed);
            let cell = format!("{}/{}", key.train_set, key.seed);
            let outcome = dataset_cell(registry, plan, &key);
            settle(&mut report, cell, outcome, plan.on_failure)?;
        }
    }
    stage_done(&report);
    Ok(report)
}

enum DatasetWork<'a> {
    Split {
        img_root: &'a Path,
        mask_root: &'a Path,
    },
    Combo {
        constituents: &'a [String],
        total_count: usize,
    },
}

fn dataset_cell(registry: &Registry, plan: &SweepPlan, key: &SplitKey) -> Result<CellStatus, SweepError> {
    let set = registry.set(&key.train_set)?;
    let lists = registry.split_lists(key)?;
    let work = match &set.layout {
        SetLayout::Plain { img_root, mask_root } => DatasetWork::Split { img_root, mask_root },
        SetLayout::Combo {
            constituents: Some(constituents),
        } => {
            let total_count = plan.dataset.total_count.ok_or_else(|| {
                SweepError::Config(
                    ErrorInfo::new("config.combo_budget", "combo sets need a dataset total_count")
                        .with_context("train_set", key.train_set.as_str()),
                )
            })?;
            DatasetWork::Combo {
                constituents,
                total_count,
            }
        }
        SetLayout::Combo { constituents: None } => {
            return Err(SweepError::Config(
                ErrorInfo::new("config.missing_combo_spec", "combo_sets does not specify this combo")
                    .with_context("train_set", key.train_set.as_str()),
            ));
        }
    };

    let location = OutputLocation::Lists {
        lists,
        with_test: matches!(work, DatasetWork::Split { .. }),
    };
    if prepare(&location, plan.overwrite)? == GuardDecision::Skip {
        return Ok(CellStatus::Skipped);
    }
    info!(train_set = %key.train_set, seed = %key.seed, "building dataset lists");
    match work {
        DatasetWork::Split { img_root, mask_root } => {
            fresh_split(
                img_root,
                mask_root,
                &set.tiles_root,
                plan.dataset.splits,
                key.seed,
                plan.dataset.total_count,
            )?;
        }
        DatasetWork::Combo {
            constituents,
            total_count,
        } => {
            compose_combo_set(
                registry,
                &key.train_set,
                constituents,
                key.seed,
                total_count,
                plan.dataset.splits,
            )?;
        }
    }
    Ok(CellStatus::Completed)
}

/// Trains one model per `(train_set, seed, backbone, model_rev)` tuple.
pub fn run_training_stage(
    registry: &Registry,
    plan: &SweepPlan,
    trainer: &mut dyn Trainer,
) -> Result<StageReport, SweepError> {
    let mut report = StageReport::new(Stage::Train);
    let keys = registry.model_keys();
    info!(stage = %report.stage, cells = keys.len(), "starting stage");
    for key in keys {
        let outcome = train_cell(registry, plan, &key, &mut *trainer);
        settle(&mut report, key.prefix(), outcome, plan.on_failure)?;
    }
    stage_done(&report);
    Ok(report)
}

fn train_cell(
    registry: &Registry,
    plan: &SweepPlan,
    key: &ModelKey,
    trainer: &mut dyn Trainer,
) -> Result<CellStatus, SweepError> {
    let mut scope = CellScope::enter(trainer);
    let set = registry.set(&key.train_set)?;
    let lists = registry.split_lists(&key.split_key())?;
    let artifacts = registry.model_artifacts(key)?;
    require_list(&lists.train_img)?;

    if prepare(&OutputLocation::Weights(artifacts), plan.overwrite)? == GuardDecision::Skip {
        return Ok(CellStatus::Skipped);
    }
    let job = TrainJob {
        img_root: set.img_root().map(Path::to_path_buf),
        mask_root: set.mask_root().map(Path::to_path_buf),
        train_img_list: lists.train_img.clone(),
        train_mask_list: lists.train_mask.clone(),
        valid_img_list: lists.valid_img.clone(),
        valid_mask_list: lists.valid_mask.clone(),
        log_file: artifacts.train_log.clone(),
        best_weights: artifacts.best_weights.clone(),
        final_weights: artifacts.final_weights.clone(),
        backbone: key.backbone.clone(),
        seed: key.seed,
        size: plan.train.size,
        epochs: plan.train.epochs,
        freeze: plan.train.freeze,
        patience: plan.train.patience,
        batchnorm: plan.train.batchnorm,
    };
    info!(run = %key.prefix(), "training");
    scope.train(&job)?;
    Ok(CellStatus::Completed)
}

/// Evaluates every trained model against every test set.
///
/// A model trained on `train_set` predicts the test lists of `test_set`,
/// resolved against the test set's own roots.
pub fn run_evaluation_stage(
    registry: &Registry,
    plan: &SweepPlan,
    evaluator: &mut dyn Evaluator,
) -> Result<StageReport, SweepError> {
    let mut report = StageReport::new(Stage::Eval);
    let keys = registry.eval_keys();
    info!(stage = %report.stage, cells = keys.len(), "starting stage");
    for key in keys {
        let cell = format!("{}_predicting_{}", key.model.prefix(), key.test_set);
        let outcome = eval_cell(registry, plan, &key, &mut *evaluator);
        settle(&mut report, cell, outcome, plan.on_failure)?;
    }
    stage_done(&report);
    Ok(report)
}

fn eval_cell(
    registry: &Registry,
    plan: &SweepPlan,
    key: &EvalKey,
    evaluator: &mut dyn Evaluator,
) -> Result<CellStatus, SweepError> {
    let mut scope = CellScope::enter(evaluator);
    let selector: WeightSelector = plan.eval.weights.parse()?;
    let weights = selector.pick(registry.model_artifacts(&key.model)?);
    let test_set = registry.set(&key.test_set)?;
    let test_lists = registry.split_lists(&key.test_split_key())?;
    let artifacts = registry.eval_artifacts(key)?;
    if !weights.is_file() {
        return Err(SweepError::Collaborator(
            ErrorInfo::new("collab.missing_weights", "trained weights do not exist")
                .with_path(weights)
                .with_hint("run the train stage first"),
        ));
    }
    require_list(&test_lists.test_img)?;

    let location = OutputLocation::Predictions {
        artifacts,
        plots: plan.eval.plots,
    };
    if prepare(&location, plan.overwrite)? == GuardDecision::Skip {
        return Ok(CellStatus::Skipped);
    }
    let job = EvalJob {
        img_root: test_set.img_root().map(Path::to_path_buf),
        mask_root: test_set.mask_root().map(Path::to_path_buf),
        test_img_list: test_lists.test_img.clone(),
        test_mask_list: test_lists.test_mask.clone(),
        weights: weights.to_path_buf(),
        result_file: artifacts.result_file.clone(),
        prediction_dir: artifacts.prediction_dir.clone(),
        plot_dir: plan.eval.plots.then(|| artifacts.plot_dir.clone()),
        backbone: key.model.backbone.clone(),
        size: plan.train.size,
        batchnorm: plan.train.batchnorm,
    };
    info!(run = %key.model.prefix(), test_set = %key.test_set, "evaluating");
    scope.evaluate(&job)?;
    Ok(CellStatus::Completed)
}

fn require_list(list: &Path) -> Result<(), SweepError> {
    if list.is_file() {
        return Ok(());
    }
    Err(SweepError::Dataset(
        ErrorInfo::new("dataset.missing_split", "dataset list does not exist")
            .with_path(list)
            .with_hint("run the datasets stage first"),
    ))
}

/// Runs the enabled stages of `plan` in order and persists the sweep report
/// under the data root.
///
/// Collaborators are only required for the stages that are enabled.
pub fn run_sweep(
    registry: &Registry,
    plan: &SweepPlan,
    trainer: Option<&mut dyn Trainer>,
    evaluator: Option<&mut dyn Evaluator>,
) -> Result<SweepReport, SweepError> {
    let trainer = match (plan.stages.train, trainer) {
        (true, None) => return Err(missing_collaborator("trainer")),
        (true, trainer) => trainer,
        (false, _) => None,
    };
    let evaluator = match (plan.stages.eval, evaluator) {
        (true, None) => return Err(missing_collaborator("evaluator")),
        (true, evaluator) => evaluator,
        (false, _) => None,
    };

    let mut stages = Vec::new();
    if plan.stages.datasets {
        stages.push(run_dataset_stage(registry, plan)?);
    }
    if let Some(trainer) = trainer {
        stages.push(run_training_stage(registry, plan, trainer)?);
    }
    if let Some(evaluator) = evaluator {
        stages.push(run_evaluation_stage(registry, plan, evaluator)?);
    }

    let report = SweepReport::new(plan, stages)?;
    let path = report.persist(registry.data_root())?;
    info!(report = %path.display(), "sweep finished");
    Ok(report)
}

fn missing_collaborator(role: &str) -> SweepError {
    SweepError::Config(
        ErrorInfo::new("config.missing_collaborator", "enabled stage has no collaborator")
            .with_context("role", role)
            .with_hint("configure it in the plan or disable the stage"),
    )
}
