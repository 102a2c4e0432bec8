#![deny(missing_docs)]
#![doc = "Sweep orchestration for solar segmentation experiments: idempotency guards, collaborator seams, plan loading and per-stage dispatch."]

/// Training and evaluation collaborator seams.
pub mod collab;
/// Canonical JSON, hashing and YAML helpers.
pub mod codec;
/// Collaborators backed by an external program.
pub mod command;
/// Stage orchestration over the sweep cross-product.
pub mod dispatch;
/// Skip and overwrite decisions for prior outputs.
pub mod guard;
/// Sweep plan loading and schema.
pub mod plan;
/// Cell, stage and sweep reports.
pub mod report;
/// Result collection across a sweep.
pub mod summary;
/// Training log and evaluation result file formats.
pub mod trainlog;

pub use collab::{CellScope, Collaborator, EvalJob, Evaluator, TrainJob, Trainer};
pub use command::{CommandEvaluator, CommandSpec, CommandTrainer};
pub use dispatch::{run_dataset_stage, run_evaluation_stage, run_sweep, run_training_stage};
pub use guard::{clear, prepare, should_skip, GuardDecision, OutputLocation};
pub use plan::{
    load_plan, DatasetSpec, EvalSpec, FailurePolicy, StageToggles, SweepPlan, TrainSpec,
    WeightSelector,
};
pub use report::{CellReport, CellStatus, Stage, StageCounts, StageReport, SweepReport};
pub use summary::{collect_results, write_summary_csv, ResultRow};
pub use trainlog::{read_result_csv, write_result_csv, write_train_log_header, EvalResult};
