//! Collaborators backed by an external program.
//!
//! The program receives every job field as a `--flag value` pair after the
//! arguments configured in the plan, e.g.
//! `python train.py --train-img-file tiles/train_img_42.txt ...`.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};
use solar_core::errors::{ErrorInfo, SweepError};
use tracing::debug;

use crate::collab::{Collaborator, EvalJob, Evaluator, TrainJob, Trainer};
use crate::trainlog::write_train_log_header;

/// External program and its leading arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    /// Executable to spawn.
    pub program: PathBuf,
    /// Arguments placed before the job flags.
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Default)]
struct JobArgs(Vec<OsString>);

impl JobArgs {
    fn flag(&mut self, name: &str, value: impl AsRef<OsStr>) -> &mut Self {
        self.0.push(OsString::from(format!("--{name}")));
        self.0.push(value.as_ref().to_os_string());
        self
    }

    fn path(&mut self, name: &str, value: &Path) -> &mut Self {
        self.flag(name, value.as_os_str())
    }

    fn optional_path(&mut self, name: &str, value: Option<&Path>) -> &mut Self {
        match value {
            Some(value) => self.path(name, value),
            None => self,
        }
    }

    fn display(&mut self, name: &str, value: impl ToString) -> &mut Self {
        self.flag(name, value.to_string())
    }
}

fn run(spec: &CommandSpec, job_args: JobArgs, role: &str) -> Result<(), SweepError> {
    let mut command = Command::new(&spec.program);
    command.args(&spec.args).args(&job_args.0);
    debug!(role, program = %spec.program.display(), "spawning collaborator");
    let status = command.status().map_err(|err| {
        SweepError::Collaborator(
            ErrorInfo::new("collab.spawn", err.to_string())
                .with_context("role", role)
                .with_context("program", spec.program.display().to_string()),
        )
    })?;
    if status.success() {
        return Ok(());
    }
    let code = status
        .code()
        .map(|code| code.to_string())
        .unwrap_or_else(|| "signal".to_string());
    Err(SweepError::Collaborator(
        ErrorInfo::new("collab.exit_status", "collaborator exited unsuccessfully")
            .with_context("role", role)
            .with_context("program", spec.program.display().to_string())
            .with_context("status", code),
    ))
}

/// Trainer that runs an external program per job.
#[derive(Debug, Clone)]
pub struct CommandTrainer {
    spec: CommandSpec,
}

impl CommandTrainer {
    /// Wraps the program described by `spec`.
    pub fn new(spec: CommandSpec) -> Self {
        Self { spec }
    }
}

impl Collaborator for CommandTrainer {}

impl Trainer for CommandTrainer {
    fn train(&mut self, job: &TrainJob) -> Result<(), SweepError> {
        write_train_log_header(job)?;
        let mut args = JobArgs::default();
        args.optional_path("train-img-dir", job.img_root.as_deref())
            .optional_path("train-mask-dir", job.mask_root.as_deref())
            .path("train-img-file", &job.train_img_list)
            .path("train-mask-file", &job.train_mask_list)
            .path("valid-img-file", &job.valid_img_list)
            .path("valid-mask-file", &job.valid_mask_list)
            .path("log-file", &job.log_file)
            .path("best-weights", &job.best_weights)
            .path("final-weights", &job.final_weights)
            .display("backbone", &job.backbone)
            .display("size", job.size)
            .display("epochs", job.epochs)
            .display("freeze", job.freeze)
            .display("patience", job.patience)
            .display("batchnorm", job.batchnorm);
        if let Some(seed) = job.seed.value() {
            args.display("seed", seed);
        }
        run(&self.spec, args, "trainer")
    }
}

/// Evaluator that runs an external program per job.
#[derive(Debug, Clone)]
pub struct CommandEvaluator {
    spec: CommandSpec,
}

impl CommandEvaluator {
    /// Wraps the program described by `spec`.
    pub fn new(spec: CommandSpec) -> Self {
        Self { spec }
    }
}

impl Collaborator for CommandEvaluator {}

impl Evaluator for CommandEvaluator {
    fn evaluate(&mut self, job: &EvalJob) -> Result<(), SweepError> {
        let mut args = JobArgs::default();
        args.optional_path("test-img-dir", job.img_root.as_deref())
            .optional_path("test-mask-dir", job.mask_root.as_deref())
            .path("test-img-file", &job.test_img_list)
            .path("test-mask-file", &job.test_mask_list)
            .path("weights", &job.weights)
            .path("result-file", &job.result_file)
            .path("pred-dir", &job.prediction_dir)
            .optional_path("plot-dir", job.plot_dir.as_deref())
            .display("backbone", &job.backbone)
            .display("size", job.size)
            .display("batchnorm", job.batchnorm);
        run(&self.spec, args, "evaluator")
    }
}
