use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use solar_core::errors::{ErrorInfo, SweepError};
use solar_core::{ModelRev, Seed};
use solar_data::SplitFractions;
use solar_registry::{build_registry, ComboSpec, ModelArtifacts, Registry, SweepDims};

use crate::command::CommandSpec;
use crate::codec::{canonical_hash, from_yaml_slice, to_yaml_string};

fn io_error(code: &str, path: &Path, err: impl ToString) -> SweepError {
    SweepError::Config(ErrorInfo::new(code, err.to_string()).with_path(path))
}

/// Dataset stage configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DatasetSpec {
    /// `[test, train, valid]` fractions of the sample budget.
    #[serde(default)]
    pub splits: SplitFractions,
    /// Sample budget per set; plain sets use every sample when absent.
    /// Combo sets require it.
    #[serde(default)]
    pub total_count: Option<usize>,
}

/// Training stage configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainSpec {
    /// Square edge length tiles are resized to.
    pub size: u32,
    /// Maximum number of epochs.
    pub epochs: u32,
    /// Early stopping patience; zero runs every epoch.
    pub patience: u32,
    /// Whether the encoder is frozen.
    pub freeze: bool,
    /// Whether the decoder uses batch normalization.
    pub batchnorm: bool,
}

impl Default for TrainSpec {
    fn default() -> Self {
        Self {
            size: 576,
            epochs: 350,
            patience: 0,
            freeze: true,
            batchnorm: false,
        }
    }
}

/// Evaluation stage configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalSpec {
    /// Weights to evaluate, `best` or `final`. Kept as written so that an
    /// unknown selector is reported per cell rather than rejecting the plan.
    pub weights: String,
    /// Whether comparison plots are written.
    pub plots: bool,
}

impl Default for EvalSpec {
    fn default() -> Self {
        Self {
            weights: WeightSelector::Best.to_string(),
            plots: false,
        }
    }
}

/// Which trained weights an evaluation reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightSelector {
    /// Checkpoint with the best validation loss.
    Best,
    /// Weights after the last epoch.
    Final,
}

impl WeightSelector {
    /// Picks the selected weights file of a training run.
    pub fn pick<'a>(&self, artifacts: &'a ModelArtifacts) -> &'a Path {
        match self {
            WeightSelector::Best => &artifacts.best_weights,
            WeightSelector::Final => &artifacts.final_weights,
        }
    }
}

impl fmt::Display for WeightSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeightSelector::Best => f.write_str("best"),
            WeightSelector::Final => f.write_str("final"),
        }
    }
}

impl FromStr for WeightSelector {
    type Err = SweepError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "best" => Ok(WeightSelector::Best),
            "final" => Ok(WeightSelector::Final),
            other => Err(SweepError::Config(
                ErrorInfo::new("config.weight_selector", "weights not found")
                    .with_context("weights", other)
                    .with_hint("use `best` or `final`"),
            )),
        }
    }
}

/// What the sweep does after a cell fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Stop the sweep with the first failure.
    #[default]
    Abort,
    /// Record the failure and move on to the next cell.
    Continue,
}

/// Stages executed by a full sweep run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageToggles {
    /// Build dataset lists.
    pub datasets: bool,
    /// Train models.
    pub train: bool,
    /// Evaluate models.
    pub eval: bool,
}

impl Default for StageToggles {
    fn default() -> Self {
        Self {
            datasets: true,
            train: true,
            eval: true,
        }
    }
}

/// Sweep plan loaded from YAML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepPlan {
    /// Root of the on-disk layout; relative paths resolve against the plan's
    /// directory.
    pub data_root: PathBuf,
    /// Train sets, constituents listed before the combos drawing on them.
    pub train_sets: Vec<String>,
    /// Evaluation sets.
    pub test_sets: Vec<String>,
    /// Constituents of every combo set.
    #[serde(default)]
    pub combo_sets: ComboSpec,
    /// Seeds; `null` requests an unseeded run.
    pub seeds: Vec<Seed>,
    /// Backbone identifiers.
    pub backbones: Vec<String>,
    /// Revision tags.
    pub model_revs: Vec<ModelRev>,
    /// Dataset stage configuration.
    #[serde(default)]
    pub dataset: DatasetSpec,
    /// Training stage configuration.
    #[serde(default)]
    pub train: TrainSpec,
    /// Evaluation stage configuration.
    #[serde(default)]
    pub eval: EvalSpec,
    /// Replace earlier outputs instead of skipping them.
    #[serde(default)]
    pub overwrite: bool,
    /// Reaction to a failed cell.
    #[serde(default)]
    pub on_failure: FailurePolicy,
    /// Stages run by `run_sweep`.
    #[serde(default)]
    pub stages: StageToggles,
    /// External training program.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trainer: Option<CommandSpec>,
    /// External evaluation program.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluator: Option<CommandSpec>,
    /// Directory containing the plan on disk (ignored when serializing).
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl SweepPlan {
    /// Returns the deterministic hash associated with the plan contents.
    pub fn plan_hash(&self) -> Result<String, SweepError> {
        canonical_hash(self)
    }

    /// Produces a YAML representation of the plan.
    pub fn to_yaml_string(&self) -> Result<String, SweepError> {
        to_yaml_string(self)
    }

    /// Returns the resolved data root.
    pub fn data_root_path(&self) -> PathBuf {
        if self.data_root.is_absolute() {
            self.data_root.clone()
        } else {
            self.base_dir.join(&self.data_root)
        }
    }

    /// Dimension sequences of the sweep.
    pub fn dims(&self) -> SweepDims {
        SweepDims {
            train_sets: self.train_sets.clone(),
            seeds: self.seeds.clone(),
            backbones: self.backbones.clone(),
            model_revs: self.model_revs.clone(),
            test_sets: self.test_sets.clone(),
        }
    }

    /// Builds the path registry of the sweep.
    pub fn registry(&self) -> Result<Registry, SweepError> {
        build_registry(self.data_root_path(), self.dims(), &self.combo_sets)
    }
}

/// Loads a plan from disk and records the directory it was read from.
pub fn load_plan<P: AsRef<Path>>(path: P) -> Result<SweepPlan, SweepError> {
    let plan_path = path.as_ref();
    let bytes = fs::read(plan_path).map_err(|err| io_error("config.plan_read", plan_path, err))?;
    let mut plan: SweepPlan = from_yaml_slice(&bytes)?;
    plan.base_dir = plan_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    Ok(plan)
}
