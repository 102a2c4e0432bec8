use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use solar_core::errors::{ErrorInfo, SweepError};

use crate::plan::SweepPlan;
use crate::codec::to_canonical_json_bytes;

/// Directory under the data root receiving sweep reports.
pub const SWEEP_REPORT_DIR: &str = "sweeps";
/// File name of the sweep report.
pub const SWEEP_REPORT_FILE: &str = "sweep_report.json";

/// Stage of a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    /// Dataset list construction.
    Datasets,
    /// Model training.
    Train,
    /// Model evaluation.
    Eval,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Datasets => "datasets",
            Stage::Train => "train",
            Stage::Eval => "eval",
        })
    }
}

/// Outcome of one sweep cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "detail", rename_all = "kebab-case")]
pub enum CellStatus {
    /// The step ran and finished.
    Completed,
    /// Earlier output exists and overwriting is disabled.
    Skipped,
    /// A configuration condition prevented the step; the sweep went on.
    Reported(ErrorInfo),
    /// The step raised an error.
    Failed(SweepError),
}

/// Outcome of one cell together with its label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellReport {
    /// Run prefix or `train_set/seed` label of the cell.
    pub cell: String,
    /// Outcome of the cell.
    pub status: CellStatus,
}

/// Cell counts of a stage per outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StageCounts {
    /// Cells that ran.
    pub completed: usize,
    /// Cells skipped by the guard.
    pub skipped: usize,
    /// Cells skipped by a reported condition.
    pub reported: usize,
    /// Cells that failed.
    pub failed: usize,
}

/// Outcomes of every cell of one stage, in sweep order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageReport {
    /// Stage the cells belong to.
    pub stage: Stage,
    /// Cell outcomes in sweep order.
    pub cells: Vec<CellReport>,
}

impl StageReport {
    /// Creates an empty report for `stage`.
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            cells: Vec::new(),
        }
    }

    /// Appends the outcome of a cell.
    pub fn record(&mut self, cell: impl Into<String>, status: CellStatus) {
        self.cells.push(CellReport {
            cell: cell.into(),
            status,
        });
    }

    /// Outcome of the cell labelled `cell`.
    pub fn status_of(&self, cell: &str) -> Option<&CellStatus> {
        self.cells
            .iter()
            .find(|report| report.cell == cell)
            .map(|report| &report.status)
    }

    /// Tallies the outcomes.
    pub fn counts(&self) -> StageCounts {
        let mut counts = StageCounts::default();
        for cell in &self.cells {
            match cell.status {
                CellStatus::Completed => counts.completed += 1,
                CellStatus::Skipped => counts.skipped += 1,
                CellStatus::Reported(_) => counts.reported += 1,
                CellStatus::Failed(_) => counts.failed += 1,
            }
        }
        counts
    }
}

/// Report of a full sweep run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    /// Canonical hash of the plan driving the run.
    pub plan_hash: String,
    /// RFC 3339 timestamp of the end of the run.
    pub created_at: String,
    /// Version of the coordinator that produced the report.
    pub tool_version: String,
    /// Stage reports in execution order.
    pub stages: Vec<StageReport>,
}

impl SweepReport {
    /// Assembles the report of a finished run.
    pub fn new(plan: &SweepPlan, stages: Vec<StageReport>) -> Result<Self, SweepError> {
        Ok(Self {
            plan_hash: plan.plan_hash()?,
            created_at: Utc::now().to_rfc3339(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            stages,
        })
    }

    /// Report of `stage`, when it ran.
    pub fn stage(&self, stage: Stage) -> Option<&StageReport> {
        self.stages.iter().find(|report| report.stage == stage)
    }

    /// Returns true when any cell failed.
    pub fn has_failures(&self) -> bool {
        self.stages.iter().any(|stage| stage.counts().failed > 0)
    }

    /// Writes the report as canonical JSON into `data_root/sweeps/` and
    /// returns its path.
    pub fn persist(&self, data_root: &Path) -> Result<PathBuf, SweepError> {
        let dir = data_root.join(SWEEP_REPORT_DIR);
        fs::create_dir_all(&dir).map_err(|err| report_io("report.dir", &dir, err))?;
        let path = dir.join(SWEEP_REPORT_FILE);
        let bytes = to_canonical_json_bytes(self)?;
        fs::write(&path, bytes).map_err(|err| report_io("report.write", &path, err))?;
        Ok(path)
    }
}

fn report_io(code: &str, path: &Path, err: impl ToString) -> SweepError {
    SweepError::Serde(ErrorInfo::new(code, err.to_string()).with_path(path))
}
