//! Collection of evaluation results across a sweep.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use solar_core::errors::{ErrorInfo, SweepError};
use solar_registry::{EvalKey, Registry};
use tracing::debug;

use crate::trainlog::{read_result_csv, EvalResult};

/// Result of one evaluation run together with its sweep tuple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    /// Evaluation key of the run.
    pub key: EvalKey,
    /// Metrics read from the run's result file.
    pub result: EvalResult,
}

/// Reads every evaluation result file of the sweep that exists, in sweep
/// order. Runs without a result file are left out.
pub fn collect_results(registry: &Registry) -> Result<Vec<ResultRow>, SweepError> {
    let mut rows = Vec::new();
    for key in registry.eval_keys() {
        let artifacts = registry.eval_artifacts(&key)?;
        if !artifacts.result_file.is_file() {
            debug!(result = %artifacts.result_file.display(), "no result file");
            continue;
        }
        let result = read_result_csv(&artifacts.result_file)?;
        rows.push(ResultRow { key, result });
    }
    Ok(rows)
}

/// Writes `rows` as one CSV table.
///
/// Metric columns are the union of all metric names in order of first
/// appearance; a row lacking a metric leaves its cell empty.
pub fn write_summary_csv(path: &Path, rows: &[ResultRow]) -> Result<(), SweepError> {
    let mut metric_names: Vec<&str> = Vec::new();
    for row in rows {
        for (name, _) in &row.result.metrics {
            if !metric_names.contains(&name.as_str()) {
                metric_names.push(name);
            }
        }
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| summary_io(path, err))?;
    }
    let mut writer = csv::Writer::from_path(path).map_err(|err| summary_io(path, err))?;
    let mut header = vec!["train_set", "seed", "backbone", "model_rev", "test_set", "weight_file"];
    header.extend(metric_names.iter().copied());
    writer.write_record(&header).map_err(|err| summary_io(path, err))?;

    for row in rows {
        let model = &row.key.model;
        let mut record = vec![
            model.train_set.clone(),
            model.seed.to_string(),
            model.backbone.clone(),
            model.model_rev.to_string(),
            row.key.test_set.clone(),
            row.result.weight_file.clone(),
        ];
        for name in &metric_names {
            let value = row
                .result
                .metrics
                .iter()
                .find(|(metric, _)| metric.as_str() == *name)
                .map(|(_, value)| value.to_string())
                .unwrap_or_default();
            record.push(value);
        }
        writer.write_record(&record).map_err(|err| summary_io(path, err))?;
    }
    writer.flush().map_err(|err| summary_io(path, err))
}

fn summary_io(path: &Path, err: impl ToString) -> SweepError {
    SweepError::Serde(ErrorInfo::new("summary.write", err.to_string()).with_path(path))
}
