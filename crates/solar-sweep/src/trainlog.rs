//! File formats shared with the collaborators: the training log header and
//! the evaluation result CSV.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use solar_core::errors::{ErrorInfo, SweepError};

use crate::collab::TrainJob;

/// Column header of the per-epoch rows following the parameter block.
pub const EPOCH_HEADER: &str = "epoch,train_loss,train_IOU,val_loss,val_IOU";

fn optional_path(path: Option<&Path>) -> String {
    path.map(|path| path.display().to_string())
        .unwrap_or_else(|| "None".to_string())
}

/// Parameter names and rendered values echoed at the top of a training log.
pub fn train_log_parameters(job: &TrainJob) -> Vec<(&'static str, String)> {
    let img_root = optional_path(job.img_root.as_deref());
    let mask_root = optional_path(job.mask_root.as_deref());
    vec![
        ("train_img_dir", img_root.clone()),
        ("train_mask_dir", mask_root.clone()),
        ("train_img_file", job.train_img_list.display().to_string()),
        ("train_mask_file", job.train_mask_list.display().to_string()),
        ("valid_img_file", job.valid_img_list.display().to_string()),
        ("valid_mask_file", job.valid_mask_list.display().to_string()),
        ("best_weight_file", job.best_weights.display().to_string()),
        ("end_weight_file", job.final_weights.display().to_string()),
        ("valid_img_dir", img_root),
        ("valid_mask_dir", mask_root),
        ("backbone", job.backbone.clone()),
        ("seed", job.seed.to_string()),
        ("img_size", format!("({0}; {0})", job.size)),
        ("epochs", job.epochs.to_string()),
        ("freeze_encoder", job.freeze.to_string()),
        ("patience", job.patience.to_string()),
        ("batchnorm", job.batchnorm.to_string()),
    ]
}

/// Starts the training log of `job`: a row of parameter names, a row of
/// values with commas replaced by `;`, a blank line and [`EPOCH_HEADER`].
/// Every field is followed by a comma.
pub fn write_train_log_header(job: &TrainJob) -> Result<(), SweepError> {
    let params = train_log_parameters(job);
    let mut text = String::new();
    for (name, _) in &params {
        text.push_str(name);
        text.push(',');
    }
    text.push('\n');
    for (_, value) in &params {
        text.push_str(&value.replace(',', ";"));
        text.push(',');
    }
    text.push_str("\n\n");
    text.push_str(EPOCH_HEADER);
    text.push('\n');

    if let Some(parent) = job.log_file.parent() {
        fs::create_dir_all(parent)
            .map_err(|err| collab_io("collab.log_dir", parent, err))?;
    }
    fs::write(&job.log_file, text).map_err(|err| collab_io("collab.log_write", &job.log_file, err))
}

/// Metric summary of one evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalResult {
    /// File name of the weights that were evaluated.
    pub weight_file: String,
    /// Metric names and values in column order.
    pub metrics: Vec<(String, f64)>,
}

/// Writes `result` as a header row (`weight file` and metric names) and a
/// data row.
///
/// This is the result file format [`read_result_csv`] and the summary expect.
/// In-process [`Evaluator`](crate::Evaluator) implementations call it to
/// record their metrics; external programs must write the same layout.
pub fn write_result_csv(path: &Path, result: &EvalResult) -> Result<(), SweepError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| collab_io("collab.result_dir", parent, err))?;
    }
    let mut writer = csv::Writer::from_path(path).map_err(|err| collab_io("collab.result_write", path, err))?;
    let mut header = vec!["weight file".to_string()];
    header.extend(result.metrics.iter().map(|(name, _)| name.clone()));
    let mut row = vec![result.weight_file.clone()];
    row.extend(result.metrics.iter().map(|(_, value)| value.to_string()));
    writer
        .write_record(&header)
        .and_then(|_| writer.write_record(&row))
        .map_err(|err| collab_io("collab.result_write", path, err))?;
    writer.flush().map_err(|err| collab_io("collab.result_write", path, err))
}

/// Reads a result file written by an evaluation collaborator.
pub fn read_result_csv(path: &Path) -> Result<EvalResult, SweepError> {
    let mut reader = csv::Reader::from_path(path).map_err(|err| result_error(path, err))?;
    let header = reader.headers().map_err(|err| result_error(path, err))?.clone();
    let row = match reader.records().next() {
        Some(row) => row.map_err(|err| result_error(path, err))?,
        None => return Err(result_error(path, "result file has no data row")),
    };
    let weight_file = row.get(0).unwrap_or_default().to_string();
    let mut metrics = Vec::with_capacity(header.len().saturating_sub(1));
    for (name, value) in header.iter().zip(row.iter()).skip(1) {
        let value = value.trim().parse::<f64>().map_err(|err| {
            SweepError::Serde(
                ErrorInfo::new("serde.result_csv", err.to_string())
                    .with_path(path)
                    .with_context("metric", name),
            )
        })?;
        metrics.push((name.to_string(), value));
    }
    Ok(EvalResult { weight_file, metrics })
}

fn collab_io(code: &str, path: &Path, err: impl ToString) -> SweepError {
    SweepError::Collaborator(ErrorInfo::new(code, err.to_string()).with_path(path))
}

fn result_error(path: &Path, err: impl ToString) -> SweepError {
    SweepError::Serde(ErrorInfo::new("serde.result_csv", err.to_string()).with_path(path))
}
