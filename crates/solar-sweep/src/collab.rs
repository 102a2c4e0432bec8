//! Seams to the external training and evaluation collaborators.

use std::ops::{Deref, DerefMut};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use solar_core::errors::SweepError;
use solar_core::Seed;

/// Inputs of one training run, resolved from the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainJob {
    /// Root of the image list entries; `None` when entries are absolute.
    pub img_root: Option<PathBuf>,
    /// Root of the mask list entries; `None` when entries are absolute.
    pub mask_root: Option<PathBuf>,
    /// Train image list.
    pub train_img_list: PathBuf,
    /// Train mask list.
    pub train_mask_list: PathBuf,
    /// Validation image list, resolved against `img_root`.
    pub valid_img_list: PathBuf,
    /// Validation mask list, resolved against `mask_root`.
    pub valid_mask_list: PathBuf,
    /// Per-epoch CSV log.
    pub log_file: PathBuf,
    /// Checkpoint with the best validation loss.
    pub best_weights: PathBuf,
    /// Weights after the last epoch.
    pub final_weights: PathBuf,
    /// Backbone identifier.
    pub backbone: String,
    /// Seed of the run.
    pub seed: Seed,
    /// Square edge length tiles are resized to.
    pub size: u32,
    /// Maximum number of epochs.
    pub epochs: u32,
    /// Whether the encoder is frozen.
    pub freeze: bool,
    /// Early stopping patience; zero runs every epoch.
    pub patience: u32,
    /// Whether the decoder uses batch normalization.
    pub batchnorm: bool,
}

/// Inputs of one evaluation run, resolved from the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalJob {
    /// Image root of the test set.
    pub img_root: Option<PathBuf>,
    /// Mask root of the test set.
    pub mask_root: Option<PathBuf>,
    /// Test image list of the test set.
    pub test_img_list: PathBuf,
    /// Test mask list of the test set.
    pub test_mask_list: PathBuf,
    /// Weights of the trained model.
    pub weights: PathBuf,
    /// Two-row metric summary to write.
    pub result_file: PathBuf,
    /// Directory receiving predicted masks.
    pub prediction_dir: PathBuf,
    /// Directory receiving comparison plots; `None` disables plotting.
    pub plot_dir: Option<PathBuf>,
    /// Backbone identifier.
    pub backbone: String,
    /// Square edge length tiles are resized to.
    pub size: u32,
    /// Whether the decoder uses batch normalization.
    pub batchnorm: bool,
}

/// Resource owner that must be released between sweep cells.
pub trait Collaborator {
    /// Drops per-cell resources such as a loaded model. Called once at the
    /// end of every cell, whatever the cell's outcome.
    fn release(&mut self) {}
}

/// Trains a segmentation model.
pub trait Trainer: Collaborator {
    /// Runs one training job, writing the weights and log named in `job`.
    fn train(&mut self, job: &TrainJob) -> Result<(), SweepError>;
}

/// Evaluates a trained segmentation model.
pub trait Evaluator: Collaborator {
    /// Runs one evaluation job, writing the predictions and result file
    /// named in `job`.
    fn evaluate(&mut self, job: &EvalJob) -> Result<(), SweepError>;
}

/// Scoped access to a collaborator for one sweep cell.
///
/// Dropping the scope releases the collaborator, so early returns and
/// errors release it the same way completion does.
pub struct CellScope<'a, C: Collaborator + ?Sized> {
    collaborator: &'a mut C,
}

impl<'a, C: Collaborator + ?Sized> CellScope<'a, C> {
    /// Opens the scope of one cell.
    pub fn enter(collaborator: &'a mut C) -> Self {
        Self { collaborator }
    }
}

impl<C: Collaborator + ?Sized> Deref for CellScope<'_, C> {
    type Target = C;

    fn deref(&self) -> &C {
        self.collaborator
    }
}

impl<C: Collaborator + ?Sized> DerefMut for CellScope<'_, C> {
    fn deref_mut(&mut self) -> &mut C {
        self.collaborator
    }
}

impl<C: Collaborator + ?Sized> Drop for CellScope<'_, C> {
    fn drop(&mut self) {
        self.collaborator.release();
    }
}
