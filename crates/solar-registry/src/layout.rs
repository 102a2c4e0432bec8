//! Naming templates for the on-disk experiment layout.
//!
//! Other tooling reads these directories directly, so every template here is
//! part of the persisted contract.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use solar_core::{ModelRev, Seed};

/// Dataset partition a list file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    /// Held-out evaluation samples.
    Test,
    /// Samples used to fit the model.
    Train,
    /// Samples used for early stopping and checkpoint selection.
    Valid,
}

impl Split {
    /// All splits in list-file order.
    pub const ALL: [Split; 3] = [Split::Test, Split::Train, Split::Valid];

    /// Name used in list file names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Split::Test => "test",
            Split::Train => "train",
            Split::Valid => "valid",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a list file enumerates images or masks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// RGB tiles.
    Img,
    /// Binary segmentation masks.
    Mask,
}

impl Channel {
    /// Name used in list file names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Img => "img",
            Channel::Mask => "mask",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) fn tiles_root(data_root: &Path, set: &str) -> PathBuf {
    data_root.join(set).join("tiles")
}

pub(crate) fn model_output_root(data_root: &Path, set: &str) -> PathBuf {
    data_root.join(set).join("models")
}

pub(crate) fn prediction_root(data_root: &Path, set: &str) -> PathBuf {
    data_root.join(set).join("predictions")
}

/// `{split}_{img|mask}_{seed}.txt`
pub fn list_file_name(split: Split, channel: Channel, seed: Seed) -> String {
    format!("{split}_{channel}_{seed}.txt")
}

/// `{train_set}_{backbone}_{seed}_v{model_rev}`, the shared prefix of every
/// model artifact and evaluation directory of one training run.
pub fn run_prefix(train_set: &str, backbone: &str, seed: Seed, model_rev: &ModelRev) -> String {
    format!("{train_set}_{backbone}_{seed}_v{model_rev}")
}

pub(crate) fn best_weights_name(prefix: &str) -> String {
    format!("{prefix}_weights_best.h5")
}

pub(crate) fn final_weights_name(prefix: &str) -> String {
    format!("{prefix}_weights_final.h5")
}

pub(crate) fn train_log_name(prefix: &str) -> String {
    format!("{prefix}_trainlog.csv")
}

/// `{prefix}_predicting_{test_set}`
pub fn prediction_dir_name(prefix: &str, test_set: &str) -> String {
    format!("{prefix}_predicting_{test_set}")
}

pub(crate) fn result_file_name(run_dir_name: &str) -> String {
    format!("{run_dir_name}_data.csv")
}

pub(crate) const PRED_MASKS_DIR: &str = "pred_masks";
pub(crate) const PLOTS_DIR: &str = "plots";
