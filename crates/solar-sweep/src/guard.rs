//! Skip, overwrite or proceed decisions for outputs of earlier runs.
//!
//! Every expensive step of a sweep checks its output location here before
//! opening any output path, which is what makes a sweep resumable: rerunning
//! it skips whatever already finished.

use std::fs;
use std::io;
use std::path::Path;

use solar_core::errors::SweepError;
use solar_registry::{EvalArtifacts, ModelArtifacts, SplitLists};
use tracing::{debug, info};

/// Output of one sweep cell as seen by the guard.
#[derive(Debug, Clone, Copy)]
pub enum OutputLocation<'a> {
    /// Dataset lists of a `(train_set, seed)` pair. Present only when every
    /// list the dataset stage writes for the pair exists.
    Lists {
        /// Registry paths of the pair's lists.
        lists: &'a SplitLists,
        /// Whether test lists are written too; combos only get train and
        /// validation lists.
        with_test: bool,
    },
    /// Model artifacts of a training run; the best weights mark them as
    /// present.
    Weights(&'a ModelArtifacts),
    /// Evaluation outputs. Present when the prediction directory is non-empty,
    /// or the plot directory is non-empty and plots are requested.
    Predictions {
        /// Registry paths of the evaluation run.
        artifacts: &'a EvalArtifacts,
        /// Whether the evaluation writes comparison plots.
        plots: bool,
    },
}

impl OutputLocation<'_> {
    /// Path used to identify the location in status lines.
    pub fn marker(&self) -> &Path {
        match self {
            OutputLocation::Lists { lists, .. } => &lists.train_img,
            OutputLocation::Weights(artifacts) => &artifacts.best_weights,
            OutputLocation::Predictions { artifacts, .. } => &artifacts.prediction_dir,
        }
    }

    /// Returns true when earlier output exists at this location.
    pub fn is_present(&self) -> Result<bool, SweepError> {
        match self {
            OutputLocation::Lists { lists, with_test } => Ok(lists
                .all()
                .into_iter()
                .filter(|list| *with_test || (*list != lists.test_img && *list != lists.test_mask))
                .all(Path::exists)),
            OutputLocation::Weights(artifacts) => Ok(artifacts.best_weights.exists()),
            OutputLocation::Predictions { artifacts, plots } => {
                if dir_has_entries(&artifacts.prediction_dir)? {
                    return Ok(true);
                }
                Ok(*plots && dir_has_entries(&artifacts.plot_dir)?)
            }
        }
    }
}

/// Outcome of [`prepare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// The location is empty or was cleared; the step should run.
    Proceed,
    /// Earlier output exists and overwriting is disabled.
    Skip,
}

/// Returns true when the step writing `location` should be skipped.
pub fn should_skip(location: &OutputLocation<'_>, overwrite: bool) -> Result<bool, SweepError> {
    Ok(!overwrite && location.is_present()?)
}

/// Removes every output of `location`. Missing files are not an error.
pub fn clear(location: &OutputLocation<'_>) -> Result<(), SweepError> {
    match location {
        OutputLocation::Lists { lists, .. } => {
            for file in lists.all() {
                remove_file(file)?;
            }
        }
        OutputLocation::Weights(artifacts) => {
            remove_file(&artifacts.best_weights)?;
            remove_file(&artifacts.final_weights)?;
            remove_file(&artifacts.train_log)?;
        }
        OutputLocation::Predictions { artifacts, .. } => {
            remove_dir(&artifacts.prediction_dir)?;
            remove_dir(&artifacts.plot_dir)?;
            remove_file(&artifacts.result_file)?;
        }
    }
    debug!(marker = %location.marker().display(), "cleared earlier output");
    Ok(())
}

/// Applies the guard to `location`.
///
/// Absent output proceeds; present output is skipped with a status line
/// unless `overwrite` is set, in which case it is cleared first. On proceed
/// the output directories of the location exist afterwards.
pub fn prepare(location: &OutputLocation<'_>, overwrite: bool) -> Result<GuardDecision, SweepError> {
    if location.is_present()? {
        if !overwrite {
            info!(output = %location.marker().display(), "output exists, skipping");
            return Ok(GuardDecision::Skip);
        }
        info!(output = %location.marker().display(), "output exists, overwriting");
        clear(location)?;
    }
    create_dirs(location)?;
    Ok(GuardDecision::Proceed)
}

fn create_dirs(location: &OutputLocation<'_>) -> Result<(), SweepError> {
    match location {
        OutputLocation::Lists { lists, .. } => create_parent(&lists.train_img),
        OutputLocation::Weights(artifacts) => create_parent(&artifacts.best_weights),
        OutputLocation::Predictions { artifacts, plots } => {
            create_dir(&artifacts.prediction_dir)?;
            if *plots {
                create_dir(&artifacts.plot_dir)?;
            }
            Ok(())
        }
    }
}

fn create_parent(path: &Path) -> Result<(), SweepError> {
    match path.parent() {
        Some(parent) => create_dir(parent),
        None => Ok(()),
    }
}

fn create_dir(dir: &Path) -> Result<(), SweepError> {
    fs::create_dir_all(dir).map_err(|err| SweepError::guard_io("guard.create_dir", dir, err))
}

fn dir_has_entries(dir: &Path) -> Result<bool, SweepError> {
    match fs::read_dir(dir) {
        Ok(mut entries) => Ok(entries.next().is_some()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(SweepError::guard_io("guard.read_dir", dir, err)),
    }
}

fn remove_file(path: &Path) -> Result<(), SweepError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(SweepError::guard_io("guard.remove_file", path, err)),
    }
}

fn remove_dir(path: &Path) -> Result<(), SweepError> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(SweepError::guard_io("guard.remove_dir", path, err)),
    }
}
