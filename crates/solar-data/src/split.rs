//! Fresh, seeded test/train/valid split of a plain tile set.

use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use solar_core::errors::{ErrorInfo, SweepError};
use solar_core::{RngHandle, Seed};
use solar_registry::layout::list_file_name;
use solar_registry::{Channel, Split};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::list::write_list_group;

/// Test, train and validation fractions of a dataset budget.
///
/// Serialized as a three element `[test, train, valid]` array. The fractions
/// are not required to sum to one; each split receives its rounded share and
/// is clamped to the samples that remain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 3]", into = "[f64; 3]")]
pub struct SplitFractions {
    test: f64,
    train: f64,
    valid: f64,
}

impl SplitFractions {
    /// Creates a set of fractions; each must be finite and non-negative.
    pub fn new(test: f64, train: f64, valid: f64) -> Result<Self, SweepError> {
        for (name, value) in [("test", test), ("train", train), ("valid", valid)] {
            if !value.is_finite() || value < 0.0 {
                return Err(SweepError::Config(
                    ErrorInfo::new("config.split_fraction", "split fractions must be finite and non-negative")
                        .with_context("split", name)
                        .with_context("value", value.to_string()),
                ));
            }
        }
        Ok(Self { test, train, valid })
    }

    /// Fraction assigned to `split`.
    pub fn get(&self, split: Split) -> f64 {
        match split {
            Split::Test => self.test,
            Split::Train => self.train,
            Split::Valid => self.valid,
        }
    }
}

impl Default for SplitFractions {
    fn default() -> Self {
        Self {
            test: 0.1,
            train: 0.8,
            valid: 0.1,
        }
    }
}

impl TryFrom<[f64; 3]> for SplitFractions {
    type Error = SweepError;

    fn try_from(value: [f64; 3]) -> Result<Self, Self::Error> {
        Self::new(value[0], value[1], value[2])
    }
}

impl From<SplitFractions> for [f64; 3] {
    fn from(value: SplitFractions) -> Self {
        [value.test, value.train, value.valid]
    }
}

/// Number of samples a split receives out of `total`.
pub fn split_count(total: usize, fraction: f64) -> usize {
    (total as f64 * fraction).round() as usize
}

/// Sizes of a written split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SplitSummary {
    /// Samples in the test lists.
    pub test: usize,
    /// Samples in the train lists.
    pub train: usize,
    /// Samples in the validation lists.
    pub valid: usize,
    /// Images skipped because no mask with the same file name exists.
    pub unpaired: usize,
}

/// Partitions the tiles under `img_root`/`mask_root` into test, train and
/// validation lists written under `tiles_root`.
///
/// Images are paired with masks by file name and sorted before the seeded
/// shuffle, so the result depends only on the directory contents, the
/// fractions, the seed and `total_count`. List entries are file names
/// relative to the image and mask roots.
pub fn fresh_split(
    img_root: &Path,
    mask_root: &Path,
    tiles_root: &Path,
    fractions: SplitFractions,
    seed: Seed,
    total_count: Option<usize>,
) -> Result<SplitSummary, SweepError> {
    let (mut samples, unpaired) = paired_samples(img_root, mask_root)?;
    let available = samples.len();

    let mut rng = RngHandle::from_seed(seed);
    samples.shuffle(rng.inner_mut());

    let budget = match total_count {
        Some(requested) if requested > available => {
            warn!(
                img_root = %img_root.display(),
                requested,
                available,
                "insufficient samples for requested total, using all samples"
            );
            available
        }
        Some(requested) => requested,
        None => available,
    };
    samples.truncate(budget);

    let mut summary = SplitSummary {
        unpaired,
        ..SplitSummary::default()
    };
    let mut lists = Vec::with_capacity(Split::ALL.len());
    let mut start = 0;
    for split in Split::ALL {
        let count = split_count(budget, fractions.get(split)).min(budget - start);
        lists.push((
            split,
            tiles_root.join(list_file_name(split, Channel::Img, seed)),
            tiles_root.join(list_file_name(split, Channel::Mask, seed)),
            &samples[start..start + count],
        ));
        start += count;
        match split {
            Split::Test => summary.test = count,
            Split::Train => summary.train = count,
            Split::Valid => summary.valid = count,
        }
    }

    // The train image list marks the set as built, so it lands last.
    lists.sort_by_key(|(split, ..)| *split == Split::Train);
    let files: Vec<(&Path, &[String])> = lists
        .iter()
        .flat_map(|(_, img, mask, chunk)| [(mask.as_path(), *chunk), (img.as_path(), *chunk)])
        .collect();
    write_list_group(&files)?;

    info!(
        tiles_root = %tiles_root.display(),
        %seed,
        test = summary.test,
        train = summary.train,
        valid = summary.valid,
        "wrote fresh split"
    );
    Ok(summary)
}

fn paired_samples(img_root: &Path, mask_root: &Path) -> Result<(Vec<String>, usize), SweepError> {
    let mut samples = Vec::new();
    let mut unpaired = 0;
    let walker = WalkDir::new(img_root)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name();
    for entry in walker {
        let entry = entry.map_err(|err| {
            let path = err.path().map(Path::to_path_buf).unwrap_or_else(|| img_root.to_path_buf());
            SweepError::dataset_io("dataset.scan", &path, err)
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            warn!(path = %entry.path().display(), "skipping tile with non UTF-8 name");
            continue;
        };
        let mask: PathBuf = mask_root.join(&name);
        if mask.is_file() {
            samples.push(name);
        } else {
            warn!(image = %entry.path().display(), "no matching mask, skipping tile");
            unpaired += 1;
        }
    }
    if samples.is_empty() {
        return Err(SweepError::Dataset(
            ErrorInfo::new("dataset.no_samples", "no image/mask pairs found")
                .with_context("img_root", img_root.display().to_string())
                .with_context("mask_root", mask_root.display().to_string()),
        ));
    }
    Ok((samples, unpaired))
}
