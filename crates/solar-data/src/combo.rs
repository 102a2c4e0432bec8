//! Combo dataset composition: seeded, budgeted merge of existing split lists.

use std::path::{Path, PathBuf};

use rand::seq::index;
use serde::{Deserialize, Serialize};
use solar_core::errors::{ErrorInfo, SweepError};
use solar_core::{RngHandle, Seed};
use solar_registry::{Channel, Registry, Split, SplitKey};
use tracing::debug;

use crate::list::{absolutize, read_sample_list, write_list, write_list_group, write_list_pair};
use crate::split::{split_count, SplitFractions};

/// One constituent list of a combo role together with the root its entries
/// are relative to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComboSource {
    /// Already written split list of the constituent.
    pub list_file: PathBuf,
    /// Root the list entries resolve against; `None` when entries are absolute.
    pub root: Option<PathBuf>,
}

impl ComboSource {
    /// Pairs a list file with its root.
    pub fn new(list_file: impl Into<PathBuf>, root: Option<PathBuf>) -> Self {
        Self {
            list_file: list_file.into(),
            root,
        }
    }
}

/// Composes one combo list file.
///
/// Every constituent list is read and resolved to absolute paths, the
/// entries are concatenated in constituent order, and `total_count` distinct
/// entries are drawn with a `StdRng` seeded by `seed`. The selection depends
/// only on the concatenated length, `total_count` and `seed`; identical
/// inputs therefore produce byte-identical output. Returns the number of
/// entries written.
pub fn compose_combo(
    sources: &[ComboSource],
    output_file: &Path,
    total_count: usize,
    seed: Seed,
) -> Result<usize, SweepError> {
    let pool = resolve_sources(sources)?;
    let picks = draw(pool.len(), total_count, seed, output_file)?;
    let lines = select(&pool, &picks);
    write_list(output_file, &lines)?;
    debug!(output = %output_file.display(), entries = lines.len(), "composed combo list");
    Ok(lines.len())
}

/// Composes the image and mask lists of one combo split together.
///
/// Image and mask constituents must match one to one in length, so a single
/// draw of indices selects corresponding lines from both pools. Both files
/// are finalized only after both are fully written.
pub fn compose_combo_pair(
    img_sources: &[ComboSource],
    mask_sources: &[ComboSource],
    img_output: &Path,
    mask_output: &Path,
    total_count: usize,
    seed: Seed,
) -> Result<usize, SweepError> {
    let (img_lines, mask_lines) = draw_pair(img_sources, mask_sources, img_output, total_count, seed)?;
    write_list_pair(img_output, &img_lines, mask_output, &mask_lines)?;
    debug!(
        img_output = %img_output.display(),
        mask_output = %mask_output.display(),
        entries = img_lines.len(),
        "composed combo list pair"
    );
    Ok(img_lines.len())
}

fn draw_pair(
    img_sources: &[ComboSource],
    mask_sources: &[ComboSource],
    img_output: &Path,
    total_count: usize,
    seed: Seed,
) -> Result<(Vec<String>, Vec<String>), SweepError> {
    if img_sources.len() != mask_sources.len() {
        return Err(SweepError::Dataset(
            ErrorInfo::new("dataset.pair_mismatch", "image and mask constituents differ")
                .with_context("img_sources", img_sources.len().to_string())
                .with_context("mask_sources", mask_sources.len().to_string()),
        ));
    }
    let mut img_pool = Vec::new();
    let mut mask_pool = Vec::new();
    for (img, mask) in img_sources.iter().zip(mask_sources) {
        let imgs = resolve_source(img)?;
        let masks = resolve_source(mask)?;
        if imgs.len() != masks.len() {
            return Err(SweepError::Dataset(
                ErrorInfo::new("dataset.pair_mismatch", "constituent image and mask lists differ in length")
                    .with_context("img_list", img.list_file.display().to_string())
                    .with_context("img_lines", imgs.len().to_string())
                    .with_context("mask_list", mask.list_file.display().to_string())
                    .with_context("mask_lines", masks.len().to_string()),
            ));
        }
        img_pool.extend(imgs);
        mask_pool.extend(masks);
    }

    let picks = draw(img_pool.len(), total_count, seed, img_output)?;
    let img_lines = select(&img_pool, &picks).into_iter().map(str::to_string).collect();
    let mask_lines = select(&mask_pool, &picks).into_iter().map(str::to_string).collect();
    Ok((img_lines, mask_lines))
}

fn resolve_sources(sources: &[ComboSource]) -> Result<Vec<String>, SweepError> {
    let mut pool = Vec::new();
    for source in sources {
        pool.extend(resolve_source(source)?);
    }
    Ok(pool)
}

fn resolve_source(source: &ComboSource) -> Result<Vec<String>, SweepError> {
    read_sample_list(&source.list_file, source.root.as_deref())?
        .into_iter()
        .map(|path| absolutize(path).map(|path| path.display().to_string()))
        .collect()
}

fn draw(available: usize, total_count: usize, seed: Seed, output: &Path) -> Result<Vec<usize>, SweepError> {
    if total_count > available {
        return Err(SweepError::Dataset(
            ErrorInfo::new("dataset.insufficient_samples", "constituents hold fewer samples than requested")
                .with_path(output)
                .with_context("requested", total_count.to_string())
                .with_context("available", available.to_string()),
        ));
    }
    let mut rng = RngHandle::from_seed(seed);
    Ok(index::sample(rng.inner_mut(), available, total_count).into_vec())
}

fn select<'a>(pool: &'a [String], picks: &[usize]) -> Vec<&'a str> {
    picks.iter().map(|&idx| pool[idx].as_str()).collect()
}

/// Sizes of the lists written for one combo set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ComboSummary {
    /// Entries in the combo's train lists.
    pub train: usize,
    /// Entries in the combo's validation lists.
    pub valid: usize,
}

/// Composes the train and validation lists of `combo` from `constituents`.
///
/// Constituent split lists must already be on disk; the caller orders the
/// sweep so that constituents are split before the combos drawing on them.
/// Combos are never test sets, so no test lists are composed. Both splits are
/// drawn before anything is written and the four lists land as one group with
/// the train image list last, so a failed draw leaves no lists behind.
pub fn compose_combo_set(
    registry: &Registry,
    combo: &str,
    constituents: &[String],
    seed: Seed,
    total_count: usize,
    fractions: SplitFractions,
) -> Result<ComboSummary, SweepError> {
    let target = registry.split_lists(&SplitKey::new(combo, seed))?;
    let mut drawn = Vec::with_capacity(2);
    for split in [Split::Valid, Split::Train] {
        let mut img_sources = Vec::with_capacity(constituents.len());
        let mut mask_sources = Vec::with_capacity(constituents.len());
        for constituent in constituents {
            let set = registry.set(constituent)?;
            let lists = registry.split_lists(&SplitKey::new(constituent.as_str(), seed))?;
            for channel in [Channel::Img, Channel::Mask] {
                let list_file = lists.get(split, channel);
                if !list_file.is_file() {
                    return Err(SweepError::Dataset(
                        ErrorInfo::new("dataset.missing_constituent_split", "constituent split list does not exist")
                            .with_path(list_file)
                            .with_context("combo", combo)
                            .with_context("constituent", constituent.as_str())
                            .with_hint("list constituents before the combos built from them"),
                    ));
                }
            }
            img_sources.push(ComboSource::new(
                lists.get(split, Channel::Img),
                set.root_for(Channel::Img).map(Path::to_path_buf),
            ));
            mask_sources.push(ComboSource::new(
                lists.get(split, Channel::Mask),
                set.root_for(Channel::Mask).map(Path::to_path_buf),
            ));
        }
        let count = split_count(total_count, fractions.get(split));
        let img_output = target.get(split, Channel::Img);
        let (img_lines, mask_lines) = draw_pair(&img_sources, &mask_sources, img_output, count, seed)?;
        drawn.push((split, img_lines, mask_lines));
    }

    let mut files: Vec<(&Path, &[String])> = Vec::with_capacity(4);
    for (split, img_lines, mask_lines) in &drawn {
        files.push((target.get(*split, Channel::Mask), mask_lines.as_slice()));
        files.push((target.get(*split, Channel::Img), img_lines.as_slice()));
    }
    write_list_group(&files)?;

    let mut summary = ComboSummary::default();
    for (split, img_lines, _) in &drawn {
        match split {
            Split::Train => summary.train = img_lines.len(),
            _ => summary.valid = img_lines.len(),
        }
    }
    debug!(combo, %seed, train = summary.train, valid = summary.valid, "composed combo set");
    Ok(summary)
}
