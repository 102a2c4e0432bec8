use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use solar_core::errors::{ErrorInfo, SweepError};
use solar_core::{ModelRev, Seed};

use crate::combo::{is_combo_name, ComboSpec};
use crate::layout::{self, Channel, Split};

fn registry_error(code: &str, message: impl Into<String>) -> SweepError {
    SweepError::Registry(ErrorInfo::new(code, message))
}

/// Ordered dimension sequences of one sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepDims {
    /// Train sets, constituents listed before the combos built from them.
    pub train_sets: Vec<String>,
    /// Seeds; an absent seed renders as `None`.
    pub seeds: Vec<Seed>,
    /// Backbone identifiers.
    pub backbones: Vec<String>,
    /// Opaque revision tags.
    pub model_revs: Vec<ModelRev>,
    /// Evaluation sets; must be plain train sets of the same sweep.
    pub test_sets: Vec<String>,
}

/// How the samples of a train set are sourced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SetLayout {
    /// Tiles read directly from disk.
    Plain {
        /// Image tile directory.
        img_root: PathBuf,
        /// Mask tile directory.
        mask_root: PathBuf,
    },
    /// Samples drawn from other train sets. `None` when the sweep declares no
    /// constituents for this combo; the dataset stage reports and skips it.
    Combo {
        /// Constituent train sets in declared order.
        constituents: Option<Vec<String>>,
    },
}

/// Set-level directories of a train set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetPaths {
    /// Train set identifier.
    pub name: String,
    /// Directory holding the tile folders and list files.
    pub tiles_root: PathBuf,
    /// Plain or combo sourcing.
    pub layout: SetLayout,
    /// Directory receiving weights and training logs.
    pub model_output_root: PathBuf,
    /// Directory receiving evaluation outputs.
    pub prediction_root: PathBuf,
}

impl SetPaths {
    /// Image root of a plain set; `None` for combos.
    pub fn img_root(&self) -> Option<&Path> {
        match &self.layout {
            SetLayout::Plain { img_root, .. } => Some(img_root),
            SetLayout::Combo { .. } => None,
        }
    }

    /// Mask root of a plain set; `None` for combos.
    pub fn mask_root(&self) -> Option<&Path> {
        match &self.layout {
            SetLayout::Plain { mask_root, .. } => Some(mask_root),
            SetLayout::Combo { .. } => None,
        }
    }

    /// Root a list line of `channel` is resolved against.
    pub fn root_for(&self, channel: Channel) -> Option<&Path> {
        match channel {
            Channel::Img => self.img_root(),
            Channel::Mask => self.mask_root(),
        }
    }

    /// Returns true for combo sets.
    pub fn is_combo(&self) -> bool {
        matches!(self.layout, SetLayout::Combo { .. })
    }
}

/// The six dataset list files of a `(train_set, seed)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitLists {
    /// Test image list.
    pub test_img: PathBuf,
    /// Test mask list.
    pub test_mask: PathBuf,
    /// Train image list.
    pub train_img: PathBuf,
    /// Train mask list.
    pub train_mask: PathBuf,
    /// Validation image list.
    pub valid_img: PathBuf,
    /// Validation mask list.
    pub valid_mask: PathBuf,
}

impl SplitLists {
    fn new(tiles_root: &Path, seed: Seed) -> Self {
        let file = |split, channel| tiles_root.join(layout::list_file_name(split, channel, seed));
        Self {
            test_img: file(Split::Test, Channel::Img),
            test_mask: file(Split::Test, Channel::Mask),
            train_img: file(Split::Train, Channel::Img),
            train_mask: file(Split::Train, Channel::Mask),
            valid_img: file(Split::Valid, Channel::Img),
            valid_mask: file(Split::Valid, Channel::Mask),
        }
    }

    /// Returns the list file of one split and channel.
    pub fn get(&self, split: Split, channel: Channel) -> &Path {
        match (split, channel) {
            (Split::Test, Channel::Img) => &self.test_img,
            (Split::Test, Channel::Mask) => &self.test_mask,
            (Split::Train, Channel::Img) => &self.train_img,
            (Split::Train, Channel::Mask) => &self.train_mask,
            (Split::Valid, Channel::Img) => &self.valid_img,
            (Split::Valid, Channel::Mask) => &self.valid_mask,
        }
    }

    /// All six list files in split order, image before mask.
    pub fn all(&self) -> [&Path; 6] {
        [
            &self.test_img,
            &self.test_mask,
            &self.train_img,
            &self.train_mask,
            &self.valid_img,
            &self.valid_mask,
        ]
    }
}

/// Artifacts of one training run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelArtifacts {
    /// Checkpoint with the best validation loss.
    pub best_weights: PathBuf,
    /// Weights at the end of training.
    pub final_weights: PathBuf,
    /// Per-epoch CSV log.
    pub train_log: PathBuf,
}

/// Outputs of evaluating one trained model against one test set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalArtifacts {
    /// Predicted masks, one image per test sample.
    pub prediction_dir: PathBuf,
    /// Four-panel comparison figures.
    pub plot_dir: PathBuf,
    /// Two-row metric summary.
    pub result_file: PathBuf,
}

impl EvalArtifacts {
    /// Directory holding all three outputs.
    pub fn run_dir(&self) -> &Path {
        self.result_file.parent().unwrap_or_else(|| Path::new(""))
    }
}

/// Key of the dataset lists of a train set.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SplitKey {
    /// Train set identifier.
    pub train_set: String,
    /// Seed of the split.
    pub seed: Seed,
}

impl SplitKey {
    /// Builds a key from its components.
    pub fn new(train_set: impl Into<String>, seed: Seed) -> Self {
        Self {
            train_set: train_set.into(),
            seed,
        }
    }
}

/// Key of a training run.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModelKey {
    /// Train set identifier.
    pub train_set: String,
    /// Seed of the run.
    pub seed: Seed,
    /// Backbone identifier.
    pub backbone: String,
    /// Revision tag.
    pub model_rev: ModelRev,
}

impl ModelKey {
    /// Builds a key from its components.
    pub fn new(
        train_set: impl Into<String>,
        seed: Seed,
        backbone: impl Into<String>,
        model_rev: ModelRev,
    ) -> Self {
        Self {
            train_set: train_set.into(),
            seed,
            backbone: backbone.into(),
            model_rev,
        }
    }

    /// Key of the dataset lists this run trains on.
    pub fn split_key(&self) -> SplitKey {
        SplitKey::new(self.train_set.as_str(), self.seed)
    }

    /// Shared file-name prefix of the run.
    pub fn prefix(&self) -> String {
        layout::run_prefix(&self.train_set, &self.backbone, self.seed, &self.model_rev)
    }

    /// Extends the key with a test set.
    pub fn evaluated_on(&self, test_set: impl Into<String>) -> EvalKey {
        EvalKey {
            model: self.clone(),
            test_set: test_set.into(),
        }
    }
}

/// Key of an evaluation run: a trained model and the set it predicts.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EvalKey {
    /// Trained model being evaluated.
    pub model: ModelKey,
    /// Test set being predicted.
    pub test_set: String,
}

impl EvalKey {
    /// Key of the test set's lists under the model's seed.
    pub fn test_split_key(&self) -> SplitKey {
        SplitKey::new(self.test_set.as_str(), self.model.seed)
    }
}

/// Single labelled path, used when listing the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathRecord {
    /// Slash separated key and field, e.g. `NY-Q/42/train_img`.
    pub label: String,
    /// Resolved path.
    pub path: PathBuf,
}

/// Immutable, fully populated path registry of one sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry {
    data_root: PathBuf,
    dims: SweepDims,
    sets: BTreeMap<String, SetPaths>,
    splits: BTreeMap<SplitKey, SplitLists>,
    models: BTreeMap<ModelKey, ModelArtifacts>,
    evals: BTreeMap<EvalKey, EvalArtifacts>,
}

impl Registry {
    /// Root directory of the whole layout.
    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    /// Dimension sequences in sweep nesting order.
    pub fn dims(&self) -> &SweepDims {
        &self.dims
    }

    /// Set-level paths of `train_set`.
    pub fn set(&self, train_set: &str) -> Result<&SetPaths, SweepError> {
        self.sets.get(train_set).ok_or_else(|| {
            SweepError::Registry(
                ErrorInfo::new("registry.unknown_set", "train set is not part of the sweep")
                    .with_context("train_set", train_set),
            )
        })
    }

    /// Dataset list files of a `(train_set, seed)` pair.
    pub fn split_lists(&self, key: &SplitKey) -> Result<&SplitLists, SweepError> {
        self.splits.get(key).ok_or_else(|| {
            SweepError::Registry(
                ErrorInfo::new("registry.unknown_split", "split key is not part of the sweep")
                    .with_context("train_set", key.train_set.as_str())
                    .with_context("seed", key.seed.to_string()),
            )
        })
    }

    /// Model artifacts of a training run.
    pub fn model_artifacts(&self, key: &ModelKey) -> Result<&ModelArtifacts, SweepError> {
        self.models.get(key).ok_or_else(|| {
            SweepError::Registry(
                ErrorInfo::new("registry.unknown_model", "model key is not part of the sweep")
                    .with_context("run", key.prefix()),
            )
        })
    }

    /// Evaluation outputs of an evaluation run.
    pub fn eval_artifacts(&self, key: &EvalKey) -> Result<&EvalArtifacts, SweepError> {
        self.evals.get(key).ok_or_else(|| {
            SweepError::Registry(
                ErrorInfo::new("registry.unknown_eval", "eval key is not part of the sweep")
                    .with_context("run", key.model.prefix())
                    .with_context("test_set", key.test_set.as_str()),
            )
        })
    }

    /// Training run keys in `train_set → seed → backbone → model_rev` order.
    pub fn model_keys(&self) -> Vec<ModelKey> {
        let dims = &self.dims;
        let mut keys = Vec::with_capacity(self.models.len());
        for train_set in &dims.train_sets {
            for &seed in &dims.seeds {
                for backbone in &dims.backbones {
                    for model_rev in &dims.model_revs {
                        keys.push(ModelKey::new(
                            train_set.as_str(),
                            seed,
                            backbone.as_str(),
                            model_rev.clone(),
                        ));
                    }
                }
            }
        }
        keys
    }

    /// Evaluation keys in sweep order with `test_set` innermost.
    pub fn eval_keys(&self) -> Vec<EvalKey> {
        self.model_keys()
            .into_iter()
            .flat_map(|model| {
                self.dims
                    .test_sets
                    .iter()
                    .map(move |test_set| model.evaluated_on(test_set.as_str()))
            })
            .collect()
    }

    /// Every path of the registry, labelled by key and field.
    pub fn listing(&self) -> Vec<PathRecord> {
        let mut records = Vec::new();
        let mut push = |label: String, path: &Path| {
            records.push(PathRecord {
                label,
                path: path.to_path_buf(),
            })
        };
        for set in self.sets.values() {
            push(format!("{}/tiles_root", set.name), &set.tiles_root);
            if let SetLayout::Plain {
                img_root,
                mask_root,
            } = &set.layout
            {
                push(format!("{}/img_root", set.name), img_root);
                push(format!("{}/mask_root", set.name), mask_root);
            }
            push(format!("{}/model_output_root", set.name), &set.model_output_root);
            push(format!("{}/prediction_root", set.name), &set.prediction_root);
        }
        for (key, lists) in &self.splits {
            let base = format!("{}/{}", key.train_set, key.seed);
            for split in Split::ALL {
                for channel in [Channel::Img, Channel::Mask] {
                    push(format!("{base}/{split}_{channel}"), lists.get(split, channel));
                }
            }
        }
        for (key, artifacts) in &self.models {
            let base = format!(
                "{}/{}/{}/v{}",
                key.train_set, key.seed, key.backbone, key.model_rev
            );
            push(format!("{base}/best_weights"), &artifacts.best_weights);
            push(format!("{base}/final_weights"), &artifacts.final_weights);
            push(format!("{base}/train_log"), &artifacts.train_log);
        }
        for (key, artifacts) in &self.evals {
            let model = &key.model;
            let base = format!(
                "{}/{}/{}/v{}/{}",
                model.train_set, model.seed, model.backbone, model.model_rev, key.test_set
            );
            push(format!("{base}/prediction_dir"), &artifacts.prediction_dir);
            push(format!("{base}/plot_dir"), &artifacts.plot_dir);
            push(format!("{base}/result_file"), &artifacts.result_file);
        }
        records
    }
}

/// Builds the registry for a sweep.
///
/// Path derivation is pure arithmetic over the inputs. Validation rejects
/// identifiers that would make two keys render to the same file name, combos
/// used as test sets, test sets and combo constituents that are not plain
/// train sets of the sweep, and empty or duplicated dimension values.
pub fn build_registry(
    data_root: impl Into<PathBuf>,
    dims: SweepDims,
    combos: &ComboSpec,
) -> Result<Registry, SweepError> {
    let data_root = data_root.into();
    validate_dims(&dims)?;
    validate_combos(&dims, combos)?;

    let mut sets = BTreeMap::new();
    let mut splits = BTreeMap::new();
    let mut models = BTreeMap::new();
    let mut evals = BTreeMap::new();

    for train_set in &dims.train_sets {
        let set = set_paths(&data_root, train_set, combos);
        for &seed in &dims.seeds {
            splits.insert(
                SplitKey::new(train_set.as_str(), seed),
                SplitLists::new(&set.tiles_root, seed),
            );
            for backbone in &dims.backbones {
                for model_rev in &dims.model_revs {
                    let key = ModelKey::new(train_set.as_str(), seed, backbone.as_str(), model_rev.clone());
                    let prefix = key.prefix();
                    models.insert(
                        key.clone(),
                        ModelArtifacts {
                            best_weights: set
                                .model_output_root
                                .join(layout::best_weights_name(&prefix)),
                            final_weights: set
                                .model_output_root
                                .join(layout::final_weights_name(&prefix)),
                            train_log: set.model_output_root.join(layout::train_log_name(&prefix)),
                        },
                    );
                    for test_set in &dims.test_sets {
                        let dir_name = layout::prediction_dir_name(&prefix, test_set);
                        let run_dir = set.prediction_root.join(&dir_name);
                        evals.insert(
                            key.evaluated_on(test_set.as_str()),
                            EvalArtifacts {
                                prediction_dir: run_dir.join(layout::PRED_MASKS_DIR),
                                plot_dir: run_dir.join(layout::PLOTS_DIR),
                                result_file: run_dir.join(layout::result_file_name(&dir_name)),
                            },
                        );
                    }
                }
            }
        }
        sets.insert(train_set.clone(), set);
    }

    Ok(Registry {
        data_root,
        dims,
        sets,
        splits,
        models,
        evals,
    })
}

fn set_paths(data_root: &Path, train_set: &str, combos: &ComboSpec) -> SetPaths {
    let tiles_root = layout::tiles_root(data_root, train_set);
    let source = if is_combo_name(train_set) {
        SetLayout::Combo {
            constituents: combos.constituents(train_set).map(<[String]>::to_vec),
        }
    } else {
        SetLayout::Plain {
            img_root: tiles_root.join("img"),
            mask_root: tiles_root.join("mask"),
        }
    };
    SetPaths {
        name: train_set.to_string(),
        layout: source,
        model_output_root: layout::model_output_root(data_root, train_set),
        prediction_root: layout::prediction_root(data_root, train_set),
        tiles_root,
    }
}

fn validate_dims(dims: &SweepDims) -> Result<(), SweepError> {
    non_empty("train_sets", dims.train_sets.len())?;
    non_empty("seeds", dims.seeds.len())?;
    non_empty("backbones", dims.backbones.len())?;
    non_empty("model_revs", dims.model_revs.len())?;
    non_empty("test_sets", dims.test_sets.len())?;

    for name in &dims.train_sets {
        validate_identifier("train_set", name)?;
    }
    for name in &dims.backbones {
        validate_identifier("backbone", name)?;
    }
    for rev in &dims.model_revs {
        validate_identifier("model_rev", rev.as_str())?;
    }
    for name in &dims.test_sets {
        validate_identifier("test_set", name)?;
    }

    unique("train_sets", dims.train_sets.iter())?;
    unique("seeds", dims.seeds.iter())?;
    unique("backbones", dims.backbones.iter())?;
    unique("model_revs", dims.model_revs.iter())?;
    unique("test_sets", dims.test_sets.iter())?;

    for test_set in &dims.test_sets {
        if is_combo_name(test_set) {
            return Err(SweepError::Registry(
                ErrorInfo::new("registry.combo_test_set", "combo sets cannot be test sets")
                    .with_context("test_set", test_set.as_str()),
            ));
        }
        if !dims.train_sets.contains(test_set) {
            return Err(SweepError::Registry(
                ErrorInfo::new(
                    "registry.unknown_test_set",
                    "test set must also be listed as a train set",
                )
                .with_context("test_set", test_set.as_str())
                .with_hint("its split lists are produced by the dataset stage"),
            ));
        }
    }
    Ok(())
}

fn validate_combos(dims: &SweepDims, combos: &ComboSpec) -> Result<(), SweepError> {
    for combo in dims.train_sets.iter().filter(|name| is_combo_name(name)) {
        let Some(constituents) = combos.constituents(combo) else {
            continue;
        };
        if constituents.is_empty() {
            return Err(SweepError::Registry(
                ErrorInfo::new("registry.empty_combo", "combo declares no constituents")
                    .with_context("combo", combo.as_str()),
            ));
        }
        for constituent in constituents {
            if is_combo_name(constituent) {
                return Err(SweepError::Registry(
                    ErrorInfo::new("registry.nested_combo", "combo constituents must be plain sets")
                        .with_context("combo", combo.as_str())
                        .with_context("constituent", constituent.as_str()),
                ));
            }
            if !dims.train_sets.contains(constituent) {
                return Err(SweepError::Registry(
                    ErrorInfo::new(
                        "registry.unknown_constituent",
                        "combo constituent is not a train set of the sweep",
                    )
                    .with_context("combo", combo.as_str())
                    .with_context("constituent", constituent.as_str()),
                ));
            }
        }
    }
    Ok(())
}

fn non_empty(dimension: &str, len: usize) -> Result<(), SweepError> {
    if len == 0 {
        return Err(SweepError::Registry(
            ErrorInfo::new("registry.empty_dimension", "sweep dimension has no values")
                .with_context("dimension", dimension),
        ));
    }
    Ok(())
}

fn unique<'a, T>(dimension: &str, values: impl Iterator<Item = &'a T>) -> Result<(), SweepError>
where
    T: Ord + ToString + 'a,
{
    let mut seen = BTreeSet::new();
    for value in values {
        if !seen.insert(value) {
            return Err(SweepError::Registry(
                ErrorInfo::new("registry.duplicate_value", "sweep dimension repeats a value")
                    .with_context("dimension", dimension)
                    .with_context("value", value.to_string()),
            ));
        }
    }
    Ok(())
}

// `_` separates the fields of every run prefix, so it may not occur inside a
// field; path separators would escape the layout.
fn validate_identifier(dimension: &str, value: &str) -> Result<(), SweepError> {
    let invalid = value.is_empty()
        || value == "."
        || value == ".."
        || value.contains(['_', '/', '\\']);
    if invalid {
        return Err(registry_error(
            "registry.invalid_identifier",
            format!("{dimension} identifier {value:?} is empty, contains '_' or a path separator"),
        ));
    }
    Ok(())
}
