#![deny(missing_docs)]
#![doc = "Deterministic path registry for solar segmentation sweeps. Every file and directory a sweep cell touches is derived here, once, from the sweep dimensions."]

/// Combo classification and specification.
pub mod combo;
/// Naming templates of the persisted layout.
pub mod layout;
mod registry;

pub use combo::{is_combo_name, ComboSpec, COMBO_MARKER};
pub use layout::{Channel, Split};
pub use registry::{
    build_registry, EvalArtifacts, EvalKey, ModelArtifacts, ModelKey, PathRecord, Registry,
    SetLayout, SetPaths, SplitKey, SplitLists, SweepDims,
};
