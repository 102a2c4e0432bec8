//! Combo set classification and specification.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Marker that classifies a train set identifier as a combo.
pub const COMBO_MARKER: &str = "CMB";

/// Returns true when `name` follows the combo naming convention.
pub fn is_combo_name(name: &str) -> bool {
    name.contains(COMBO_MARKER)
}

/// Mapping from combo identifier to its ordered constituent train sets.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComboSpec(BTreeMap<String, Vec<String>>);

impl ComboSpec {
    /// Creates an empty specification.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the constituents of `combo`.
    pub fn with_combo<I, S>(mut self, combo: impl Into<String>, constituents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0.insert(
            combo.into(),
            constituents.into_iter().map(Into::into).collect(),
        );
        self
    }

    /// Returns the constituents of `combo` in their declared order.
    pub fn constituents(&self, combo: &str) -> Option<&[String]> {
        self.0.get(combo).map(Vec::as_slice)
    }
}
