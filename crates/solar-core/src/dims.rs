//! Value types for the sweep dimensions.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Random seed of a sweep cell. An absent seed renders as `None` in every
/// derived file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Seed(Option<u64>);

impl Seed {
    /// A concrete, reproducible seed.
    pub const fn new(raw: u64) -> Self {
        Self(Some(raw))
    }

    /// The absent seed.
    pub const fn none() -> Self {
        Self(None)
    }

    /// Returns the raw seed value when present.
    pub fn value(&self) -> Option<u64> {
        self.0
    }
}

impl From<u64> for Seed {
    fn from(raw: u64) -> Self {
        Self::new(raw)
    }
}

impl From<Option<u64>> for Seed {
    fn from(raw: Option<u64>) -> Self {
        Self(raw)
    }
}

impl fmt::Display for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(raw) => write!(f, "{raw}"),
            None => f.write_str("None"),
        }
    }
}

/// Opaque model revision tag. Integers and strings are both accepted when
/// deserializing; the tag is only ever used through its rendering.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ModelRev(String);

impl ModelRev {
    /// Creates a revision tag from anything that renders to a string.
    pub fn new(tag: impl fmt::Display) -> Self {
        Self(tag.to_string())
    }

    /// Returns the rendered tag.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelRev {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ModelRev {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawRev {
            Int(i64),
            Text(String),
        }

        Ok(match RawRev::deserialize(deserializer)? {
            RawRev::Int(value) => ModelRev::new(value),
            RawRev::Text(value) => ModelRev(value),
        })
    }
}
