//! Structured error types shared across the sweep crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`SweepError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (set names, paths, counts).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Records the filesystem path involved in the failure.
    pub fn with_path(self, path: &Path) -> Self {
        self.with_context("path", path.display().to_string())
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for the sweep coordinator.
///
/// Families map onto the failure taxonomy of a sweep: configuration
/// conditions are reported and skip a single cell, collaborator failures are
/// fatal for the cell that raised them, and the remaining families describe
/// registry, dataset, guard and serialization problems.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum SweepError {
    /// Registry construction or lookup errors.
    #[error("registry error: {0}")]
    Registry(ErrorInfo),
    /// Dataset list, split and combo composition errors.
    #[error("dataset error: {0}")]
    Dataset(ErrorInfo),
    /// Failures while inspecting or clearing prior outputs.
    #[error("guard error: {0}")]
    Guard(ErrorInfo),
    /// Failures raised by an external training or evaluation collaborator.
    #[error("collaborator error: {0}")]
    Collaborator(ErrorInfo),
    /// Invalid sweep configuration.
    #[error("config error: {0}")]
    Config(ErrorInfo),
    /// Serialization and schema errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl SweepError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            SweepError::Registry(info)
            | SweepError::Dataset(info)
            | SweepError::Guard(info)
            | SweepError::Collaborator(info)
            | SweepError::Config(info)
            | SweepError::Serde(info) => info,
        }
    }

    /// Returns the stable code of the underlying payload.
    pub fn code(&self) -> &str {
        &self.info().code
    }

    /// Wraps an I/O failure on `path` into a dataset error.
    pub fn dataset_io(code: &str, path: &Path, err: impl ToString) -> Self {
        SweepError::Dataset(ErrorInfo::new(code, err.to_string()).with_path(path))
    }

    /// Wraps an I/O failure on `path` into a guard error.
    pub fn guard_io(code: &str, path: &Path, err: impl ToString) -> Self {
        SweepError::Guard(ErrorInfo::new(code, err.to_string()).with_path(path))
    }
}
