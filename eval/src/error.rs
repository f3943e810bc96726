// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Error type shared by every pipeline stage

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EvalError {
    /// Input table is missing a required column or holds a value of the wrong type.
    /// Fatal: raised before any modeling begins.
    #[error("schema error in column '{column}': {reason}")]
    Schema { column: String, reason: String },

    #[error("invalid train fraction {0}: must lie strictly between 0 and 1")]
    InvalidFraction(f64),

    #[error("invalid range for {name}: {reason}")]
    InvalidRange { name: String, reason: String },

    /// A single adapter could not fit. The comparison runner records it and moves on.
    #[error("{adapter} failed to fit: {reason}")]
    Fit { adapter: String, reason: String },

    /// A scored prediction escaped the clamping range. Indicates a bug, not bad input.
    #[error("prediction {value} outside [{min}, {max}] after clamping")]
    PredictionRange { value: f64, min: f64, max: f64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EvalError {
    pub fn schema(column: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Schema {
            column: column.into(),
            reason: reason.into(),
        }
    }

    pub fn range(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRange {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn fit(adapter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Fit {
            adapter: adapter.into(),
            reason: reason.into(),
        }
    }

    /// Whether the whole run must stop (as opposed to failing one adapter)
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Fit { .. })
    }
}

pub type Result<T> = std::result::Result<T, EvalError>;
