use thiserror::Error;

use crate::report::SnapshotMismatch;
use crate::store::{SnapshotId, StoreError};
use crate::substitution::SubstitutionKind;

/// Invalid setup of a snapshot test. Always fatal to the current test.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Wrappers cannot be empty strings.")]
    EmptyWrapper,

    #[error("{kind} substitution keys cannot be empty.")]
    EmptyKey { kind: SubstitutionKind },

    #[error(
        "{kind} substitutions can only be string values or values that can be converted \
         to a string. You provided substitution `{key}` of type {value_kind}"
    )]
    InvalidValue {
        kind: SubstitutionKind,
        key: String,
        value_kind: &'static str,
    },

    #[error("Error while saving snapshot: {kind} substitution `{key}` is empty.")]
    EmptySubstitution { kind: SubstitutionKind, key: String },

    #[error(
        "Substitution `{key}` has different plain and strict values, so placeholder \
         `{placeholder}` cannot be restored. Use distinct keys."
    )]
    AmbiguousPlaceholder { key: String, placeholder: String },

    #[error("Failed to compile pattern `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        source: regex::Error,
    },

    #[error("Invalid snapshot id `{id}`: {reason}")]
    InvalidSnapshotId { id: String, reason: &'static str },
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("Fetched dynamic snapshot `{id}` is empty.")]
    ContentNotFound { id: SnapshotId },

    #[error("{0}")]
    Mismatch(Box<SnapshotMismatch>),

    #[error("Failed to fetch dynamic data for snapshot `{id}`: {source}")]
    Fetch {
        id: SnapshotId,
        source: anyhow::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SnapshotError {
    /// True for the ordinary test failure, as opposed to a broken setup.
    pub fn is_mismatch(&self) -> bool {
        matches!(self, SnapshotError::Mismatch(_))
    }

    pub fn as_mismatch(&self) -> Option<&SnapshotMismatch> {
        match self {
            SnapshotError::Mismatch(mismatch) => Some(mismatch),
            _ => None,
        }
    }
}
