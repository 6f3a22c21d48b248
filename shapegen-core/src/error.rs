use std::fmt;

use crate::generator::Path;

/// Errors emitted while compiling schemas into generators.
#[derive(Clone, Debug, PartialEq)]
pub enum ArbitraryError {
    /// The schema kind has no generator; an override is required.
    UnsupportedSchema { path: Path, type_name: String },
    /// Rejection sampling accepted too few candidates to make progress.
    GenerationInfeasible {
        path: Path,
        trials: u64,
        successes: u64,
    },
    /// The schema definition is self-contradictory.
    InvalidSchema { path: Path, reason: String },
}

impl ArbitraryError {
    pub fn path(&self) -> &Path {
        match self {
            ArbitraryError::UnsupportedSchema { path, .. }
            | ArbitraryError::GenerationInfeasible { path, .. }
            | ArbitraryError::InvalidSchema { path, .. } => path,
        }
    }
}

impl fmt::Display for ArbitraryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArbitraryError::UnsupportedSchema { path, type_name } => write!(
                f,
                "unable to generate values for {type_name} schema at path '{path}': \
                 an override must be provided for this schema"
            ),
            ArbitraryError::GenerationInfeasible {
                path,
                trials,
                successes,
            } => write!(
                f,
                "unable to generate valid values for schema at path '{path}' \
                 ({successes} of {trials} candidates accepted): \
                 an override must be provided for this schema"
            ),
            ArbitraryError::InvalidSchema { path, reason } => {
                write!(f, "invalid schema at path '{path}': {reason}")
            }
        }
    }
}

impl std::error::Error for ArbitraryError {}
