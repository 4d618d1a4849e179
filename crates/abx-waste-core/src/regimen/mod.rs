//! Regimen aggregation and the in-memory comparison session.

mod aggregator;
mod session;

pub use aggregator::*;
pub use session::*;

use thiserror::Error;

use crate::resolver::{ResolverError, ValidationError};

/// Regimen errors.
#[derive(Error, Debug)]
pub enum RegimenError {
    #[error("Regimen not found: {0}")]
    UnknownRegimen(String),

    #[error("No impact data for the current selection")]
    NothingToSave,

    #[error("Resolver error: {0}")]
    Resolver(#[from] ResolverError),
}

impl From<ValidationError> for RegimenError {
    fn from(e: ValidationError) -> Self {
        RegimenError::Resolver(ResolverError::Validation(e))
    }
}

pub type RegimenResult<T> = Result<T, RegimenError>;
