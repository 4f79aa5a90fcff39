//! Error taxonomy crossing the core boundary
//!
//! Expected control flow (validation, authorization, state rules) is always a
//! typed `Err`; only storage faults surface as opaque failures.

use thiserror::Error;

use crate::application::ports::StoreError;
use crate::domain::aggregates::{BookingError, ProviderError, ReviewError};
use crate::domain::value_objects::RatingError;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    InvalidTransition(String),

    #[error("{0}")]
    Conflict(String),

    #[error("external service failure: {0}")]
    ExternalService(String),

    /// The gateway committed a charge but the outcome could not be recorded
    /// locally. Requires operator attention; never silently retried.
    #[error("charge {transaction_id} succeeded but could not be recorded")]
    Reconciliation { transaction_id: String },

    #[error("storage error: {0}")]
    Storage(String),
}

impl CoreError {
    /// Stable machine-readable kind for API payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Unauthorized(_) => "unauthorized",
            Self::Validation(_) => "validation_error",
            Self::InvalidTransition(_) => "invalid_state_transition",
            Self::Conflict(_) => "conflict",
            Self::ExternalService(_) => "external_service_failure",
            Self::Reconciliation { .. } => "reconciliation_error",
            Self::Storage(_) => "storage_error",
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

impl From<BookingError> for CoreError {
    fn from(e: BookingError) -> Self {
        match e {
            BookingError::ScheduledInPast | BookingError::NegativeTotal => Self::Validation(e.to_string()),
            BookingError::InvalidTransition { .. } | BookingError::ProgressNotForward { .. } => {
                Self::InvalidTransition(e.to_string())
            }
            BookingError::NotAssignedProvider | BookingError::NotParticipant => Self::Unauthorized(e.to_string()),
        }
    }
}

impl From<ReviewError> for CoreError {
    fn from(e: ReviewError) -> Self {
        match e {
            ReviewError::NotReviewedProvider => Self::Unauthorized(e.to_string()),
            ReviewError::AlreadyResponded => Self::Conflict(e.to_string()),
        }
    }
}

impl From<ProviderError> for CoreError {
    fn from(e: ProviderError) -> Self { Self::Validation(e.to_string()) }
}

impl From<RatingError> for CoreError {
    fn from(e: RatingError) -> Self { Self::Validation(e.to_string()) }
}

impl From<StoreError> for CoreError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::VersionConflict => Self::Conflict("record was modified concurrently; retry".into()),
            StoreError::Duplicate(what) => Self::Conflict(format!("{what} already exists")),
            StoreError::InsufficientFunds => Self::Conflict("balance changed concurrently; retry".into()),
            StoreError::Backend(msg) => Self::Storage(msg),
        }
    }
}
