//! Error taxonomy shared by every core operation.

use uuid::Uuid;

use crate::budget::AllocationError;

pub type CoreResult<T> = Result<T, CoreError>;

/// Failures surfaced to callers of the core.
///
/// Malformed stored collections never show up here; they are recovered in
/// [`crate::decode`] by substituting an empty collection.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A required field is missing or malformed.
    #[error("invalid {field}: {message}")]
    Validation { field: String, message: String },

    /// The caller does not own the itinerary.
    #[error("not authorized: {0}")]
    Authorization(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    /// The store failed; carries the query context.
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl CoreError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    pub fn is_authorization(&self) -> bool {
        matches!(self, Self::Authorization(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<AllocationError> for CoreError {
    fn from(err: AllocationError) -> Self {
        let field = match err {
            AllocationError::InvalidDays(_) | AllocationError::TooManyDays { .. } => "days",
            AllocationError::InvalidBudget(_) => "budget",
            AllocationError::EmptyPool => "pool",
        };
        Self::validation(field, err.to_string())
    }
}
