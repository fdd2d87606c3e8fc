use thiserror::Error;

use crate::core::entity::EntityId;
use crate::validation::ValidationOutcome;

/// Failures raised by an entity store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{kind} with id '{id}' was not found")]
    NotFound { kind: &'static str, id: EntityId },

    #[error("{message}")]
    UniqueViolation {
        kind: &'static str,
        key: &'static str,
        value: String,
        message: String,
    },

    #[error("operation cancelled before it was applied")]
    Cancelled,

    #[error("store backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Error taxonomy surfaced by the lifecycle layer.
///
/// Rendering to clients happens only in `web::problem`; `Unhandled` keeps the
/// original error for logging and is never shown verbatim.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// `key` names the lookup, e.g. `id '7'` or `email 'a@b.io'`.
    #[error("{resource} with {key} was not found")]
    NotFound { resource: String, key: String },

    #[error("One or more validation failures have occurred")]
    ValidationFailed(ValidationOutcome),

    #[error("{0}")]
    BusinessRuleViolation(String),

    #[error("unhandled error: {0:#}")]
    Unhandled(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ServiceError>;

impl ServiceError {
    pub fn not_found(resource: impl Into<String>, id: impl std::fmt::Display) -> Self {
        Self::not_found_by(resource, "id", id)
    }

    pub fn not_found_by(
        resource: impl Into<String>,
        field: &str,
        value: impl std::fmt::Display,
    ) -> Self {
        Self::NotFound {
            resource: resource.into(),
            key: format!("{field} '{value}'"),
        }
    }

    pub fn business_rule(message: impl Into<String>) -> Self {
        Self::BusinessRuleViolation(message.into())
    }

    pub fn unhandled(message: impl Into<String>) -> Self {
        Self::Unhandled(anyhow::Error::msg(message.into()))
    }

    /// Stable machine-readable tag used as the problem `type`.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::ValidationFailed(_) => "validation_failed",
            Self::BusinessRuleViolation(_) => "business_rule_violation",
            Self::Unhandled(_) => "internal_error",
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { kind, id } => Self::not_found(kind, id),
            StoreError::UniqueViolation { message, .. } => Self::BusinessRuleViolation(message),
            other @ (StoreError::Cancelled | StoreError::Backend(_)) => {
                Self::Unhandled(anyhow::Error::new(other))
            }
        }
    }
}

impl From<ValidationOutcome> for ServiceError {
    fn from(outcome: ValidationOutcome) -> Self {
        Self::ValidationFailed(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_onto_taxonomy() {
        let not_found = ServiceError::from(StoreError::NotFound {
            kind: "Employee",
            id: 4,
        });
        assert_eq!(not_found.to_string(), "Employee with id '4' was not found");
        assert_eq!(not_found.kind(), "not_found");

        let unique = ServiceError::from(StoreError::UniqueViolation {
            kind: "Employee",
            key: "email",
            value: "a@b.io".to_string(),
            message: "Employee with email 'a@b.io' already exists".to_string(),
        });
        assert!(matches!(unique, ServiceError::BusinessRuleViolation(ref msg)
            if msg == "Employee with email 'a@b.io' already exists"));

        let cancelled = ServiceError::from(StoreError::Cancelled);
        assert_eq!(cancelled.kind(), "internal_error");
    }
}
