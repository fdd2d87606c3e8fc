//! Field-level validation that reports every violation in one pass.
//!
//! A [`RuleSet`] evaluates each declared field independently; a failing field
//! never stops evaluation of the next one. The collected [`ValidationOutcome`]
//! is empty exactly when the payload is valid.

mod rules;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::error::ServiceError;

pub use rules::{DateRules, NumberRules, RuleSet, TextRules};

/// Field name to ordered violation messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationOutcome {
    errors: BTreeMap<String, Vec<String>>,
}

impl ValidationOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an outcome with a single message, used for transport-level input errors.
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut outcome = Self::new();
        outcome.add(field, message);
        outcome
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    pub fn merge(&mut self, other: ValidationOutcome) {
        for (field, messages) in other.errors {
            self.errors.entry(field).or_default().extend(messages);
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn field(&self, name: &str) -> Option<&[String]> {
        self.errors.get(name).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.errors.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// `Ok` for a valid outcome, otherwise a single `ValidationFailed` carrying every field.
    pub fn into_result(self) -> Result<(), ServiceError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(ServiceError::ValidationFailed(self))
        }
    }
}

/// Implemented by request payloads that carry a rule set.
pub trait Validate {
    fn validate(&self) -> ValidationOutcome;
}

/// Runs the payload's rules and fails with the aggregated outcome.
pub fn ensure_valid<T: Validate + ?Sized>(payload: &T) -> Result<(), ServiceError> {
    payload.validate().into_result()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_outcome_is_valid() {
        assert!(ValidationOutcome::new().into_result().is_ok());
    }

    #[test]
    fn messages_keep_insertion_order_per_field() {
        let mut outcome = ValidationOutcome::new();
        outcome.add("email", "Email is required");
        outcome.add("email", "Invalid email format");
        outcome.add("firstName", "First name is required");

        assert_eq!(
            outcome.field("email"),
            Some(&["Email is required".to_string(), "Invalid email format".to_string()][..])
        );
        assert_eq!(outcome.len(), 2);

        let err = outcome.into_result().unwrap_err();
        assert!(matches!(err, ServiceError::ValidationFailed(ref o) if o.len() == 2));
    }

    #[test]
    fn merge_appends_to_existing_fields() {
        let mut left = ValidationOutcome::single("pageSize", "Page size must be at least 1");
        left.merge(ValidationOutcome::single("pageSize", "Page size must not exceed 100"));
        left.merge(ValidationOutcome::single("pageNumber", "Page number must be at least 1"));

        assert_eq!(left.field("pageSize").map(<[String]>::len), Some(2));
        assert_eq!(left.fields().collect::<Vec<_>>(), vec!["pageNumber", "pageSize"]);
    }

    #[test]
    fn serializes_as_plain_map() {
        let outcome = ValidationOutcome::single("email", "Invalid email format");
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            serde_json::json!({ "email": ["Invalid email format"] })
        );
    }
}
