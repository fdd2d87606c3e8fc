//! Translation of the lifecycle error taxonomy into problem-details responses.
//!
//! This is the only place a [`ServiceError`] is rendered for a client. Internal
//! failures are logged with their full chain and replaced by a generic detail.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::core::ServiceError;
use crate::validation::ValidationOutcome;

pub type ApiResult<T> = Result<T, ApiProblem>;

pub const PROBLEM_CONTENT_TYPE: &str = "application/problem+json";
pub const INTERNAL_ERROR_DETAIL: &str = "An unexpected error occurred";

/// Client-facing error body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemDetails {
    pub status: u16,
    pub title: String,
    pub detail: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub instance: String,
    pub trace_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<ValidationOutcome>,
}

/// Maps an error onto its status code and body. Pure; logging happens in [`ApiProblem::new`].
pub fn translate(error: &ServiceError, instance: &str, trace_id: &str) -> (StatusCode, ProblemDetails) {
    let (status, title, detail, errors) = match error {
        ServiceError::NotFound { .. } => (
            StatusCode::NOT_FOUND,
            "Resource Not Found",
            error.to_string(),
            None,
        ),
        ServiceError::ValidationFailed(outcome) => (
            StatusCode::BAD_REQUEST,
            "Validation Failed",
            error.to_string(),
            Some(outcome.clone()),
        ),
        ServiceError::BusinessRuleViolation(message) => (
            StatusCode::BAD_REQUEST,
            "Business Rule Violation",
            message.clone(),
            None,
        ),
        ServiceError::Unhandled(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal Server Error",
            INTERNAL_ERROR_DETAIL.to_string(),
            None,
        ),
    };

    let details = ProblemDetails {
        status: status.as_u16(),
        title: title.to_string(),
        detail,
        kind: error.kind().to_string(),
        instance: instance.to_string(),
        trace_id: trace_id.to_string(),
        errors,
    };
    (status, details)
}

#[derive(Debug)]
pub struct ApiProblem {
    status: StatusCode,
    details: ProblemDetails,
}

impl ApiProblem {
    pub fn new(error: ServiceError, instance: &str, trace_id: &str) -> Self {
        match &error {
            ServiceError::Unhandled(inner) => {
                error!(trace_id, instance, error = ?inner, "unhandled error while serving request");
            }
            other => {
                debug!(trace_id, instance, kind = other.kind(), error = %other, "request rejected");
            }
        }

        let (status, details) = translate(&error, instance, trace_id);
        Self { status, details }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn details(&self) -> &ProblemDetails {
        &self.details
    }
}

impl IntoResponse for ApiProblem {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.details)).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(PROBLEM_CONTENT_TYPE),
        );
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn not_found_maps_to_404() {
        let (status, body) = translate(
            &ServiceError::not_found("Employee", 9),
            "/api/v1/employees/9",
            "trace-1",
        );
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.title, "Resource Not Found");
        assert_eq!(body.detail, "Employee with id '9' was not found");
        assert_eq!(body.kind, "not_found");
        assert_eq!(body.instance, "/api/v1/employees/9");
        assert_eq!(body.trace_id, "trace-1");
        assert!(body.errors.is_none());
    }

    #[test]
    fn validation_attaches_field_errors() {
        let mut outcome = ValidationOutcome::new();
        outcome.add("email", "Invalid email format");
        outcome.add("firstName", "First name is required");

        let (status, body) = translate(&ServiceError::ValidationFailed(outcome), "/x", "t");
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.title, "Validation Failed");
        assert_eq!(body.errors.as_ref().map(ValidationOutcome::len), Some(2));

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["errors"]["email"][0], "Invalid email format");
        assert_eq!(json["type"], "validation_failed");
        assert_eq!(json["traceId"], "t");
    }

    #[test]
    fn business_rule_keeps_message() {
        let (status, body) = translate(
            &ServiceError::business_rule("Employee with email 'a@b.io' already exists"),
            "/x",
            "t",
        );
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.title, "Business Rule Violation");
        assert_eq!(body.detail, "Employee with email 'a@b.io' already exists");
    }

    #[test]
    fn unhandled_errors_are_sanitized() {
        let error = ServiceError::Unhandled(anyhow!("connection string postgres://secret@db"));
        let (status, body) = translate(&error, "/x", "t");

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.title, "Internal Server Error");
        assert_eq!(body.detail, INTERNAL_ERROR_DETAIL);
        assert_eq!(body.kind, "internal_error");

        let rendered = serde_json::to_string(&body).unwrap();
        assert!(!rendered.contains("secret"));
        assert!(!rendered.contains("errors"));
    }

    #[test]
    fn validation_problem_reads_back_from_json() {
        let outcome = ValidationOutcome::single("email", "Invalid email format");
        let (_, body) = translate(&ServiceError::ValidationFailed(outcome.clone()), "/x", "t");

        let text = serde_json::to_string(&body).unwrap();
        let parsed: ProblemDetails = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, body);
        assert_eq!(parsed.errors, Some(outcome));
    }

    #[test]
    fn response_uses_problem_content_type() {
        let response = ApiProblem::new(ServiceError::not_found("Employee", 1), "/x", "t").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            PROBLEM_CONTENT_TYPE
        );
    }
}
