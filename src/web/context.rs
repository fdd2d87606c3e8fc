use std::convert::Infallible;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;

use crate::core::{Actor, CancelSignal, ServiceError};
use crate::web::AppState;
use crate::web::problem::ApiProblem;

/// Correlation header set by `SetRequestIdLayer` and echoed in every body.
pub const REQUEST_ID_HEADER: &str = "x-request-id";
/// Header naming the acting user; absent means [`Actor::system`].
pub const ACTOR_HEADER: &str = "x-username";

pub fn trace_id_from(headers: &HeaderMap) -> Option<String> {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Everything a handler needs about the caller, extracted once per request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub trace_id: String,
    pub instance: String,
    pub actor: Actor,
    pub cancel: CancelSignal,
}

impl RequestContext {
    /// Renders a lifecycle failure for this request.
    pub fn problem(&self, error: ServiceError) -> ApiProblem {
        ApiProblem::new(error, &self.instance, &self.trace_id)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for RequestContext {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let actor = Actor::from_optional(
            parts
                .headers
                .get(ACTOR_HEADER)
                .and_then(|value| value.to_str().ok()),
        );

        Ok(Self {
            trace_id: trace_id_from(&parts.headers).unwrap_or_default(),
            instance: parts.uri.path().to_string(),
            actor,
            cancel: state.shutdown.clone(),
        })
    }
}
