//! Wraps successful JSON responses in the standard success envelope.
//!
//! The inner response body is fully buffered before anything reaches the
//! client, so a failure while producing it surfaces as this service's error
//! and the partial output is discarded with the buffer.

use std::task::{Context, Poll};

use axum::{
    body::Body,
    extract::Request,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::Response,
};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower::{BoxError, Layer, Service};
use tracing::trace;

use crate::web::context::trace_id_from;

pub const SUCCESS_MESSAGE: &str = "Request completed successfully";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
    pub trace_id: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T, trace_id: impl Into<String>) -> Self {
        Self {
            success: true,
            message: SUCCESS_MESSAGE.to_string(),
            data,
            trace_id: trace_id.into(),
        }
    }
}

/// Only 2xx responses declaring a JSON content type are enveloped.
pub fn should_wrap(status: StatusCode, headers: &HeaderMap) -> bool {
    if !status.is_success() {
        return false;
    }

    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
        .unwrap_or(false)
}

/// Re-encodes `body` as the `data` of a success envelope. An empty body becomes `null`.
pub fn wrap_body(body: &[u8], trace_id: &str) -> Result<Vec<u8>, serde_json::Error> {
    let data = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        serde_json::from_slice(body)?
    };
    serde_json::to_vec(&ApiResponse::success(data, trace_id))
}

#[derive(Debug, Clone)]
pub struct ResponseEnvelopeLayer {
    max_buffered_bytes: usize,
}

impl ResponseEnvelopeLayer {
    pub fn new(max_buffered_bytes: usize) -> Self {
        Self { max_buffered_bytes }
    }
}

impl<S> Layer<S> for ResponseEnvelopeLayer {
    type Service = ResponseEnvelope<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ResponseEnvelope {
            inner,
            max_buffered_bytes: self.max_buffered_bytes,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResponseEnvelope<S> {
    inner: S,
    max_buffered_bytes: usize,
}

impl<S> Service<Request> for ResponseEnvelope<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Error: Into<BoxError>,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<Response, BoxError>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let trace_id = trace_id_from(request.headers()).unwrap_or_default();
        let limit = self.max_buffered_bytes;
        // The clone stays behind; the instance that was driven to readiness serves this call.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let response = inner.call(request).await.map_err(Into::into)?;
            let (mut parts, body) = response.into_parts();
            let buffered = axum::body::to_bytes(body, limit).await?;

            if !should_wrap(parts.status, &parts.headers) {
                return Ok(Response::from_parts(parts, Body::from(buffered)));
            }

            let wrapped = wrap_body(&buffered, &trace_id)?;
            trace!(trace_id, original = buffered.len(), wrapped = wrapped.len(), "enveloped response");

            parts
                .headers
                .insert(header::CONTENT_LENGTH, HeaderValue::from(wrapped.len()));
            parts.headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
            Ok(Response::from_parts(parts, Body::from(wrapped)))
        })
    }
}
