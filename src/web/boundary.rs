//! Outermost application boundary: anything that escapes the handlers or the
//! envelope (an error while producing the body, a panic) becomes a 500 problem
//! response instead of a dropped connection.

use std::any::Any;
use std::convert::Infallible;
use std::panic::AssertUnwindSafe;
use std::task::{Context, Poll};

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
};
use futures::FutureExt;
use futures::future::BoxFuture;
use tower::{BoxError, Layer, Service, ServiceExt};
use uuid::Uuid;

use crate::core::ServiceError;
use crate::web::context::{REQUEST_ID_HEADER, trace_id_from};
use crate::web::problem::ApiProblem;

#[derive(Debug, Clone, Default)]
pub struct ErrorBoundaryLayer;

impl ErrorBoundaryLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for ErrorBoundaryLayer {
    type Service = ErrorBoundary<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ErrorBoundary { inner }
    }
}

#[derive(Debug, Clone)]
pub struct ErrorBoundary<S> {
    inner: S,
}

impl<S> Service<Request> for ErrorBoundary<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Error: Into<BoxError>,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Response, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // Readiness of the inner service is awaited per call by `oneshot`.
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, mut request: Request) -> Self::Future {
        let trace_id = ensure_trace_id(request.headers_mut());
        let instance = request.uri().path().to_string();
        let inner = self.inner.clone();

        Box::pin(async move {
            let outcome = AssertUnwindSafe(inner.oneshot(request)).catch_unwind().await;
            let error = match outcome {
                Ok(Ok(response)) => return Ok(response),
                Ok(Err(err)) => {
                    let err: BoxError = err.into();
                    ServiceError::unhandled(format!("request pipeline failed: {err}"))
                }
                Err(panic) => ServiceError::unhandled(format!(
                    "request handler panicked: {}",
                    panic_message(panic.as_ref())
                )),
            };
            Ok(ApiProblem::new(error, &instance, &trace_id).into_response())
        })
    }
}

/// Returns the request's correlation id, generating and attaching one if absent.
fn ensure_trace_id(headers: &mut HeaderMap) -> String {
    if let Some(existing) = trace_id_from(headers) {
        return existing;
    }

    let generated = Uuid::new_v4().to_string();
    if let Ok(value) = HeaderValue::from_str(&generated) {
        headers.insert(REQUEST_ID_HEADER, value);
    }
    generated
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
