//! HTTP surface for the employee lifecycle.
//!
//! Layer order, outermost first: CORS, tracing, request-id assignment and
//! propagation, timing, the error boundary, then the success envelope around
//! the API routes. `/health` sits outside the boundary and the envelope.

pub mod boundary;
pub mod context;
pub mod envelope;
pub mod handlers;
pub mod problem;
pub mod timing;

use std::time::Duration;

use axum::{
    Router,
    http::{HeaderName, Method},
    middleware,
    routing::get,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::core::CancelSignal;
use crate::employee::EmployeeService;

pub use boundary::ErrorBoundaryLayer;
pub use context::{ACTOR_HEADER, REQUEST_ID_HEADER, RequestContext};
pub use envelope::{ApiResponse, ResponseEnvelopeLayer};
pub use problem::{ApiProblem, ApiResult, ProblemDetails};

/// Transport knobs resolved from configuration.
#[derive(Debug, Clone)]
pub struct WebSettings {
    pub default_page_size: u32,
    pub max_page_size: u32,
    pub max_buffered_bytes: usize,
    pub slow_request_threshold: Duration,
}

impl Default for WebSettings {
    fn default() -> Self {
        Self {
            default_page_size: 10,
            max_page_size: 100,
            max_buffered_bytes: 4 * 1024 * 1024,
            slow_request_threshold: Duration::from_millis(1000),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub employees: EmployeeService,
    pub settings: WebSettings,
    /// Cancelled when the server begins shutting down; handed to every store call.
    pub shutdown: CancelSignal,
}

impl AppState {
    pub fn new(employees: EmployeeService, settings: WebSettings) -> Self {
        Self {
            employees,
            settings,
            shutdown: CancelSignal::new(),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let request_id_header = HeaderName::from_static(REQUEST_ID_HEADER);
    let settings = state.settings.clone();

    Router::new()
        .route(
            "/api/v1/employees",
            get(handlers::list_employees).post(handlers::create_employee),
        )
        .route("/api/v1/employees/all", get(handlers::list_all_employees))
        .route(
            "/api/v1/employees/by-email/:email",
            get(handlers::get_employee_by_email),
        )
        .route(
            "/api/v1/employees/by-department/:department",
            get(handlers::list_employees_by_department),
        )
        .route(
            "/api/v1/employees/:id",
            get(handlers::get_employee)
                .put(handlers::update_employee)
                .delete(handlers::delete_employee),
        )
        .layer(
            ServiceBuilder::new()
                .layer(ErrorBoundaryLayer::new())
                .layer(ResponseEnvelopeLayer::new(settings.max_buffered_bytes)),
        )
        .route("/health", get(handlers::healthcheck))
        .layer(middleware::from_fn_with_state(
            settings.slow_request_threshold,
            timing::log_request_timing,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ]),
        )
        .with_state(state)
}
