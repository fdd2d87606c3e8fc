use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::{info, warn};

/// Logs method, path, status and elapsed time; requests slower than the
/// threshold are logged at `warn`.
pub async fn log_request_timing(
    State(slow_threshold): State<Duration>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    let elapsed = started.elapsed();
    let elapsed_ms = elapsed_millis(elapsed);
    let status = response.status().as_u16();

    if elapsed > slow_threshold {
        warn!(%method, path, status, elapsed_ms, "slow request");
    } else {
        info!(%method, path, status, elapsed_ms, "request completed");
    }

    response
}

fn elapsed_millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
