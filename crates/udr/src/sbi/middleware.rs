//! Middleware applied to the SBI router.
//!
//! Includes the per-group pre-handler chain and request timeout enforcement.

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::Request, middleware::Next, response::Response};

use super::router::PreHandler;

/// Default per-request timeout applied to all routes.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Run `chain` in order; the first rejection becomes the response and the
/// matched handler is never called.
pub async fn run_pre_handlers(
    chain: Arc<[Arc<dyn PreHandler>]>,
    req: Request,
    next: Next,
) -> Response {
    let (parts, body) = req.into_parts();
    for pre in chain.iter() {
        if let Err(rejection) = pre.handle(&parts) {
            return rejection;
        }
    }
    next.run(Request::from_parts(parts, body)).await
}
