// crates/approval-gate-http/src/csrf.rs
// ============================================================================
// Module: Anti-CSRF Guard
// Description: Enforces the `X-PuddleJumper-Request: true` marker header on
// mutation endpoints.
// Purpose: Stop a browser-delivered cross-site form submission (which
// cannot set custom headers without a CORS preflight the trusted-origin
// policy would reject) from reaching a mutating handler.
// Dependencies: axum
// ============================================================================

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;

use crate::error::ApiError;

const MARKER_HEADER: &str = "x-puddlejumper-request";
const MARKER_VALUE: &str = "true";

/// Rejects the request with [`ApiError::Validation`] unless the marker
/// header is present and set to `"true"`.
pub async fn require_marker(request: Request, next: Next) -> Response {
    let present = request
        .headers()
        .get(MARKER_HEADER)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.eq_ignore_ascii_case(MARKER_VALUE));
    if present {
        next.run(request).await
    } else {
        ApiError::Validation("missing X-PuddleJumper-Request: true header".to_string())
            .into_response()
    }
}
