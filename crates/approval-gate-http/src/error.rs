// crates/approval-gate-http/src/error.rs
// ============================================================================
// Module: API Error
// Description: The error taxonomy of §7 and its mapping onto HTTP status
// codes and JSON error bodies.
// Purpose: Give every handler one `Result<_, ApiError>` return type instead
// of hand-rolled status codes scattered through route bodies.
// Dependencies: axum, serde_json, approval_gate_core, approval_gate_authz
// ============================================================================

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use serde::Serialize;
use serde_json::json;

use approval_gate_core::ChainError;
use approval_gate_core::IdempotencyError;
use approval_gate_core::StoreError;

/// The semantic error kinds of the approval HTTP surface.
///
/// # Invariants
/// - Every variant maps to exactly one HTTP status code via
///   [`ApiError::status_code`]; `handler_failure` is deliberately absent
///   here because it is reported as a `200` with `success: false` in the
///   response body, not as an `ApiError`.
#[derive(Debug)]
pub enum ApiError {
    /// Missing or invalid bearer token.
    Unauthenticated,
    /// Authenticated but not permitted to perform this action.
    Forbidden(String),
    /// Malformed request body or query string.
    Validation(String),
    /// No such approval, step, or template.
    NotFound(String),
    /// `request_id` collided with an existing row for this tenant+operator.
    DuplicateRequest,
    /// The target row is not in a state that accepts this transition.
    IllegalTransition(String),
    /// Lost the compare-and-set race for a dispatch or step decision.
    ConsumeCasConflict(String),
    /// Underlying store or idempotency I/O failed.
    DurableFailure(String),
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: &'static str,
    message: String,
}

impl ApiError {
    /// The stable machine-readable kind tag, matching §7's taxonomy names.
    #[must_use]
    fn kind(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Forbidden(_) => "forbidden",
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::DuplicateRequest => "duplicate_request",
            Self::IllegalTransition(_) => "illegal_transition",
            Self::ConsumeCasConflict(_) => "consume_cas_conflict",
            Self::DurableFailure(_) => "durable_failure",
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Unauthenticated => "authentication required".to_string(),
            Self::Forbidden(detail)
            | Self::Validation(detail)
            | Self::NotFound(detail)
            | Self::IllegalTransition(detail)
            | Self::ConsumeCasConflict(detail)
            | Self::DurableFailure(detail) => detail.clone(),
            Self::DuplicateRequest => "request_id already used for this operator".to_string(),
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::DuplicateRequest
            | Self::IllegalTransition(_)
            | Self::ConsumeCasConflict(_) => StatusCode::CONFLICT,
            Self::DurableFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if matches!(self, Self::DurableFailure(_)) {
            tracing::error!(kind = self.kind(), message = %self.message(), "durable failure");
        }
        let body = ErrorBody {
            success: false,
            error: self.kind(),
            message: self.message(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateRequest => Self::DuplicateRequest,
            StoreError::Io(msg) | StoreError::Decode(msg) => Self::DurableFailure(msg),
        }
    }
}

impl From<ChainError> for ApiError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::TemplateNotFound => Self::NotFound("chain template not found".to_string()),
            ChainError::DefaultTemplateImmutable => {
                Self::Forbidden("the default chain template cannot be modified".to_string())
            }
            ChainError::InUse => {
                Self::IllegalTransition("template is referenced by a non-terminal chain".to_string())
            }
            ChainError::ChainExists => {
                Self::IllegalTransition("a chain already exists for this approval".to_string())
            }
            ChainError::NonSequentialOrders => {
                Self::Validation("step orders must form a contiguous range starting at 0".to_string())
            }
            ChainError::Io(msg) => Self::DurableFailure(msg),
        }
    }
}

impl From<IdempotencyError> for ApiError {
    fn from(err: IdempotencyError) -> Self {
        match err {
            IdempotencyError::Io(msg) => Self::DurableFailure(msg),
        }
    }
}

/// Renders a `200` body with `success: false` for a connector-level
/// dispatch failure, per §7's `handler_failure` row: the HTTP transport
/// succeeded even though the action did not.
#[must_use]
pub fn handler_failure_body<T: Serialize>(data: T) -> Json<serde_json::Value> {
    Json(json!({ "success": false, "data": data }))
}
