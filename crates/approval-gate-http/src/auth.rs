// crates/approval-gate-http/src/auth.rs
// ============================================================================
// Module: Bearer Authentication
// Description: JWT bearer-token verification and the `Principal` extractor.
// Purpose: Verify an externally-issued token exactly once per request, via
// a `middleware::from_fn` layer, and let every handler pull the resulting
// principal out of request extensions through a typed extractor.
// Dependencies: axum, jsonwebtoken, approval_gate_config
// ============================================================================

//! ## Overview
//! The engine signs nothing; it only verifies. [`Verifier`] is the seam a
//! deployment plugs a token format into — [`JwtVerifier`] is the one
//! concrete implementation shipped here, backed by `jsonwebtoken` over the
//! HS256 secret in [`approval_gate_config::JwtConfig`]. [`authenticate`]
//! runs as an axum middleware layer and inserts the resulting [`Principal`]
//! into request extensions; [`Principal`] itself implements
//! [`axum::extract::FromRequestParts`] so handlers can require one by adding
//! it as an argument.

use std::collections::BTreeSet;
use std::sync::Arc;

use axum::Json;
use axum::extract::FromRequestParts;
use axum::extract::Request;
use axum::extract::State;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;
use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::Validation;
use jsonwebtoken::decode;
use serde::Deserialize;
use serde_json::json;

use approval_gate_authz::Delegation;
use approval_gate_config::JwtConfig;
use approval_gate_core::MunicipalityId;
use approval_gate_core::OperatorId;
use approval_gate_core::TenantId;
use approval_gate_core::WorkspaceId;

use crate::state::AppState;

/// The authenticated caller a request acts as, once a bearer token verifies.
///
/// # Invariants
/// - `permissions` and `delegations` are exactly the sets [`Principal`]
///   carried in its token; the authorization evaluator trusts them as-is.
#[derive(Debug, Clone)]
pub struct Principal {
    /// Operator id claimed by the token's `sub`.
    pub operator_id: OperatorId,
    /// Tenant the operator is acting within.
    pub tenant_id: TenantId,
    /// Workspace the operator is acting within.
    pub workspace_id: WorkspaceId,
    /// Municipality the operator is acting within.
    pub municipality_id: MunicipalityId,
    /// Whether this principal is exempt from tenant/operator scoping.
    pub is_admin: bool,
    /// The operator's directly-held permission set.
    pub permissions: BTreeSet<String>,
    /// The operator's role label, used for chain step `required_role` gates.
    pub role: String,
    /// Active delegations presented alongside the token.
    pub delegations: Vec<Delegation>,
}

/// Wire shape of the verified token's claims.
///
/// Unknown fields are ignored rather than rejected, so a token issued for a
/// broader surface than this engine still verifies here.
#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    tenant_id: String,
    workspace_id: String,
    #[serde(default)]
    municipality_id: String,
    #[serde(default)]
    role: String,
    #[serde(default)]
    permissions: Vec<String>,
    #[serde(default)]
    admin: bool,
    #[serde(default)]
    delegations: Vec<Delegation>,
}

/// Verifies an externally-issued bearer token and produces a [`Principal`].
///
/// The engine never signs a token; deployments plug in whichever issuer
/// they trust by supplying an implementation of this trait.
pub trait Verifier: Send + Sync {
    /// Verifies `token` and extracts the principal it names.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] when the token is malformed, expired, or fails
    /// signature verification.
    fn verify(&self, token: &str) -> Result<Principal, AuthError>;
}

/// Reasons a bearer token failed to verify.
#[derive(Debug)]
pub enum AuthError {
    /// No `Authorization` header, or it was not a `Bearer` token.
    MissingOrMalformed,
    /// Signature, expiry, issuer, or audience check failed.
    Invalid(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match &self {
            Self::MissingOrMalformed => "missing or malformed bearer token".to_string(),
            Self::Invalid(detail) => detail.clone(),
        };
        let body = Json(json!({
            "success": false,
            "error": "unauthenticated",
            "message": message,
        }));
        let mut response = (StatusCode::UNAUTHORIZED, body).into_response();
        response
            .headers_mut()
            .insert("WWW-Authenticate", "Bearer".parse().unwrap_or_else(|_| {
                axum::http::HeaderValue::from_static("Bearer")
            }));
        response
    }
}

/// `jsonwebtoken`-backed [`Verifier`] for HS256-signed tokens, configured
/// from [`JwtConfig`].
pub struct JwtVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    /// Builds a verifier from the service's JWT settings.
    #[must_use]
    pub fn new(config: &JwtConfig) -> Self {
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = config.leeway_secs;
        validation.set_required_spec_claims(&["sub", "exp"]);
        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer]);
        }
        if let Some(audience) = &config.audience {
            validation.set_audience(&[audience]);
        }
        Self {
            decoding_key,
            validation,
        }
    }
}

impl Verifier for JwtVerifier {
    fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|err| AuthError::Invalid(err.to_string()))?;
        let claims = data.claims;
        let permissions = claims.permissions.into_iter().collect();
        Ok(Principal {
            operator_id: OperatorId::from(claims.sub.as_str()),
            tenant_id: TenantId::from(claims.tenant_id.as_str()),
            workspace_id: WorkspaceId::from(claims.workspace_id.as_str()),
            municipality_id: MunicipalityId::from(claims.municipality_id.as_str()),
            is_admin: claims.admin,
            permissions,
            role: claims.role,
            delegations: claims.delegations,
        })
    }
}

/// Axum middleware: verifies the `Authorization` bearer token and inserts
/// the resulting [`Principal`] into request extensions for downstream
/// extractors. Rejects before any handler runs on a missing or invalid
/// token.
pub async fn authenticate(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    let token = match header.and_then(|value| value.strip_prefix("Bearer ")) {
        Some(token) if !token.trim().is_empty() => token,
        _ => return AuthError::MissingOrMalformed.into_response(),
    };
    match state.verifier.verify(token) {
        Ok(principal) => {
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Err(err) => err.into_response(),
    }
}

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Principal>().cloned().ok_or_else(|| {
            AuthError::MissingOrMalformed.into_response()
        })
    }
}
