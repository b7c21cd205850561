//! Per-request authorization gate for SBI capability groups.
//!
//! The gate is a pure decision over the request headers and the NF's
//! security context. It never touches repository state, so a denial has no
//! side effects beyond the 401 response.

use std::sync::Arc;

use axum::{
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    response::Response,
};
use common::{ServiceError, ServiceName};
use thiserror::Error;
use tracing::debug;

use super::response::problem_response;
use super::router::PreHandler;

/// Reasons an access token is refused.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    /// No `Authorization` header was sent.
    #[error("missing access token")]
    MissingToken,

    /// The header is present but not of the form `Bearer <token>`.
    #[error("authorization header is not a bearer token")]
    NotBearer,

    /// The token is not a well-formed JWT.
    #[error("malformed access token: {0}")]
    MalformedToken(String),

    /// The token header names an algorithm this UDR does not accept.
    #[error("unsupported token algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The token signature does not verify against the NRF key.
    #[error("access token signature mismatch")]
    BadSignature,

    /// The configured NRF key cannot be used for verification.
    #[error("token verification key is unusable")]
    InvalidKey,

    /// The token `exp` claim is in the past.
    #[error("access token expired")]
    Expired,

    /// The token scope does not grant the invoked service.
    #[error("scope {granted:?} does not grant {required}")]
    InsufficientScope {
        required: ServiceName,
        granted: String,
    },
}

/// Read-only view of the NF's security state consulted by the gate.
///
/// Implementations are shared by every in-flight request and must not mutate
/// anything while evaluating.
#[cfg_attr(test, mockall::automock)]
pub trait SecurityContext: Send + Sync {
    /// Decide whether `token` (the raw `Authorization` header value, empty
    /// when absent) may invoke `service_name`.
    fn authorization_check(&self, token: &str, service_name: ServiceName) -> Result<(), AuthError>;
}

/// Outcome of evaluating one request against the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationDecision {
    Allow,
    Deny(String),
}

/// Gate installed in front of every route of one capability group.
#[derive(Clone)]
pub struct RouterAuthorizationCheck {
    service_name: ServiceName,
    context: Arc<dyn SecurityContext>,
}

impl RouterAuthorizationCheck {
    pub fn new(service_name: ServiceName, context: Arc<dyn SecurityContext>) -> Self {
        Self {
            service_name,
            context,
        }
    }

    /// Evaluate the request headers against the security context.
    pub fn check(&self, headers: &HeaderMap) -> AuthorizationDecision {
        let token = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        match self.context.authorization_check(token, self.service_name) {
            Ok(()) => {
                debug!(service = %self.service_name, "authorization check passed");
                AuthorizationDecision::Allow
            }
            Err(e) => {
                debug!(service = %self.service_name, reason = %e, "authorization check failed");
                AuthorizationDecision::Deny(e.to_string())
            }
        }
    }
}

impl PreHandler for RouterAuthorizationCheck {
    fn handle(&self, parts: &Parts) -> Result<(), Response> {
        match self.check(&parts.headers) {
            AuthorizationDecision::Allow => Ok(()),
            AuthorizationDecision::Deny(reason) => {
                Err(problem_response(&ServiceError::Unauthorized(reason)))
            }
        }
    }
}
