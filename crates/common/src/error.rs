//! Request-scoped error types shared across crates.

use thiserror::Error;

use crate::protocol::ProblemDetails;

/// Error returned to an SBI consumer within a single request/response cycle.
///
/// Variants map to HTTP status codes and 3GPP `ProblemDetails` causes:
/// - [`ServiceError::BadRequest`] → 400 `MANDATORY_IE_INCORRECT`
/// - [`ServiceError::Unauthorized`] → 401 `UNAUTHORIZED`
/// - [`ServiceError::DataNotFound`] → 404 `DATA_NOT_FOUND`
/// - [`ServiceError::Internal`] → 500 `SYSTEM_FAILURE`
///
/// None of these are process faults; they never affect other requests.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request body or parameters were malformed.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The authorization gate rejected the request.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The addressed repository resource does not exist.
    #[error("data not found: {0}")]
    DataNotFound(String),

    /// An unexpected internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Returns the HTTP status code that should be sent for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            ServiceError::BadRequest(_) => 400,
            ServiceError::Unauthorized(_) => 401,
            ServiceError::DataNotFound(_) => 404,
            ServiceError::Internal(_) => 500,
        }
    }

    /// Application-level cause code carried in the `ProblemDetails` body.
    pub fn cause(&self) -> &'static str {
        match self {
            ServiceError::BadRequest(_) => "MANDATORY_IE_INCORRECT",
            ServiceError::Unauthorized(_) => "UNAUTHORIZED",
            ServiceError::DataNotFound(_) => "DATA_NOT_FOUND",
            ServiceError::Internal(_) => "SYSTEM_FAILURE",
        }
    }

    /// Render this error as a `ProblemDetails` body.
    pub fn to_problem(&self) -> ProblemDetails {
        let title = match self {
            ServiceError::BadRequest(_) => "Bad Request",
            ServiceError::Unauthorized(_) => "Unauthorized",
            ServiceError::DataNotFound(_) => "Not Found",
            ServiceError::Internal(_) => "Internal Server Error",
        };
        let detail = match self {
            ServiceError::BadRequest(d)
            | ServiceError::Unauthorized(d)
            | ServiceError::DataNotFound(d)
            | ServiceError::Internal(d) => d.clone(),
        };
        ProblemDetails {
            title: Some(title.into()),
            status: self.http_status(),
            detail: Some(detail),
            cause: Some(self.cause().into()),
            ..ProblemDetails::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_codes() {
        assert_eq!(ServiceError::BadRequest("x".into()).http_status(), 400);
        assert_eq!(ServiceError::Unauthorized("x".into()).http_status(), 401);
        assert_eq!(ServiceError::DataNotFound("x".into()).http_status(), 404);
        assert_eq!(ServiceError::Internal("x".into()).http_status(), 500);
    }

    #[test]
    fn problem_carries_status_and_cause() {
        let p = ServiceError::Unauthorized("token expired".into()).to_problem();
        assert_eq!(p.status, 401);
        assert_eq!(p.cause.as_deref(), Some("UNAUTHORIZED"));
        assert_eq!(p.detail.as_deref(), Some("token expired"));
    }

    #[test]
    fn display_includes_message() {
        let e = ServiceError::DataNotFound("/policy-data/ues/imsi-1/am-data".into());
        assert!(e.to_string().contains("/policy-data/ues/imsi-1/am-data"));
    }
}
