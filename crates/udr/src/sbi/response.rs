//! Rendering of request-scoped errors as SBI responses.

use axum::{
    http::{header::CONTENT_TYPE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use common::{protocol::PROBLEM_JSON, ServiceError};

/// Build a `ProblemDetails` response for `err`.
pub fn problem_response(err: &ServiceError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut resp = (status, Json(err.to_problem())).into_response();
    resp.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(PROBLEM_JSON));
    resp
}

/// Catch-all 404 handler for paths outside every capability group.
pub async fn not_found() -> Response {
    problem_response(&ServiceError::DataNotFound(
        "the requested resource does not exist".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn problem_response_sets_status_and_media_type() {
        let resp = problem_response(&ServiceError::BadRequest("bad json".into()));
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(resp.headers()[CONTENT_TYPE], PROBLEM_JSON);
    }
}
