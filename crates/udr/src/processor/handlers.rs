//! Generic document handlers shared by every data repository resource.
//!
//! A resource is identified by its request path relative to the service
//! prefix, so `/subscription-data/imsi-1/.../am-data` and
//! `/subscription-data/imsi-2/.../am-data` are distinct documents.

use axum::{
    body::{self, Body},
    extract::{OriginalUri, Request},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use common::ServiceError;
use serde_json::Value;
use tracing::{debug, warn};

use super::store::{DocumentStore, PutOutcome};
use crate::sbi::response::problem_response;

/// Largest request body accepted for a document.
pub const MAX_DOCUMENT_BYTES: usize = 64 * 1024;

fn resource_key(req: &Request) -> String {
    req.uri().path().to_owned()
}

async fn read_json(req: Request) -> Result<Value, ServiceError> {
    let bytes = body::to_bytes(req.into_body(), MAX_DOCUMENT_BYTES)
        .await
        .map_err(|e| ServiceError::BadRequest(format!("failed to read request body: {e}")))?;
    if bytes.is_empty() {
        return Err(ServiceError::BadRequest("request body is empty".into()));
    }
    serde_json::from_slice(&bytes)
        .map_err(|e| ServiceError::BadRequest(format!("request body is not valid JSON: {e}")))
}

fn data_not_found(key: &str) -> Response {
    problem_response(&ServiceError::DataNotFound(format!("no data stored at {key}")))
}

/// GET: return the stored document.
pub async fn query(store: DocumentStore, req: Request) -> Response {
    let key = resource_key(&req);
    match store.get(&key).await {
        Some(doc) => Json(doc).into_response(),
        None => {
            debug!(resource = %key, "document not found");
            data_not_found(&key)
        }
    }
}

/// PUT: create or replace the document.
///
/// `201 Created` echoes the stored document and carries a `Location` header;
/// a replacement answers `204 No Content`.
pub async fn replace(store: DocumentStore, req: Request) -> Response {
    let key = resource_key(&req);
    let location = req
        .extensions()
        .get::<OriginalUri>()
        .map(|uri| uri.path().to_owned())
        .unwrap_or_else(|| key.clone());
    let doc = match read_json(req).await {
        Ok(doc) => doc,
        Err(e) => return problem_response(&e),
    };

    match store.put(&key, doc.clone()).await {
        PutOutcome::Created => {
            debug!(resource = %key, "document created");
            (
                StatusCode::CREATED,
                [(header::LOCATION, location)],
                Json(doc),
            )
                .into_response()
        }
        PutOutcome::Replaced => {
            debug!(resource = %key, "document replaced");
            StatusCode::NO_CONTENT.into_response()
        }
    }
}

/// PATCH: apply a JSON Patch array or a JSON Merge Patch object.
pub async fn modify(store: DocumentStore, req: Request) -> Response {
    let key = resource_key(&req);
    let patch = match read_json(req).await {
        Ok(patch) => patch,
        Err(e) => return problem_response(&e),
    };

    match store.patch(&key, &patch).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => data_not_found(&key),
        Err(e) => {
            warn!(resource = %key, error = %e, "patch rejected");
            problem_response(&ServiceError::BadRequest(e.to_string()))
        }
    }
}

/// DELETE: remove the document. Deleting an absent document succeeds.
pub async fn remove(store: DocumentStore, req: Request) -> Response {
    let key = resource_key(&req);
    if store.remove(&key).await {
        debug!(resource = %key, "document removed");
    }
    (StatusCode::NO_CONTENT, Body::empty()).into_response()
}
