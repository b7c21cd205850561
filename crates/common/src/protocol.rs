//! Wire types exchanged over the Service-Based Interface.
//!
//! Only the types the SBI server layer itself produces live here; the
//! repository record schemas belong to the processor.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Service names
// ---------------------------------------------------------------------------

/// NF service names a UDR can expose (3GPP TS 29.510 `ServiceName`).
///
/// The string form is also the OAuth2 scope an access token must carry to
/// invoke the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceName {
    /// Data repository service.
    #[serde(rename = "nudr-dr")]
    NudrDr,
    /// Group identifier mapping service.
    #[serde(rename = "nudr-group-id-map")]
    NudrGroupIdMap,
}

impl ServiceName {
    /// Wire representation, e.g. `"nudr-dr"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceName::NudrDr => "nudr-dr",
            ServiceName::NudrGroupIdMap => "nudr-group-id-map",
        }
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

/// `ProblemDetails` body returned on any non-2xx SBI response
/// (3GPP TS 29.571, RFC 7807).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemDetails {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub problem_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    /// Application-level cause, e.g. `"DATA_NOT_FOUND"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

/// Media type for `ProblemDetails` bodies.
pub const PROBLEM_JSON: &str = "application/problem+json";
