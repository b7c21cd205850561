//! Verification of NRF-issued OAuth2 access tokens.
//!
//! In 5G SBA the NRF is the authorization server: consumers obtain a JWT
//! through the client credentials grant and present it as
//! `Authorization: Bearer <jwt>`. The UDR accepts a token when:
//!
//! ```text
//! <base64url(header)>.<base64url(claims)>.<base64url(HMAC-SHA256)>
//! ```
//!
//! - the header names `HS256` and the signature verifies against the key
//!   shared with the NRF,
//! - `exp` is in the future,
//! - the space-delimited `scope` contains the invoked service name.
//!
//! # Security invariants
//!
//! - Token contents and the NRF key are **never** logged.

pub mod token;

pub use token::{extract_bearer_token, TokenVerifier};
