//! HS256 access token parsing and validation.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use common::ServiceName;
use hmac::{Hmac, Mac};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::Sha256;

use crate::sbi::AuthError;

type HmacSha256 = Hmac<Sha256>;

/// The only signing algorithm accepted from the NRF.
pub const ALGORITHM: &str = "HS256";

/// JOSE header of an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TokenHeader {
    alg: String,
}

/// Claims of a 5G SBA access token (3GPP TS 29.510 `AccessTokenClaims`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Issuer: NF instance ID of the NRF.
    pub iss: String,
    /// Subject: NF instance ID of the consumer.
    pub sub: String,
    /// Audience: NF type or NF instance ID(s) of the producer.
    pub aud: serde_json::Value,
    /// Space-delimited NF service names.
    pub scope: String,
    /// Expiry, seconds since the Unix epoch.
    pub exp: u64,
}

/// Strip the `Bearer ` prefix (case-insensitive) from an `Authorization`
/// header value.
pub fn extract_bearer_token(header: &str) -> Option<&str> {
    let trimmed = header.trim();
    let scheme = trimmed.get(..7)?;
    let token = trimmed.get(7..)?.trim();
    if scheme.eq_ignore_ascii_case("bearer ") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}

/// Verifies access tokens against the key shared with the NRF.
#[derive(Clone)]
pub struct TokenVerifier {
    key: Vec<u8>,
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TokenVerifier([REDACTED])")
    }
}

impl TokenVerifier {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self { key: key.into() }
    }

    /// Validate `token` for `service` at time `now` (seconds since epoch).
    ///
    /// # Errors
    ///
    /// Returns the first [`AuthError`] the token fails on, checked in order:
    /// structure, algorithm, signature, expiry, scope.
    pub fn verify(
        &self,
        token: &str,
        service: ServiceName,
        now: u64,
    ) -> Result<AccessTokenClaims, AuthError> {
        let parts: Vec<&str> = token.split('.').collect();
        let [header_b64, claims_b64, signature_b64] = parts[..] else {
            return Err(AuthError::MalformedToken(
                "expected three dot-separated parts".into(),
            ));
        };

        let header: TokenHeader = decode_segment(header_b64, "header")?;
        if header.alg != ALGORITHM {
            return Err(AuthError::UnsupportedAlgorithm(header.alg));
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| AuthError::MalformedToken("signature is not base64url".into()))?;
        self.mac(header_b64, claims_b64)?
            .verify_slice(&signature)
            .map_err(|_| AuthError::BadSignature)?;

        let claims: AccessTokenClaims = decode_segment(claims_b64, "claims")?;
        if claims.exp <= now {
            return Err(AuthError::Expired);
        }
        if !claims.scope.split_whitespace().any(|s| s == service.as_str()) {
            return Err(AuthError::InsufficientScope {
                required: service,
                granted: claims.scope,
            });
        }
        Ok(claims)
    }

    /// Sign `claims`, producing a compact token this verifier accepts.
    #[cfg(test)]
    pub fn sign(&self, claims: &AccessTokenClaims) -> Result<String, AuthError> {
        let header = TokenHeader {
            alg: ALGORITHM.into(),
        };
        let header_b64 = encode_segment(&header);
        let claims_b64 = encode_segment(claims);
        let signature = self.mac(&header_b64, &claims_b64)?.finalize().into_bytes();
        Ok(format!(
            "{header_b64}.{claims_b64}.{}",
            URL_SAFE_NO_PAD.encode(signature)
        ))
    }

    fn mac(&self, header_b64: &str, claims_b64: &str) -> Result<HmacSha256, AuthError> {
        let mut mac =
            <HmacSha256 as Mac>::new_from_slice(&self.key).map_err(|_| AuthError::InvalidKey)?;
        mac.update(header_b64.as_bytes());
        mac.update(b".");
        mac.update(claims_b64.as_bytes());
        Ok(mac)
    }
}

fn decode_segment<T: DeserializeOwned>(segment: &str, what: &str) -> Result<T, AuthError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| AuthError::MalformedToken(format!("{what} is not base64url")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| AuthError::MalformedToken(format!("invalid {what}: {e}")))
}

#[cfg(test)]
fn encode_segment<T: Serialize>(value: &T) -> String {
    // Serialising these plain structs cannot fail.
    let json = serde_json::to_vec(value).unwrap_or_default();
    URL_SAFE_NO_PAD.encode(json)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: u64 = 1_700_000_000;

    fn claims(scope: &str, exp: u64) -> AccessTokenClaims {
        AccessTokenClaims {
            iss: "nrf-instance".into(),
            sub: "udm-instance".into(),
            aud: serde_json::json!("UDR"),
            scope: scope.into(),
            exp,
        }
    }

    fn verifier() -> TokenVerifier {
        TokenVerifier::new("nrf-shared-key")
    }

    #[test]
    fn extract_bearer_variants() {
        assert_eq!(extract_bearer_token("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(extract_bearer_token("  bearer   xyz "), Some("xyz"));
        assert_eq!(extract_bearer_token("Basic dXNlcjpwYXNz"), None);
        assert_eq!(extract_bearer_token("Bearer "), None);
        assert_eq!(extract_bearer_token(""), None);
    }

    #[test]
    fn accepts_signed_token_with_scope() {
        let token = verifier().sign(&claims("nudr-dr nudr-group-id-map", NOW + 60)).unwrap();
        let verified = verifier().verify(&token, ServiceName::NudrDr, NOW).unwrap();
        assert_eq!(verified.sub, "udm-instance");
    }

    #[test]
    fn rejects_wrong_key() {
        let token = TokenVerifier::new("other-key").sign(&claims("nudr-dr", NOW + 60)).unwrap();
        assert_eq!(
            verifier().verify(&token, ServiceName::NudrDr, NOW),
            Err(AuthError::BadSignature)
        );
    }

    #[test]
    fn rejects_expired_token() {
        let token = verifier().sign(&claims("nudr-dr", NOW)).unwrap();
        assert_eq!(
            verifier().verify(&token, ServiceName::NudrDr, NOW),
            Err(AuthError::Expired)
        );
    }

    #[test]
    fn rejects_missing_scope() {
        let token = verifier().sign(&claims("nudr-group-id-map", NOW + 60)).unwrap();
        assert!(matches!(
            verifier().verify(&token, ServiceName::NudrDr, NOW),
            Err(AuthError::InsufficientScope { required: ServiceName::NudrDr, .. })
        ));
    }

    #[test]
    fn scope_must_match_whole_word() {
        let token = verifier().sign(&claims("nudr-dr-extra", NOW + 60)).unwrap();
        assert!(verifier().verify(&token, ServiceName::NudrDr, NOW).is_err());
    }

    #[test]
    fn rejects_tampered_claims() {
        let token = verifier().sign(&claims("nudr-group-id-map", NOW + 60)).unwrap();
        let forged_claims = encode_segment(&claims("nudr-dr", NOW + 60));
        let mut parts: Vec<&str> = token.split('.').collect();
        parts[1] = &forged_claims;
        assert_eq!(
            verifier().verify(&parts.join("."), ServiceName::NudrDr, NOW),
            Err(AuthError::BadSignature)
        );
    }

    #[test]
    fn rejects_other_algorithms() {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none"}"#);
        let body = encode_segment(&claims("nudr-dr", NOW + 60));
        let token = format!("{header}.{body}.");
        assert_eq!(
            verifier().verify(&token, ServiceName::NudrDr, NOW),
            Err(AuthError::UnsupportedAlgorithm("none".into()))
        );
    }

    #[test]
    fn rejects_malformed_structure() {
        for token in ["", "abc", "a.b", "a.b.c.d", "!!!.???.***"] {
            assert!(matches!(
                verifier().verify(token, ServiceName::NudrDr, NOW),
                Err(AuthError::MalformedToken(_))
            ));
        }
    }

    #[test]
    fn verifier_debug_is_redacted() {
        assert!(format!("{:?}", verifier()).contains("REDACTED"));
    }
}
