//! Runtime security context of the UDR network function.

use std::time::{SystemTime, UNIX_EPOCH};

use common::ServiceName;
use tracing::debug;

use crate::config::Config;
use crate::oauth::{extract_bearer_token, TokenVerifier};
use crate::sbi::{AuthError, SecurityContext};

/// Identity and OAuth2 policy of this UDR instance.
///
/// Built once at startup and only read afterwards, so it can be shared by
/// every request task without locking.
#[derive(Debug, Clone)]
pub struct UdrContext {
    nf_instance_id: String,
    oauth2_required: bool,
    verifier: Option<TokenVerifier>,
}

impl UdrContext {
    pub fn new(
        nf_instance_id: impl Into<String>,
        oauth2_required: bool,
        verifier: Option<TokenVerifier>,
    ) -> Self {
        Self {
            nf_instance_id: nf_instance_id.into(),
            oauth2_required,
            verifier,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(
            cfg.nf_instance_id.clone(),
            cfg.oauth2_required,
            cfg.nrf_token_key.as_deref().map(TokenVerifier::new),
        )
    }

    pub fn nf_instance_id(&self) -> &str {
        &self.nf_instance_id
    }

    pub fn oauth2_required(&self) -> bool {
        self.oauth2_required
    }
}

impl SecurityContext for UdrContext {
    fn authorization_check(&self, token: &str, service_name: ServiceName) -> Result<(), AuthError> {
        if !self.oauth2_required {
            debug!(service = %service_name, "OAuth2 not required");
            return Ok(());
        }
        if token.trim().is_empty() {
            return Err(AuthError::MissingToken);
        }
        let bearer = extract_bearer_token(token).ok_or(AuthError::NotBearer)?;
        let verifier = self.verifier.as_ref().ok_or(AuthError::InvalidKey)?;

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        verifier.verify(bearer, service_name, now).map(|_| ())
    }
}
