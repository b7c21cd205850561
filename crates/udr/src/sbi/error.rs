//! Process-level errors raised by the SBI server.

use std::time::Duration;

use thiserror::Error;

use super::server::ServerState;

/// Errors from constructing, running or stopping the SBI server.
///
/// `Configuration`, `Bind` and `AcceptLoop` are fatal: the process should
/// stop rather than run without a working SBI endpoint. `ShutdownTimeout` is
/// only ever logged.
#[derive(Debug, Error)]
pub enum SbiError {
    /// The configured scheme is neither `http` nor `https`.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The listener or its TLS material could not be set up.
    #[error("failed to bind SBI server on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The running accept loop failed for a reason other than shutdown.
    #[error("SBI accept loop failed: {0}")]
    AcceptLoop(#[source] std::io::Error),

    /// In-flight requests did not drain before the shutdown deadline.
    #[error("SBI server shutdown did not drain within {0:?}")]
    ShutdownTimeout(Duration),

    /// `start` was called outside the `Unstarted` state.
    #[error("SBI server cannot start from state {0:?}")]
    InvalidState(ServerState),
}

impl SbiError {
    pub(crate) fn bind(
        addr: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        SbiError::Bind {
            addr: addr.into(),
            source: source.into(),
        }
    }

    /// Whether the process must stop when this error surfaces.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SbiError::ShutdownTimeout(_))
    }
}
