//! Service-Based Interface server: binding, routing, authorization and
//! lifecycle.
//!
//! # Responsibilities
//! - Pick plain HTTP or TLS from the configured scheme and bind the listener.
//! - Mount the processor's routes under the data repository prefix, behind
//!   the authorization gate.
//! - Run the accept loop in the background and stop it within a bounded
//!   drain deadline.

pub mod auth;
pub mod binder;
pub mod error;
pub mod middleware;
pub mod response;
pub mod router;
pub mod server;
pub mod tls;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::config::SbiConfig;

pub use auth::{AuthError, SecurityContext};
pub use router::Route;
pub use server::{SbiServer, ShutdownOutcome};

/// The configuration the SBI server reads from its NF.
pub trait ConfigProvider: Send + Sync {
    fn sbi_config(&self) -> &SbiConfig;

    /// Where to write TLS session secrets, if anywhere.
    fn tls_key_log_path(&self) -> Option<&Path> {
        None
    }

    /// Drain deadline for `SbiServer::shutdown`.
    fn shutdown_timeout(&self) -> Duration {
        server::DEFAULT_SHUTDOWN_TIMEOUT
    }
}

/// Source of the security context consulted by the authorization gate.
pub trait SecurityContextProvider: Send + Sync {
    fn security_context(&self) -> Arc<dyn SecurityContext>;
}
