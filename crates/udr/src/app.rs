//! The UDR network function as seen by its SBI server.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, SbiConfig};
use crate::context::UdrContext;
use crate::sbi::{ConfigProvider, SecurityContext, SecurityContextProvider};

/// Validated configuration plus the shared security context.
pub struct UdrApp {
    config: Config,
    context: Arc<UdrContext>,
}

impl UdrApp {
    pub fn new(config: Config) -> Self {
        let context = Arc::new(UdrContext::from_config(&config));
        Self { config, context }
    }

    pub fn context(&self) -> &UdrContext {
        &self.context
    }
}

impl ConfigProvider for UdrApp {
    fn sbi_config(&self) -> &SbiConfig {
        &self.config.sbi
    }

    fn tls_key_log_path(&self) -> Option<&Path> {
        self.config.tls_key_log_path.as_deref()
    }

    fn shutdown_timeout(&self) -> Duration {
        self.config.shutdown_timeout()
    }
}

impl SecurityContextProvider for UdrApp {
    fn security_context(&self) -> Arc<dyn SecurityContext> {
        self.context.clone()
    }
}
