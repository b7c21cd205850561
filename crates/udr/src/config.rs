//! Configuration loading and validation for the UDR.
//!
//! Values come from an optional YAML file (path in `UDR_CONFIG`) overlaid by
//! environment variables prefixed with `UDR_`, using `__` as the nesting
//! separator (e.g. `UDR_SBI__PORT=8000`). The process exits with a clear error
//! message if any value is missing or invalid.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Default certificate chain served when `sbi.tls.pem` is left empty.
pub const DEFAULT_CERT_PEM_PATH: &str = "./cert/udr.pem";

/// Default private key used when `sbi.tls.key` is left empty.
pub const DEFAULT_PRIVATE_KEY_PATH: &str = "./cert/udr.key";

/// Environment variable naming the optional YAML configuration file.
pub const CONFIG_PATH_ENV: &str = "UDR_CONFIG";

/// Validated UDR configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Service-Based Interface listener settings.
    #[serde(default)]
    pub sbi: SbiConfig,

    /// NF instance identifier of this UDR.
    #[serde(default = "default_nf_instance_id")]
    pub nf_instance_id: String,

    /// Whether SBI consumers must present an NRF-issued OAuth2 access token.
    #[serde(default)]
    pub oauth2_required: bool,

    /// Shared key used to verify HS256 access tokens issued by the NRF.
    /// **Required** when `oauth2_required` is set.
    #[serde(default)]
    pub nrf_token_key: Option<String>,

    /// File to append TLS session secrets to (NSS key log format), for
    /// decrypting captured SBI traffic during debugging.
    #[serde(default)]
    pub tls_key_log_path: Option<PathBuf>,

    /// How long (milliseconds) shutdown waits for in-flight requests to drain.
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// SBI listener settings. Immutable once the server is constructed.
#[derive(Debug, Clone, Deserialize)]
pub struct SbiConfig {
    /// `"http"` or `"https"`. Checked at bind time, not at load time.
    #[serde(default = "default_scheme")]
    pub scheme: String,

    /// Address the SBI server binds to.
    #[serde(default = "default_binding_ipv4")]
    pub binding_ipv4: String,

    /// Port the SBI server listens on.
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub tls: TlsConfig,
}

/// TLS material locations. Empty paths resolve to the packaged defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TlsConfig {
    #[serde(default)]
    pub pem: String,
    #[serde(default)]
    pub key: String,
}

impl Default for SbiConfig {
    fn default() -> Self {
        Self {
            scheme: default_scheme(),
            binding_ipv4: default_binding_ipv4(),
            port: default_port(),
            tls: TlsConfig::default(),
        }
    }
}

fn default_scheme() -> String {
    "http".into()
}
fn default_binding_ipv4() -> String {
    "127.0.0.4".into()
}
fn default_port() -> u16 {
    8000
}
fn default_nf_instance_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
fn default_shutdown_timeout_ms() -> u64 {
    2000
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from `UDR_CONFIG` and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, a value cannot be parsed,
    /// or validation fails.
    pub fn load() -> Result<Self> {
        let file = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
        Self::load_from(file.as_deref())
    }

    /// Load from an explicit optional YAML file plus the environment.
    pub fn load_from(file: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Yaml)
                    .required(true),
            );
        }
        let cfg = builder
            .add_source(
                config::Environment::with_prefix("UDR")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("failed to build configuration")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Drain deadline applied by `SbiServer::shutdown`.
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        if self.sbi.binding_ipv4.trim().is_empty() {
            anyhow::bail!("sbi.binding_ipv4 is required and must not be empty");
        }
        if self.sbi.port == 0 {
            anyhow::bail!("sbi.port must be a non-zero port");
        }
        if self.shutdown_timeout_ms == 0 {
            anyhow::bail!("shutdown_timeout_ms must be > 0");
        }
        if self.oauth2_required
            && self
                .nrf_token_key
                .as_deref()
                .map_or(true, |k| k.trim().is_empty())
        {
            anyhow::bail!("nrf_token_key is required when oauth2_required is set");
        }
        Ok(())
    }
}
