//! Scheme selection and listener binding.

use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use axum::Router;
use rustls::KeyLog;
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use tracing::info;

use super::error::SbiError;
use super::tls::{self, KeyLogFile};
use crate::config::{SbiConfig, TlsConfig, DEFAULT_CERT_PEM_PATH, DEFAULT_PRIVATE_KEY_PATH};

/// Transport scheme of the SBI endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl FromStr for Scheme {
    type Err = SbiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "http" => Ok(Scheme::Http),
            "https" => Ok(Scheme::Https),
            other => Err(SbiError::Configuration(format!(
                "invalid SBI scheme: {other}"
            ))),
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        })
    }
}

/// Certificate chain and private key actually used for `https`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Resolve the TLS file locations: configured values win, empty ones fall
/// back to the packaged defaults.
pub fn resolve_tls_paths(tls: &TlsConfig) -> TlsPaths {
    let pick = |configured: &str, default: &str| {
        if configured.is_empty() {
            PathBuf::from(default)
        } else {
            PathBuf::from(configured)
        }
    };
    TlsPaths {
        cert: pick(&tls.pem, DEFAULT_CERT_PEM_PATH),
        key: pick(&tls.key, DEFAULT_PRIVATE_KEY_PATH),
    }
}

/// A bound but not yet serving SBI endpoint.
///
/// Owns the listening socket; dropping it closes the socket.
pub struct BoundServer {
    pub(crate) listener: TcpListener,
    pub(crate) tls: Option<TlsAcceptor>,
    pub(crate) router: Router,
    pub(crate) scheme: Scheme,
}

impl BoundServer {
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }
}

/// Bind the SBI listener for `config` and attach `router` to it.
///
/// The scheme is checked before anything else, so an unknown scheme never
/// opens a socket. No connection is accepted until the server is started.
///
/// # Errors
///
/// - [`SbiError::Configuration`] for a scheme other than `http`/`https`.
/// - [`SbiError::Bind`] when TLS material cannot be loaded or the address
///   cannot be bound.
pub async fn bind(
    config: &SbiConfig,
    router: Router,
    key_log_path: Option<&Path>,
) -> Result<BoundServer, SbiError> {
    let scheme: Scheme = config.scheme.parse()?;
    let addr = format!("{}:{}", config.binding_ipv4, config.port);

    let tls = match scheme {
        Scheme::Http => None,
        Scheme::Https => {
            let paths = resolve_tls_paths(&config.tls);
            let key_log = match key_log_path {
                Some(path) => {
                    let file = KeyLogFile::open(path).map_err(|e| SbiError::bind(&addr, e))?;
                    Some(Arc::new(file) as Arc<dyn KeyLog>)
                }
                None => None,
            };
            let server_config = tls::load_server_config(&paths.cert, &paths.key, key_log)
                .map_err(|e| SbiError::bind(&addr, e))?;
            info!(cert = %paths.cert.display(), key = %paths.key.display(), "TLS material loaded");
            Some(TlsAcceptor::from(server_config))
        }
    };

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| SbiError::bind(&addr, e))?;
    info!(addr = %addr, %scheme, "SBI listener bound");

    Ok(BoundServer {
        listener,
        tls,
        router,
        scheme,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sbi(scheme: &str, port: u16) -> SbiConfig {
        SbiConfig {
            scheme: scheme.into(),
            binding_ipv4: "127.0.0.1".into(),
            port,
            tls: TlsConfig::default(),
        }
    }

    fn free_port() -> u16 {
        std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port()
    }

    #[test]
    fn parses_known_schemes_only() {
        assert_eq!("http".parse::<Scheme>().unwrap(), Scheme::Http);
        assert_eq!("https".parse::<Scheme>().unwrap(), Scheme::Https);
        for bad in ["", "HTTP", "ftp", "http2", " https"] {
            assert!(matches!(
                bad.parse::<Scheme>(),
                Err(SbiError::Configuration(_))
            ));
        }
    }

    #[test]
    fn empty_tls_paths_resolve_to_defaults() {
        let paths = resolve_tls_paths(&TlsConfig::default());
        assert_eq!(paths.cert, PathBuf::from("./cert/udr.pem"));
        assert_eq!(paths.key, PathBuf::from("./cert/udr.key"));
    }

    #[test]
    fn configured_tls_paths_are_used_verbatim() {
        let paths = resolve_tls_paths(&TlsConfig {
            pem: "/etc/udr/tls/udr.pem".into(),
            key: "relative/udr.key".into(),
        });
        assert_eq!(paths.cert, PathBuf::from("/etc/udr/tls/udr.pem"));
        assert_eq!(paths.key, PathBuf::from("relative/udr.key"));
    }

    #[test]
    fn one_path_configured_other_defaulted() {
        let paths = resolve_tls_paths(&TlsConfig {
            pem: String::new(),
            key: "/secrets/udr.key".into(),
        });
        assert_eq!(paths.cert, PathBuf::from(DEFAULT_CERT_PEM_PATH));
        assert_eq!(paths.key, PathBuf::from("/secrets/udr.key"));
    }

    #[tokio::test]
    async fn invalid_scheme_fails_without_opening_socket() {
        let port = free_port();
        let result = bind(&sbi("ftp", port), Router::new(), None).await;
        assert!(matches!(result, Err(SbiError::Configuration(_))));

        // The port is still free: nothing was bound for the failed attempt.
        let probe = TcpListener::bind(("127.0.0.1", port)).await;
        assert!(probe.is_ok());
    }

    #[tokio::test]
    async fn http_binds_listener() {
        let bound = bind(&sbi("http", 0), Router::new(), None).await.unwrap();
        assert_eq!(bound.scheme(), Scheme::Http);
        assert!(bound.tls.is_none());
        assert_ne!(bound.local_addr().unwrap().port(), 0);
    }

    #[tokio::test]
    async fn address_in_use_is_bind_error() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();
        let result = bind(&sbi("http", port), Router::new(), None).await;
        assert!(matches!(result, Err(SbiError::Bind { .. })));
    }

    #[tokio::test]
    async fn https_with_missing_material_is_bind_error() {
        let mut config = sbi("https", 0);
        config.tls.pem = "/nonexistent/udr.pem".into();
        config.tls.key = "/nonexistent/udr.key".into();
        let result = bind(&config, Router::new(), None).await;
        assert!(matches!(result, Err(SbiError::Bind { .. })));
    }

    #[tokio::test]
    async fn https_binds_with_valid_material_and_key_log() {
        let dir = std::env::temp_dir().join(format!("udr-tls-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let ck = rcgen::generate_simple_self_signed(vec!["localhost".into()]).unwrap();
        let cert = dir.join("udr.pem");
        let key = dir.join("udr.key");
        std::fs::write(&cert, ck.cert.pem()).unwrap();
        std::fs::write(&key, ck.key_pair.serialize_pem()).unwrap();

        let mut config = sbi("https", 0);
        config.tls.pem = cert.to_string_lossy().into_owned();
        config.tls.key = key.to_string_lossy().into_owned();
        let key_log = dir.join("keylog.txt");

        let bound = bind(&config, Router::new(), Some(&key_log)).await.unwrap();
        assert_eq!(bound.scheme(), Scheme::Https);
        assert!(bound.tls.is_some());
        assert!(key_log.exists());

        drop(bound);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
