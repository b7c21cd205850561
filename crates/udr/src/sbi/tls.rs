//! TLS material loading for the `https` SBI scheme.
//!
//! The certificate chain and private key are PEM files shipped with the
//! deployment. This module parses them into a `rustls::ServerConfig` that
//! advertises both HTTP/2 and HTTP/1.1 over ALPN.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use rustls::{KeyLog, ServerConfig};
use tracing::warn;

/// ALPN identifiers offered to TLS clients, in preference order.
pub const ALPN_PROTOCOLS: [&[u8]; 2] = [b"h2", b"http/1.1"];

/// Build a [`rustls::ServerConfig`] from PEM-encoded certificate and private key bytes.
///
/// When `key_log` is set, session secrets are handed to it for every handshake.
///
/// # Errors
///
/// Returns an error if the certificate or key cannot be parsed, or if rustls
/// rejects the configuration.
pub fn build_server_config(
    cert_pem: &[u8],
    key_pem: &[u8],
    key_log: Option<Arc<dyn KeyLog>>,
) -> Result<Arc<ServerConfig>> {
    let certs = rustls_pemfile::certs(&mut std::io::BufReader::new(cert_pem))
        .collect::<Result<Vec<_>, _>>()
        .context("failed to parse TLS certificate chain")?;
    if certs.is_empty() {
        anyhow::bail!("no certificate found in PEM data");
    }

    let key = rustls_pemfile::private_key(&mut std::io::BufReader::new(key_pem))
        .context("failed to read TLS private key")?
        .context("no private key found in PEM data")?;

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let mut config = ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .context("failed to select TLS protocol versions")?
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .context("failed to build rustls ServerConfig")?;

    config.alpn_protocols = ALPN_PROTOCOLS.iter().map(|p| p.to_vec()).collect();
    if let Some(key_log) = key_log {
        config.key_log = key_log;
    }

    Ok(Arc::new(config))
}

/// Read the PEM files at `cert_path` and `key_path` and build a server config.
///
/// # Errors
///
/// Returns an error if either file is unreadable or its contents are rejected
/// by [`build_server_config`].
pub fn load_server_config(
    cert_path: &Path,
    key_path: &Path,
    key_log: Option<Arc<dyn KeyLog>>,
) -> Result<Arc<ServerConfig>> {
    let cert_pem = std::fs::read(cert_path)
        .with_context(|| format!("failed to read TLS certificate {}", cert_path.display()))?;
    let key_pem = std::fs::read(key_path)
        .with_context(|| format!("failed to read TLS private key {}", key_path.display()))?;
    build_server_config(&cert_pem, &key_pem, key_log)
}

/// Appends TLS secrets to a file in NSS key log format, so captured SBI
/// traffic can be decrypted in Wireshark.
#[derive(Debug)]
pub struct KeyLogFile {
    path: PathBuf,
    file: Mutex<File>,
}

impl KeyLogFile {
    /// Open (or create) `path` for appending.
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_owned(),
            file: Mutex::new(file),
        })
    }
}

impl KeyLog for KeyLogFile {
    fn log(&self, label: &str, client_random: &[u8], secret: &[u8]) {
        let line = format!("{label} {} {}\n", to_hex(client_random), to_hex(secret));
        let Ok(mut file) = self.file.lock() else {
            return;
        };
        if let Err(e) = file.write_all(line.as_bytes()) {
            warn!(path = %self.path.display(), error = %e, "failed to write TLS key log");
        }
    }
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn self_signed() -> (String, String) {
        let ck = rcgen::generate_simple_self_signed(vec!["udr.5gc.mnc093.mcc208.3gppnetwork.org".into()])
            .unwrap();
        (ck.cert.pem(), ck.key_pair.serialize_pem())
    }

    #[test]
    fn rejects_empty_cert_pem() {
        let result = build_server_config(b"", b"", None);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_garbage_pem() {
        let result = build_server_config(b"not a pem", b"also not a pem", None);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_missing_key() {
        let (cert, _) = self_signed();
        assert!(build_server_config(cert.as_bytes(), b"", None).is_err());
    }

    #[test]
    fn accepts_self_signed_and_offers_h2() {
        let (cert, key) = self_signed();
        let config = build_server_config(cert.as_bytes(), key.as_bytes(), None).unwrap();
        assert_eq!(config.alpn_protocols[0], b"h2".to_vec());
        assert_eq!(config.alpn_protocols[1], b"http/1.1".to_vec());
    }

    #[test]
    fn load_reports_missing_file() {
        let err = load_server_config(
            Path::new("/nonexistent/udr.pem"),
            Path::new("/nonexistent/udr.key"),
            None,
        )
        .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/udr.pem"));
    }

    #[test]
    fn key_log_writes_nss_lines() {
        let path = std::env::temp_dir().join(format!("udr-keylog-{}.txt", uuid::Uuid::new_v4()));
        let log = KeyLogFile::open(&path).unwrap();
        log.log("CLIENT_RANDOM", &[0x01, 0xab], &[0xff]);
        log.log("SERVER_TRAFFIC_SECRET_0", &[0x00], &[0x10, 0x20]);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents,
            "CLIENT_RANDOM 01ab ff\nSERVER_TRAFFIC_SECRET_0 00 1020\n"
        );
        std::fs::remove_file(&path).unwrap();
    }
}
