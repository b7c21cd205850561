//! Structured logging for the UDR.
//!
//! A single JSON `fmt` subscriber is installed at startup. Components do not
//! log through a package-level logger: each one is handed a [`tracing::Span`]
//! at construction and records its events inside that span, so the caller
//! decides how a component's output is labelled.
//!
//! # Telemetry invariants
//!
//! - **No access tokens or TLS secrets** appear in any log field.
//! - Log level is configurable via `log_level` (default: `info`); `RUST_LOG`
//!   overrides it.

pub mod init;

pub use init::{component_span, init};
