//! `udr`: Unified Data Repository binary entry point.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from `UDR_CONFIG` and `UDR_*` variables.
//! 2. Initialise structured logging.
//! 3. Build the security context and the data repository processor.
//! 4. Bind the SBI server and start accepting connections.
//! 5. Wait for a termination signal or a fatal accept-loop error, then drain.

mod app;
mod config;
mod context;
mod oauth;
mod processor;
mod sbi;
mod telemetry;

use anyhow::Result;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

use app::UdrApp;
use config::Config;
use processor::{DocumentStore, Processor};
use sbi::{SbiServer, ShutdownOutcome};

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::load().map_err(|e| {
        // Logging is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Logging
    // -----------------------------------------------------------------------
    telemetry::init(&cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        nf_instance_id = %cfg.nf_instance_id,
        "udr starting"
    );

    // -----------------------------------------------------------------------
    // 3. Context and processor
    // -----------------------------------------------------------------------
    let app = UdrApp::new(cfg);
    info!(
        oauth2_required = app.context().oauth2_required(),
        "security context ready"
    );
    let processor = Processor::new(DocumentStore::new());

    // -----------------------------------------------------------------------
    // 4. SBI server
    // -----------------------------------------------------------------------
    let span = telemetry::component_span("sbi", app.context().nf_instance_id());
    let server = SbiServer::new(&app, processor.data_repository_routes(), span).await?;
    info!(
        addr = %server.local_addr(),
        scheme = %server.scheme(),
        "SBI server bound"
    );

    let tasks = TaskTracker::new();
    let fatal = server.start(&tasks)?;

    // -----------------------------------------------------------------------
    // 5. Run until signalled
    // -----------------------------------------------------------------------
    let result = tokio::select! {
        _ = shutdown_signal() => {
            info!("termination signal received");
            Ok(())
        }
        Some(err) = fatal => {
            if err.is_fatal() {
                error!(error = %err, "SBI server failed");
                Err(err.into())
            } else {
                warn!(error = %err, "SBI server stopped");
                Ok(())
            }
        }
    };

    let outcome = server.shutdown().await;
    match outcome {
        ShutdownOutcome::TimedOut => {
            warn!(state = ?server.state(), "SBI server closed after drain deadline")
        }
        _ => info!(?outcome, state = ?server.state(), "SBI server closed"),
    }
    tasks.close();
    tasks.wait().await;

    info!("udr stopped");
    result
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
