//! Tracing subscriber initialisation.

use anyhow::{Context, Result};
use tracing::Span;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialise the global tracing subscriber.
///
/// Outputs structured JSON logs to stdout at the configured log level.
///
/// # Errors
///
/// Returns an error if a subscriber has already been set.
pub fn init(log_level: &str) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
        .try_init()
        .context("failed to initialise tracing subscriber")?;

    Ok(())
}

/// Build the logging handle injected into a component.
///
/// Every event the component emits is nested under a span carrying
/// `component` and the NF instance it belongs to.
pub fn component_span(component: &'static str, nf_instance_id: &str) -> Span {
    tracing::info_span!("udr", component, nf_instance_id = %nf_instance_id)
}
