//! Common SBI types and request-scoped errors shared across the UDR crates.

pub mod error;
pub mod protocol;

pub use error::ServiceError;
pub use protocol::{ProblemDetails, ServiceName};
