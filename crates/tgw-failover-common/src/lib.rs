//! Common infrastructure for the transit-gateway VPN failover daemon.
//!
//! This crate provides the pieces shared between the daemon crate and its
//! tests:
//!
//! - [`error`]: Error types for failover operations
//! - [`context`]: Immutable per-invocation deployment context
//! - [`arn`]: ARN resource-id extraction
//!
//! # Architecture
//!
//! The failover daemon follows this pattern:
//!
//! 1. Classify an inbound tunnel health-change event against the context
//! 2. Read tunnel telemetry to confirm a full outage or full recovery
//! 3. Rewrite matching static routes across all route tables, under a
//!    distributed lock
//! 4. Push a best-effort notification describing what changed

pub mod arn;
pub mod context;
pub mod error;

// Re-export commonly used items at crate root
pub use context::{env_vars, optional_env, require_env, GatewayContext};
pub use error::{FailoverError, FailoverResult};
