//! Error types for failover operations.
//!
//! This module defines the error types used throughout the failover crates.
//! All errors implement `std::error::Error` via `thiserror`.

use thiserror::Error;

/// Result type alias for failover operations.
pub type FailoverResult<T> = Result<T, FailoverError>;

/// Errors that can occur during failover operations.
#[derive(Debug, Error)]
pub enum FailoverError {
    /// Event references a transit gateway other than the configured one.
    #[error("Irrelevant tgw {gateway_id}")]
    IrrelevantGateway {
        /// The gateway id carried by the event.
        gateway_id: String,
    },

    /// Event references an attachment that is neither configured attachment.
    #[error("Irrelevant tgw attachment {attachment_id}")]
    IrrelevantAttachment {
        /// The attachment id carried by the event.
        attachment_id: String,
    },

    /// Event payload is missing a field required for its change type.
    #[error("Invalid event: {message}")]
    InvalidEvent {
        /// Error message.
        message: String,
    },

    /// Configuration validation error.
    #[error("Invalid configuration for {field}: {message}")]
    InvalidConfig {
        /// The field that failed validation.
        field: String,
        /// Error message.
        message: String,
    },

    /// Gateway/route API call failed.
    #[error("Gateway API call failed: {operation}: {message}")]
    Api {
        /// The operation that failed (e.g., "DescribeVpnConnections").
        operation: String,
        /// Error message.
        message: String,
    },

    /// Lock store operation failed.
    #[error("Lock store operation failed: {operation}: {message}")]
    LockStore {
        /// The operation that failed (e.g., "acquire", "release").
        operation: String,
        /// Error message.
        message: String,
    },

    /// External API returned a response violating its documented shape.
    #[error("External API contract violation: {message}")]
    Contract {
        /// Error message.
        message: String,
    },
}

impl FailoverError {
    /// Creates an irrelevant-gateway error.
    pub fn irrelevant_gateway(gateway_id: impl Into<String>) -> Self {
        Self::IrrelevantGateway {
            gateway_id: gateway_id.into(),
        }
    }

    /// Creates an irrelevant-attachment error.
    pub fn irrelevant_attachment(attachment_id: impl Into<String>) -> Self {
        Self::IrrelevantAttachment {
            attachment_id: attachment_id.into(),
        }
    }

    /// Creates an invalid-event error.
    pub fn invalid_event(message: impl Into<String>) -> Self {
        Self::InvalidEvent {
            message: message.into(),
        }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates a gateway API error.
    pub fn api(operation: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Api {
            operation: operation.into(),
            message: message.to_string(),
        }
    }

    /// Creates a lock store error.
    pub fn lock_store(operation: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::LockStore {
            operation: operation.into(),
            message: message.to_string(),
        }
    }

    /// Creates a contract violation error.
    pub fn contract(message: impl Into<String>) -> Self {
        Self::Contract {
            message: message.into(),
        }
    }

    /// Returns true if this error means the event was not addressed to this
    /// deployment (wrong gateway or unknown attachment). Such errors are
    /// rejected before any lock or route API call is made.
    pub fn is_irrelevant(&self) -> bool {
        matches!(
            self,
            FailoverError::IrrelevantGateway { .. } | FailoverError::IrrelevantAttachment { .. }
        )
    }
}
