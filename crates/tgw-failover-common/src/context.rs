//! Gateway deployment context.
//!
//! Every invocation builds one immutable [`GatewayContext`] from the
//! environment and passes it to the components that need it. There is no
//! ambient global configuration.

use crate::error::{FailoverError, FailoverResult};

/// Environment variable names, matching the deployment template.
pub mod env_vars {
    /// Region the transit gateway lives in.
    pub const REGION: &str = "TGWRegion";
    /// Transit gateway id.
    pub const GATEWAY_ID: &str = "TGWID";
    /// First (preferred) VPN attachment id.
    pub const ATTACHMENT_A: &str = "TGWAttachmentID1";
    /// Second (standby) VPN attachment id.
    pub const ATTACHMENT_B: &str = "TGWAttachmentID2";
    /// DynamoDB table backing the mutation lock.
    pub const LOCK_TABLE: &str = "DynamoDBLockTable";
    /// Fallback support flag ("no" disables fallback).
    pub const FALLBACK_SUPPORT: &str = "FallbackSupport";
    /// Incoming webhook URL for notifications (optional).
    pub const WEBHOOK_URL: &str = "SlackIncomingWebhook";
}

/// Immutable per-invocation deployment context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayContext {
    /// Transit gateway id all events must reference.
    pub gateway_id: String,
    /// First configured VPN attachment.
    pub attachment_a: String,
    /// Second configured VPN attachment.
    pub attachment_b: String,
    /// Region the gateway lives in.
    pub region: String,
    /// Whether recovered attachments get their routes back.
    pub fallback_enabled: bool,
}

impl GatewayContext {
    /// Builds a context, validating that the two attachments differ.
    pub fn new(
        gateway_id: impl Into<String>,
        attachment_a: impl Into<String>,
        attachment_b: impl Into<String>,
        region: impl Into<String>,
        fallback_enabled: bool,
    ) -> FailoverResult<Self> {
        let attachment_a = attachment_a.into();
        let attachment_b = attachment_b.into();

        if attachment_a == attachment_b {
            return Err(FailoverError::invalid_config(
                env_vars::ATTACHMENT_B,
                "the two VPN attachments must differ",
            ));
        }

        Ok(Self {
            gateway_id: gateway_id.into(),
            attachment_a,
            attachment_b,
            region: region.into(),
            fallback_enabled,
        })
    }

    /// Loads the context from the process environment.
    pub fn from_env() -> FailoverResult<Self> {
        let fallback = require_env(env_vars::FALLBACK_SUPPORT)?;

        Self::new(
            require_env(env_vars::GATEWAY_ID)?,
            require_env(env_vars::ATTACHMENT_A)?,
            require_env(env_vars::ATTACHMENT_B)?,
            require_env(env_vars::REGION)?,
            fallback != "no",
        )
    }

    /// Returns true if `attachment_id` is one of the two configured
    /// attachments.
    pub fn knows_attachment(&self, attachment_id: &str) -> bool {
        attachment_id == self.attachment_a || attachment_id == self.attachment_b
    }

    /// Returns the redundant peer of `attachment_id`.
    ///
    /// Callers must have validated the id with [`knows_attachment`] first.
    ///
    /// [`knows_attachment`]: GatewayContext::knows_attachment
    pub fn peer_attachment(&self, attachment_id: &str) -> &str {
        if attachment_id == self.attachment_a {
            &self.attachment_b
        } else {
            &self.attachment_a
        }
    }
}

/// Reads a required environment variable.
pub fn require_env(name: &str) -> FailoverResult<String> {
    std::env::var(name).map_err(|_| FailoverError::invalid_config(name, "not set"))
}

/// Reads an optional environment variable, mapping empty to `None`.
pub fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> GatewayContext {
        GatewayContext::new(
            "tgw-0123456789abcdef0",
            "tgw-attach-aaaa",
            "tgw-attach-bbbb",
            "eu-west-1",
            true,
        )
        .unwrap()
    }

    #[test]
    fn test_attachments_must_differ() {
        let err = GatewayContext::new("tgw-1", "tgw-attach-aaaa", "tgw-attach-aaaa", "eu-west-1", true)
            .unwrap_err();
        assert!(err.to_string().contains("must differ"));
    }

    #[test]
    fn test_knows_attachment() {
        let ctx = context();
        assert!(ctx.knows_attachment("tgw-attach-aaaa"));
        assert!(ctx.knows_attachment("tgw-attach-bbbb"));
        assert!(!ctx.knows_attachment("tgw-attach-cccc"));
    }

    #[test]
    fn test_peer_attachment() {
        let ctx = context();
        assert_eq!(ctx.peer_attachment("tgw-attach-aaaa"), "tgw-attach-bbbb");
        assert_eq!(ctx.peer_attachment("tgw-attach-bbbb"), "tgw-attach-aaaa");
    }
}
