//! Inbound event model and classification.
//!
//! Events arrive as EventBridge payloads; only the `detail` object matters
//! here. Classification validates that the event belongs to the configured
//! gateway and attachments and picks the handling path. Rejections are
//! ordinary errors — the binary decides how they map to exit status.

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use tgw_failover_common::{arn, FailoverError, FailoverResult, GatewayContext};

use crate::types::ChangeType;

/// EventBridge envelope; fields outside `detail` are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEvent {
    /// The tunnel health-change detail object.
    pub detail: EventDetail,
}

/// The `detail` object of a VPN tunnel health-change event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDetail {
    /// Change type tag (e.g. `VPN-CONNECTION-IPSEC-DOWN`).
    pub change_type: String,
    /// ARN of the transit gateway the change belongs to.
    pub transit_gateway_arn: String,
    /// ARN of the affected VPN attachment; absent on health-check sweeps.
    #[serde(default)]
    pub transit_gateway_attachment_arn: Option<String>,
    /// ARN of the affected VPN connection; absent on health-check sweeps.
    #[serde(default)]
    pub vpn_connection_arn: Option<String>,
}

/// A validated event, ready for the decision engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifiedEvent {
    /// A tunnel recovered on the named attachment.
    TunnelUp {
        /// The attachment the event names.
        attachment_id: String,
        /// Its underlying VPN connection.
        vpn_connection_id: String,
    },
    /// A tunnel degraded on the named attachment.
    TunnelDown {
        /// The attachment the event names.
        attachment_id: String,
        /// Its underlying VPN connection.
        vpn_connection_id: String,
    },
    /// Scheduled sweep over both configured attachments.
    HealthCheck,
    /// A change type this daemon does not act on.
    Unhandled {
        /// The raw change type, for logging.
        change_type: String,
    },
}

/// Validates an event against the deployment context and classifies it.
///
/// Rejects events for a different gateway, and non-health-check events for
/// an attachment that is neither configured one. No gateway or lock calls
/// happen before this guard passes.
pub fn classify(event: &EventDetail, ctx: &GatewayContext) -> FailoverResult<ClassifiedEvent> {
    let gateway_id = arn::resource_id(&event.transit_gateway_arn)?;
    if gateway_id != ctx.gateway_id {
        error!("Irrelevant tgw {}", gateway_id);
        return Err(FailoverError::irrelevant_gateway(gateway_id));
    }

    let change_type = ChangeType::parse(&event.change_type);

    if change_type == ChangeType::IpsecHealthCheck {
        return Ok(ClassifiedEvent::HealthCheck);
    }

    // Every other change type names a single attachment and VPN connection.
    let attachment_arn = event.transit_gateway_attachment_arn.as_deref().ok_or_else(|| {
        FailoverError::invalid_event(format!(
            "{} event without transitGatewayAttachmentArn",
            event.change_type
        ))
    })?;
    let attachment_id = arn::resource_id(attachment_arn)?;

    if !ctx.knows_attachment(attachment_id) {
        error!("Irrelevant tgw attachment {}", attachment_id);
        return Err(FailoverError::irrelevant_attachment(attachment_id));
    }

    let vpn_arn = event.vpn_connection_arn.as_deref().ok_or_else(|| {
        FailoverError::invalid_event(format!(
            "{} event without vpnConnectionArn",
            event.change_type
        ))
    })?;
    let vpn_connection_id = arn::resource_id(vpn_arn)?;

    info!("Event {} for vpn {}", event.change_type, vpn_connection_id);

    Ok(match change_type {
        ChangeType::IpsecUp => ClassifiedEvent::TunnelUp {
            attachment_id: attachment_id.to_string(),
            vpn_connection_id: vpn_connection_id.to_string(),
        },
        ChangeType::IpsecDown => ClassifiedEvent::TunnelDown {
            attachment_id: attachment_id.to_string(),
            vpn_connection_id: vpn_connection_id.to_string(),
        },
        ChangeType::IpsecHealthCheck => unreachable!("handled above"),
        ChangeType::Other(raw) => ClassifiedEvent::Unhandled { change_type: raw },
    })
}
