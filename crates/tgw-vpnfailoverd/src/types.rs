//! Core type definitions and constants for the failover daemon.

use std::time::Duration;

use tgw_failover_common::{FailoverError, FailoverResult};

/// Change type string for a tunnel that came back up.
pub const CHANGE_TYPE_IPSEC_UP: &str = "VPN-CONNECTION-IPSEC-UP";

/// Change type string for a tunnel that went down.
pub const CHANGE_TYPE_IPSEC_DOWN: &str = "VPN-CONNECTION-IPSEC-DOWN";

/// Change type string for the scheduled health-check sweep.
pub const CHANGE_TYPE_IPSEC_HEALTHCHECK: &str = "VPN-CONNECTION-IPSEC-HEALTHCHECK";

/// Name of the single mutation lock record.
pub const LOCK_NAME: &str = "my_key";

/// How long a holder may keep the lock without renewing it.
pub const LOCK_LEASE: Duration = Duration::from_secs(60);

/// After this period a lock record is reclaimable even if its holder
/// vanished without releasing.
pub const LOCK_EXPIRY: Duration = Duration::from_secs(1200);

/// Tunnel health-change event kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeType {
    /// A tunnel on some attachment recovered.
    IpsecUp,
    /// A tunnel on some attachment degraded.
    IpsecDown,
    /// Periodic sweep over both attachments.
    IpsecHealthCheck,
    /// Anything else; carried verbatim for logging.
    Other(String),
}

impl ChangeType {
    /// Parses the `detail.changeType` event field.
    pub fn parse(raw: &str) -> Self {
        match raw {
            CHANGE_TYPE_IPSEC_UP => ChangeType::IpsecUp,
            CHANGE_TYPE_IPSEC_DOWN => ChangeType::IpsecDown,
            CHANGE_TYPE_IPSEC_HEALTHCHECK => ChangeType::IpsecHealthCheck,
            other => ChangeType::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeType::IpsecUp => f.write_str(CHANGE_TYPE_IPSEC_UP),
            ChangeType::IpsecDown => f.write_str(CHANGE_TYPE_IPSEC_DOWN),
            ChangeType::IpsecHealthCheck => f.write_str(CHANGE_TYPE_IPSEC_HEALTHCHECK),
            ChangeType::Other(raw) => f.write_str(raw),
        }
    }
}

/// Status of a single IPsec tunnel as reported by telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TunnelStatus {
    /// Tunnel is passing traffic.
    Up,
    /// Tunnel is down.
    Down,
}

impl TunnelStatus {
    /// Parses the telemetry status string ("UP"/"DOWN").
    ///
    /// Anything that is not literally "UP" counts as down, matching how the
    /// telemetry API reports degraded tunnels.
    pub fn parse(raw: &str) -> Self {
        if raw == "UP" {
            TunnelStatus::Up
        } else {
            TunnelStatus::Down
        }
    }

    /// Returns true if the tunnel is up.
    pub fn is_up(&self) -> bool {
        matches!(self, TunnelStatus::Up)
    }
}

/// Telemetry record for one tunnel of a VPN connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelTelemetry {
    /// Outside IP address of the tunnel endpoint.
    pub outside_ip: String,
    /// Reported status.
    pub status: TunnelStatus,
}

/// Telemetry for the two tunnels composing a VPN connection.
///
/// A VPN connection always reports exactly two tunnels; a response with any
/// other count is an external-contract violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelPairStatus {
    tunnels: [TunnelTelemetry; 2],
}

impl TunnelPairStatus {
    /// Builds a pair from however many records the API returned.
    pub fn from_telemetry(
        vpn_connection_id: &str,
        records: Vec<TunnelTelemetry>,
    ) -> FailoverResult<Self> {
        let tunnels: [TunnelTelemetry; 2] = records.try_into().map_err(|records: Vec<_>| {
            FailoverError::contract(format!(
                "VPN connection {} reported {} tunnels, expected 2",
                vpn_connection_id,
                records.len()
            ))
        })?;
        Ok(Self { tunnels })
    }

    /// Both tunnel records, in the order the API reported them.
    pub fn tunnels(&self) -> &[TunnelTelemetry; 2] {
        &self.tunnels
    }

    /// True if both tunnels are up (fully recovered).
    pub fn all_up(&self) -> bool {
        self.tunnels.iter().all(|t| t.status.is_up())
    }

    /// True if both tunnels are down (full outage).
    pub fn all_down(&self) -> bool {
        self.tunnels.iter().all(|t| !t.status.is_up())
    }

    /// The first tunnel that is in `status`, if any.
    pub fn first_with(&self, status: TunnelStatus) -> Option<&TunnelTelemetry> {
        self.tunnels.iter().find(|t| t.status == status)
    }
}

/// A decided route switch, consumed exactly once by the route switcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailoverIntent {
    /// Attachment the matching static routes currently point at.
    pub current_attachment: String,
    /// Attachment the routes will be redirected to.
    pub new_attachment: String,
    /// Human-readable reason, used as the notification prefix.
    pub reason: String,
}

impl FailoverIntent {
    /// Creates a new intent.
    pub fn new(
        current_attachment: impl Into<String>,
        new_attachment: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            current_attachment: current_attachment.into(),
            new_attachment: new_attachment.into(),
            reason: reason.into(),
        }
    }
}

/// Terminal result of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The event warranted no route mutation.
    NoAction {
        /// Why nothing was done.
        reason: String,
    },
    /// Routes were evaluated under lock; `routes_replaced` may be zero when
    /// a retried intent found everything already switched.
    Switched {
        /// Summary message (reason + one clause per replaced route).
        summary: String,
        /// Number of replace operations issued.
        routes_replaced: usize,
    },
}

impl Outcome {
    /// Convenience constructor for the no-action case.
    pub fn no_action(reason: impl Into<String>) -> Self {
        Outcome::NoAction {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn telemetry(ip: &str, status: TunnelStatus) -> TunnelTelemetry {
        TunnelTelemetry {
            outside_ip: ip.to_string(),
            status,
        }
    }

    #[test]
    fn test_change_type_parse() {
        assert_eq!(ChangeType::parse("VPN-CONNECTION-IPSEC-UP"), ChangeType::IpsecUp);
        assert_eq!(ChangeType::parse("VPN-CONNECTION-IPSEC-DOWN"), ChangeType::IpsecDown);
        assert_eq!(
            ChangeType::parse("VPN-CONNECTION-IPSEC-HEALTHCHECK"),
            ChangeType::IpsecHealthCheck
        );
        assert_eq!(
            ChangeType::parse("BGP-SESSION-DOWN"),
            ChangeType::Other("BGP-SESSION-DOWN".to_string())
        );
    }

    #[test]
    fn test_tunnel_status_parse() {
        assert_eq!(TunnelStatus::parse("UP"), TunnelStatus::Up);
        assert_eq!(TunnelStatus::parse("DOWN"), TunnelStatus::Down);
        assert_eq!(TunnelStatus::parse("IMPAIRED"), TunnelStatus::Down);
    }

    #[test]
    fn test_tunnel_pair_predicates() {
        let pair = TunnelPairStatus::from_telemetry(
            "vpn-1",
            vec![
                telemetry("203.0.113.1", TunnelStatus::Up),
                telemetry("203.0.113.2", TunnelStatus::Down),
            ],
        )
        .unwrap();

        assert!(!pair.all_up());
        assert!(!pair.all_down());
        assert_eq!(
            pair.first_with(TunnelStatus::Down).unwrap().outside_ip,
            "203.0.113.2"
        );
        assert_eq!(
            pair.first_with(TunnelStatus::Up).unwrap().outside_ip,
            "203.0.113.1"
        );
    }

    #[test]
    fn test_tunnel_pair_requires_two_records() {
        let err = TunnelPairStatus::from_telemetry(
            "vpn-1",
            vec![telemetry("203.0.113.1", TunnelStatus::Up)],
        )
        .unwrap_err();
        assert!(err.to_string().contains("expected 2"));

        let err = TunnelPairStatus::from_telemetry(
            "vpn-1",
            vec![
                telemetry("203.0.113.1", TunnelStatus::Up),
                telemetry("203.0.113.2", TunnelStatus::Up),
                telemetry("203.0.113.3", TunnelStatus::Up),
            ],
        )
        .unwrap_err();
        assert!(err.to_string().contains("reported 3"));
    }
}
