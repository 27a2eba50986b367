//! Transit-Gateway VPN Route Failover Daemon
//!
//! vpnfailoverd keeps traffic flowing between a transit gateway and a
//! remote site served by two redundant VPN attachments, handling:
//! - Classification of inbound tunnel health-change events
//! - Failover once both tunnels of an attachment are down
//! - Fallback once a preferred attachment is fully recovered
//! - A scheduled health-check sweep over both attachments
//! - Static route redirection across all of the gateway's route tables,
//!   serialized by a shared DynamoDB lock
//! - Best-effort webhook notifications for every route switch

pub mod event;
pub mod failover_mgr;
pub mod gateway;
pub mod lock;
pub mod notify;
pub mod types;

pub use event::{ClassifiedEvent, EventDetail, InboundEvent};
pub use failover_mgr::FailoverMgr;
pub use types::{FailoverIntent, Outcome};
