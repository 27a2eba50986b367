//! Failover Manager - decision engine and lock-protected route switching.

use tracing::{info, instrument, warn};

use tgw_failover_common::{FailoverError, FailoverResult, GatewayContext};

use crate::event::{classify, ClassifiedEvent, EventDetail};
use crate::gateway::GatewayApi;
use crate::lock::{with_lock, LockStore};
use crate::notify::Notifier;
use crate::types::{FailoverIntent, Outcome, TunnelStatus, LOCK_NAME};

/// Failover Manager
///
/// Owns one invocation's view of the deployment: classifies the inbound
/// event, confirms tunnel state, and redirects static routes between the
/// two redundant VPN attachments under the mutation lock.
pub struct FailoverMgr<A, L, N> {
    ctx: GatewayContext,
    gateway: A,
    lock: L,
    notifier: N,
}

impl<A, L, N> FailoverMgr<A, L, N>
where
    A: GatewayApi,
    L: LockStore,
    N: Notifier,
{
    /// Creates a manager for one invocation.
    pub fn new(ctx: GatewayContext, gateway: A, lock: L, notifier: N) -> Self {
        Self {
            ctx,
            gateway,
            lock,
            notifier,
        }
    }

    /// Classifies and fully handles one inbound event.
    ///
    /// Irrelevant events (wrong gateway, unknown attachment) come back as
    /// errors before any gateway or lock call is made.
    pub async fn handle(&self, event: &EventDetail) -> FailoverResult<Outcome> {
        match classify(event, &self.ctx)? {
            ClassifiedEvent::TunnelUp {
                attachment_id,
                vpn_connection_id,
            } => self.on_tunnel_up(&attachment_id, &vpn_connection_id).await,
            ClassifiedEvent::TunnelDown {
                attachment_id,
                vpn_connection_id,
            } => self.on_tunnel_down(&attachment_id, &vpn_connection_id).await,
            ClassifiedEvent::HealthCheck => self.on_health_check().await,
            ClassifiedEvent::Unhandled { change_type } => {
                info!("Ignoring irrelevant change type {}", change_type);
                Ok(Outcome::no_action(format!(
                    "change type {change_type} is not handled"
                )))
            }
        }
    }

    /// A tunnel recovered on `attachment_id`. Routes fall back to it only
    /// once both of its tunnels confirm UP, and only if fallback is
    /// configured; a half-recovered attachment is left alone to avoid
    /// flapping.
    #[instrument(skip(self))]
    async fn on_tunnel_up(
        &self,
        attachment_id: &str,
        vpn_connection_id: &str,
    ) -> FailoverResult<Outcome> {
        if !self.ctx.fallback_enabled {
            info!("Ignore it as fallback is not configured.");
            return Ok(Outcome::no_action("fallback is not configured"));
        }

        let pair = self.gateway.tunnel_pair_status(vpn_connection_id).await?;
        if let Some(tunnel) = pair.first_with(TunnelStatus::Down) {
            info!(
                "Tunnel {} is still DOWN in {}, do not fallback.",
                tunnel.outside_ip, vpn_connection_id
            );
            return Ok(Outcome::no_action("attachment not fully recovered"));
        }

        let intent = FailoverIntent::new(
            self.ctx.peer_attachment(attachment_id),
            attachment_id,
            format!("Both tunnels for {vpn_connection_id} are UP, kick off fallback."),
        );
        self.switch_routes(&intent).await
    }

    /// A tunnel degraded on `attachment_id`. Routes fail over only once
    /// both of its tunnels confirm DOWN; a single-tunnel failure is
    /// tolerated by the attachment's internal redundancy.
    #[instrument(skip(self))]
    async fn on_tunnel_down(
        &self,
        attachment_id: &str,
        vpn_connection_id: &str,
    ) -> FailoverResult<Outcome> {
        let pair = self.gateway.tunnel_pair_status(vpn_connection_id).await?;
        if let Some(tunnel) = pair.first_with(TunnelStatus::Up) {
            info!(
                "Tunnel {} is still UP in {}, do not failover.",
                tunnel.outside_ip, vpn_connection_id
            );
            return Ok(Outcome::no_action("attachment still has a live tunnel"));
        }

        let intent = FailoverIntent::new(
            attachment_id,
            self.ctx.peer_attachment(attachment_id),
            format!("Both tunnels for {vpn_connection_id} are DOWN, kick off failover."),
        );
        self.switch_routes(&intent).await
    }

    /// Scheduled sweep over both attachments. At most one mutation per
    /// sweep: failing over both attachments at once would leave no usable
    /// path, so the scan stops at the first full outage.
    #[instrument(skip(self))]
    async fn on_health_check(&self) -> FailoverResult<Outcome> {
        let configured = [
            self.ctx.attachment_a.clone(),
            self.ctx.attachment_b.clone(),
        ];
        let records = self.gateway.attachment_resources(&configured).await?;

        for attachment_id in &configured {
            let record = records
                .iter()
                .find(|r| &r.attachment_id == attachment_id)
                .ok_or_else(|| {
                    FailoverError::contract(format!("no attachment record for {attachment_id}"))
                })?;

            let pair = self.gateway.tunnel_pair_status(&record.resource_id).await?;
            if let Some(tunnel) = pair.first_with(TunnelStatus::Up) {
                info!(
                    "Health checking - Tunnel {} is UP for {}",
                    tunnel.outside_ip, record.resource_id
                );
                continue;
            }

            let intent = FailoverIntent::new(
                attachment_id,
                self.ctx.peer_attachment(attachment_id),
                format!(
                    "Health checking - Both connection for {} are DOWN, updating route table.",
                    record.resource_id
                ),
            );
            return self.switch_routes(&intent).await;
        }

        Ok(Outcome::no_action("all attachments healthy"))
    }

    /// Redirects every matching static route across every route table of
    /// the gateway, under the mutation lock, then notifies if anything
    /// changed.
    ///
    /// The search filters on the intent's current attachment, so replaying
    /// the same intent finds nothing left to switch and writes nothing —
    /// the whole operation is safe to retry after a partial failure.
    async fn switch_routes(&self, intent: &FailoverIntent) -> FailoverResult<Outcome> {
        let outcome = with_lock(&self.lock, LOCK_NAME, || self.switch_routes_locked(intent)).await?;

        if let Outcome::Switched {
            summary,
            routes_replaced,
        } = &outcome
        {
            if *routes_replaced > 0 {
                self.notifier.notify(summary).await;
            }
        }

        Ok(outcome)
    }

    /// The lock-protected body: enumerate tables, search, replace.
    async fn switch_routes_locked(&self, intent: &FailoverIntent) -> FailoverResult<Outcome> {
        let table_ids = self.gateway.route_table_ids(&self.ctx.gateway_id).await?;

        let mut summary = intent.reason.clone();
        let mut routes_replaced = 0;

        for table_id in &table_ids {
            let routes = self
                .gateway
                .static_routes_for_attachment(table_id, &intent.current_attachment)
                .await?;

            if routes.is_empty() {
                info!(
                    "No routes to {} found in {}",
                    intent.current_attachment, table_id
                );
                continue;
            }

            for route in routes {
                summary.push_str(&format!(
                    " Replacing route {} to {} in TGW route table {}.",
                    route.destination_cidr, intent.new_attachment, table_id
                ));
                self.gateway
                    .replace_static_route(table_id, &route.destination_cidr, &intent.new_attachment)
                    .await?;
                routes_replaced += 1;
            }
        }

        if routes_replaced > 0 {
            warn!("{}", summary);
        } else {
            info!(
                "No routes to {} left anywhere, nothing to switch",
                intent.current_attachment
            );
        }

        Ok(Outcome::Switched {
            summary,
            routes_replaced,
        })
    }
}
