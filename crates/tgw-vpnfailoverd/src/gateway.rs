//! Gateway/route API seam.
//!
//! [`GatewayApi`] is the daemon's view of the cloud route-management API:
//! enumerate route tables, search static routes by attachment, replace a
//! route's target, and read VPN tunnel telemetry. [`Ec2GatewayApi`] is the
//! production implementation over the EC2 SDK client. Failures are not
//! retried here; the event trigger's redelivery policy is the only retry
//! mechanism.

use async_trait::async_trait;
use aws_sdk_ec2::error::DisplayErrorContext;
use aws_sdk_ec2::types::Filter;

use tgw_failover_common::{FailoverError, FailoverResult};

use crate::types::{TunnelPairStatus, TunnelStatus, TunnelTelemetry};

/// Route search filter: owning transit gateway.
pub const FILTER_GATEWAY_ID: &str = "transit-gateway-id";

/// Route search filter: current target attachment.
pub const FILTER_ATTACHMENT_ID: &str = "attachment.transit-gateway-attachment-id";

/// Route search filter: route type.
pub const FILTER_ROUTE_TYPE: &str = "type";

/// Only static routes are failover candidates.
pub const ROUTE_TYPE_STATIC: &str = "static";

/// A static route matched in a route table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticRoute {
    /// Destination CIDR block identifying the route within its table.
    pub destination_cidr: String,
}

/// Mapping from a VPN attachment to its underlying VPN connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentRecord {
    /// The transit gateway attachment id.
    pub attachment_id: String,
    /// The VPN connection the attachment fronts.
    pub resource_id: String,
}

/// The daemon's interface to the gateway/route management API.
#[async_trait]
pub trait GatewayApi: Send + Sync {
    /// Lists the ids of all route tables associated with `gateway_id`.
    async fn route_table_ids(&self, gateway_id: &str) -> FailoverResult<Vec<String>>;

    /// Searches `table_id` for static routes currently targeting
    /// `attachment_id`.
    async fn static_routes_for_attachment(
        &self,
        table_id: &str,
        attachment_id: &str,
    ) -> FailoverResult<Vec<StaticRoute>>;

    /// Redirects the route identified by `destination_cidr` in `table_id`
    /// to `attachment_id`, leaving the destination unchanged.
    async fn replace_static_route(
        &self,
        table_id: &str,
        destination_cidr: &str,
        attachment_id: &str,
    ) -> FailoverResult<()>;

    /// Reads the two-tunnel telemetry of a VPN connection.
    async fn tunnel_pair_status(&self, vpn_connection_id: &str)
        -> FailoverResult<TunnelPairStatus>;

    /// Resolves attachment ids to their underlying VPN connections.
    async fn attachment_resources(
        &self,
        attachment_ids: &[String],
    ) -> FailoverResult<Vec<AttachmentRecord>>;
}

/// Production [`GatewayApi`] over the EC2 SDK client.
#[derive(Debug, Clone)]
pub struct Ec2GatewayApi {
    client: aws_sdk_ec2::Client,
}

impl Ec2GatewayApi {
    /// Wraps an EC2 client.
    pub fn new(client: aws_sdk_ec2::Client) -> Self {
        Self { client }
    }
}

fn api_error<E>(operation: &str, err: E) -> FailoverError
where
    E: std::error::Error + Send + Sync + 'static,
{
    FailoverError::api(operation, DisplayErrorContext(err))
}

#[async_trait]
impl GatewayApi for Ec2GatewayApi {
    async fn route_table_ids(&self, gateway_id: &str) -> FailoverResult<Vec<String>> {
        let response = self
            .client
            .describe_transit_gateway_route_tables()
            .filters(
                Filter::builder()
                    .name(FILTER_GATEWAY_ID)
                    .values(gateway_id)
                    .build(),
            )
            .send()
            .await
            .map_err(|e| api_error("DescribeTransitGatewayRouteTables", e))?;

        Ok(response
            .transit_gateway_route_tables()
            .iter()
            .filter_map(|table| table.transit_gateway_route_table_id().map(str::to_string))
            .collect())
    }

    async fn static_routes_for_attachment(
        &self,
        table_id: &str,
        attachment_id: &str,
    ) -> FailoverResult<Vec<StaticRoute>> {
        let response = self
            .client
            .search_transit_gateway_routes()
            .transit_gateway_route_table_id(table_id)
            .filters(
                Filter::builder()
                    .name(FILTER_ATTACHMENT_ID)
                    .values(attachment_id)
                    .build(),
            )
            .filters(
                Filter::builder()
                    .name(FILTER_ROUTE_TYPE)
                    .values(ROUTE_TYPE_STATIC)
                    .build(),
            )
            .send()
            .await
            .map_err(|e| api_error("SearchTransitGatewayRoutes", e))?;

        Ok(response
            .routes()
            .iter()
            .filter_map(|route| route.destination_cidr_block().map(str::to_string))
            .map(|destination_cidr| StaticRoute { destination_cidr })
            .collect())
    }

    async fn replace_static_route(
        &self,
        table_id: &str,
        destination_cidr: &str,
        attachment_id: &str,
    ) -> FailoverResult<()> {
        self.client
            .replace_transit_gateway_route()
            .transit_gateway_route_table_id(table_id)
            .destination_cidr_block(destination_cidr)
            .transit_gateway_attachment_id(attachment_id)
            .send()
            .await
            .map_err(|e| api_error("ReplaceTransitGatewayRoute", e))?;
        Ok(())
    }

    async fn tunnel_pair_status(
        &self,
        vpn_connection_id: &str,
    ) -> FailoverResult<TunnelPairStatus> {
        let response = self
            .client
            .describe_vpn_connections()
            .vpn_connection_ids(vpn_connection_id)
            .send()
            .await
            .map_err(|e| api_error("DescribeVpnConnections", e))?;

        let connection = response.vpn_connections().first().ok_or_else(|| {
            FailoverError::contract(format!(
                "DescribeVpnConnections returned no record for {vpn_connection_id}"
            ))
        })?;

        let telemetry = connection
            .vgw_telemetry()
            .iter()
            .map(|record| TunnelTelemetry {
                outside_ip: record.outside_ip_address().unwrap_or_default().to_string(),
                status: TunnelStatus::parse(
                    record.status().map(|s| s.as_str()).unwrap_or("DOWN"),
                ),
            })
            .collect();

        TunnelPairStatus::from_telemetry(vpn_connection_id, telemetry)
    }

    async fn attachment_resources(
        &self,
        attachment_ids: &[String],
    ) -> FailoverResult<Vec<AttachmentRecord>> {
        let response = self
            .client
            .describe_transit_gateway_attachments()
            .set_transit_gateway_attachment_ids(Some(attachment_ids.to_vec()))
            .send()
            .await
            .map_err(|e| api_error("DescribeTransitGatewayAttachments", e))?;

        response
            .transit_gateway_attachments()
            .iter()
            .map(|attachment| {
                let attachment_id = attachment
                    .transit_gateway_attachment_id()
                    .ok_or_else(|| {
                        FailoverError::contract("attachment record without an attachment id")
                    })?
                    .to_string();
                let resource_id = attachment
                    .resource_id()
                    .ok_or_else(|| {
                        FailoverError::contract(format!(
                            "attachment {attachment_id} has no resource id"
                        ))
                    })?
                    .to_string();
                Ok(AttachmentRecord {
                    attachment_id,
                    resource_id,
                })
            })
            .collect()
    }
}
