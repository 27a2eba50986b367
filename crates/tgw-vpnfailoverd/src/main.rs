//! Failover Daemon Entry Point
//!
//! One Lambda invocation per delivered event; the runtime's redelivery
//! policy is the only retry mechanism. An invocation error marks the event
//! as failed (irrelevant events and external-call failures); deliberate
//! no-action outcomes succeed.

use aws_config::BehaviorVersion;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use serde::Serialize;
use tracing::info;

use tgw_failover_common::{env_vars, optional_env, require_env, GatewayContext};
use tgw_vpnfailoverd::gateway::Ec2GatewayApi;
use tgw_vpnfailoverd::lock::DynamoLockStore;
use tgw_vpnfailoverd::notify::WebhookNotifier;
use tgw_vpnfailoverd::{FailoverMgr, InboundEvent, Outcome};

#[derive(Serialize)]
struct Response {
    status: String,
    message: String,
    routes_replaced: usize,
}

async fn handler(event: LambdaEvent<InboundEvent>) -> Result<Response, Error> {
    info!(
        "Received event: {}",
        serde_json::to_string(&event.payload)?
    );

    let ctx = GatewayContext::from_env()?;
    let lock_table = require_env(env_vars::LOCK_TABLE)?;
    let webhook_url = optional_env(env_vars::WEBHOOK_URL);

    let config = aws_config::defaults(BehaviorVersion::latest())
        .region(aws_config::Region::new(ctx.region.clone()))
        .load()
        .await;

    let mgr = FailoverMgr::new(
        ctx,
        Ec2GatewayApi::new(aws_sdk_ec2::Client::new(&config)),
        DynamoLockStore::new(aws_sdk_dynamodb::Client::new(&config), lock_table),
        WebhookNotifier::new(webhook_url),
    );

    let outcome = mgr.handle(&event.payload.detail).await?;

    Ok(match outcome {
        Outcome::NoAction { reason } => {
            info!("No action taken: {}", reason);
            Response {
                status: "no-action".to_string(),
                message: reason,
                routes_replaced: 0,
            }
        }
        Outcome::Switched {
            summary,
            routes_replaced,
        } => Response {
            status: "switched".to_string(),
            message: summary,
            routes_replaced,
        },
    })
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .json()
        .init();

    run(service_fn(handler)).await
}
