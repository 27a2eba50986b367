//! Distributed mutation lock.
//!
//! Route mutation across tables must not interleave between concurrent
//! invocations, so the switcher runs under a named lock in a shared
//! DynamoDB table. [`with_lock`] is the only way the daemon takes the lock:
//! it acquires, runs the body, and releases on every exit path.
//!
//! A lock record carries its holder's owner token, the lease duration, and
//! an absolute expiry timestamp. Acquisition blocks (poll + sleep) while a
//! live record exists; a record past its expiry is stolen, which bounds how
//! long a crashed holder can wedge the system.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::AttributeValue;
use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use tgw_failover_common::{FailoverError, FailoverResult};

use crate::types::{LOCK_EXPIRY, LOCK_LEASE};

/// Attribute names of the lock record.
mod attrs {
    /// Partition key: the lock name.
    pub const LOCK_KEY: &str = "lock_key";
    /// Owner token of the current holder.
    pub const OWNER: &str = "owner";
    /// Lease duration in seconds.
    pub const LEASE_DURATION: &str = "lease_duration";
    /// Epoch second past which the record is reclaimable.
    pub const EXPIRY_TIME: &str = "expiry_time";
}

/// Poll interval while another invocation holds the lock.
const ACQUIRE_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Exclusive ownership of one named lock record.
///
/// Created by [`LockStore::acquire`], consumed by [`LockStore::release`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockHandle {
    /// The lock name.
    pub name: String,
    /// Owner token proving this invocation holds the record.
    pub owner: String,
}

/// Interface to the shared lock store.
#[async_trait]
pub trait LockStore: Send + Sync {
    /// Acquires the named lock, blocking until it is available.
    async fn acquire(&self, name: &str) -> FailoverResult<LockHandle>;

    /// Releases a held lock.
    async fn release(&self, handle: LockHandle) -> FailoverResult<()>;
}

/// Runs `body` while holding the named lock.
///
/// The lock is released on every exit path. A release failure after a
/// successful body is propagated (the record will be reclaimed at expiry,
/// but the condition is surfaced); a release failure after a failed body is
/// logged and the body error wins.
pub async fn with_lock<S, T, F, Fut>(store: &S, name: &str, body: F) -> FailoverResult<T>
where
    S: LockStore + ?Sized,
    F: FnOnce() -> Fut,
    Fut: Future<Output = FailoverResult<T>>,
{
    let handle = store.acquire(name).await?;
    debug!("Acquired lock {}", name);

    let result = body().await;

    match store.release(handle).await {
        Ok(()) => {
            debug!("Released lock {}", name);
            result
        }
        Err(release_err) => match result {
            Ok(_) => Err(release_err),
            Err(body_err) => {
                warn!("Lock release failed after error: {}", release_err);
                Err(body_err)
            }
        },
    }
}

/// DynamoDB-backed [`LockStore`].
#[derive(Debug, Clone)]
pub struct DynamoLockStore {
    client: aws_sdk_dynamodb::Client,
    table_name: String,
    lease: Duration,
    expiry: Duration,
}

impl DynamoLockStore {
    /// Creates a store over `table_name` with the standard lease and
    /// expiry bounds.
    pub fn new(client: aws_sdk_dynamodb::Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
            lease: LOCK_LEASE,
            expiry: LOCK_EXPIRY,
        }
    }
}

fn is_conditional_check_failed<E, R>(err: &aws_sdk_dynamodb::error::SdkError<E, R>) -> bool
where
    E: aws_sdk_dynamodb::error::ProvideErrorMetadata,
{
    err.as_service_error()
        .and_then(|e| e.code())
        .is_some_and(|code| code == "ConditionalCheckFailedException")
}

#[async_trait]
impl LockStore for DynamoLockStore {
    async fn acquire(&self, name: &str) -> FailoverResult<LockHandle> {
        let owner = Uuid::new_v4().to_string();

        loop {
            let now = Utc::now().timestamp();
            let expiry_time = now + self.expiry.as_secs() as i64;

            let attempt = self
                .client
                .put_item()
                .table_name(&self.table_name)
                .item(attrs::LOCK_KEY, AttributeValue::S(name.to_string()))
                .item(attrs::OWNER, AttributeValue::S(owner.clone()))
                .item(
                    attrs::LEASE_DURATION,
                    AttributeValue::N(self.lease.as_secs().to_string()),
                )
                .item(attrs::EXPIRY_TIME, AttributeValue::N(expiry_time.to_string()))
                .condition_expression("attribute_not_exists(#key) OR #expiry < :now")
                .expression_attribute_names("#key", attrs::LOCK_KEY)
                .expression_attribute_names("#expiry", attrs::EXPIRY_TIME)
                .expression_attribute_values(":now", AttributeValue::N(now.to_string()))
                .send()
                .await;

            match attempt {
                Ok(_) => {
                    return Ok(LockHandle {
                        name: name.to_string(),
                        owner,
                    });
                }
                Err(err) if is_conditional_check_failed(&err) => {
                    debug!("Lock {} is held, waiting", name);
                    tokio::time::sleep(ACQUIRE_RETRY_INTERVAL).await;
                }
                Err(err) => {
                    return Err(FailoverError::lock_store("acquire", DisplayErrorContext(err)));
                }
            }
        }
    }

    async fn release(&self, handle: LockHandle) -> FailoverResult<()> {
        let attempt = self
            .client
            .delete_item()
            .table_name(&self.table_name)
            .key(attrs::LOCK_KEY, AttributeValue::S(handle.name.clone()))
            .condition_expression("#owner = :owner")
            .expression_attribute_names("#owner", attrs::OWNER)
            .expression_attribute_values(":owner", AttributeValue::S(handle.owner))
            .send()
            .await;

        match attempt {
            Ok(_) => Ok(()),
            // Someone stole the record after our expiry passed; there is
            // nothing of ours left to release.
            Err(err) if is_conditional_check_failed(&err) => {
                warn!("Lock {} was reclaimed before release", handle.name);
                Ok(())
            }
            Err(err) => Err(FailoverError::lock_store("release", DisplayErrorContext(err))),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct RecordingLockStore {
        log: Mutex<Vec<String>>,
        fail_release: bool,
    }

    impl RecordingLockStore {
        fn log(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LockStore for RecordingLockStore {
        async fn acquire(&self, name: &str) -> FailoverResult<LockHandle> {
            self.log.lock().unwrap().push(format!("acquire {}", name));
            Ok(LockHandle {
                name: name.to_string(),
                owner: "owner-1".to_string(),
            })
        }

        async fn release(&self, handle: LockHandle) -> FailoverResult<()> {
            self.log.lock().unwrap().push(format!("release {}", handle.name));
            if self.fail_release {
                return Err(FailoverError::lock_store("release", "table unavailable"));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_with_lock_releases_on_success() {
        let store = RecordingLockStore::default();

        let value = with_lock(&store, "my_key", || async { Ok(41 + 1) })
            .await
            .unwrap();

        assert_eq!(value, 42);
        assert_eq!(store.log(), vec!["acquire my_key", "release my_key"]);
    }

    #[tokio::test]
    async fn test_with_lock_releases_on_body_error() {
        let store = RecordingLockStore::default();

        let result: FailoverResult<()> = with_lock(&store, "my_key", || async {
            Err(FailoverError::api("ReplaceTransitGatewayRoute", "boom"))
        })
        .await;

        let err = result.unwrap_err();
        assert!(err.to_string().contains("ReplaceTransitGatewayRoute"));
        assert_eq!(store.log(), vec!["acquire my_key", "release my_key"]);
    }

    #[tokio::test]
    async fn test_with_lock_body_error_wins_over_release_error() {
        let store = RecordingLockStore {
            fail_release: true,
            ..Default::default()
        };

        let result: FailoverResult<()> = with_lock(&store, "my_key", || async {
            Err(FailoverError::api("SearchTransitGatewayRoutes", "boom"))
        })
        .await;

        let err = result.unwrap_err();
        assert!(err.to_string().contains("SearchTransitGatewayRoutes"));
    }

    #[tokio::test]
    async fn test_with_lock_propagates_release_error_after_success() {
        let store = RecordingLockStore {
            fail_release: true,
            ..Default::default()
        };

        let result = with_lock(&store, "my_key", || async { Ok(()) }).await;

        let err = result.unwrap_err();
        assert!(err.to_string().contains("release"));
    }
}
