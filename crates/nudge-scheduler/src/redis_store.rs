//! Redis-backed expiring-key store. Keys are written with a millisecond
//! TTL and delivery rides on keyspace expiry notifications; the payloads
//! stay in an in-process registry keyed by the same names.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use futures_util::StreamExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::{ExpiringKeyStore, ExpiryHandler, ReminderPayload, ScheduleEntry, SchedulerError};

/// Channel pattern for expired-key notifications (`notify-keyspace-events Ex`).
const EXPIRED_EVENT_PATTERN: &str = "__keyevent@*__:expired";

pub struct RedisReminderStore {
    client: redis::Client,
    connection: redis::aio::MultiplexedConnection,
    pending: Arc<Mutex<HashMap<String, ReminderPayload>>>,
}

impl RedisReminderStore {
    /// Connect to the store and enable expired-key notifications, which the
    /// delivery path depends on.
    pub async fn connect(redis_url: &str) -> Result<Self, SchedulerError> {
        let client = redis::Client::open(redis_url).map_err(store_error)?;
        let mut connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(store_error)?;
        // Managed servers may forbid CONFIG SET; notifications are then
        // expected to be preconfigured.
        if let Err(error) = redis::cmd("CONFIG")
            .arg("SET")
            .arg("notify-keyspace-events")
            .arg("Ex")
            .query_async::<()>(&mut connection)
            .await
        {
            warn!("could not enable keyspace notifications: {error}");
        }
        Ok(Self {
            client,
            connection,
            pending: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// Spawn the expiry listener. Expired keys with a registered payload are
    /// handed to `handler`; anything else on the channel is ignored.
    pub async fn run_expiry_listener(
        &self,
        handler: Arc<dyn ExpiryHandler>,
    ) -> Result<tokio::task::JoinHandle<()>, SchedulerError> {
        let mut pubsub = self.client.get_async_pubsub().await.map_err(store_error)?;
        pubsub
            .psubscribe(EXPIRED_EVENT_PATTERN)
            .await
            .map_err(store_error)?;
        let pending = Arc::clone(&self.pending);
        Ok(tokio::spawn(async move {
            let mut messages = pubsub.into_on_message();
            while let Some(message) = messages.next().await {
                let key = match message.get_payload::<String>() {
                    Ok(key) => key,
                    Err(error) => {
                        warn!("discarding malformed expiry notification: {error}");
                        continue;
                    }
                };
                let payload = pending.lock().await.remove(&key);
                let Some(payload) = payload else {
                    debug!("expired key '{key}' has no registered reminder");
                    continue;
                };
                if let Err(error) = handler.on_expire(payload).await {
                    warn!("reminder delivery for '{key}' failed: {error:#}");
                }
            }
        }))
    }
}

#[async_trait]
impl ExpiringKeyStore for RedisReminderStore {
    async fn cancel(&self, key: &str) -> Result<(), SchedulerError> {
        let registered = self.pending.lock().await.remove(key);
        let mut connection = self.connection.clone();
        let deleted: u64 = redis::cmd("DEL")
            .arg(key)
            .query_async(&mut connection)
            .await
            .map_err(store_error)?;
        if deleted == 0 && registered.is_none() {
            return Err(SchedulerError::NotFound {
                key: key.to_string(),
            });
        }
        Ok(())
    }

    async fn schedule(&self, entry: ScheduleEntry) -> Result<(), SchedulerError> {
        let ttl_ms = ttl_millis(entry.expire_at, Utc::now());
        let value = serde_json::to_string(&entry.payload)
            .map_err(|error| SchedulerError::Store(error.to_string()))?;
        let mut connection = self.connection.clone();
        redis::cmd("SET")
            .arg(&entry.key)
            .arg(value)
            .arg("PX")
            .arg(ttl_ms)
            .query_async::<()>(&mut connection)
            .await
            .map_err(store_error)?;
        self.pending.lock().await.insert(entry.key, entry.payload);
        Ok(())
    }
}

/// TTL for a registration. Past expiries clamp to the minimum and fire
/// almost immediately.
fn ttl_millis(expire_at: chrono::DateTime<Utc>, now: chrono::DateTime<Utc>) -> i64 {
    (expire_at - now).num_milliseconds().max(1)
}

fn store_error(error: redis::RedisError) -> SchedulerError {
    SchedulerError::Store(error.to_string())
}
