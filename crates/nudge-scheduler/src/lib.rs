//! Consumer-side contract for the expiring-key reminder store, plus the
//! Redis-backed implementation. The store is an external collaborator: this
//! crate only cancels, registers, and receives expiry callbacks.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod redis_store;

pub use redis_store::RedisReminderStore;

#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The key being cancelled has no active entry.
    #[error("no schedule entry for key '{key}'")]
    NotFound { key: String },
    /// The backing store rejected or could not serve the operation.
    #[error("scheduler store error: {0}")]
    Store(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// What to do when a reminder key expires. Kept as a plain value so the
/// store never depends on live references surviving until delivery.
pub struct ReminderPayload {
    pub repo: String,
    pub issue_number: u64,
}

#[derive(Debug, Clone)]
/// A pending registration: key, absolute expiry, and the payload handed back
/// at expiry.
pub struct ScheduleEntry {
    pub key: String,
    pub expire_at: DateTime<Utc>,
    pub payload: ReminderPayload,
}

/// External expiring-key store contract. `cancel` of an absent key reports
/// [`SchedulerError::NotFound`]; `schedule` registers a fresh entry under
/// the entry's key.
#[async_trait]
pub trait ExpiringKeyStore: Send + Sync {
    async fn cancel(&self, key: &str) -> Result<(), SchedulerError>;
    async fn schedule(&self, entry: ScheduleEntry) -> Result<(), SchedulerError>;
}

/// Invoked by the store's expiry listener when a registered key elapses.
#[async_trait]
pub trait ExpiryHandler: Send + Sync {
    async fn on_expire(&self, payload: ReminderPayload) -> anyhow::Result<()>;
}

/// Store key for an issue's reminder: `{repo}:issue:{number}`.
pub fn reminder_key(repo: &str, issue_number: u64) -> String {
    format!("{repo}:issue:{issue_number}")
}

/// Replace any pending reminder for the issue with a new registration.
///
/// The cancel of a missing key is swallowed: first-time scheduling has
/// nothing to cancel. The cancel-then-set pair is not atomic across the two
/// store calls; a crash in between leaves no entry for the key until the
/// next poll cycle re-derives the same command and schedules it again.
/// Registration failures are propagated, never retried here.
pub async fn schedule_reminder(
    store: &dyn ExpiringKeyStore,
    repo: &str,
    issue_number: u64,
    expire_at: DateTime<Utc>,
) -> Result<(), SchedulerError> {
    let key = reminder_key(repo, issue_number);
    match store.cancel(&key).await {
        Ok(()) | Err(SchedulerError::NotFound { .. }) => {}
        Err(error) => return Err(error),
    }
    store
        .schedule(ScheduleEntry {
            key,
            expire_at,
            payload: ReminderPayload {
                repo: repo.to_string(),
                issue_number,
            },
        })
        .await
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    use super::{
        reminder_key, schedule_reminder, ExpiringKeyStore, ScheduleEntry, SchedulerError,
    };

    #[derive(Default)]
    struct RecordingStore {
        operations: Mutex<Vec<String>>,
        entries: Mutex<HashMap<String, ScheduleEntry>>,
        fail_cancel: bool,
        fail_schedule: bool,
    }

    #[async_trait]
    impl ExpiringKeyStore for RecordingStore {
        async fn cancel(&self, key: &str) -> Result<(), SchedulerError> {
            self.operations
                .lock()
                .expect("operations lock")
                .push(format!("cancel:{key}"));
            if self.fail_cancel {
                return Err(SchedulerError::Store("cancel rejected".to_string()));
            }
            match self.entries.lock().expect("entries lock").remove(key) {
                Some(_) => Ok(()),
                None => Err(SchedulerError::NotFound {
                    key: key.to_string(),
                }),
            }
        }

        async fn schedule(&self, entry: ScheduleEntry) -> Result<(), SchedulerError> {
            self.operations
                .lock()
                .expect("operations lock")
                .push(format!("schedule:{}", entry.key));
            if self.fail_schedule {
                return Err(SchedulerError::Store("store unreachable".to_string()));
            }
            self.entries
                .lock()
                .expect("entries lock")
                .insert(entry.key.clone(), entry);
            Ok(())
        }
    }

    fn expiry() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 29, 9, 0, 0).unwrap()
    }

    #[test]
    fn unit_reminder_key_formats_repo_and_issue_number() {
        assert_eq!(reminder_key("owner/repo", 42), "owner/repo:issue:42");
    }

    #[tokio::test]
    async fn functional_first_schedule_swallows_the_missing_cancel() {
        let store = RecordingStore::default();
        schedule_reminder(&store, "owner/repo", 7, expiry())
            .await
            .expect("first schedule");
        let operations = store.operations.lock().expect("operations lock").clone();
        assert_eq!(
            operations,
            vec!["cancel:owner/repo:issue:7", "schedule:owner/repo:issue:7"]
        );
    }

    #[tokio::test]
    async fn functional_rescheduling_the_same_key_keeps_one_active_entry() {
        let store = RecordingStore::default();
        schedule_reminder(&store, "owner/repo", 7, expiry())
            .await
            .expect("first schedule");
        schedule_reminder(&store, "owner/repo", 7, expiry())
            .await
            .expect("second schedule");
        let entries = store.entries.lock().expect("entries lock");
        assert_eq!(entries.len(), 1);
        let entry = entries.get("owner/repo:issue:7").expect("entry");
        assert_eq!(entry.payload.issue_number, 7);
        assert_eq!(entry.payload.repo, "owner/repo");
    }

    #[tokio::test]
    async fn regression_schedule_failure_is_propagated() {
        let store = RecordingStore {
            fail_schedule: true,
            ..RecordingStore::default()
        };
        let error = schedule_reminder(&store, "owner/repo", 7, expiry())
            .await
            .expect_err("schedule should fail");
        assert!(matches!(error, SchedulerError::Store(_)));
    }

    #[tokio::test]
    async fn regression_non_missing_cancel_failure_is_propagated() {
        let store = RecordingStore {
            fail_cancel: true,
            ..RecordingStore::default()
        };
        let error = schedule_reminder(&store, "owner/repo", 7, expiry())
            .await
            .expect_err("cancel should fail");
        assert!(matches!(error, SchedulerError::Store(_)));
        let operations = store.operations.lock().expect("operations lock").clone();
        assert_eq!(operations, vec!["cancel:owner/repo:issue:7"]);
    }
}
