//! Session middleware configuration.
//!
//! Sets up in-memory sessions using tower-sessions. The storefront keeps no
//! database; a restart signs everybody out, and the upstream API session
//! is the lasting one.
//!
//! Records are pruned once they expire so abandoned visits do not pile up.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tower_sessions::cookie::time::OffsetDateTime;
use tower_sessions::session::{Id, Record};
use tower_sessions::session_store::{self, ExpiredDeletion, SessionStore};
use tower_sessions::{Expiry, SessionManagerLayer};
use tracing::debug;

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "canteen_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// How often expired records are removed.
const PRUNE_INTERVAL: Duration = Duration::from_secs(5 * 60);

type Records = Mutex<HashMap<Id, Record>>;

/// Session records held in memory.
#[derive(Clone, Debug, Default)]
pub struct SessionMemoryStore(Arc<Records>);

impl SessionMemoryStore {
    /// Number of records held, expired or not.
    pub async fn count(&self) -> usize {
        self.0.lock().await.len()
    }

    /// Delete expired records every `period` until the store is dropped.
    pub fn spawn_pruning(&self, period: Duration) {
        let records = Arc::downgrade(&self.0);
        tokio::spawn(prune_until_dropped(records, period));
    }
}

async fn prune_until_dropped(records: Weak<Records>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    // The first tick completes immediately
    interval.tick().await;
    loop {
        interval.tick().await;
        let Some(records) = records.upgrade() else {
            break;
        };
        let removed = prune(&records).await;
        if removed > 0 {
            debug!(removed, "Pruned expired sessions");
        }
    }
}

async fn prune(records: &Records) -> usize {
    let now = OffsetDateTime::now_utc();
    let mut records = records.lock().await;
    let before = records.len();
    records.retain(|_, record| record.expiry_date > now);
    before - records.len()
}

#[async_trait]
impl SessionStore for SessionMemoryStore {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        let mut records = self.0.lock().await;
        while records.contains_key(&record.id) {
            record.id = Id::default();
        }
        records.insert(record.id, record.clone());
        Ok(())
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        self.0.lock().await.insert(record.id, record.clone());
        Ok(())
    }

    async fn load(&self, session_id: &Id) -> session_store::Result<Option<Record>> {
        let now = OffsetDateTime::now_utc();
        Ok(self
            .0
            .lock()
            .await
            .get(session_id)
            .filter(|record| record.expiry_date > now)
            .cloned())
    }

    async fn delete(&self, session_id: &Id) -> session_store::Result<()> {
        self.0.lock().await.remove(session_id);
        Ok(())
    }
}

#[async_trait]
impl ExpiredDeletion for SessionMemoryStore {
    async fn delete_expired(&self) -> session_store::Result<()> {
        prune(&self.0).await;
        Ok(())
    }
}

/// Create the session layer with an in-memory store and start pruning it.
#[must_use]
pub fn create_session_layer(config: &StorefrontConfig) -> SessionManagerLayer<SessionMemoryStore> {
    let store = SessionMemoryStore::default();
    store.spawn_pruning(PRUNE_INTERVAL);

    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tower_sessions::cookie::time::Duration as CookieDuration;

    fn record(expires_in: CookieDuration) -> Record {
        Record {
            id: Id::default(),
            data: HashMap::default(),
            expiry_date: OffsetDateTime::now_utc() + expires_in,
        }
    }

    #[tokio::test]
    async fn test_expired_records_are_hidden_then_deleted() {
        let store = SessionMemoryStore::default();
        let mut live = record(CookieDuration::minutes(30));
        let mut stale = record(CookieDuration::minutes(-1));
        store.create(&mut live).await.unwrap();
        store.create(&mut stale).await.unwrap();

        assert!(store.load(&stale.id).await.unwrap().is_none());
        assert_eq!(store.count().await, 2);

        store.delete_expired().await.unwrap();
        assert_eq!(store.count().await, 1);
        assert_eq!(store.load(&live.id).await.unwrap(), Some(live));
    }

    #[tokio::test]
    async fn test_pruning_runs_in_background() {
        let store = SessionMemoryStore::default();
        let mut stale = record(CookieDuration::seconds(-5));
        store.create(&mut stale).await.unwrap();

        store.spawn_pruning(Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(store.count().await, 0);
    }

    #[tokio::test]
    async fn test_pruning_stops_with_the_store() {
        let store = SessionMemoryStore::default();
        let records = Arc::downgrade(&store.0);
        let task = tokio::spawn(prune_until_dropped(records, Duration::from_millis(10)));
        drop(store);
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_replaces_colliding_id() {
        let store = SessionMemoryStore::default();
        let mut first = record(CookieDuration::minutes(30));
        store.create(&mut first).await.unwrap();
        let mut second = record(CookieDuration::minutes(30));
        second.id = first.id;
        store.create(&mut second).await.unwrap();
        assert_ne!(first.id, second.id);
    }
}
