//! Per-session bridge between the Canteen event feed and the browser.
//!
//! Each signed-in browser session gets one [`Bridge`]: a background task
//! reading the upstream feed with that user's cookie, a bounded
//! [`NotificationLog`] and a broadcast channel the browser's
//! `/notifications/stream` subscribes to. A second task per bridge expires
//! old notifications whether or not the feed is still open.
//!
//! There is no retry loop. When the upstream feed ends the bridge is marked
//! disconnected and the next browser subscription starts a fresh task.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use canteen_core::UserId;
use canteen_core::notifications::{Notification, NotificationKind, NotificationLog};
use chrono::Utc;
use futures::StreamExt;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock, broadcast};
use tokio::task::AbortHandle;
use tracing::{debug, info, instrument, warn};

use crate::api::{ApiSession, CanteenClient};
use crate::config::NotificationConfig;

/// How often expired notifications are purged and announced.
const PURGE_INTERVAL: Duration = Duration::from_millis(500);

/// Bridges with no browser attached for this long are dropped by [`NotificationHub::sweep`].
const IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Update pushed to browser streams.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BridgeMessage {
    /// A new notification to show.
    Notify(Notification),
    /// A notification expired or was dismissed.
    Dismiss { id: u64 },
    /// Everything was dismissed.
    Clear,
}

/// State shared between a bridge and its feed task.
struct Shared {
    log: Mutex<NotificationLog>,
    sender: broadcast::Sender<BridgeMessage>,
    connected: AtomicBool,
}

impl Shared {
    async fn publish(&self, message: String, kind: NotificationKind) {
        let notification = self.log.lock().await.push(message, kind, Utc::now());
        // No receivers is fine; the log keeps it for the next snapshot.
        let _ = self.sender.send(BridgeMessage::Notify(notification));
    }

    async fn purge(&self) {
        let expired = self.log.lock().await.purge_expired(Utc::now());
        for id in expired {
            let _ = self.sender.send(BridgeMessage::Dismiss { id });
        }
    }
}

/// One session's link to the event feed.
struct Bridge {
    user_id: UserId,
    shared: Arc<Shared>,
    task: Option<AbortHandle>,
    purger: AbortHandle,
    last_seen: Instant,
}

impl Bridge {
    fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::Acquire)
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.purger.abort();
    }
}

/// Registry of bridges keyed by storefront session id.
#[derive(Clone)]
pub struct NotificationHub {
    inner: Arc<HubInner>,
}

struct HubInner {
    client: CanteenClient,
    config: NotificationConfig,
    bridges: RwLock<HashMap<String, Bridge>>,
}

impl NotificationHub {
    #[must_use]
    pub fn new(client: CanteenClient, config: NotificationConfig) -> Self {
        Self {
            inner: Arc::new(HubInner {
                client,
                config,
                bridges: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// How many notifications the browser shows at once.
    #[must_use]
    pub fn visible(&self) -> usize {
        self.inner.config.visible
    }

    /// How long a notification stays up.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.inner.config.ttl
    }

    fn new_shared(&self) -> Arc<Shared> {
        let ttl = chrono::Duration::from_std(self.inner.config.ttl)
            .unwrap_or_else(|_| chrono::Duration::seconds(5));
        let (sender, _) = broadcast::channel(self.inner.config.capacity.max(16));
        Arc::new(Shared {
            log: Mutex::new(NotificationLog::new(self.inner.config.capacity, ttl)),
            sender,
            connected: AtomicBool::new(false),
        })
    }

    fn spawn_feed(&self, shared: &Arc<Shared>, api: &ApiSession) -> AbortHandle {
        shared.connected.store(true, Ordering::Release);
        let task = tokio::spawn(run_feed(
            self.inner.client.clone(),
            api.clone(),
            Arc::clone(shared),
        ));
        task.abort_handle()
    }

    /// Start (or restart) the bridge for a session.
    ///
    /// A bridge that already belongs to this user and is still connected is
    /// left alone. A bridge for a different user is replaced.
    #[instrument(skip(self, api))]
    pub async fn connect(&self, session_id: &str, user_id: &UserId, api: &ApiSession) {
        let mut bridges = self.inner.bridges.write().await;

        if let Some(bridge) = bridges.get_mut(session_id)
            && bridge.user_id == *user_id
        {
            bridge.last_seen = Instant::now();
            if !bridge.is_connected() {
                debug!("Reconnecting event feed");
                if let Some(old) = bridge.task.take() {
                    old.abort();
                }
                bridge.task = Some(self.spawn_feed(&bridge.shared, api));
            }
            return;
        }

        let shared = self.new_shared();
        let task = self.spawn_feed(&shared, api);
        let purger = tokio::spawn(run_purge(Arc::clone(&shared))).abort_handle();
        info!("Event bridge connected");
        // Replacing drops (and aborts) any bridge of a previous user.
        bridges.insert(
            session_id.to_owned(),
            Bridge {
                user_id: user_id.clone(),
                shared,
                task: Some(task),
                purger,
                last_seen: Instant::now(),
            },
        );
    }

    /// Tear down a session's bridge.
    #[instrument(skip(self))]
    pub async fn disconnect(&self, session_id: &str) {
        if self.inner.bridges.write().await.remove(session_id).is_some() {
            info!("Event bridge disconnected");
        }
    }

    /// Subscribe a browser stream, (re)connecting the feed if needed.
    ///
    /// Returns the live notifications to replay first, then the receiver for
    /// later updates.
    pub async fn subscribe(
        &self,
        session_id: &str,
        user_id: &UserId,
        api: &ApiSession,
    ) -> (Vec<Notification>, broadcast::Receiver<BridgeMessage>) {
        self.connect(session_id, user_id, api).await;

        let bridges = self.inner.bridges.read().await;
        if let Some(bridge) = bridges.get(session_id) {
            let receiver = bridge.shared.sender.subscribe();
            let snapshot = bridge.shared.log.lock().await.snapshot(Utc::now());
            return (snapshot, receiver);
        }
        drop(bridges);

        // Raced with a disconnect; hand back a closed channel.
        let (_, receiver) = broadcast::channel(1);
        (Vec::new(), receiver)
    }

    /// Live notifications for a session, newest first.
    pub async fn snapshot(&self, session_id: &str) -> Vec<Notification> {
        let bridges = self.inner.bridges.read().await;
        match bridges.get(session_id) {
            Some(bridge) => bridge.shared.log.lock().await.snapshot(Utc::now()),
            None => Vec::new(),
        }
    }

    /// Dismiss one notification. Returns whether it existed.
    pub async fn dismiss(&self, session_id: &str, id: u64) -> bool {
        let bridges = self.inner.bridges.read().await;
        let Some(bridge) = bridges.get(session_id) else {
            return false;
        };
        let removed = bridge.shared.log.lock().await.dismiss(id);
        if removed {
            let _ = bridge.shared.sender.send(BridgeMessage::Dismiss { id });
        }
        removed
    }

    /// Dismiss everything.
    pub async fn clear(&self, session_id: &str) {
        let bridges = self.inner.bridges.read().await;
        if let Some(bridge) = bridges.get(session_id) {
            bridge.shared.log.lock().await.clear();
            let _ = bridge.shared.sender.send(BridgeMessage::Clear);
        }
    }

    /// Drop bridges that no browser has looked at for a while.
    ///
    /// Returns the number removed.
    pub async fn sweep(&self) -> usize {
        let mut bridges = self.inner.bridges.write().await;
        let before = bridges.len();
        bridges.retain(|_, bridge| {
            bridge.shared.sender.receiver_count() > 0 || bridge.last_seen.elapsed() < IDLE_TIMEOUT
        });
        let removed = before - bridges.len();
        if removed > 0 {
            debug!(removed, "Swept idle event bridges");
        }
        removed
    }

    /// Number of live bridges.
    pub async fn len(&self) -> usize {
        self.inner.bridges.read().await.len()
    }

    /// Whether any bridge is live.
    pub async fn is_empty(&self) -> bool {
        self.inner.bridges.read().await.is_empty()
    }

    /// Whether a session's bridge currently has an open upstream feed.
    pub async fn is_connected(&self, session_id: &str) -> bool {
        self.inner
            .bridges
            .read()
            .await
            .get(session_id)
            .is_some_and(Bridge::is_connected)
    }
}

/// Read the upstream feed until it ends, translating events.
async fn run_feed(client: CanteenClient, api: ApiSession, shared: Arc<Shared>) {
    let events = match client.events(&api).await {
        Ok(events) => events,
        Err(e) => {
            warn!(error = %e, "Could not open event feed");
            shared.connected.store(false, Ordering::Release);
            return;
        }
    };
    futures::pin_mut!(events);

    while let Some(event) = events.next().await {
        let (message, kind) = event.message();
        shared.publish(message, kind).await;
    }

    shared.connected.store(false, Ordering::Release);
    debug!("Event feed closed");
}

/// Expire old notifications for as long as the bridge lives.
async fn run_purge(shared: Arc<Shared>) {
    let mut purge = tokio::time::interval(PURGE_INTERVAL);
    loop {
        purge.tick().await;
        shared.purge().await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::CanteenApiConfig;

    use axum::Router;
    use axum::http::header;
    use axum::routing::get;

    /// Serve a fixed event-stream body on an ephemeral port.
    async fn fake_feed(body: &'static str) -> CanteenClient {
        let app = Router::new().route(
            "/events",
            get(move || async move { ([(header::CONTENT_TYPE, "text/event-stream")], body) }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        let config = CanteenApiConfig::for_base(&format!("http://{addr}/")).unwrap();
        CanteenClient::new(&config)
    }

    /// Publish straight into a session's bridge, bypassing the feed.
    async fn push(hub: &NotificationHub, session_id: &str, message: &str, kind: NotificationKind) {
        let bridges = hub.inner.bridges.read().await;
        bridges
            .get(session_id)
            .unwrap()
            .shared
            .publish(message.to_owned(), kind)
            .await;
    }

    fn config(ttl: Duration) -> NotificationConfig {
        NotificationConfig {
            capacity: 50,
            ttl,
            visible: 3,
        }
    }

    #[tokio::test]
    async fn test_bridge_translates_feed_events() {
        let client = fake_feed(
            "event: order:paid\ndata: {}\n\nevent: unknown\ndata: {}\n\nevent: product:new\ndata: {\"name\":\"Tea\"}\n\n",
        )
        .await;
        let hub = NotificationHub::new(client, config(Duration::from_secs(60)));
        let user = UserId::new("u1");
        let api = ApiSession::new("token=t");

        let (_, _rx) = hub.subscribe("s1", &user, &api).await;

        let deadline = Instant::now() + Duration::from_secs(5);
        while hub.snapshot("s1").await.len() < 2 {
            assert!(Instant::now() < deadline, "events never arrived");
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        let snapshot = hub.snapshot("s1").await;
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].message, "New product: Tea");
    }

    #[tokio::test]
    async fn test_dismiss_and_clear() {
        let client = fake_feed("").await;
        let hub = NotificationHub::new(client, config(Duration::from_secs(60)));
        let user = UserId::new("u1");
        hub.connect("s1", &user, &ApiSession::new("token=t")).await;

        push(&hub, "s1", "one", NotificationKind::Info).await;
        push(&hub, "s1", "two", NotificationKind::Success).await;
        let snapshot = hub.snapshot("s1").await;
        assert_eq!(snapshot.len(), 2);

        assert!(hub.dismiss("s1", snapshot[1].id).await);
        assert!(!hub.dismiss("s1", snapshot[1].id).await);
        assert_eq!(hub.snapshot("s1").await.len(), 1);

        hub.clear("s1").await;
        assert!(hub.snapshot("s1").await.is_empty());
    }

    #[tokio::test]
    async fn test_new_user_replaces_bridge() {
        let client = fake_feed("").await;
        let hub = NotificationHub::new(client, config(Duration::from_secs(60)));
        let api = ApiSession::new("token=t");

        hub.connect("s1", &UserId::new("u1"), &api).await;
        push(&hub, "s1", "for u1", NotificationKind::Info).await;
        hub.connect("s1", &UserId::new("u2"), &api).await;

        assert!(hub.snapshot("s1").await.is_empty());
        assert_eq!(hub.len().await, 1);

        hub.disconnect("s1").await;
        assert!(hub.is_empty().await);
    }

    #[tokio::test]
    async fn test_feed_end_marks_disconnected() {
        let client = fake_feed("event: order:new\ndata: {}\n\n").await;
        let hub = NotificationHub::new(client, config(Duration::from_secs(60)));
        hub.connect("s1", &UserId::new("u1"), &ApiSession::new("token=t")).await;

        let deadline = Instant::now() + Duration::from_secs(5);
        while hub.is_connected("s1").await {
            assert!(Instant::now() < deadline, "feed never closed");
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(hub.snapshot("s1").await[0].message, "New order received!");
    }

    #[tokio::test]
    async fn test_notifications_expire() {
        let client = fake_feed("").await;
        let hub = NotificationHub::new(client, config(Duration::from_millis(50)));
        hub.connect("s1", &UserId::new("u1"), &ApiSession::new("token=t")).await;
        push(&hub, "s1", "short lived", NotificationKind::Info).await;

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(hub.snapshot("s1").await.is_empty());
    }

    #[tokio::test]
    async fn test_expiry_continues_after_feed_closes() {
        let client = fake_feed("event: order:new\ndata: {}\n\n").await;
        let hub = NotificationHub::new(client, config(Duration::from_millis(200)));
        let user = UserId::new("u1");
        let (mut seen, mut rx) = hub.subscribe("s1", &user, &ApiSession::new("token=t")).await;

        let dismissed = tokio::time::timeout(Duration::from_secs(3), async {
            loop {
                match rx.recv().await.unwrap() {
                    BridgeMessage::Notify(n) if !seen.iter().any(|s| s.id == n.id) => seen.push(n),
                    BridgeMessage::Notify(_) => {}
                    BridgeMessage::Dismiss { id } => break id,
                    BridgeMessage::Clear => panic!("unexpected clear"),
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].message, "New order received!");
        assert_eq!(dismissed, seen[0].id);
        assert!(!hub.is_connected("s1").await);
        assert!(hub.snapshot("s1").await.is_empty());
    }
}
