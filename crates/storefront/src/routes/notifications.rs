//! Live notification endpoints used by the toast tray.
//!
//! The browser opens `/notifications/stream` once per page. Opening it
//! (re)connects the session's bridge to the upstream event feed, replays
//! the live notifications and then forwards updates as they happen.

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{
        IntoResponse,
        sse::{Event, KeepAlive, Sse},
    },
};
use canteen_core::notifications::Notification;
use futures::Stream;
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, instrument, warn};

use crate::middleware::RequireAuth;
use crate::services::BridgeMessage;
use crate::state::AppState;

/// Dismissal outcome.
#[derive(Debug, Serialize)]
pub struct Dismissed {
    pub dismissed: bool,
}

/// Server-sent event for a bridge update.
fn to_event(message: &BridgeMessage) -> Option<Event> {
    let (name, data) = match message {
        BridgeMessage::Notify(notification) => ("notification", serde_json::to_string(notification)),
        BridgeMessage::Dismiss { id } => ("dismiss", serde_json::to_string(&serde_json::json!({ "id": id }))),
        BridgeMessage::Clear => ("clear", Ok("{}".to_owned())),
    };
    match data {
        Ok(data) => Some(Event::default().event(name).data(data)),
        Err(e) => {
            warn!(error = %e, "Failed to encode notification");
            None
        }
    }
}

/// Stream notifications to the browser.
#[instrument(skip(state, auth), fields(user_id = %auth.user.id))]
pub async fn stream(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (replay, mut receiver) = state
        .notifications()
        .subscribe(&auth.bridge_id, &auth.user.id, &auth.api)
        .await;

    let stream = async_stream::stream! {
        for notification in replay.iter().rev() {
            if let Some(event) = to_event(&BridgeMessage::Notify(notification.clone())) {
                yield Ok(event);
            }
        }

        loop {
            match receiver.recv().await {
                Ok(message) => {
                    if let Some(event) = to_event(&message) {
                        yield Ok(event);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Notification stream lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

/// Live notifications, newest first.
#[instrument(skip(state, auth))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
) -> Json<Vec<Notification>> {
    Json(state.notifications().snapshot(&auth.bridge_id).await)
}

/// Dismiss one notification.
#[instrument(skip(state, auth))]
pub async fn dismiss(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
    Path(id): Path<u64>,
) -> impl IntoResponse {
    let dismissed = state.notifications().dismiss(&auth.bridge_id, id).await;
    let status = if dismissed {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    };
    (status, Json(Dismissed { dismissed }))
}

/// Dismiss everything.
#[instrument(skip(state, auth))]
pub async fn clear(State(state): State<AppState>, RequireAuth(auth): RequireAuth) -> StatusCode {
    state.notifications().clear(&auth.bridge_id).await;
    StatusCode::NO_CONTENT
}

#[cfg(test)]
mod tests {
    use super::*;
    use canteen_core::notifications::NotificationKind;
    use chrono::Utc;

    #[test]
    fn test_every_bridge_message_becomes_an_event() {
        let notification = Notification {
            id: 7,
            message: "Payment confirmed!".into(),
            kind: NotificationKind::Success,
            created_at: Utc::now(),
        };
        assert!(to_event(&BridgeMessage::Notify(notification)).is_some());
        assert!(to_event(&BridgeMessage::Dismiss { id: 7 }).is_some());
        assert!(to_event(&BridgeMessage::Clear).is_some());
    }
}
