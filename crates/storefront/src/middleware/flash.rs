//! One-shot flash messages carried across a redirect.

use tower_sessions::Session;
use tracing::warn;

use crate::models::{Flash, session_keys};

/// Queue a message for the next rendered page.
///
/// A session write failure only loses the message, so it is logged rather
/// than returned.
pub async fn push_flash(session: &Session, flash: Flash) {
    let mut pending: Vec<Flash> = session
        .get(session_keys::FLASHES)
        .await
        .ok()
        .flatten()
        .unwrap_or_default();
    pending.push(flash);
    if let Err(e) = session.insert(session_keys::FLASHES, pending).await {
        warn!(error = %e, "Failed to store flash message");
    }
}

/// Take every queued message, leaving none behind.
pub async fn take_flashes(session: &Session) -> Vec<Flash> {
    session
        .remove::<Vec<Flash>>(session_keys::FLASHES)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}
