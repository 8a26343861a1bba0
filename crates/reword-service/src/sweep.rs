//! Background sweep for expired verification-prompt tracking records.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use reword_core::VerificationMessage;
use reword_store::{Result, Store};

/// Remove all tracking records that have expired as of `now`.
///
/// Returns the removed records so a transport adapter can also delete the
/// corresponding chat messages.
pub fn sweep_once(store: &dyn Store, now: DateTime<Utc>) -> Result<Vec<VerificationMessage>> {
    let expired = store.expired_verification_messages(now)?;
    for message in &expired {
        store.delete_verification_message(&message.id)?;
    }
    if !expired.is_empty() {
        tracing::info!(
            count = expired.len(),
            "Cleared expired verification prompts"
        );
    }
    Ok(expired)
}

/// Run the sweep forever at the given interval.
pub async fn run(store: Arc<dyn Store>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    // The first tick fires immediately; that is fine, a sweep on startup
    // clears anything that expired while the service was down.
    loop {
        ticker.tick().await;
        if let Err(e) = sweep_once(store.as_ref(), Utc::now()) {
            tracing::error!(error = %e, "Verification-prompt sweep failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use reword_core::UserId;
    use reword_store::RocksStore;
    use tempfile::TempDir;

    #[test]
    fn sweep_removes_only_expired_records() {
        let dir = TempDir::new().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();

        let fresh = VerificationMessage::new(UserId::new("u1"), 1, 10);
        let mut stale = VerificationMessage::new(UserId::new("u2"), 2, 20);
        stale.expires_at = Utc::now() - ChronoDuration::hours(1);
        store.put_verification_message(&fresh).unwrap();
        store.put_verification_message(&stale).unwrap();

        let removed = sweep_once(&store, Utc::now()).unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].id, stale.id);

        // The fresh record survives; a second sweep finds nothing.
        assert!(sweep_once(&store, Utc::now()).unwrap().is_empty());
        assert_eq!(
            store
                .expired_verification_messages(Utc::now() + ChronoDuration::hours(48))
                .unwrap()
                .len(),
            1
        );
    }
}
