use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

/// Session-keyed store of hashed one-time CSRF tokens.
///
/// Only the SHA-256 digest of a token is kept; the raw token goes to the
/// client and is never stored.  One entry per session — a new issuance
/// overwrites the previous one.  Expiry is checked lazily on `verify` and
/// swept by the periodic [`CsrfStore::cleanup`] task.
///
/// Concurrent issue/verify on the *same* session id race last-write-wins,
/// which is fine for short-lived single-purpose tokens; different sessions
/// never interfere.
#[derive(Clone, Debug)]
pub struct CsrfStore {
    inner: Arc<CsrfStoreInner>,
}

#[derive(Debug)]
struct CsrfStoreInner {
    entries: RwLock<HashMap<String, CsrfEntry>>,
    ttl: Duration,
}

#[derive(Debug, Clone)]
struct CsrfEntry {
    digest: [u8; 32],
    expires_at: Instant,
}

fn digest_of(token: &str) -> [u8; 32] {
    Sha256::digest(token.as_bytes()).into()
}

impl CsrfStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(CsrfStoreInner {
                entries: RwLock::new(HashMap::new()),
                ttl,
            }),
        }
    }

    /// Generate a fresh token for `session_id`, store its digest, and return
    /// the raw token to send to the client.
    pub async fn issue(&self, session_id: &str) -> String {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        let token = URL_SAFE_NO_PAD.encode(bytes);

        let entry = CsrfEntry {
            digest: digest_of(&token),
            expires_at: Instant::now() + self.inner.ttl,
        };

        self.inner
            .entries
            .write()
            .await
            .insert(session_id.to_string(), entry);

        debug!("Issued CSRF token for session {}", session_id);
        token
    }

    /// Check `candidate` against the digest stored for `session_id`.
    /// An expired entry is evicted as a side effect and fails the check.
    pub async fn verify(&self, session_id: &str, candidate: &str) -> bool {
        let now = Instant::now();
        let mut entries = self.inner.entries.write().await;

        let (digest, expires_at) = match entries.get(session_id) {
            Some(entry) => (entry.digest, entry.expires_at),
            None => return false,
        };

        if expires_at <= now {
            entries.remove(session_id);
            debug!("Evicted expired CSRF entry for session {}", session_id);
            return false;
        }

        digest_of(candidate) == digest
    }

    /// Sweep all expired entries.  Run periodically; correctness does not
    /// depend on it because `verify` also evicts lazily.
    pub async fn cleanup(&self) {
        let now = Instant::now();
        let mut entries = self.inner.entries.write().await;
        let before = entries.len();

        entries.retain(|_, entry| entry.expires_at > now);

        let swept = before - entries.len();
        if swept > 0 {
            debug!("CSRF cleanup removed {} expired entries", swept);
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn token_verifies_immediately_after_issue() {
        let store = CsrfStore::new(Duration::from_secs(60));
        let token = store.issue("session-a").await;
        assert!(store.verify("session-a", &token).await);
    }

    #[tokio::test]
    async fn cross_session_reuse_fails() {
        let store = CsrfStore::new(Duration::from_secs(60));
        let token = store.issue("session-b").await;
        assert!(!store.verify("session-a", &token).await);
    }

    #[tokio::test]
    async fn reissue_invalidates_previous_token() {
        let store = CsrfStore::new(Duration::from_secs(60));
        let old = store.issue("session-a").await;
        let new = store.issue("session-a").await;

        assert!(!store.verify("session-a", &old).await);
        assert!(store.verify("session-a", &new).await);
    }

    #[tokio::test]
    async fn wrong_token_fails() {
        let store = CsrfStore::new(Duration::from_secs(60));
        let _ = store.issue("session-a").await;
        assert!(!store.verify("session-a", "forged-token").await);
    }

    #[tokio::test]
    async fn expired_token_fails_and_is_evicted() {
        let store = CsrfStore::new(Duration::from_millis(5));
        let token = store.issue("session-a").await;

        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(!store.verify("session-a", &token).await);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn cleanup_sweeps_only_expired_entries() {
        let store = CsrfStore::new(Duration::from_millis(5));
        let _ = store.issue("stale").await;

        tokio::time::sleep(Duration::from_millis(20)).await;

        // A fresh store shares the ttl, so issue the live entry afterwards.
        let live = store.issue("live").await;
        store.cleanup().await;

        assert_eq!(store.len().await, 1);
        assert!(store.verify("live", &live).await);
    }

    #[tokio::test]
    async fn different_sessions_do_not_interfere() {
        let store = CsrfStore::new(Duration::from_secs(60));
        let ta = store.issue("a").await;
        let tb = store.issue("b").await;

        assert!(store.verify("a", &ta).await);
        assert!(store.verify("b", &tb).await);
        assert_eq!(store.len().await, 2);
    }
}
