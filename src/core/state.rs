// src/core/state.rs — Keyed session store with per-user serialization
//
// One async lock per user key: turns for the same user queue up FIFO behind
// the in-flight one, turns for different users never contend. The map lock
// is a plain std::sync::Mutex held only for entry lookup, never across an
// await point.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::store::StoreHandle;

use super::session::Session;

pub struct SessionStore {
    entries: Mutex<HashMap<i64, Arc<AsyncMutex<Session>>>>,
    durable: Option<StoreHandle>,
}

impl SessionStore {
    pub fn new(durable: Option<StoreHandle>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            durable,
        }
    }

    /// Acquire the session for one user, locking out concurrent turns for
    /// the same user until the guard drops. A user never seen before gets a
    /// fresh empty session, reloaded from the durable snapshot when one
    /// exists.
    pub async fn acquire(&self, user_id: i64) -> OwnedMutexGuard<Session> {
        let entry = {
            let mut map = self.entries.lock().expect("session map poisoned");
            map.entry(user_id)
                .or_insert_with(|| Arc::new(AsyncMutex::new(self.load_or_new(user_id))))
                .clone()
        };
        entry.lock_owned().await
    }

    /// Write the session's durable snapshot. Failures are non-fatal: the
    /// in-memory session stays authoritative within the process lifetime.
    pub fn persist(&self, session: &Session) {
        let Some(ref store) = self.durable else { return };
        let snapshot = match serde_json::to_string(session) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(user_id = session.user_id, "Session snapshot failed: {e}");
                return;
            }
        };
        if let Ok(s) = store.lock() {
            if let Err(e) = s.save_session_snapshot(session.user_id, &snapshot) {
                tracing::warn!(user_id = session.user_id, "Session snapshot write failed: {e}");
            }
        }
    }

    /// Evict a user's in-memory entry. The next acquire reloads from the
    /// durable snapshot.
    pub fn evict(&self, user_id: i64) {
        self.entries
            .lock()
            .expect("session map poisoned")
            .remove(&user_id);
    }

    fn load_or_new(&self, user_id: i64) -> Session {
        if let Some(ref store) = self.durable {
            if let Ok(s) = store.lock() {
                match s.load_session_snapshot(user_id) {
                    Ok(Some(snapshot)) => match serde_json::from_str::<Session>(&snapshot) {
                        Ok(session) => {
                            tracing::debug!(user_id, "Session reloaded from snapshot");
                            return session;
                        }
                        Err(e) => {
                            tracing::warn!(user_id, "Discarding unreadable snapshot: {e}");
                        }
                    },
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!(user_id, "Snapshot load failed: {e}");
                    }
                }
            }
        }
        Session::new(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;
    use std::time::Duration;

    #[tokio::test]
    async fn test_absent_user_gets_fresh_session() {
        let store = SessionStore::new(None);
        let session = store.acquire(42).await;
        assert_eq!(session.user_id, 42);
        assert!(session.current_draft.is_none());
    }

    #[tokio::test]
    async fn test_read_your_writes_across_turns() {
        let store = SessionStore::new(None);
        {
            let mut s = store.acquire(1).await;
            s.prefs.topic = "launch".into();
        }
        let s = store.acquire(1).await;
        assert_eq!(s.prefs.topic, "launch");
    }

    #[tokio::test]
    async fn test_same_user_turns_serialized() {
        let store = Arc::new(SessionStore::new(None));
        let order = Arc::new(Mutex::new(Vec::new()));

        let first = {
            let store = store.clone();
            let order = order.clone();
            async move {
                let _guard = store.acquire(1).await;
                order.lock().unwrap().push("first-start");
                tokio::time::sleep(Duration::from_millis(50)).await;
                order.lock().unwrap().push("first-end");
            }
        };
        let second = {
            let store = store.clone();
            let order = order.clone();
            async move {
                // Let the first turn win the lock.
                tokio::time::sleep(Duration::from_millis(10)).await;
                let _guard = store.acquire(1).await;
                order.lock().unwrap().push("second");
            }
        };

        tokio::join!(first, second);

        let order = order.lock().unwrap();
        assert_eq!(*order, vec!["first-start", "first-end", "second"]);
    }

    #[tokio::test]
    async fn test_different_users_proceed_independently() {
        let store = Arc::new(SessionStore::new(None));

        // Hold user 1's lock while acquiring user 2's — must not block.
        let _guard1 = store.acquire(1).await;
        let acquired =
            tokio::time::timeout(Duration::from_millis(100), store.acquire(2)).await;
        assert!(acquired.is_ok(), "user 2 blocked behind user 1");
    }

    #[tokio::test]
    async fn test_evict_then_reload_from_snapshot() {
        let durable: StoreHandle = Arc::new(Mutex::new(Store::open_in_memory().unwrap()));
        let store = SessionStore::new(Some(durable));

        {
            let mut s = store.acquire(7).await;
            s.connected = true;
            store.persist(&s);
        }
        store.evict(7);

        let s = store.acquire(7).await;
        assert!(s.connected, "snapshot not reloaded after eviction");
    }
}
