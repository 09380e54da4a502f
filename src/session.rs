//! Short-lived conversation history, keyed by (handle, target date).
//!
//! Sessions are a soft hint for disambiguating follow-up messages, not the
//! source of truth for orders, so losing them on restart is fine. A background
//! sweep evicts anything untouched for longer than the TTL; eviction is
//! best-effort, not linearizable.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::consts::SESSION_TTL;

/// One conversation per user per target date.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub handle: String,
    pub date: NaiveDate,
}

impl SessionKey {
    pub fn new(handle: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            handle: handle.into(),
            date,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Bot,
}

/// One line of conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
        }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Bot,
            text: text.into(),
        }
    }
}

impl fmt::Display for Turn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let who = match self.speaker {
            Speaker::User => "User",
            Speaker::Bot => "Bot",
        };
        write!(f, "{who}: {}", self.text)
    }
}

struct SessionData {
    turns: Vec<Turn>,
    last_touch: Instant,
}

/// Concurrent-safe store of per-(handle, date) conversations with TTL
/// eviction. A single mutex over the whole map is plenty at this contention.
pub struct SessionStore {
    inner: Mutex<HashMap<SessionKey, SessionData>>,
    ttl: Duration,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_ttl(SESSION_TTL)
    }

    /// Store with a custom TTL. Use short TTLs in tests.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            ttl,
            sweeper: Mutex::new(None),
        }
    }

    /// Append a turn and refresh the session's last-touch timestamp.
    pub fn append(&self, key: &SessionKey, turn: Turn) {
        let mut map = self.inner.lock().unwrap();
        let data = map.entry(key.clone()).or_insert_with(|| SessionData {
            turns: Vec::new(),
            last_touch: Instant::now(),
        });
        data.turns.push(turn);
        data.last_touch = Instant::now();
    }

    /// The turns so far, oldest first. Empty if the session is absent.
    pub fn history(&self, key: &SessionKey) -> Vec<Turn> {
        let map = self.inner.lock().unwrap();
        map.get(key).map(|d| d.turns.clone()).unwrap_or_default()
    }

    /// Refresh the last-touch timestamp without appending.
    pub fn touch(&self, key: &SessionKey) {
        let mut map = self.inner.lock().unwrap();
        if let Some(data) = map.get_mut(key) {
            data.last_touch = Instant::now();
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every session untouched for longer than the TTL. Returns how
    /// many were evicted.
    pub fn evict_expired(&self) -> usize {
        let mut map = self.inner.lock().unwrap();
        let before = map.len();
        let ttl = self.ttl;
        map.retain(|_, data| data.last_touch.elapsed() <= ttl);
        before - map.len()
    }

    /// Start the background sweep on a fixed interval. The task holds only
    /// a weak reference, so dropping the store ends it on the next tick.
    pub fn start(self: &Arc<Self>, every: Duration) {
        let weak: Weak<Self> = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await; // the first tick fires immediately
            loop {
                ticker.tick().await;
                let Some(store) = weak.upgrade() else { break };
                let evicted = store.evict_expired();
                if evicted > 0 {
                    debug!(evicted, remaining = store.len(), "session sweep");
                }
            }
        });
        if let Some(old) = self.sweeper.lock().unwrap().replace(handle) {
            old.abort();
        }
    }

    /// Stop the background sweep, if running.
    pub fn stop(&self) {
        if let Some(handle) = self.sweeper.lock().unwrap().take() {
            handle.abort();
        }
    }
}

impl Drop for SessionStore {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(handle: &str) -> SessionKey {
        SessionKey::new(handle, NaiveDate::from_ymd_opt(2025, 9, 15).unwrap())
    }

    #[test]
    fn history_of_absent_session_is_empty() {
        let store = SessionStore::new();
        assert!(store.history(&key("a")).is_empty());
    }

    #[test]
    fn append_preserves_order() {
        let store = SessionStore::new();
        let k = key("a");
        store.append(&k, Turn::user("lunch tomorrow"));
        store.append(&k, Turn::bot("noted"));

        let history = store.history(&k);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].speaker, Speaker::User);
        assert_eq!(history[1].speaker, Speaker::Bot);
        assert_eq!(history[1].text, "noted");
    }

    #[test]
    fn keys_are_independent_per_date() {
        let store = SessionStore::new();
        let monday = SessionKey::new("a", NaiveDate::from_ymd_opt(2025, 9, 15).unwrap());
        let tuesday = SessionKey::new("a", NaiveDate::from_ymd_opt(2025, 9, 16).unwrap());
        store.append(&monday, Turn::user("hi"));

        assert_eq!(store.history(&monday).len(), 1);
        assert!(store.history(&tuesday).is_empty());
    }

    #[test]
    fn evict_expired_drops_stale_sessions() {
        let store = SessionStore::with_ttl(Duration::from_millis(0));
        store.append(&key("a"), Turn::user("hi"));
        std::thread::sleep(Duration::from_millis(5));

        assert_eq!(store.evict_expired(), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn evict_expired_keeps_fresh_sessions() {
        let store = SessionStore::with_ttl(Duration::from_secs(60));
        store.append(&key("a"), Turn::user("hi"));

        assert_eq!(store.evict_expired(), 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn touch_refreshes_last_seen() {
        let store = SessionStore::with_ttl(Duration::from_millis(50));
        let k = key("a");
        store.append(&k, Turn::user("hi"));
        std::thread::sleep(Duration::from_millis(30));
        store.touch(&k);
        std::thread::sleep(Duration::from_millis(30));

        // 60ms since append but only 30ms since touch.
        assert_eq!(store.evict_expired(), 0);
    }

    #[test]
    fn concurrent_appends_lose_nothing() {
        let store = Arc::new(SessionStore::new());
        let k = key("a");
        let mut handles = Vec::new();
        for i in 0..8 {
            let store = Arc::clone(&store);
            let k = k.clone();
            handles.push(std::thread::spawn(move || {
                for j in 0..50 {
                    store.append(&k, Turn::user(format!("{i}-{j}")));
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(store.history(&k).len(), 8 * 50);
    }

    #[tokio::test]
    async fn sweep_task_evicts_in_background() {
        let store = Arc::new(SessionStore::with_ttl(Duration::from_millis(10)));
        store.append(&key("a"), Turn::user("hi"));
        store.start(Duration::from_millis(20));

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(store.is_empty());
        store.stop();
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let store = Arc::new(SessionStore::new());
        store.start(Duration::from_secs(3600));
        store.stop();
        store.stop();
    }
}
