//! Visitor sessions and their storage.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;
use uuid::Uuid;

/// Per-visitor context.
///
/// Cloning is cheap; clones share the same underlying state. The transcript is
/// absent (`None`) until something initializes it.
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    id: String,
    created_at: DateTime<Utc>,
    history: RwLock<Option<Vec<String>>>,
    flash: RwLock<Option<String>>,
    // Monotonic, on the tokio clock so tests can advance it.
    last_activity: RwLock<Instant>,
    in_flight: AtomicUsize,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

impl Session {
    fn new(id: String) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                id,
                created_at: Utc::now(),
                history: RwLock::new(None),
                flash: RwLock::new(None),
                last_activity: RwLock::new(Instant::now()),
                in_flight: AtomicUsize::new(0),
            }),
        }
    }

    /// Get the session ID.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// When the session was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.inner.created_at
    }

    /// Snapshot of the transcript, or `None` if it was never initialized.
    #[must_use]
    pub fn history(&self) -> Option<Vec<String>> {
        read(&self.inner.history).clone()
    }

    /// Number of transcript entries (0 when absent).
    #[must_use]
    pub fn history_len(&self) -> usize {
        read(&self.inner.history).as_ref().map_or(0, Vec::len)
    }

    /// Install an empty transcript if none exists.
    ///
    /// Returns `true` if the transcript was created by this call.
    pub fn ensure_history(&self) -> bool {
        let mut guard = write(&self.inner.history);
        if guard.is_some() {
            return false;
        }
        *guard = Some(Vec::new());
        drop(guard);
        self.touch();
        true
    }

    /// Append entries to the transcript in one step, creating it if absent.
    pub fn extend_history<I>(&self, entries: I)
    where
        I: IntoIterator<Item = String>,
    {
        let mut guard = write(&self.inner.history);
        guard.get_or_insert_with(Vec::new).extend(entries);
        drop(guard);
        self.touch();
    }

    /// Replace the whole transcript.
    ///
    /// Does nothing and returns `false` when the transcript is absent.
    pub fn replace_history(&self, entries: Vec<String>) -> bool {
        let mut guard = write(&self.inner.history);
        let Some(history) = guard.as_mut() else {
            return false;
        };
        *history = entries;
        drop(guard);
        self.touch();
        true
    }

    /// Store a one-shot message for the next page render.
    pub fn set_flash(&self, message: impl Into<String>) {
        *write(&self.inner.flash) = Some(message.into());
    }

    /// Take the pending flash message, clearing it.
    pub fn take_flash(&self) -> Option<String> {
        write(&self.inner.flash).take()
    }

    /// Update the last activity timestamp.
    pub fn touch(&self) {
        *write(&self.inner.last_activity) = Instant::now();
    }

    /// Mark a request as running against this session until the guard drops.
    ///
    /// A session with a request in flight never expires, however long the
    /// request takes.
    pub fn begin_request(&self) -> RequestGuard {
        self.inner.in_flight.fetch_add(1, Ordering::SeqCst);
        self.touch();
        RequestGuard {
            session: self.clone(),
        }
    }

    /// Number of requests currently running against this session.
    #[must_use]
    pub fn requests_in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    /// Check if the session has been idle longer than `timeout`.
    #[must_use]
    pub fn is_expired_with_timeout(&self, timeout: Duration) -> bool {
        if self.requests_in_flight() > 0 {
            return false;
        }
        read(&self.inner.last_activity).elapsed() > timeout
    }
}

/// Keeps a [`Session`] busy for the lifetime of one request.
#[derive(Debug)]
#[must_use = "the session only counts as busy while the guard is alive"]
pub struct RequestGuard {
    session: Session,
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        // Touch first so the idle clock restarts before the session looks idle.
        self.session.touch();
        self.session.inner.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Thread-safe store for sessions.
///
/// The store lock is only held for map lookups and inserts, never across an
/// await point, so sessions do not contend with each other.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<String, Session>>>,
}

impl SessionStore {
    /// Create a new session store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new session with a random ID and return it.
    #[must_use]
    pub fn create(&self) -> Session {
        let session = Session::new(Uuid::new_v4().to_string());
        write(&self.inner).insert(session.id().to_string(), session.clone());
        session
    }

    /// Get a session by ID.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Session> {
        read(&self.inner).get(id).cloned()
    }

    /// Look up the session for a presented ID, creating a fresh one when the
    /// ID is missing or unknown.
    ///
    /// Returns the session and whether it was newly created. Unknown IDs are
    /// never adopted, so clients cannot choose their own session ID.
    #[must_use]
    pub fn resolve(&self, id: Option<&str>) -> (Session, bool) {
        match id.and_then(|id| self.get(id)) {
            Some(session) => {
                session.touch();
                (session, false)
            }
            None => (self.create(), true),
        }
    }

    /// Remove a session by ID.
    pub fn remove(&self, id: &str) -> Option<Session> {
        write(&self.inner).remove(id)
    }

    /// Get the number of active sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        read(&self.inner).len()
    }

    /// Check if there are no sessions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove sessions that have been inactive longer than the timeout.
    ///
    /// Returns the number of sessions removed.
    pub fn cleanup_expired_with_timeout(&self, timeout: Duration) -> usize {
        let mut guard = write(&self.inner);
        let before = guard.len();
        guard.retain(|_, session| !session.is_expired_with_timeout(timeout));
        before - guard.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_starts_absent() {
        let session = Session::new("test-123".to_string());

        assert_eq!(session.id(), "test-123");
        assert!(session.history().is_none());
        assert_eq!(session.history_len(), 0);

        assert!(session.ensure_history());
        assert!(!session.ensure_history());
        assert_eq!(session.history(), Some(Vec::new()));
    }

    #[test]
    fn test_replace_requires_history() {
        let session = Session::new("test".to_string());

        assert!(!session.replace_history(vec!["A".to_string()]));
        assert!(session.history().is_none());

        session.ensure_history();
        assert!(session.replace_history(vec!["A".to_string()]));
        assert_eq!(session.history().unwrap(), vec!["A"]);
    }

    #[test]
    fn test_extend_creates_history() {
        let session = Session::new("test".to_string());
        session.extend_history(["User: a".to_string(), "Assistant: b".to_string()]);
        assert_eq!(session.history_len(), 2);
    }

    #[test]
    fn test_flash_is_one_shot() {
        let session = Session::new("test".to_string());
        assert!(session.take_flash().is_none());

        session.set_flash("oops");
        assert_eq!(session.take_flash().as_deref(), Some("oops"));
        assert!(session.take_flash().is_none());
    }

    #[test]
    fn test_session_store() {
        let store = SessionStore::new();

        assert!(store.is_empty());

        let session = store.create();
        assert_eq!(store.len(), 1);

        let retrieved = store.get(session.id()).unwrap();
        assert_eq!(retrieved.id(), session.id());

        // Clones share state.
        retrieved.ensure_history();
        assert!(session.history().is_some());

        store.remove(session.id());
        assert!(store.is_empty());
    }

    #[test]
    fn test_resolve_never_adopts_unknown_ids() {
        let store = SessionStore::new();

        let (fresh, created) = store.resolve(None);
        assert!(created);

        let (same, created) = store.resolve(Some(fresh.id()));
        assert!(!created);
        assert_eq!(same.id(), fresh.id());

        let (other, created) = store.resolve(Some("attacker-chosen"));
        assert!(created);
        assert_ne!(other.id(), "attacker-chosen");
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_created_at_is_fixed() {
        let before = Utc::now();
        let session = Session::new("test".to_string());
        let created = session.created_at();
        assert!(created >= before && created <= Utc::now());

        session.touch();
        assert_eq!(session.created_at(), created);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_expired() {
        let store = SessionStore::new();
        let _ = store.create();
        let _ = store.create();

        assert_eq!(store.cleanup_expired_with_timeout(Duration::from_secs(60)), 0);
        assert_eq!(store.len(), 2);

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(store.cleanup_expired_with_timeout(Duration::from_secs(60)), 2);
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_touch_restarts_idle_clock() {
        let store = SessionStore::new();
        let session = store.create();

        tokio::time::advance(Duration::from_secs(50)).await;
        let (same, created) = store.resolve(Some(session.id()));
        assert!(!created);

        tokio::time::advance(Duration::from_secs(50)).await;
        assert!(!same.is_expired_with_timeout(Duration::from_secs(60)));
        assert_eq!(store.cleanup_expired_with_timeout(Duration::from_secs(60)), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_busy_session_is_not_swept() {
        let store = SessionStore::new();
        let session = store.create();

        let guard = session.begin_request();
        assert_eq!(session.requests_in_flight(), 1);

        tokio::time::advance(Duration::from_secs(600)).await;
        assert!(!session.is_expired_with_timeout(Duration::from_secs(60)));
        assert_eq!(store.cleanup_expired_with_timeout(Duration::from_secs(60)), 0);

        // Finishing the request restarts the idle clock.
        drop(guard);
        assert_eq!(session.requests_in_flight(), 0);
        assert_eq!(store.cleanup_expired_with_timeout(Duration::from_secs(60)), 0);

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(store.cleanup_expired_with_timeout(Duration::from_secs(60)), 1);
        assert!(store.get(session.id()).is_none());
    }
}
