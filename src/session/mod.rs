//! Visitor session management.
//!
//! Sessions live in memory and are identified by a random UUID carried in a
//! cookie. Each session holds the visitor's transcript and a one-shot flash
//! message.
//!
//! # Architecture
//!
//! - [`Session`]: Per-visitor state handed explicitly to conversation operations
//! - [`SessionStore`]: Thread-safe store for all active sessions
//! - [`RequestGuard`]: Keeps a session from expiring while a request runs
//! - [`middleware::session_middleware`]: Resolves the cookie into a [`Session`]
//! - [`spawn_sweeper`]: Background removal of idle sessions
//!
//! # Example
//!
//! ```rust
//! use civicscape_chat::session::SessionStore;
//!
//! let store = SessionStore::new();
//! let (session, created) = store.resolve(None);
//! assert!(created);
//! assert!(session.history().is_none());
//! ```

pub mod middleware;
mod store;

pub use store::{RequestGuard, Session, SessionStore};

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

/// Periodically drop sessions idle longer than `idle_timeout`.
///
/// The returned handle can be aborted on shutdown.
pub fn spawn_sweeper(
    store: SessionStore,
    idle_timeout: Duration,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let removed = store.cleanup_expired_with_timeout(idle_timeout);
            if removed > 0 {
                debug!(
                    name: "session.swept",
                    removed,
                    remaining = store.len(),
                    "Expired sessions removed"
                );
            }
        }
    })
}
