//! Conversation transcript operations.
//!
//! A transcript is the ordered list of `"User: ..."` / `"Assistant: ..."`
//! entries kept in a visitor's [`Session`]. [`ConversationStore`] implements the
//! four operations the web layer needs:
//!
//! 1. [`initialize`](ConversationStore::initialize) an empty transcript
//! 2. [`submit`](ConversationStore::submit) a prompt and append the exchange
//! 3. [`replace_all`](ConversationStore::replace_all) from edited form fields
//! 4. [`export`](ConversationStore::export) as plain text
//!
//! The store holds no sessions itself; every operation receives one.

pub mod transcript;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::llm::{CompletionClient, CompletionError};
use crate::session::Session;

pub use transcript::{EXPORT_SEPARATOR, HISTORY_FIELD_PREFIX, Role};

/// File name suggested for downloaded transcripts.
pub const EXPORT_FILE_NAME: &str = "chat_history.txt";

/// Content type of downloaded transcripts.
pub const EXPORT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// A transcript rendered for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    /// Entries joined by [`EXPORT_SEPARATOR`].
    pub body: String,
    /// Suggested attachment file name.
    pub file_name: &'static str,
    /// MIME type for the body.
    pub content_type: &'static str,
}

/// Transcript operations backed by a completion service.
#[derive(Clone)]
pub struct ConversationStore {
    client: Arc<dyn CompletionClient>,
    timeout: Duration,
}

impl std::fmt::Debug for ConversationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationStore")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ConversationStore {
    /// Create a store that asks `client` for completions, giving up after
    /// `timeout`.
    #[must_use]
    pub fn new(client: Arc<dyn CompletionClient>, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Give the session an empty transcript if it has none.
    pub fn initialize(&self, session: &Session) {
        if session.ensure_history() {
            debug!(session_id = %session.id(), "Initialized transcript");
        }
    }

    /// Send `user_text` with the transcript so far and append the exchange.
    ///
    /// On success exactly two entries are appended, the user turn then the
    /// trimmed assistant turn. On failure the transcript is left untouched.
    ///
    /// No lock is held while waiting on the completion service. The session's
    /// idle clock restarts once the service answers.
    pub async fn submit(&self, session: &Session, user_text: &str) -> Result<(), CompletionError> {
        let history = session.history().unwrap_or_default();
        let prompt = transcript::build_prompt(&history, user_text);

        debug!(
            session_id = %session.id(),
            history_len = history.len(),
            prompt_len = prompt.len(),
            "Requesting completion"
        );

        let outcome = tokio::time::timeout(self.timeout, self.client.complete(&prompt)).await;
        session.touch();

        let reply = match outcome {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                warn!(name: "chat.submit.failed", session_id = %session.id(), error = %e, "Completion failed");
                return Err(e);
            }
            Err(_) => {
                let e = CompletionError::Timeout(self.timeout);
                warn!(name: "chat.submit.failed", session_id = %session.id(), error = %e, "Completion timed out");
                return Err(e);
            }
        };

        let reply = reply.trim();
        session.extend_history([Role::User.turn(user_text), Role::Assistant.turn(reply)]);

        info!(
            name: "chat.submit.completed",
            session_id = %session.id(),
            reply_len = reply.len(),
            history_len = session.history_len(),
            "Exchange appended"
        );
        Ok(())
    }

    /// Replace the transcript with the `history_*` fields of an edit form.
    ///
    /// Does nothing when the session has no transcript. Returns whether the
    /// transcript was replaced.
    pub fn replace_all<I>(&self, session: &Session, fields: I) -> bool
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let entries = transcript::collect_edits(fields);
        let count = entries.len();
        let replaced = session.replace_history(entries);

        if replaced {
            info!(name: "chat.history.replaced", session_id = %session.id(), entries = count, "Transcript edited");
        } else {
            debug!(session_id = %session.id(), "Edit ignored; no transcript");
        }
        replaced
    }

    /// Render the transcript for download, or `None` when there is nothing to
    /// export.
    #[must_use]
    pub fn export(&self, session: &Session) -> Option<Export> {
        let history = session.history()?;
        let body = transcript::render_export(&history)?;
        Some(Export {
            body,
            file_name: EXPORT_FILE_NAME,
            content_type: EXPORT_CONTENT_TYPE,
        })
    }
}
