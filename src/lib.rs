//! Civicscape Chat
//!
//! A small server-rendered chat front-end. Visitors type prompts, the server
//! forwards the running transcript to a hosted completion service, and the
//! exchange is kept in the visitor's session where it can be edited in place
//! or downloaded as plain text.
//!
//! # Architecture
//!
//! - **Server**: Axum router with post-redirect-get form handlers
//! - **Conversation**: Transcript operations over an explicit session
//! - **Completion**: `OpenAI` Responses API client behind a trait
//! - **UI**: Plain HTML forms, no client framework
//!
//! # Modules
//!
//! - [`config`]: Layered configuration (defaults, file, env, CLI)
//! - [`conversation`]: Transcript submit / edit / export
//! - [`llm`]: Completion client trait and implementation
//! - [`server`]: Router, handlers and startup
//! - [`session`]: Cookie-backed in-memory sessions
//! - [`telemetry`]: Logging setup
//! - [`ui`]: HTML rendering

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::unused_async)]

pub mod config;
pub mod conversation;
pub mod llm;
pub mod server;
pub mod session;
pub mod telemetry;
pub mod ui;

use crate::config::AppConfig;

use conversation::ConversationStore;
use session::SessionStore;
use std::sync::Arc;

/// Application state shared across all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Transcript operations and the completion client behind them.
    pub conversations: ConversationStore,
    /// Session store for visitor state.
    pub sessions: SessionStore,
    /// Global Configuration
    pub config: Arc<AppConfig>,
}
