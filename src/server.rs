use axum::{
    Extension, Form, Router,
    extract::State,
    http::{StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use std::sync::Arc;

use tower_http::trace::TraceLayer;

use tracing::info;

use crate::AppState;
use crate::config::AppConfig;
use crate::conversation::ConversationStore;
use crate::llm::ResponsesClient;
use crate::session::{self, Session, SessionStore, middleware::session_middleware};
use crate::ui::render_chat_page;

/// Body of the 404 returned when there is nothing to download.
pub const NO_HISTORY_MESSAGE: &str = "No history to download.";

/// Start the Axum server with the provided configuration.
pub async fn start_server(config: Arc<AppConfig>) -> anyhow::Result<()> {
    let settings = config.completion_settings()?;
    info!(
        name: "llm.config.loaded",
        base_url = %settings.base_url,
        prompt_id = %settings.prompt_id,
        timeout_secs = settings.timeout.as_secs(),
        "Completion service configured"
    );

    let client = Arc::new(ResponsesClient::new(settings)?);
    let conversations = ConversationStore::new(client, config.completion_timeout());

    // Session store
    let sessions = SessionStore::new();
    let sweeper = session::spawn_sweeper(
        sessions.clone(),
        config.session_idle_timeout(),
        config.session_sweep_interval(),
    );

    let state = AppState {
        conversations,
        sessions,
        config: Arc::clone(&config),
    };

    let app = router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        "Server started"
    );

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    info!(name: "server.stopped", "Server stopped");
    Ok(())
}

/// Build the application router.
///
/// Page routes run behind the session middleware; `/healthz` does not, so
/// health checks never create sessions.
pub fn router(state: AppState) -> Router {
    let pages = Router::new()
        .route("/", get(index_handler).post(submit_handler))
        .route("/update", post(update_handler))
        .route("/download", get(download_handler))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            session_middleware,
        ));

    Router::new()
        .route("/healthz", get(healthz))
        .merge(pages)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Prompt form body.
#[derive(Debug, Deserialize)]
struct SubmitForm {
    /// Text typed by the visitor.
    user_input: String,
}

/// GET / - Render the transcript.
async fn index_handler(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Html<String> {
    state.conversations.initialize(&session);
    let history = session.history().unwrap_or_default();
    let flash = session.take_flash();
    Html(render_chat_page(&history, flash.as_deref()))
}

/// POST / - Send a prompt, then redirect back to the transcript.
///
/// A failed completion leaves the transcript alone and queues a message for
/// the next render.
async fn submit_handler(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Form(form): Form<SubmitForm>,
) -> Redirect {
    state.conversations.initialize(&session);

    if let Err(e) = state
        .conversations
        .submit(&session, &form.user_input)
        .await
    {
        session.set_flash(e.user_message());
    }

    Redirect::to("/")
}

/// POST /update - Replace the transcript with the edit form's contents.
async fn update_handler(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Form(fields): Form<Vec<(String, String)>>,
) -> Redirect {
    state.conversations.replace_all(&session, fields);
    Redirect::to("/")
}

/// GET /download - Transcript as a plain-text attachment.
async fn download_handler(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Response {
    let Some(export) = state.conversations.export(&session) else {
        return (StatusCode::NOT_FOUND, NO_HISTORY_MESSAGE).into_response();
    };

    info!(
        name: "chat.history.exported",
        session_id = %session.id(),
        bytes = export.body.len(),
        "Transcript exported"
    );

    (
        [
            (header::CONTENT_TYPE, export.content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", export.file_name),
            ),
        ],
        export.body,
    )
        .into_response()
}

/// GET /healthz - Liveness probe.
async fn healthz() -> &'static str {
    "ok"
}
