//! Cookie-to-session resolution.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::AppState;

/// Attach the visitor's [`Session`](super::Session) to the request.
///
/// Reads the session cookie, resolves it against the store and inserts the
/// session into request extensions. The session stays exempt from the idle
/// sweep until the response is produced. When a new session had to be created
/// the response carries a `Set-Cookie` for it.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let cookie_name = state.config.session.cookie_name.as_str();
    let jar = CookieJar::from_headers(request.headers());
    let presented = jar.get(cookie_name).map(Cookie::value);

    let (session, created) = state.sessions.resolve(presented);
    if created {
        tracing::debug!(
            name: "session.created",
            session_id = %session.id(),
            created_at = %session.created_at(),
            replaced = presented.is_some(),
            "Created session"
        );
    }

    let id = session.id().to_string();
    let _busy = session.begin_request();
    request.extensions_mut().insert(session);
    let response = next.run(request).await;

    if !created {
        return response;
    }

    let cookie = Cookie::build((cookie_name.to_string(), id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);
    (jar.add(cookie), response).into_response()
}
