//! Request middleware: session extraction.

use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;

use trolley_core::SessionId;

use crate::app::errors;
use crate::context::SessionContext;

/// Header carrying the opaque session handle.
pub const SESSION_HEADER: &str = "x-session-id";

/// Pull the session handle out of the request and stash it as an extension.
///
/// Cart routes are meaningless without a session, so a missing or unreadable
/// header short-circuits with 400 before any handler runs.
pub async fn session_middleware(mut req: Request, next: Next) -> Response {
    let token = req
        .headers()
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty());

    let Some(token) = token else {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "missing_session",
            format!("{SESSION_HEADER} header is required"),
        );
    };

    let context = SessionContext::new(SessionId::from(token));
    req.extensions_mut().insert(context);
    next.run(req).await
}
