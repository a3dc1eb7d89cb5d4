use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Authenticated Router Module
///
/// Wrapped in `auth::login_required` by `create_router`. Handlers still take an `Identity`
/// and re-check it, so they stay safe if mounted elsewhere.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /logout
        .route("/logout", get(handlers::logout))
        // POST /post/{post_id}/comments
        // Comment on a post; the text is sanitized before it is stored.
        .route("/post/{post_id}/comments", post(handlers::add_comment))
}
