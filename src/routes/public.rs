use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Read-only views of the blog plus the account gateway. Nothing here writes content.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        // GET /
        // All posts, newest first.
        .route("/", get(handlers::list_posts))
        // GET /post/{post_id}
        // A post and its comments.
        .route("/post/{post_id}", get(handlers::show_post))
        // GET /me
        // The caller's session state (anonymous callers included).
        .route("/me", get(handlers::me))
        // POST /register, GET|POST /login
        // The POSTs end in a redirect; failures carry a flash code that GET /login resolves.
        .route("/register", post(handlers::register))
        .route("/login", get(handlers::login_page).post(handlers::login))
}
