use crate::{AppState, handlers};
use axum::{Router, routing::post};

/// Admin Router Module
///
/// Every post mutation lives here. `create_router` wraps this router in `auth::admin_guard`
/// and each handler additionally runs its work through `auth::admin_only`.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // POST /new-post
        .route("/new-post", post(handlers::create_post))
        // POST /edit-post/{post_id}
        .route("/edit-post/{post_id}", post(handlers::edit_post))
        // POST /delete/{post_id}
        // POST only, so a cross-site link or image cannot delete a post.
        .route("/delete/{post_id}", post(handlers::delete_post))
}
