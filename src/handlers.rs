use crate::{
    AppState,
    auth::{
        Identity, admin_only,
        credentials::{self, PasswordHash},
        session,
    },
    config::AppConfig,
    error::{AppError, Result},
    flash::Flash,
    models::{
        CommentForm, FlashQuery, LoginForm, LoginPage, NewComment, NewUser, PostContent,
        PostDetail, PostForm, PostView, RegisterForm, SessionView, User,
    },
    sanitizer::{SafeText, Sanitizer},
};
use axum::{
    Form, Json,
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Redirect, Response},
};

// --- Field limits (mirror the column sizes in migrations/) ---

const MAX_EMAIL: usize = 100;
const MAX_NAME: usize = 100;
const MAX_PASSWORD: usize = 1024;
const MAX_TITLE: usize = 250;
const MAX_IMG_URL: usize = 250;
const MAX_COMMENT: usize = 3000;
const MAX_BODY: usize = 100_000;

/// Raw input may take at most this many bytes per stored character before it is sanitized.
const RAW_BYTES_PER_CHAR: usize = 4;

/// Rejects raw input that could not fit `max_chars` once sanitized, before any parsing.
fn within_raw_limit(field: &str, raw: &str, max_chars: usize) -> Result<()> {
    if raw.len() > max_chars.saturating_mul(RAW_BYTES_PER_CHAR) {
        return Err(AppError::Validation(format!(
            "{field} must be at most {max_chars} characters"
        )));
    }
    Ok(())
}

/// Sanitizes `raw` and requires the result to be non-blank and at most `max_chars` long.
fn sanitized(sanitizer: &Sanitizer, field: &str, raw: &str, max_chars: usize) -> Result<SafeText> {
    within_raw_limit(field, raw, max_chars)?;
    required(field, sanitizer.clean(raw), max_chars)
}

fn required(field: &str, value: SafeText, max_chars: usize) -> Result<SafeText> {
    if value.is_blank() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    if value.as_str().chars().count() > max_chars {
        return Err(AppError::Validation(format!(
            "{field} must be at most {max_chars} characters"
        )));
    }
    Ok(value)
}

fn post_content(sanitizer: &Sanitizer, form: &PostForm) -> Result<PostContent> {
    Ok(PostContent {
        title: sanitized(sanitizer, "title", &form.title, MAX_TITLE)?,
        subtitle: sanitized(sanitizer, "subtitle", &form.subtitle, MAX_TITLE)?,
        img_url: sanitized(sanitizer, "img_url", &form.img_url, MAX_IMG_URL)?,
        body: sanitized(sanitizer, "body", &form.body, MAX_BODY)?,
    })
}

/// Issues a session cookie for `user` and sends them to the post listing.
fn start_session(user: &User, config: &AppConfig) -> Result<Response> {
    let token = session::issue_token(user.id, config)?;
    Ok((
        [(header::SET_COOKIE, session::session_cookie(&token, config))],
        Redirect::to("/"),
    )
        .into_response())
}

// --- Public Handlers ---

/// list_posts
///
/// [Public Route] All posts, newest first.
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "All posts", body = [PostView]))
)]
pub async fn list_posts(State(state): State<AppState>) -> Result<Json<Vec<PostView>>> {
    let posts = state.repo.list_posts().await?;
    Ok(Json(posts.into_iter().map(PostView::from).collect()))
}

/// show_post
///
/// [Public Route] One post with its comments.
#[utoipa::path(
    get,
    path = "/post/{post_id}",
    params(("post_id" = i64, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Found", body = PostDetail),
        (status = 404, description = "Not Found")
    )
)]
pub async fn show_post(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<Json<PostDetail>> {
    let post = state
        .repo
        .get_post(post_id)
        .await?
        .ok_or(AppError::NotFound("post"))?;
    let comments = state.repo.get_comments(post_id).await?;
    Ok(Json(PostDetail {
        post: post.into(),
        comments: comments.into_iter().map(Into::into).collect(),
    }))
}

/// me
///
/// [Public Route] Describes the caller's session. Anonymous callers get an empty view
/// rather than an error.
#[utoipa::path(
    get,
    path = "/me",
    responses((status = 200, description = "Session", body = SessionView))
)]
pub async fn me(identity: Identity) -> Json<SessionView> {
    Json(SessionView {
        authenticated: identity.is_authenticated(),
        is_admin: identity.is_admin(),
        user_id: identity.user().map(|u| u.id),
        name: identity.user().map(|u| u.name.clone()),
    })
}

/// login_page
///
/// [Public Route] Data for the login page: the notice named by `?flash=`, if it is a known
/// code. Unknown codes are ignored.
#[utoipa::path(
    get,
    path = "/login",
    params(("flash" = Option<String>, Query, description = "Flash code from a redirect")),
    responses((status = 200, description = "Login page", body = LoginPage))
)]
pub async fn login_page(Query(query): Query<FlashQuery>) -> Json<LoginPage> {
    Json(LoginPage {
        flash: query
            .flash
            .as_deref()
            .and_then(Flash::from_code)
            .map(Flash::notice),
    })
}

/// register
///
/// [Public Route] Creates an account and logs it in.
///
/// Every field is sanitized; the password is then hashed and only the hash is stored.
/// An email that is already registered never produces a second account: the caller is sent
/// to the login page with the `already-registered` notice instead.
#[utoipa::path(
    post,
    path = "/register",
    request_body(content = RegisterForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Registered and logged in, or sent to login if the email exists"),
        (status = 422, description = "Missing field")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> Result<Response> {
    let email = sanitized(&state.sanitizer, "email", &form.email, MAX_EMAIL)?;
    let name = sanitized(&state.sanitizer, "name", &form.name, MAX_NAME)?;
    let password = sanitized(&state.sanitizer, "password", &form.password, MAX_PASSWORD)?;

    if state.repo.find_user_by_email(email.as_str()).await?.is_some() {
        tracing::info!("registration refused: email already registered");
        return Ok(Flash::AlreadyRegistered.redirect_to("/login").into_response());
    }

    let password_hash = credentials::hash_password_blocking(password).await?;
    let created = state
        .repo
        .create_user(NewUser {
            email,
            name,
            password_hash,
        })
        .await;

    let user = match created.map_err(AppError::from) {
        Ok(user) => user,
        // Lost a race with a concurrent registration for the same email.
        Err(AppError::Conflict(_)) => {
            return Ok(Flash::AlreadyRegistered.redirect_to("/login").into_response());
        }
        Err(e) => return Err(e),
    };

    tracing::info!(user_id = user.id, "user registered");
    start_session(&user, &state.config)
}

/// login
///
/// [Public Route] Verifies the credentials and starts a session. Unknown email and wrong
/// password produce the same `invalid-credentials` notice.
#[utoipa::path(
    post,
    path = "/login",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Logged in, or back to login with a notice"),
        (status = 422, description = "Field too long")
    )
)]
pub async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Result<Response> {
    within_raw_limit("email", &form.email, MAX_EMAIL)?;
    within_raw_limit("password", &form.password, MAX_PASSWORD)?;
    // Must match the sanitization applied before hashing at registration.
    let email = state.sanitizer.clean(&form.email);
    let password = state.sanitizer.clean(&form.password);

    let Some(user) = state.repo.find_user_by_email(email.as_str()).await? else {
        tracing::info!("login refused");
        return Ok(Flash::InvalidCredentials.redirect_to("/login").into_response());
    };

    let stored = PasswordHash::from_stored(user.password_hash.clone());
    if !credentials::verify_password_blocking(password, stored).await? {
        tracing::info!(user_id = user.id, "login refused");
        return Ok(Flash::InvalidCredentials.redirect_to("/login").into_response());
    }

    tracing::info!(user_id = user.id, "user logged in");
    start_session(&user, &state.config)
}

// --- Authenticated Handlers ---

/// logout
///
/// [Authenticated Route] Clears the session cookie.
///
/// Sessions are stateless signed tokens, so this cannot revoke a token copied before logout:
/// it stays valid until its `exp`, at most `SESSION_TTL_SECS` after login. Deployments that
/// need prompt revocation should lower that TTL.
#[utoipa::path(
    get,
    path = "/logout",
    responses((status = 303, description = "Logged out"))
)]
pub async fn logout(State(state): State<AppState>) -> Response {
    (
        [(header::SET_COOKIE, session::clear_session_cookie(&state.config))],
        Redirect::to("/"),
    )
        .into_response()
}

/// add_comment
///
/// [Authenticated Route] Adds a sanitized comment to a post and returns to it.
#[utoipa::path(
    post,
    path = "/post/{post_id}/comments",
    params(("post_id" = i64, Path, description = "Post ID")),
    request_body(content = CommentForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Comment added, or sent to login when anonymous"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn add_comment(
    identity: Identity,
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Form(form): Form<CommentForm>,
) -> Result<Response> {
    let Some(user) = identity.user() else {
        return Ok(Flash::LoginRequired.redirect_to("/login").into_response());
    };
    if state.repo.get_post(post_id).await?.is_none() {
        return Err(AppError::NotFound("post"));
    }

    let text = sanitized(&state.sanitizer, "comment_text", &form.comment_text, MAX_COMMENT)?;
    let comment = state
        .repo
        .add_comment(NewComment {
            post_id,
            author_id: user.id,
            text,
        })
        .await?;

    tracing::info!(post_id, comment_id = comment.id, "comment added");
    Ok(Redirect::to(&format!("/post/{post_id}")).into_response())
}

// --- Admin Handlers ---

/// create_post
///
/// [Admin Route] Publishes a new post authored by the admin.
#[utoipa::path(
    post,
    path = "/new-post",
    request_body(content = PostForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Created"),
        (status = 403, description = "Not the admin"),
        (status = 409, description = "Title already used")
    )
)]
pub async fn create_post(
    identity: Identity,
    State(state): State<AppState>,
    Form(form): Form<PostForm>,
) -> Result<Redirect> {
    admin_only(&identity, |admin| async move {
        let content = post_content(&state.sanitizer, &form)?;
        let post = state.repo.create_post(admin.id, content).await?;
        tracing::info!(post_id = post.id, "post created");
        Ok(Redirect::to("/"))
    })
    .await
}

/// edit_post
///
/// [Admin Route] Replaces a post's title, subtitle, image URL and body.
#[utoipa::path(
    post,
    path = "/edit-post/{post_id}",
    params(("post_id" = i64, Path, description = "Post ID")),
    request_body(content = PostForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Updated"),
        (status = 403, description = "Not the admin"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn edit_post(
    identity: Identity,
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Form(form): Form<PostForm>,
) -> Result<Redirect> {
    admin_only(&identity, |_admin| async move {
        let content = post_content(&state.sanitizer, &form)?;
        state
            .repo
            .update_post(post_id, content)
            .await?
            .ok_or(AppError::NotFound("post"))?;
        tracing::info!(post_id, "post updated");
        Ok(Redirect::to("/"))
    })
    .await
}

/// delete_post
///
/// [Admin Route] Deletes a post together with its comments.
#[utoipa::path(
    post,
    path = "/delete/{post_id}",
    params(("post_id" = i64, Path, description = "Post ID")),
    responses(
        (status = 303, description = "Deleted"),
        (status = 403, description = "Not the admin"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_post(
    identity: Identity,
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<Redirect> {
    admin_only(&identity, |_admin| async move {
        if !state.repo.delete_post(post_id).await? {
            return Err(AppError::NotFound("post"));
        }
        tracing::info!(post_id, "post deleted");
        Ok(Redirect::to("/"))
    })
    .await
}
