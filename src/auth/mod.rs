use std::{convert::Infallible, future::Future};

use axum::{
    extract::{FromRef, FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::{
    config::AppConfig,
    error::AppError,
    flash::Flash,
    models::User,
    repository::{Repository, RepositoryState},
};

pub mod credentials;
pub mod session;

/// The account that holds admin rights: the first one created.
pub const ADMIN_USER_ID: i64 = 1;

/// Role
///
/// Privilege level of an authenticated caller, derived from the user id and never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Reader,
    Admin,
}

impl Role {
    pub fn for_user_id(id: i64) -> Self {
        if id == ADMIN_USER_ID { Role::Admin } else { Role::Reader }
    }
}

/// Identity
///
/// The resolved caller for the current request, decided from the session token on every
/// request. `Authenticated` always carries the user record it was resolved to; a missing or
/// unusable token is `Anonymous`, never an error.
///
/// Also an axum extractor: resolution happens once per request and the result is cached in
/// the request extensions, so layers and handlers see the same value. Extraction never fails.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Identity {
    #[default]
    Anonymous,
    Authenticated(User),
}

impl Identity {
    pub fn user(&self) -> Option<&User> {
        match self {
            Identity::Anonymous => None,
            Identity::Authenticated(user) => Some(user),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Identity::Authenticated(_))
    }

    pub fn role(&self) -> Option<Role> {
        self.user().map(|user| Role::for_user_id(user.id))
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Some(Role::Admin)
    }
}

/// True only for an authenticated caller whose id is [`ADMIN_USER_ID`].
pub fn is_admin(identity: &Identity) -> bool {
    identity.is_admin()
}

/// resolve_identity
///
/// Maps a session token to an [`Identity`] with one store lookup. Absent, malformed or
/// expired tokens, ids with no matching record, and failed lookups all resolve to
/// `Anonymous`. There is no retry.
pub async fn resolve_identity(
    repo: &dyn Repository,
    session_secret: &str,
    token: Option<&str>,
) -> Identity {
    let Some(token) = token else {
        return Identity::Anonymous;
    };
    let Some(user_id) = session::token_subject(token, session_secret) else {
        return Identity::Anonymous;
    };

    match repo.find_user_by_id(user_id).await {
        Ok(Some(user)) => Identity::Authenticated(user),
        Ok(None) => {
            tracing::debug!(user_id, "session refers to a missing user");
            Identity::Anonymous
        }
        Err(e) => {
            tracing::error!(user_id, "identity lookup failed: {e}");
            Identity::Anonymous
        }
    }
}

/// Outcome of the admin check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    Allow,
    Deny,
}

pub fn require_admin(identity: &Identity) -> Authorization {
    if is_admin(identity) {
        Authorization::Allow
    } else {
        Authorization::Deny
    }
}

/// admin_only
///
/// Runs `operation` with the admin's user record if the caller is the admin. Otherwise the
/// operation is never invoked and [`AppError::Forbidden`] is returned. On success the
/// operation's result is passed through untouched.
pub async fn admin_only<F, Fut, T>(identity: &Identity, operation: F) -> Result<T, AppError>
where
    F: FnOnce(User) -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    match (require_admin(identity), identity) {
        (Authorization::Allow, Identity::Authenticated(user)) => operation(user.clone()).await,
        _ => {
            tracing::warn!(
                user_id = identity.user().map(|u| u.id),
                "privileged operation refused"
            );
            Err(AppError::Forbidden)
        }
    }
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(identity) = parts.extensions.get::<Identity>() {
            return Ok(identity.clone());
        }

        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);
        let token = session::token_from_headers(&parts.headers);

        let identity =
            resolve_identity(repo.as_ref(), &config.session_secret, token.as_deref()).await;
        parts.extensions.insert(identity.clone());
        Ok(identity)
    }
}

/// admin_guard
///
/// Route layer for the privileged router: non-admin callers get a 403 and the request never
/// reaches the handler.
pub async fn admin_guard(identity: Identity, request: Request, next: Next) -> Response {
    match require_admin(&identity) {
        Authorization::Allow => next.run(request).await,
        Authorization::Deny => {
            tracing::warn!(
                user_id = identity.user().map(|u| u.id),
                path = %request.uri().path(),
                "admin route refused"
            );
            AppError::Forbidden.into_response()
        }
    }
}

/// login_required
///
/// Route layer for routes that need any logged-in user. Anonymous callers are redirected
/// to the login page.
pub async fn login_required(identity: Identity, request: Request, next: Next) -> Response {
    if identity.is_authenticated() {
        next.run(request).await
    } else {
        Flash::LoginRequired.redirect_to("/login").into_response()
    }
}
