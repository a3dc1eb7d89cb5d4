mod common;

use axum::{
    extract::FromRequestParts,
    http::{Request, header},
};
use blog_backend::{
    auth::{
        self, ADMIN_USER_ID, Authorization, Identity, Role, admin_only, require_admin,
        resolve_identity, session,
    },
    config::AppConfig,
    error::AppError,
    models::User,
};
use common::{MockRepo, app_state, session_cookie_for};
use std::sync::atomic::{AtomicBool, Ordering};

fn user(id: i64) -> User {
    User {
        id,
        email: format!("user{id}@blog.test"),
        name: format!("User {id}"),
        ..User::default()
    }
}

fn token_for(id: i64) -> String {
    session::issue_token(id, &AppConfig::default()).unwrap()
}

// --- resolve_identity ---

#[tokio::test]
async fn missing_token_is_anonymous() {
    let repo = MockRepo::new();
    let secret = AppConfig::default().session_secret;

    let identity = resolve_identity(repo.as_ref(), &secret, None).await;

    assert_eq!(identity, Identity::Anonymous);
    assert_eq!(repo.id_lookups.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn valid_token_resolves_to_the_stored_user() {
    let repo = MockRepo::new();
    let stored = repo.seed_user("a@blog.test", "Ada", "pw");
    let secret = AppConfig::default().session_secret;

    let identity = resolve_identity(repo.as_ref(), &secret, Some(&token_for(stored.id))).await;

    assert_eq!(identity.user(), Some(&stored));
    assert_eq!(repo.id_lookups.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn token_for_a_deleted_user_is_anonymous() {
    let repo = MockRepo::new();
    let secret = AppConfig::default().session_secret;

    let identity = resolve_identity(repo.as_ref(), &secret, Some(&token_for(5))).await;

    assert_eq!(identity, Identity::Anonymous);
}

#[tokio::test]
async fn garbage_token_is_anonymous_without_a_lookup() {
    let repo = MockRepo::new();
    repo.seed_user("a@blog.test", "Ada", "pw");
    let secret = AppConfig::default().session_secret;

    let identity = resolve_identity(repo.as_ref(), &secret, Some("definitely-not-a-token")).await;

    assert_eq!(identity, Identity::Anonymous);
    assert_eq!(repo.id_lookups.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn store_failure_is_anonymous() {
    let repo = MockRepo::new();
    repo.seed_user("a@blog.test", "Ada", "pw");
    repo.fail_lookups.store(true, Ordering::SeqCst);
    let secret = AppConfig::default().session_secret;

    let identity = resolve_identity(repo.as_ref(), &secret, Some(&token_for(1))).await;

    assert_eq!(identity, Identity::Anonymous);
}

// --- Roles and the admin check ---

#[test]
fn only_user_one_is_admin() {
    assert_eq!(ADMIN_USER_ID, 1);
    assert!(auth::is_admin(&Identity::Authenticated(user(1))));
    assert!(!auth::is_admin(&Identity::Authenticated(user(2))));
    assert!(!auth::is_admin(&Identity::Anonymous));

    assert_eq!(Identity::Authenticated(user(1)).role(), Some(Role::Admin));
    assert_eq!(Identity::Authenticated(user(7)).role(), Some(Role::Reader));
    assert_eq!(Identity::Anonymous.role(), None);
}

#[test]
fn require_admin_allows_only_the_admin() {
    assert_eq!(
        require_admin(&Identity::Authenticated(user(1))),
        Authorization::Allow
    );
    assert_eq!(
        require_admin(&Identity::Authenticated(user(2))),
        Authorization::Deny
    );
    assert_eq!(require_admin(&Identity::Anonymous), Authorization::Deny);
}

#[tokio::test]
async fn admin_only_never_runs_the_operation_when_denied() {
    for identity in [Identity::Anonymous, Identity::Authenticated(user(2))] {
        let ran = AtomicBool::new(false);

        let result = admin_only(&identity, |_admin| async {
            ran.store(true, Ordering::SeqCst);
            Ok::<_, AppError>(())
        })
        .await;

        assert!(matches!(result, Err(AppError::Forbidden)));
        assert!(!ran.load(Ordering::SeqCst));
    }
}

#[tokio::test]
async fn admin_only_passes_the_result_through() {
    let identity = Identity::Authenticated(user(1));

    let result = admin_only(&identity, |admin| async move { Ok::<_, AppError>(admin.id * 10) }).await;
    assert!(matches!(result, Ok(10)));

    let failed = admin_only(&identity, |_admin| async {
        Err::<(), _>(AppError::NotFound("post"))
    })
    .await;
    assert!(matches!(failed, Err(AppError::NotFound("post"))));
}

// --- Identity extractor ---

#[tokio::test]
async fn extractor_resolves_once_per_request() {
    let repo = MockRepo::new();
    repo.seed_user("a@blog.test", "Ada", "pw");
    let state = app_state(repo.clone());

    let request = Request::builder()
        .header(header::COOKIE, session_cookie_for(1))
        .body(())
        .unwrap();
    let (mut parts, _) = request.into_parts();

    let first = Identity::from_request_parts(&mut parts, &state).await.unwrap();
    let second = Identity::from_request_parts(&mut parts, &state).await.unwrap();

    assert!(first.is_admin());
    assert_eq!(first, second);
    assert_eq!(repo.id_lookups.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn extractor_accepts_bearer_tokens() {
    let repo = MockRepo::new();
    repo.seed_user("a@blog.test", "Ada", "pw");
    repo.seed_user("b@blog.test", "Bob", "pw");
    let state = app_state(repo);

    let request = Request::builder()
        .header(header::AUTHORIZATION, format!("Bearer {}", token_for(2)))
        .body(())
        .unwrap();
    let (mut parts, _) = request.into_parts();

    let identity = Identity::from_request_parts(&mut parts, &state).await.unwrap();

    assert!(identity.is_authenticated());
    assert!(!identity.is_admin());
    assert_eq!(identity.user().map(|u| u.name.as_str()), Some("Bob"));
}
