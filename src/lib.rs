use axum::{
    Json, Router,
    extract::FromRef,
    http::HeaderName,
    middleware,
    routing::get,
};
use std::sync::Arc;
use utoipa::OpenApi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod flash;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod sanitizer;

// Routers split by access level (public, logged-in, admin).
pub mod routes;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use repository::{PostgresRepository, RepositoryState};
pub use sanitizer::{SafeText, SanitizationPolicy, Sanitizer};

/// ApiDoc
///
/// OpenAPI description of the JSON and form endpoints, built from the `#[utoipa::path]`
/// annotations in `handlers` and served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::list_posts, handlers::show_post, handlers::me, handlers::login_page,
        handlers::register, handlers::login, handlers::logout, handlers::add_comment,
        handlers::create_post, handlers::edit_post, handlers::delete_post
    ),
    components(
        schemas(
            models::BlogPost, models::Comment, models::PostView, models::CommentView,
            models::PostDetail, models::SessionView, models::FlashNotice, models::LoginPage,
            models::PostForm, models::RegisterForm, models::LoginForm, models::CommentForm,
        )
    ),
    tags(
        (name = "blog", description = "Blog backend API")
    )
)]
pub struct ApiDoc;

/// SanitizerState
///
/// The sanitizer is configured once at startup and shared read-only by every request.
pub type SanitizerState = Arc<Sanitizer>;

/// AppState
///
/// Everything a request may need, cloned cheaply into each handler.
#[derive(Clone)]
pub struct AppState {
    /// Persistence layer (Postgres in production, in-memory in tests).
    pub repo: RepositoryState,
    /// Input sanitizer applied to every stored text field.
    pub sanitizer: SanitizerState,
    /// The loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for SanitizerState {
    fn from_ref(app_state: &AppState) -> SanitizerState {
        app_state.sanitizer.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// create_router
///
/// Assembles the routers, applies the access layers and the observability stack, and binds
/// the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        .route("/api-docs/openapi.json", get(openapi_json))
        // Public Routes: No middleware applied.
        .merge(public::public_routes())
        // Authenticated Routes: anonymous callers are redirected to the login page.
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth::login_required,
            )),
        )
        // Admin Routes: everyone except the admin gets a 403 before the handler runs.
        // The handlers check again through `auth::admin_only`.
        .merge(
            admin::admin_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth::admin_guard,
            )),
        )
        .with_state(state);

    // 3. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID Generation: a UUID per incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request Tracing: one span per request, tagged with the request ID.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID Propagation: echo x-request-id back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer
        .layer(cors)
}

/// trace_span_logger
///
/// Span factory for `TraceLayer`: method, URI and the `x-request-id` header, so every log
/// line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
