use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
    routing::get,
};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod models;
pub mod repository;

// Routers split by access level (public, authenticated).
pub mod routes;
use auth::AuthUser;
use routes::{authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::ApiError;
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};

/// ApiDoc
///
/// OpenAPI document assembled from the `#[utoipa::path]` handlers and `ToSchema` models.
/// Served at `/api-docs/openapi.json`, browsable at `/swagger-ui`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::list_recipes, handlers::get_recipe, handlers::create_recipe,
        handlers::update_recipe, handlers::delete_recipe, handlers::create_user,
        handlers::create_session
    ),
    components(
        schemas(
            models::Recipe, models::RecipeDetail, models::RecipeParams, models::UserResponse,
            models::CreateUserRequest, models::LoginRequest, models::SessionResponse,
            models::MessageResponse, error::ErrorResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "recipes", description = "Recipe resource"),
        (name = "users", description = "Sign up and log in")
    )
)]
struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

/// AppState
///
/// Everything a handler needs, cloned into each request.
#[derive(Clone)]
pub struct AppState {
    // Persistence handle (Postgres in production, in-memory in tests).
    pub repo: RepositoryState,
    // Immutable configuration; the auth extractor reads the JWT secret from here.
    pub config: AppConfig,
}

impl AppState {
    pub fn new(repo: RepositoryState, config: AppConfig) -> Self {
        Self { repo, config }
    }
}

// --- Axum FromRef Extractor Implementations ---

// Lets the `AuthUser` extractor pull only what it needs out of the state.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Guards the authenticated routes. Extracting `AuthUser` rejects the request with 401
/// before the handler (and its body extractor) runs. The resolved identity is stored in
/// the request extensions, where the handler's own `AuthUser` extractor picks it up
/// without a second lookup.
async fn auth_middleware(auth_user: AuthUser, mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(auth_user);
    next.run(request).await
}

/// create_router
///
/// Assembles routes, middleware and state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS
    // Permissive: any origin may call the API.
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. API Routes
    // The auth middleware is a `route_layer`, so it only runs for matched authenticated
    // routes and unknown paths still 404.
    let api = public::public_routes().merge(
        authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        )),
    );

    // 3. Documentation, health and the `/api` tree.
    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        .nest("/api", api)
        .with_state(state);

    // 4. Middleware
    // Request id is set first so the trace span and the response both carry it.
    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// One span per request, tagged with method, URI and `x-request-id`.
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
