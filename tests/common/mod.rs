#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use recipe_api::{
    AppConfig, AppState, InMemoryRepository, create_router,
    auth::{self, Claims},
    models::{RecipeAttributes, User},
    repository::{NewUser, Repository, RepositoryState},
};
use serde_json::Value;
use tower::util::ServiceExt;

pub const TEST_JWT_SECRET: &str = "test-secret-value-1234567890";

/// A router over a seeded in-memory store:
/// one user ("Cheddar") owning three recipes.
pub struct TestApp {
    pub repo: Arc<InMemoryRepository>,
    pub router: Router,
    pub config: AppConfig,
    pub user: User,
}

pub fn test_config() -> AppConfig {
    AppConfig {
        jwt_secret: TEST_JWT_SECRET.to_string(),
        ..AppConfig::default()
    }
}

pub async fn seeded_app() -> TestApp {
    let repo = Arc::new(InMemoryRepository::new());
    let user = create_user(&repo, "Cheddar", "cheddar@gmail.com", "password").await;

    for (n, prep_time) in [(1, 100), (2, 200), (3, 300)] {
        repo.create_recipe(
            user.id,
            RecipeAttributes {
                title: format!("Example Title {n}"),
                ingredients: format!("Example ingredients {n}"),
                directions: format!("Example directions {n}"),
                prep_time,
                image_url: format!("Example image url {n}"),
            },
        )
        .await
        .unwrap();
    }

    let config = test_config();
    let state = AppState::new(repo.clone() as RepositoryState, config.clone());
    TestApp {
        router: create_router(state),
        repo,
        config,
        user,
    }
}

pub async fn create_user(repo: &InMemoryRepository, name: &str, email: &str, password: &str) -> User {
    repo.create_user(NewUser {
        name: name.to_string(),
        email: email.to_string(),
        password_digest: auth::hash_password(password).unwrap(),
    })
    .await
    .unwrap()
}

/// HS256 token carrying only `user_id`, with no expiry.
pub fn token_for(user_id: i64) -> String {
    token_with_secret(user_id, TEST_JWT_SECRET)
}

pub fn token_with_secret(user_id: i64, secret: &str) -> String {
    encode(
        &Header::new(Algorithm::HS256),
        &Claims { user_id, exp: None },
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

pub fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Sends one request and returns the status and the JSON body (`Value::Null` if the body is not JSON).
pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}
