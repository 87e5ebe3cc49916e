use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints that need no token. Mounted under `/api`.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /api/recipes
        // Every recipe, in storage order. The result does not depend on the caller.
        .route("/recipes", get(handlers::list_recipes))
        // GET /api/recipes/{id}
        // One recipe plus its derived views. 404 for unknown ids.
        .route("/recipes/{id}", get(handlers::get_recipe))
        // POST /api/users
        // Sign up.
        .route("/users", post(handlers::create_user))
        // POST /api/sessions
        // Log in and receive a JWT for the authenticated routes.
        .route("/sessions", post(handlers::create_session))
}
