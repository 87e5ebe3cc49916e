use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{patch, post},
};

/// Authenticated Router Module
///
/// Recipe mutations. `create_router` wraps this router in the auth middleware, which
/// answers 401 before the body is read when the bearer token is missing or invalid.
///
/// Ownership is not checked here: any authenticated user may update or delete any recipe.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // POST /api/recipes
        // Creates a recipe owned by the token's user.
        .route("/recipes", post(handlers::create_recipe))
        // PATCH/DELETE /api/recipes/{id}
        // Partial update with validation of the merged record, and removal.
        .route(
            "/recipes/{id}",
            patch(handlers::update_recipe).delete(handlers::delete_recipe),
        )
}
