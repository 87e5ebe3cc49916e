use crate::{
    AppState,
    auth::{self, AuthUser},
    error::{ApiError, ErrorResponse},
    extract::{JsonBody, RecipeId},
    models::{
        CreateUserRequest, LoginRequest, MessageResponse, Recipe, RecipeDetail, RecipeDraft,
        RecipeParams, SessionResponse, UserResponse,
    },
    repository::NewUser,
};
use axum::{Json, extract::State, http::StatusCode};
use validator::Validate;

// --- Recipe Handlers ---

/// list_recipes
///
/// [Public Route] All recipes in storage order.
#[utoipa::path(
    get,
    path = "/api/recipes",
    tag = "recipes",
    responses((status = 200, description = "All recipes", body = [Recipe]))
)]
pub async fn list_recipes(State(state): State<AppState>) -> Result<Json<Vec<Recipe>>, ApiError> {
    let recipes = state.repo.list_recipes().await?;
    Ok(Json(recipes))
}

/// get_recipe
///
/// [Public Route] One recipe with its derived views (list forms, friendly timestamp and duration).
#[utoipa::path(
    get,
    path = "/api/recipes/{id}",
    tag = "recipes",
    params(("id" = i64, Path, description = "Recipe ID")),
    responses(
        (status = 200, description = "Found", body = RecipeDetail),
        (status = 404, description = "Not Found", body = ErrorResponse)
    )
)]
pub async fn get_recipe(
    State(state): State<AppState>,
    RecipeId(id): RecipeId,
) -> Result<Json<RecipeDetail>, ApiError> {
    let recipe = state
        .repo
        .get_recipe(id)
        .await?
        .ok_or(ApiError::NotFound("Recipe"))?;
    Ok(Json(RecipeDetail::from(recipe)))
}

/// create_recipe
///
/// [Authenticated Route] The owner is always the token's user; any `user_id` in the body is ignored.
#[utoipa::path(
    post,
    path = "/api/recipes",
    tag = "recipes",
    request_body = RecipeParams,
    responses(
        (status = 200, description = "Created", body = Recipe),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 422, description = "Invalid fields", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_recipe(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    JsonBody(params): JsonBody<RecipeParams>,
) -> Result<Json<Recipe>, ApiError> {
    let attrs = RecipeDraft::new(params).validated().inspect_err(|errors| {
        tracing::debug!(user_id, ?errors, "rejected recipe create");
    })?;

    let recipe = state.repo.create_recipe(user_id, attrs).await?;
    tracing::info!(recipe_id = recipe.id, user_id, "recipe created");
    Ok(Json(recipe))
}

/// update_recipe
///
/// [Authenticated Route] Partial update. The change set is merged onto the stored record and
/// the merged record is validated before anything is written.
///
/// Any authenticated user may update any recipe; non-owner edits are logged.
#[utoipa::path(
    patch,
    path = "/api/recipes/{id}",
    tag = "recipes",
    params(("id" = i64, Path, description = "Recipe ID")),
    request_body = RecipeParams,
    responses(
        (status = 200, description = "Updated", body = Recipe),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "Not Found", body = ErrorResponse),
        (status = 422, description = "Invalid fields", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_recipe(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    RecipeId(id): RecipeId,
    JsonBody(params): JsonBody<RecipeParams>,
) -> Result<Json<Recipe>, ApiError> {
    let current = state
        .repo
        .get_recipe(id)
        .await?
        .ok_or(ApiError::NotFound("Recipe"))?;
    log_foreign_mutation(&current, user_id, "update");

    let attrs = RecipeDraft::from_recipe(&current)
        .apply(params)
        .validated()
        .inspect_err(|errors| {
            tracing::debug!(recipe_id = id, user_id, ?errors, "rejected recipe update");
        })?;

    // The row may have been deleted between the read and the write.
    let recipe = state
        .repo
        .update_recipe(id, attrs)
        .await?
        .ok_or(ApiError::NotFound("Recipe"))?;
    Ok(Json(recipe))
}

/// delete_recipe
///
/// [Authenticated Route] Removes the recipe. Any authenticated user may delete any recipe.
#[utoipa::path(
    delete,
    path = "/api/recipes/{id}",
    tag = "recipes",
    params(("id" = i64, Path, description = "Recipe ID")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "Not Found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_recipe(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    RecipeId(id): RecipeId,
) -> Result<Json<MessageResponse>, ApiError> {
    if let Some(current) = state.repo.get_recipe(id).await? {
        log_foreign_mutation(&current, user_id, "delete");
    }

    if !state.repo.delete_recipe(id).await? {
        return Err(ApiError::NotFound("Recipe"));
    }
    tracing::info!(recipe_id = id, user_id, "recipe deleted");
    Ok(Json(MessageResponse {
        message: "Recipe destroyed successfully".to_string(),
    }))
}

fn log_foreign_mutation(recipe: &Recipe, actor_id: i64, action: &str) {
    if recipe.user_id != actor_id {
        tracing::info!(
            recipe_id = recipe.id,
            owner_id = recipe.user_id,
            actor_id,
            action,
            "recipe mutated by a user who does not own it"
        );
    }
}

// --- Account Handlers ---

/// create_user
///
/// [Public Route] Sign up. The password is hashed with Argon2 on the blocking pool.
#[utoipa::path(
    post,
    path = "/api/users",
    tag = "users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Created", body = UserResponse),
        (status = 422, description = "Invalid fields or email taken", body = ErrorResponse)
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    payload.validate()?;

    let CreateUserRequest {
        name,
        email,
        password,
        ..
    } = payload;
    let password_digest = tokio::task::spawn_blocking(move || auth::hash_password(&password))
        .await
        .map_err(|e| ApiError::Internal(format!("hashing task failed: {e}")))??;

    let user = state
        .repo
        .create_user(NewUser {
            name,
            email,
            password_digest,
        })
        .await?;
    tracing::info!(user_id = user.id, "user created");
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// create_session
///
/// [Public Route] Log in. Unknown email and wrong password get the same 401.
#[utoipa::path(
    post,
    path = "/api/sessions",
    tag = "users",
    request_body = LoginRequest,
    responses(
        (status = 201, description = "Logged in", body = SessionResponse),
        (status = 401, description = "Bad credentials", body = ErrorResponse)
    )
)]
pub async fn create_session(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let user = state
        .repo
        .find_user_by_email(&payload.email)
        .await?
        .ok_or(ApiError::Unauthorized("Invalid email or password"))?;

    let digest = user.password_digest.clone();
    let password = payload.password;
    let verified = tokio::task::spawn_blocking(move || auth::verify_password(&password, &digest))
        .await
        .map_err(|e| ApiError::Internal(format!("verification task failed: {e}")))?;
    if !verified {
        tracing::debug!(user_id = user.id, "login rejected");
        return Err(ApiError::Unauthorized("Invalid email or password"));
    }

    let jwt = auth::issue_token(user.id, &state.config)?;
    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            jwt,
            email: user.email,
            user_id: user.id,
        }),
    ))
}
