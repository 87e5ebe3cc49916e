use async_trait::async_trait;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use recipe_api::{
    AppState, ApiError,
    auth::{self, AuthUser},
    config::AppConfig,
    error::RepositoryError,
    extract::{JsonBody, RecipeId},
    handlers,
    models::{
        CreateUserRequest, LoginRequest, PrepTime, Recipe, RecipeAttributes, RecipeParams, User,
    },
    repository::{NewUser, RepoResult, Repository},
};
use std::sync::{Arc, Mutex};
use tokio::test;

// --- MOCK REPOSITORY IMPLEMENTATION ---

// Canned outputs plus a record of what the handlers passed in.
#[derive(Default)]
pub struct MockRepoControl {
    pub recipes_to_return: Vec<Recipe>,
    pub get_recipe_result: Option<Recipe>,
    pub delete_result: bool,
    pub user_by_email: Option<User>,
    pub email_taken: bool,

    pub created: Mutex<Option<(i64, RecipeAttributes)>>,
    pub updated: Mutex<Option<(i64, RecipeAttributes)>>,
    pub deleted: Mutex<Option<i64>>,
    pub new_user: Mutex<Option<NewUser>>,
}

#[async_trait]
impl Repository for MockRepoControl {
    async fn list_recipes(&self) -> RepoResult<Vec<Recipe>> {
        Ok(self.recipes_to_return.clone())
    }
    async fn get_recipe(&self, _id: i64) -> RepoResult<Option<Recipe>> {
        Ok(self.get_recipe_result.clone())
    }
    async fn create_recipe(&self, user_id: i64, attrs: RecipeAttributes) -> RepoResult<Recipe> {
        *self.created.lock().unwrap() = Some((user_id, attrs.clone()));
        Ok(recipe_from(77, user_id, attrs))
    }
    async fn update_recipe(&self, id: i64, attrs: RecipeAttributes) -> RepoResult<Option<Recipe>> {
        *self.updated.lock().unwrap() = Some((id, attrs.clone()));
        Ok(self
            .get_recipe_result
            .as_ref()
            .map(|current| recipe_from(id, current.user_id, attrs)))
    }
    async fn delete_recipe(&self, id: i64) -> RepoResult<bool> {
        *self.deleted.lock().unwrap() = Some(id);
        Ok(self.delete_result)
    }
    async fn get_user(&self, _id: i64) -> RepoResult<Option<User>> {
        Ok(None)
    }
    async fn find_user_by_email(&self, _email: &str) -> RepoResult<Option<User>> {
        Ok(self.user_by_email.clone())
    }
    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        if self.email_taken {
            return Err(RepositoryError::DuplicateEmail);
        }
        *self.new_user.lock().unwrap() = Some(user.clone());
        Ok(User {
            id: 5,
            name: user.name,
            email: user.email,
            password_digest: user.password_digest,
            ..User::default()
        })
    }
}

// --- HELPERS ---

fn recipe_from(id: i64, user_id: i64, attrs: RecipeAttributes) -> Recipe {
    Recipe {
        id,
        title: attrs.title,
        ingredients: attrs.ingredients,
        directions: attrs.directions,
        prep_time: attrs.prep_time,
        image_url: attrs.image_url,
        user_id,
        ..Recipe::default()
    }
}

fn stored_recipe() -> Recipe {
    Recipe {
        id: 1,
        title: "Pancakes".to_string(),
        ingredients: "flour, milk, eggs".to_string(),
        directions: "whisk, fry".to_string(),
        prep_time: 75,
        image_url: "pancakes.jpg".to_string(),
        user_id: 10,
        ..Recipe::default()
    }
}

fn setup_state(mock: MockRepoControl) -> (AppState, Arc<MockRepoControl>) {
    let repo = Arc::new(mock);
    let state = AppState::new(repo.clone(), AppConfig::default());
    (state, repo)
}

fn caller(id: i64) -> AuthUser {
    AuthUser {
        id,
        email: "cheddar@gmail.com".to_string(),
    }
}

fn full_params() -> RecipeParams {
    RecipeParams {
        title: Some(Some("Soup".to_string())),
        ingredients: Some(Some("water, salt".to_string())),
        directions: Some(Some("boil, season".to_string())),
        prep_time: Some(Some(PrepTime::Minutes(20))),
        image_url: Some(Some("soup.jpg".to_string())),
    }
}

// --- RECIPE HANDLERS ---

#[test]
async fn test_list_recipes_returns_repo_contents() {
    let (state, _) = setup_state(MockRepoControl {
        recipes_to_return: vec![stored_recipe()],
        ..Default::default()
    });

    let Json(recipes) = handlers::list_recipes(State(state)).await.unwrap();

    assert_eq!(recipes, vec![stored_recipe()]);
}

#[test]
async fn test_get_recipe_includes_derived_views() {
    let (state, _) = setup_state(MockRepoControl {
        get_recipe_result: Some(stored_recipe()),
        ..Default::default()
    });

    let Json(detail) = handlers::get_recipe(State(state), RecipeId(1)).await.unwrap();

    assert_eq!(detail.recipe, stored_recipe());
    assert_eq!(detail.ingredients_list, vec!["flour", "milk", "eggs"]);
    assert_eq!(detail.directions_list, vec!["whisk", "fry"]);
    assert_eq!(detail.friendly_prep_time, "1 hour(s) 15 minutes");
}

#[test]
async fn test_get_recipe_not_found() {
    let (state, _) = setup_state(MockRepoControl::default());

    let err = handlers::get_recipe(State(state), RecipeId(9)).await.unwrap_err();

    assert!(matches!(err, ApiError::NotFound("Recipe")));
    assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
}

#[test]
async fn test_create_recipe_assigns_caller_as_owner() {
    let (state, repo) = setup_state(MockRepoControl::default());

    let Json(recipe) =
        handlers::create_recipe(caller(3), State(state), JsonBody(full_params()))
            .await
            .unwrap();

    assert_eq!(recipe.user_id, 3);
    let (owner, attrs) = repo.created.lock().unwrap().clone().unwrap();
    assert_eq!(owner, 3);
    assert_eq!(attrs.title, "Soup");
    assert_eq!(attrs.prep_time, 20);
}

#[test]
async fn test_create_recipe_validation_never_reaches_repo() {
    let (state, repo) = setup_state(MockRepoControl::default());
    let params = RecipeParams {
        title: Some(Some("  ".to_string())),
        ..full_params()
    };

    let err = handlers::create_recipe(caller(3), State(state), JsonBody(params))
        .await
        .unwrap_err();

    match err {
        ApiError::Validation(messages) => assert_eq!(messages, vec!["Title can't be blank"]),
        other => panic!("expected validation error, got {other:?}"),
    }
    assert!(repo.created.lock().unwrap().is_none());
}

#[test]
async fn test_update_recipe_merges_onto_stored_record() {
    let (state, repo) = setup_state(MockRepoControl {
        get_recipe_result: Some(stored_recipe()),
        ..Default::default()
    });
    let params = RecipeParams {
        prep_time: Some(Some(PrepTime::Text("30".to_string()))),
        ..RecipeParams::default()
    };

    let Json(recipe) =
        handlers::update_recipe(caller(10), State(state), RecipeId(1), JsonBody(params))
            .await
            .unwrap();

    assert_eq!(recipe.prep_time, 30);
    assert_eq!(recipe.title, "Pancakes");
    let (id, attrs) = repo.updated.lock().unwrap().clone().unwrap();
    assert_eq!(id, 1);
    assert_eq!(attrs.ingredients, "flour, milk, eggs");
}

#[test]
async fn test_update_recipe_not_found_skips_write() {
    let (state, repo) = setup_state(MockRepoControl::default());

    let err = handlers::update_recipe(
        caller(10),
        State(state),
        RecipeId(1),
        JsonBody(full_params()),
    )
    .await
    .unwrap_err();

    assert_eq!(err.status(), StatusCode::NOT_FOUND);
    assert!(repo.updated.lock().unwrap().is_none());
}

#[test]
async fn test_update_recipe_invalid_merge_skips_write() {
    let (state, repo) = setup_state(MockRepoControl {
        get_recipe_result: Some(stored_recipe()),
        ..Default::default()
    });
    let params = RecipeParams {
        prep_time: Some(Some(PrepTime::Minutes(-1))),
        ..RecipeParams::default()
    };

    let err =
        handlers::update_recipe(caller(10), State(state), RecipeId(1), JsonBody(params))
            .await
            .unwrap_err();

    assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(repo.updated.lock().unwrap().is_none());
}

#[test]
async fn test_update_recipe_null_title_skips_write() {
    let (state, repo) = setup_state(MockRepoControl {
        get_recipe_result: Some(stored_recipe()),
        ..Default::default()
    });
    let params = RecipeParams {
        title: Some(None),
        ..RecipeParams::default()
    };

    let err =
        handlers::update_recipe(caller(10), State(state), RecipeId(1), JsonBody(params))
            .await
            .unwrap_err();

    match err {
        ApiError::Validation(messages) => assert_eq!(messages, vec!["Title can't be blank"]),
        other => panic!("expected validation error, got {other:?}"),
    }
    assert!(repo.updated.lock().unwrap().is_none());
}

#[test]
async fn test_delete_recipe_success() {
    let (state, repo) = setup_state(MockRepoControl {
        get_recipe_result: Some(stored_recipe()),
        delete_result: true,
        ..Default::default()
    });

    let Json(body) = handlers::delete_recipe(caller(99), State(state), RecipeId(1))
        .await
        .unwrap();

    assert_eq!(body.message, "Recipe destroyed successfully");
    assert_eq!(*repo.deleted.lock().unwrap(), Some(1));
}

#[test]
async fn test_delete_recipe_missing_is_not_found() {
    let (state, _) = setup_state(MockRepoControl::default());

    let err = handlers::delete_recipe(caller(99), State(state), RecipeId(1))
        .await
        .unwrap_err();

    assert_eq!(err.status(), StatusCode::NOT_FOUND);
}

// --- ACCOUNT HANDLERS ---

fn signup(password: &str, confirmation: &str) -> CreateUserRequest {
    CreateUserRequest {
        name: "Cheddar".to_string(),
        email: "cheddar@gmail.com".to_string(),
        password: password.to_string(),
        password_confirmation: confirmation.to_string(),
    }
}

#[test]
async fn test_create_user_hashes_password() {
    let (state, repo) = setup_state(MockRepoControl::default());

    let (status, Json(user)) =
        handlers::create_user(State(state), JsonBody(signup("password", "password")))
            .await
            .unwrap();

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(user.email, "cheddar@gmail.com");
    let stored = repo.new_user.lock().unwrap().clone().unwrap();
    assert_ne!(stored.password_digest, "password");
    assert!(auth::verify_password("password", &stored.password_digest));
}

#[test]
async fn test_create_user_confirmation_mismatch() {
    let (state, repo) = setup_state(MockRepoControl::default());

    let err = handlers::create_user(State(state), JsonBody(signup("password", "passw0rd")))
        .await
        .unwrap_err();

    match err {
        ApiError::Validation(messages) => {
            assert_eq!(messages, vec!["Password confirmation doesn't match Password"])
        }
        other => panic!("expected validation error, got {other:?}"),
    }
    assert!(repo.new_user.lock().unwrap().is_none());
}

#[test]
async fn test_create_user_duplicate_email() {
    let (state, _) = setup_state(MockRepoControl {
        email_taken: true,
        ..Default::default()
    });

    let err = handlers::create_user(State(state), JsonBody(signup("password", "password")))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ApiError::Repository(RepositoryError::DuplicateEmail)
    ));
    assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[test]
async fn test_create_session_issues_verifiable_token() {
    let user = User {
        id: 8,
        email: "cheddar@gmail.com".to_string(),
        password_digest: auth::hash_password("password").unwrap(),
        ..User::default()
    };
    let (state, _) = setup_state(MockRepoControl {
        user_by_email: Some(user),
        ..Default::default()
    });
    let secret = state.config.jwt_secret.clone();

    let (status, Json(session)) = handlers::create_session(
        State(state),
        JsonBody(LoginRequest {
            email: "cheddar@gmail.com".to_string(),
            password: "password".to_string(),
        }),
    )
    .await
    .unwrap();

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(session.user_id, 8);
    let claims = auth::decode_token(&session.jwt, &secret).unwrap();
    assert_eq!(claims.user_id, 8);
    assert!(claims.exp.is_some());
}

#[test]
async fn test_create_session_bad_credentials() {
    let user = User {
        id: 8,
        email: "cheddar@gmail.com".to_string(),
        password_digest: auth::hash_password("password").unwrap(),
        ..User::default()
    };
    let (state, _) = setup_state(MockRepoControl {
        user_by_email: Some(user),
        ..Default::default()
    });

    let wrong_password = handlers::create_session(
        State(state.clone()),
        JsonBody(LoginRequest {
            email: "cheddar@gmail.com".to_string(),
            password: "guess".to_string(),
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);

    let (empty_state, _) = setup_state(MockRepoControl::default());
    let unknown_email = handlers::create_session(
        State(empty_state),
        JsonBody(LoginRequest {
            email: "nobody@example.com".to_string(),
            password: "password".to_string(),
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(unknown_email.status(), StatusCode::UNAUTHORIZED);
}
