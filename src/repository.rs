use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tokio::sync::RwLock;

use crate::{
    error::RepositoryError,
    models::{Recipe, RecipeAttributes, User},
};

pub type RepoResult<T> = Result<T, RepositoryError>;

/// NewUser
///
/// Insert payload for `users`. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_digest: String,
}

/// Repository Trait
///
/// Persistence contract for users and recipes. Handlers only see `Arc<dyn Repository>`,
/// so the Postgres store and the in-memory store are interchangeable.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Recipes ---
    // All recipes in storage order (ascending id).
    async fn list_recipes(&self) -> RepoResult<Vec<Recipe>>;
    async fn get_recipe(&self, id: i64) -> RepoResult<Option<Recipe>>;
    async fn create_recipe(&self, user_id: i64, attrs: RecipeAttributes) -> RepoResult<Recipe>;
    // Overwrites the mutable fields. `None` if the id does not exist.
    async fn update_recipe(&self, id: i64, attrs: RecipeAttributes) -> RepoResult<Option<Recipe>>;
    // `true` if a row was removed.
    async fn delete_recipe(&self, id: i64) -> RepoResult<bool>;

    // --- Users ---
    async fn get_user(&self, id: i64) -> RepoResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    // Fails with `RepositoryError::DuplicateEmail` if the email is taken.
    async fn create_user(&self, user: NewUser) -> RepoResult<User>;
}

/// RepositoryState
///
/// The shared handle stored in `AppState`.
pub type RepositoryState = Arc<dyn Repository>;

const RECIPE_COLUMNS: &str =
    "id, title, ingredients, directions, prep_time, image_url, created_at, user_id";
const USER_COLUMNS: &str = "id, name, email, password_digest, created_at";

/// PostgresRepository
///
/// `Repository` backed by Postgres. Queries are bound at runtime, so the crate builds
/// without a live database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn list_recipes(&self) -> RepoResult<Vec<Recipe>> {
        let recipes = sqlx::query_as::<_, Recipe>(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes ORDER BY id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(recipes)
    }

    async fn get_recipe(&self, id: i64) -> RepoResult<Option<Recipe>> {
        let recipe =
            sqlx::query_as::<_, Recipe>(&format!("SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(recipe)
    }

    async fn create_recipe(&self, user_id: i64, attrs: RecipeAttributes) -> RepoResult<Recipe> {
        let recipe = sqlx::query_as::<_, Recipe>(&format!(
            r#"
            INSERT INTO recipes (title, ingredients, directions, prep_time, image_url, user_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            RETURNING {RECIPE_COLUMNS}
            "#
        ))
        .bind(attrs.title)
        .bind(attrs.ingredients)
        .bind(attrs.directions)
        .bind(attrs.prep_time)
        .bind(attrs.image_url)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(recipe)
    }

    /// Owner and creation time are never part of the SET list.
    async fn update_recipe(&self, id: i64, attrs: RecipeAttributes) -> RepoResult<Option<Recipe>> {
        let recipe = sqlx::query_as::<_, Recipe>(&format!(
            r#"
            UPDATE recipes
            SET title = $2,
                ingredients = $3,
                directions = $4,
                prep_time = $5,
                image_url = $6
            WHERE id = $1
            RETURNING {RECIPE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(attrs.title)
        .bind(attrs.ingredients)
        .bind(attrs.directions)
        .bind(attrs.prep_time)
        .bind(attrs.image_url)
        .fetch_optional(&self.pool)
        .await?;
        Ok(recipe)
    }

    async fn delete_recipe(&self, id: i64) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM recipes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_user(&self, id: i64) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let user =
            sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
        Ok(user)
    }

    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let result = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (name, email, password_digest, created_at)
            VALUES ($1, $2, $3, NOW())
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.name)
        .bind(user.email)
        .bind(user.password_digest)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(user) => Ok(user),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(RepositoryError::DuplicateEmail)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// InMemoryRepository
///
/// `Repository` kept in process memory. Used by the test-suite and for running the API
/// without Postgres. Ids are assigned sequentially, so iteration order is storage order.
#[derive(Default)]
pub struct InMemoryRepository {
    inner: RwLock<Store>,
}

#[derive(Default)]
struct Store {
    users: BTreeMap<i64, User>,
    recipes: BTreeMap<i64, Recipe>,
    next_user_id: i64,
    next_recipe_id: i64,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn recipe_count(&self) -> usize {
        self.inner.read().await.recipes.len()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn list_recipes(&self) -> RepoResult<Vec<Recipe>> {
        Ok(self.inner.read().await.recipes.values().cloned().collect())
    }

    async fn get_recipe(&self, id: i64) -> RepoResult<Option<Recipe>> {
        Ok(self.inner.read().await.recipes.get(&id).cloned())
    }

    async fn create_recipe(&self, user_id: i64, attrs: RecipeAttributes) -> RepoResult<Recipe> {
        let mut store = self.inner.write().await;
        store.next_recipe_id += 1;
        let recipe = Recipe {
            id: store.next_recipe_id,
            title: attrs.title,
            ingredients: attrs.ingredients,
            directions: attrs.directions,
            prep_time: attrs.prep_time,
            image_url: attrs.image_url,
            created_at: Utc::now(),
            user_id,
        };
        store.recipes.insert(recipe.id, recipe.clone());
        Ok(recipe)
    }

    async fn update_recipe(&self, id: i64, attrs: RecipeAttributes) -> RepoResult<Option<Recipe>> {
        let mut store = self.inner.write().await;
        Ok(store.recipes.get_mut(&id).map(|recipe| {
            recipe.title = attrs.title;
            recipe.ingredients = attrs.ingredients;
            recipe.directions = attrs.directions;
            recipe.prep_time = attrs.prep_time;
            recipe.image_url = attrs.image_url;
            recipe.clone()
        }))
    }

    async fn delete_recipe(&self, id: i64) -> RepoResult<bool> {
        Ok(self.inner.write().await.recipes.remove(&id).is_some())
    }

    async fn get_user(&self, id: i64) -> RepoResult<Option<User>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        Ok(self
            .inner
            .read()
            .await
            .users
            .values()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let mut store = self.inner.write().await;
        if store.users.values().any(|existing| existing.email == user.email) {
            return Err(RepositoryError::DuplicateEmail);
        }
        store.next_user_id += 1;
        let user = User {
            id: store.next_user_id,
            name: user.name,
            email: user.email,
            password_digest: user.password_digest,
            created_at: Utc::now(),
        };
        store.users.insert(user.id, user.clone());
        Ok(user)
    }
}
