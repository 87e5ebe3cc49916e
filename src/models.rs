use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use validator::{Validate, ValidationError, ValidationErrors};

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// Row of the `users` table. Carries the password digest, so it is never serialized;
/// handlers answer with `UserResponse` instead.
#[derive(Debug, Clone, FromRow, Default)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    // argon2 PHC string.
    pub password_digest: String,
    pub created_at: DateTime<Utc>,
}

/// Recipe
///
/// Row of the `recipes` table and the JSON recipe object.
/// `ingredients` and `directions` are flat strings holding `", "`-separated items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Recipe {
    #[ts(type = "number")]
    pub id: i64,
    pub title: String,
    pub ingredients: String,
    pub directions: String,
    // Minutes.
    pub prep_time: i32,
    pub image_url: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    // FK to users.id (owner). Set at creation, never updated.
    #[ts(type = "number")]
    pub user_id: i64,
}

const LIST_DELIMITER: &str = ", ";

impl Recipe {
    pub fn ingredients_list(&self) -> Vec<String> {
        split_list(&self.ingredients)
    }

    pub fn directions_list(&self) -> Vec<String> {
        split_list(&self.directions)
    }

    /// `Mar  5,  3:07 PM`: abbreviated month, space-padded day and 12-hour clock.
    pub fn friendly_created_at(&self) -> String {
        self.created_at.format("%b %e, %l:%M %p").to_string()
    }

    /// `"<H> hour(s) "` when H > 0, followed by `"<M> minutes"` when M > 0.
    pub fn friendly_prep_time(&self) -> String {
        let hours = self.prep_time / 60;
        let minutes = self.prep_time % 60;
        let mut result = String::new();
        if hours > 0 {
            result.push_str(&format!("{hours} hour(s) "));
        }
        if minutes > 0 {
            result.push_str(&format!("{minutes} minutes"));
        }
        result
    }
}

/// Splits on the literal `", "`. Trailing empty items are dropped, so an empty
/// string yields an empty list; interior empty items are kept.
fn split_list(raw: &str) -> Vec<String> {
    let mut items: Vec<String> = raw.split(LIST_DELIMITER).map(str::to_string).collect();
    while items.last().is_some_and(|item| item.is_empty()) {
        items.pop();
    }
    items
}

// --- Response Payloads (Output Schemas) ---

/// RecipeDetail
///
/// Output of GET /api/recipes/{id}: the recipe object plus its derived views.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RecipeDetail {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub ingredients_list: Vec<String>,
    pub directions_list: Vec<String>,
    pub friendly_created_at: String,
    pub friendly_prep_time: String,
}

impl From<Recipe> for RecipeDetail {
    fn from(recipe: Recipe) -> Self {
        Self {
            ingredients_list: recipe.ingredients_list(),
            directions_list: recipe.directions_list(),
            friendly_created_at: recipe.friendly_created_at(),
            friendly_prep_time: recipe.friendly_prep_time(),
            recipe,
        }
    }
}

/// UserResponse
///
/// Public view of a `User`, without password material.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UserResponse {
    #[ts(type = "number")]
    pub id: i64,
    pub name: String,
    pub email: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            created_at: user.created_at,
        }
    }
}

/// SessionResponse
///
/// Output of POST /api/sessions.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SessionResponse {
    pub jwt: String,
    pub email: String,
    #[ts(type = "number")]
    pub user_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct MessageResponse {
    pub message: String,
}

// --- Request Payloads (Input Schemas) ---

/// PrepTime
///
/// `prep_time` as sent by a client. JSON integers, integral floats (`20.0`) and decimal
/// strings (form-style clients) are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum PrepTime {
    Minutes(i64),
    Fraction(f64),
    Text(String),
    #[default]
    Missing,
}

impl PrepTime {
    /// Resolves the input to a minute count, or the validation error describing why not.
    pub fn minutes(&self) -> Result<i32, ValidationError> {
        let value = match self {
            PrepTime::Missing => return Err(invalid("blank", "can't be blank")),
            // `20.0` casts to 20; saturating `as` leaves huge values to the range check.
            PrepTime::Fraction(value) if value.fract() == 0.0 => *value as i64,
            PrepTime::Fraction(_) => return Err(invalid("not_an_integer", "must be an integer")),
            PrepTime::Minutes(n) => *n,
            PrepTime::Text(text) => {
                let text = text.trim();
                if text.is_empty() {
                    return Err(invalid("blank", "can't be blank"));
                }
                text.parse::<i64>()
                    .map_err(|_| invalid("not_a_number", "is not a number"))?
            }
        };

        if value < 0 {
            return Err(invalid(
                "greater_than_or_equal_to",
                "must be greater than or equal to 0",
            ));
        }
        i32::try_from(value).map_err(|_| invalid("too_large", "is too large"))
    }
}

impl From<i32> for PrepTime {
    fn from(minutes: i32) -> Self {
        PrepTime::Minutes(i64::from(minutes))
    }
}

/// RecipeParams
///
/// Body of POST /api/recipes and PATCH /api/recipes/{id}.
///
/// Each field is `None` when the key is absent and `Some(None)` when it is an explicit
/// `null`. On create both count as blank. On update an absent field is left unchanged,
/// while `null` clears the field and then fails validation.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RecipeParams {
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    #[ts(type = "string | null")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    #[ts(type = "string | null")]
    pub ingredients: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    #[ts(type = "string | null")]
    pub directions: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<i32>)]
    #[ts(type = "number | string | null")]
    pub prep_time: Option<Option<PrepTime>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    #[ts(type = "string | null")]
    pub image_url: Option<Option<String>>,
}

/// Wraps any value that is present in the body, `null` included, in `Some`.
/// Absent keys never reach this function and fall back to `#[serde(default)]`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// RecipeDraft
///
/// The full set of mutable recipe fields, before validation.
/// Built from params on create, or from the stored record plus params on update.
#[derive(Debug, Clone, Validate)]
pub struct RecipeDraft {
    #[validate(custom(function = "not_blank"))]
    pub title: String,
    #[validate(custom(function = "not_blank"))]
    pub ingredients: String,
    #[validate(custom(function = "not_blank"))]
    pub directions: String,
    #[validate(custom(function = "valid_prep_time"))]
    pub prep_time: PrepTime,
    #[validate(custom(function = "not_blank"))]
    pub image_url: String,
}

/// RecipeAttributes
///
/// Validated mutable fields, ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeAttributes {
    pub title: String,
    pub ingredients: String,
    pub directions: String,
    pub prep_time: i32,
    pub image_url: String,
}

impl RecipeDraft {
    pub fn new(params: RecipeParams) -> Self {
        Self {
            title: params.title.flatten().unwrap_or_default(),
            ingredients: params.ingredients.flatten().unwrap_or_default(),
            directions: params.directions.flatten().unwrap_or_default(),
            prep_time: params.prep_time.flatten().unwrap_or_default(),
            image_url: params.image_url.flatten().unwrap_or_default(),
        }
    }

    pub fn from_recipe(recipe: &Recipe) -> Self {
        Self {
            title: recipe.title.clone(),
            ingredients: recipe.ingredients.clone(),
            directions: recipe.directions.clone(),
            prep_time: PrepTime::from(recipe.prep_time),
            image_url: recipe.image_url.clone(),
        }
    }

    /// Overwrites every field present in `params`. An explicit `null` becomes blank.
    pub fn apply(mut self, params: RecipeParams) -> Self {
        if let Some(title) = params.title {
            self.title = title.unwrap_or_default();
        }
        if let Some(ingredients) = params.ingredients {
            self.ingredients = ingredients.unwrap_or_default();
        }
        if let Some(directions) = params.directions {
            self.directions = directions.unwrap_or_default();
        }
        if let Some(prep_time) = params.prep_time {
            self.prep_time = prep_time.unwrap_or_default();
        }
        if let Some(image_url) = params.image_url {
            self.image_url = image_url.unwrap_or_default();
        }
        self
    }

    pub fn validated(self) -> Result<RecipeAttributes, ValidationErrors> {
        self.validate()?;
        let prep_time = self.prep_time.minutes().map_err(|e| {
            let mut errors = ValidationErrors::new();
            errors.add("prep_time", e);
            errors
        })?;

        Ok(RecipeAttributes {
            title: self.title,
            ingredients: self.ingredients,
            directions: self.directions,
            prep_time,
            image_url: self.image_url,
        })
    }
}

/// CreateUserRequest
///
/// Body of POST /api/users.
#[derive(Debug, Clone, Deserialize, Validate, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateUserRequest {
    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    pub name: String,
    #[serde(default)]
    #[validate(email(message = "is invalid"))]
    pub email: String,
    #[serde(default)]
    #[validate(
        custom(function = "not_blank"),
        length(max = 72, message = "is too long (maximum is 72 characters)")
    )]
    pub password: String,
    #[serde(default)]
    #[validate(must_match(other = "password", message = "doesn't match Password"))]
    pub password_confirmation: String,
}

/// LoginRequest
///
/// Body of POST /api/sessions.
#[derive(Debug, Clone, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

// --- Validation helpers ---

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(invalid("blank", "can't be blank"));
    }
    Ok(())
}

fn valid_prep_time(value: &PrepTime) -> Result<(), ValidationError> {
    value.minutes().map(|_| ())
}
