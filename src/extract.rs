use axum::{
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// JsonBody
///
/// `axum::Json` for request bodies, rejecting with `ApiError` so a malformed or
/// wrongly typed body gets the same `{"errors": [...]}` body as every other failure.
/// Responses keep using `axum::Json`.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    // Same bounds `axum::Json` itself needs.
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let axum::Json(value) = axum::Json::<T>::from_request(req, state).await?;
        Ok(JsonBody(value))
    }
}

/// RecipeId
///
/// The `{id}` segment of `/api/recipes/{id}`. An id that does not parse as an integer
/// cannot name a stored recipe, so it is answered with the same 404 as an unknown id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecipeId(pub i64);

impl<S> FromRequestParts<S> for RecipeId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<i64>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| {
                tracing::debug!(%rejection, "unparseable recipe id");
                ApiError::NotFound("Recipe")
            })?;
        Ok(RecipeId(id))
    }
}
