use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;
use validator::ValidationErrors;

/// ErrorResponse
///
/// Body returned with every 4xx/5xx produced by this service.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ErrorResponse {
    pub errors: Vec<String>,
}

/// Errors raised by a `Repository` implementation.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("email has already been taken")]
    DuplicateEmail,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Startup configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// ApiError
///
/// Every failure a handler or extractor can surface to the caller.
/// The `IntoResponse` impl is the single place statuses are chosen.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("validation failed: {}", .0.join(", "))]
    Validation(Vec<String>),

    #[error("{0} not found")]
    NotFound(&'static str),

    // Request body rejected before any handler logic ran (bad JSON, wrong content type).
    #[error("{message}")]
    Malformed { status: StatusCode, message: String },

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Malformed { status, .. } => *status,
            ApiError::Repository(RepositoryError::DuplicateEmail) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::Repository(RepositoryError::Database(_)) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<ValidationErrors> for ApiError {
    /// Flattens field errors into full messages ("Title can't be blank"), sorted by field.
    fn from(errors: ValidationErrors) -> Self {
        let mut fields: Vec<(String, String)> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, field_errors)| {
                let field = field.to_string();
                field_errors.iter().map(move |e| {
                    let message = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "is invalid".to_string());
                    (field.clone(), message)
                })
            })
            .collect();
        fields.sort();

        ApiError::Validation(
            fields
                .into_iter()
                .map(|(field, message)| format!("{} {}", humanize(&field), message))
                .collect(),
        )
    }
}

impl From<JsonRejection> for ApiError {
    /// A body that parses but does not fit the payload type (e.g. a number where a string
    /// belongs) is a 422 validation failure. Anything else keeps axum's status.
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(e) => ApiError::Validation(vec![e.body_text()]),
            JsonRejection::JsonSyntaxError(e) => ApiError::Malformed {
                status: e.status(),
                message: "Request body is not valid JSON".to_string(),
            },
            JsonRejection::MissingJsonContentType(e) => ApiError::Malformed {
                status: e.status(),
                message: "Expected request with `Content-Type: application/json`".to_string(),
            },
            other => ApiError::Malformed {
                status: other.status(),
                message: other.body_text(),
            },
        }
    }
}

/// `prep_time` -> `Prep time`
fn humanize(field: &str) -> String {
    let spaced = field.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let display = self.to_string();
        let errors = match self {
            ApiError::Validation(messages) => messages,
            ApiError::Repository(RepositoryError::DuplicateEmail) => {
                vec!["Email has already been taken".to_string()]
            }
            ApiError::Unauthorized(_) | ApiError::NotFound(_) => vec![display],
            ApiError::Malformed { message, .. } => vec![message],
            ApiError::Repository(RepositoryError::Database(e)) => {
                tracing::error!(error = ?e, "database error");
                vec!["Internal server error".to_string()]
            }
            ApiError::Internal(reason) => {
                tracing::error!(%reason, "internal error");
                vec!["Internal server error".to_string()]
            }
        };

        (status, Json(ErrorResponse { errors })).into_response()
    }
}
