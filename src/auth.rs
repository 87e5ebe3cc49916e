use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    errors::ErrorKind, get_current_timestamp,
};
use serde::{Deserialize, Serialize};

use crate::{config::AppConfig, error::ApiError, repository::RepositoryState};

/// Claims
///
/// JWT payload, signed with the configured HS256 secret and checked on every
/// authenticated request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Id of the calling user (`users.id`). Resolved against the store on every request.
    pub user_id: i64,
    /// Expiration time (seconds since the epoch). Tokens issued by POST /api/sessions
    /// always carry one; tokens minted without it never expire.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
}

/// AuthUser
///
/// Resolved identity of an authenticated request. Handlers take it as an argument to
/// learn who is acting; recipe handlers use `id` as the owner of new recipes.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    /// Primary key of the user, as stored in `users.id`.
    pub id: i64,
    /// Email the user signed up with. Carried for logging and session responses.
    pub email: String,
}

/// Signs `claims` with the configured secret (HS256).
pub fn encode_token(claims: &Claims, secret: &str) -> Result<String, ApiError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("token encoding failed: {e}")))
}

/// Issues a session token for `user_id` that expires after `config.token_ttl_secs`.
pub fn issue_token(user_id: i64, config: &AppConfig) -> Result<String, ApiError> {
    let claims = Claims {
        user_id,
        exp: Some(get_current_timestamp() + config.token_ttl_secs),
    };
    encode_token(&claims, &config.jwt_secret)
}

/// Verifies the signature (HS256 only) and, if present, the expiry.
pub fn decode_token(token: &str, secret: &str) -> Result<Claims, ApiError> {
    // Pinning the algorithm rejects HS384/HS512 and `none` tokens outright.
    let mut validation = Validation::new(Algorithm::HS256);
    // Tokens minted without `exp` are accepted; `validate_exp` still applies when it is present.
    validation.required_spec_claims.clear();
    validation.validate_exp = true;

    // Expiry gets its own message; every other failure (signature, shape, algorithm)
    // is reported as an invalid token.
    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => ApiError::Unauthorized("Token has expired"),
            _ => ApiError::Unauthorized("Invalid token"),
        })
}

/// AuthUser extractor
///
/// 1. Reuses an identity already resolved by the auth middleware for this request.
/// 2. Requires `Authorization: Bearer <token>`.
/// 3. Decodes the token with the secret from `AppConfig`.
/// 4. Resolves `user_id` to a stored user, so tokens of deleted users stop working.
///
/// Rejection: `ApiError::Unauthorized` (401) on any failure.
impl<S> FromRequestParts<S> for AuthUser
where
    // S must allow sending across threads and sharing.
    S: Send + Sync,
    // Allows the extractor to pull the Repository State from the app state.
    RepositoryState: FromRef<S>,
    // Allows the extractor to pull the AppConfig (for the JWT secret).
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // 1. Cached Identity
        // `auth_middleware` has already run this extractor for authenticated routes.
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        // 2. Dependency Resolution
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        // 3. Token Extraction
        // Only the exact `Bearer ` scheme is accepted; an empty token counts as missing.
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthorized("Missing bearer token"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(ApiError::Unauthorized("Missing bearer token"))?;

        // 4. Decode and Validate the Token
        let claims = decode_token(token, &config.jwt_secret)?;

        // 5. Database Lookup
        // A valid token for a user that no longer exists is rejected.
        let user = repo.get_user(claims.user_id).await?.ok_or_else(|| {
            tracing::debug!(user_id = claims.user_id, "token subject no longer exists");
            ApiError::Unauthorized("Invalid token")
        })?;

        Ok(AuthUser {
            id: user.id,
            email: user.email,
        })
    }
}

/// Hashes a password with Argon2id and a random salt. CPU-bound; call from a blocking task.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))
}

/// Checks `password` against a stored PHC string. A malformed digest never verifies.
pub fn verify_password(password: &str, digest: &str) -> bool {
    PasswordHash::new(digest)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}
