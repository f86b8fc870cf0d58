/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /api/auth/register/` - Register new user
/// - `POST /api/auth/login/` - Login and get an access/refresh pair
/// - `POST /api/auth/logout/` - Blacklist a refresh token (bearer required)
/// - `POST /api/auth/token/refresh/` - Exchange a refresh token for an access token

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
    extract::ApiJson,
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use projectdesk_shared::{
    auth::{jwt, middleware::AuthContext, password},
    models::{
        token_blacklist::TokenBlacklist,
        user::{CreateUser, User, UserRole},
    },
};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Letters, digits and `@ . + - _`
fn validate_username(username: &str) -> Result<(), ValidationError> {
    let valid = username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'));

    if valid {
        Ok(())
    } else {
        let mut error = ValidationError::new("username_chars");
        error.message = Some(
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters."
                .into(),
        );
        Err(error)
    }
}

fn validate_password(value: &str) -> Result<(), ValidationError> {
    password::validate_password_length(value).map_err(|message| {
        let mut error = ValidationError::new("password_too_short");
        error.message = Some(message.into());
        error
    })
}

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(
        length(min = 1, max = 150, message = "Username must be between 1 and 150 characters"),
        custom(function = "validate_username")
    )]
    pub username: String,

    #[serde(default)]
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,

    #[serde(default)]
    #[validate(custom(function = "validate_password"))]
    pub password: String,
}

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,
}

/// Body of logout and token refresh
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh: Option<String>,
}

/// Refresh response
#[derive(Debug, Serialize, Deserialize)]
pub struct AccessTokenResponse {
    pub access: String,
}

/// Register a new user
///
/// ```text
/// POST /api/auth/register/
///
/// { "username": "newuser", "email": "new@example.com", "password": "newpassword" }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: invalid fields, or username/email already taken
///   (every offending field is reported)
pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    req.validate()?;

    let mut taken = Vec::new();
    if User::username_exists(&state.db, &req.username).await? {
        taken.push(ValidationErrorDetail::new(
            "username",
            "A user with that username already exists.",
        ));
    }
    if User::email_exists(&state.db, &req.email).await? {
        taken.push(ValidationErrorDetail::new(
            "email",
            "A user with that email already exists.",
        ));
    }
    if !taken.is_empty() {
        return Err(ApiError::ValidationError(taken));
    }

    let password_hash = password::hash_password(&req.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            username: req.username,
            email: req.email,
            password_hash,
            role: UserRole::default(),
            is_superuser: false,
        },
    )
    .await?;

    tracing::info!(user_id = user.id, username = %user.username, "User registered");

    Ok((StatusCode::CREATED, Json(user)))
}

/// Login with username and password
///
/// ```text
/// POST /api/auth/login/
///
/// { "username": "testuser", "password": "testpassword" }
/// ```
///
/// Responds with `{"access": "...", "refresh": "..."}`.
///
/// # Errors
///
/// - `401 Unauthorized`: `{"error": "Invalid credentials"}` for an unknown
///   user, a wrong password or an inactive account
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<jwt::TokenPair>> {
    let invalid = || ApiError::Unauthorized("Invalid credentials".to_string());

    let user = User::find_by_username(&state.db, &req.username)
        .await?
        .ok_or_else(invalid)?;

    if !password::verify_password(&req.password, &user.password_hash)? || !user.is_active {
        tracing::debug!(user_id = user.id, "Login rejected");
        return Err(invalid());
    }

    User::update_last_login(&state.db, user.id).await?;

    let jwt_config = &state.config.jwt;
    let tokens = jwt::issue_token_pair(
        user.id,
        state.jwt_secret(),
        jwt_config.access_ttl(),
        jwt_config.refresh_ttl(),
    )?;

    tracing::info!(user_id = user.id, "User logged in");

    Ok(Json(tokens))
}

/// Logout: blacklists the given refresh token
///
/// ```text
/// POST /api/auth/logout/
/// Authorization: Bearer <access>
///
/// { "refresh": "<refresh>" }
/// ```
///
/// Responds `205 Reset Content` with an empty body.
///
/// # Errors
///
/// - `400 Bad Request`: refresh token missing, invalid, already blacklisted,
///   or issued to another user
/// - `401 Unauthorized`: missing or invalid bearer token (middleware)
pub async fn logout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(req): ApiJson<RefreshRequest>,
) -> ApiResult<StatusCode> {
    let token = req
        .refresh
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Refresh token required".to_string()))?;

    let invalid = || ApiError::BadRequest("Token is invalid or expired".to_string());

    let claims = jwt::validate_refresh_token(&token, state.jwt_secret()).map_err(|_| invalid())?;

    if claims.sub != auth.user_id {
        return Err(invalid());
    }

    let newly_blacklisted =
        TokenBlacklist::blacklist(&state.db, claims.jti, claims.sub, claims.expires_at()).await?;

    if !newly_blacklisted {
        return Err(ApiError::BadRequest("Token is blacklisted".to_string()));
    }

    tracing::info!(user_id = auth.user_id, jti = %claims.jti, "Refresh token blacklisted");

    Ok(StatusCode::RESET_CONTENT)
}

/// Exchange a refresh token for a new access token
///
/// ```text
/// POST /api/auth/token/refresh/
///
/// { "refresh": "<refresh>" }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: token invalid, expired, blacklisted, not a refresh
///   token, or its user no longer exists or is inactive
pub async fn refresh(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RefreshRequest>,
) -> ApiResult<Json<AccessTokenResponse>> {
    let token = req
        .refresh
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Refresh token required".to_string()))?;

    let claims = jwt::validate_refresh_token(&token, state.jwt_secret())?;

    if TokenBlacklist::is_blacklisted(&state.db, claims.jti).await? {
        return Err(ApiError::Unauthorized("Token is blacklisted".to_string()));
    }

    let active = User::find_by_id(&state.db, claims.sub)
        .await?
        .is_some_and(|user| user.is_active);
    if !active {
        return Err(ApiError::Unauthorized("User not found or inactive".to_string()));
    }

    let access = jwt::create_token(
        &jwt::Claims::with_expiration(
            claims.sub,
            jwt::TokenType::Access,
            state.config.jwt.access_ttl(),
        ),
        state.jwt_secret(),
    )?;

    Ok(Json(AccessTokenResponse { access }))
}
