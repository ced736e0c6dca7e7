/// Local registration and login.
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::db::user_repo;
use crate::error::AppError;
use crate::middleware::UserId;
use crate::security::{jwt, password};
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 50))]
    pub username: String,

    #[validate(email)]
    pub email: String,

    #[validate(length(min = 8))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1))]
    pub username: String,

    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub username: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

#[derive(Debug, Serialize)]
pub struct RefreshTokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub message: String,
}

/// POST /api/v1/auth/register
///
/// Creates the account and its blank profile, then sends the client to
/// log in. Duplicate emails are rejected case-insensitively so social
/// sign-on can later link accounts by email without ambiguity.
pub async fn register(
    state: web::Data<AppState>,
    payload: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    payload.validate()?;

    if user_repo::username_exists(&state.db, &payload.username).await? {
        return Err(AppError::Conflict("Username is already taken".to_string()));
    }
    if user_repo::email_exists(&state.db, &payload.email).await? {
        return Err(AppError::Conflict(
            "A user is already registered with this email address".to_string(),
        ));
    }

    let password_hash = password::hash_password(&payload.password)?;
    let user =
        user_repo::create_with_profile(&state.db, &payload.email, &payload.username, &password_hash)
            .await
            .map_err(|e| match &e {
                // A concurrent signup can slip past the existence checks.
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    AppError::Conflict("Username or email is already taken".to_string())
                }
                _ => AppError::Database(e),
            })?;

    tracing::info!(user_id = %user.id, username = %user.username, "registered new user");

    Ok(HttpResponse::Created().json(RegisterResponse {
        user_id: user.id,
        username: user.username.clone(),
        message: format!(
            "Account created for {}! You can now log in.",
            user.username
        ),
    }))
}

/// POST /api/v1/auth/login
pub async fn login(
    state: web::Data<AppState>,
    payload: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    payload.validate()?;

    let user = user_repo::find_by_username(&state.db, &payload.username)
        .await?
        .ok_or_else(|| AppError::Authentication("Invalid username or password".to_string()))?;

    // Social-only accounts have no password to check against.
    if !user.has_password() || !password::verify_password(&payload.password, &user.password_hash)? {
        return Err(AppError::Authentication(
            "Invalid username or password".to_string(),
        ));
    }

    user_repo::record_successful_login(&state.db, user.id).await?;

    let tokens = jwt::generate_token_pair(user.id, &user.email, &user.username)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(HttpResponse::Ok().json(LoginResponse {
        user_id: user.id,
        username: user.username,
        email: user.email,
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        token_type: tokens.token_type,
        expires_in: tokens.expires_in,
    }))
}

/// POST /api/v1/auth/refresh
pub async fn refresh_token(
    payload: web::Json<RefreshTokenRequest>,
) -> Result<HttpResponse, AppError> {
    let token_data = jwt::validate_token(&payload.refresh_token)
        .map_err(|e| AppError::Authentication(e.to_string()))?;

    if token_data.claims.token_type != "refresh" {
        return Err(AppError::Authentication(
            "Expected a refresh token".to_string(),
        ));
    }

    let user_id = Uuid::parse_str(&token_data.claims.sub)
        .map_err(|_| AppError::Authentication("Invalid user ID in token".to_string()))?;

    let tokens = jwt::generate_token_pair(
        user_id,
        &token_data.claims.email,
        &token_data.claims.username,
    )
    .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(HttpResponse::Ok().json(RefreshTokenResponse {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        expires_in: tokens.expires_in,
    }))
}

/// POST /api/v1/auth/logout
///
/// Tokens are stateless; logout is an acknowledgement and the client
/// discards its pair.
pub async fn logout(user_id: UserId) -> Result<HttpResponse, AppError> {
    tracing::debug!(user_id = %user_id.0, "user logged out");

    Ok(HttpResponse::Ok().json(LogoutResponse {
        message: "Logged out successfully".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_request_validates_fields() {
        let ok = RegisterRequest {
            username: "ana".to_string(),
            email: "ana@example.com".to_string(),
            password: "long enough".to_string(),
        };
        assert!(ok.validate().is_ok());

        let bad_email = RegisterRequest {
            username: "ana".to_string(),
            email: "not-an-email".to_string(),
            password: "long enough".to_string(),
        };
        assert!(bad_email.validate().is_err());

        let short_password = RegisterRequest {
            username: "ana".to_string(),
            email: "ana@example.com".to_string(),
            password: "short".to_string(),
        };
        assert!(short_password.validate().is_err());

        let short_username = RegisterRequest {
            username: "ab".to_string(),
            email: "ana@example.com".to_string(),
            password: "long enough".to_string(),
        };
        assert!(short_username.validate().is_err());
    }

    #[test]
    fn login_request_rejects_empty_fields() {
        let empty = LoginRequest {
            username: String::new(),
            password: "pw".to_string(),
        };
        assert!(empty.validate().is_err());
    }
}
