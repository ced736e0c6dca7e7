/// Social sign-on callback handling.
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::user_repo;
use crate::error::AppError;
use crate::security::jwt;
use crate::services::oauth::{resolve_oauth_user, OAuthProvider, OAuthProviderFactory};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct OAuthAuthorizeRequest {
    pub provider: String,
    pub code: String,
    pub state: String,
    pub redirect_uri: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OAuthAuthorizeResponse {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// POST /api/v1/auth/oauth/authorize
///
/// Handles the provider callback: exchanges the code, then signs in the
/// connected user, links the provider to a local user with the same
/// email, or auto-signs-up a fresh account with a provider-populated
/// profile.
pub async fn oauth_authorize(
    state: web::Data<AppState>,
    payload: web::Json<OAuthAuthorizeRequest>,
) -> Result<HttpResponse, AppError> {
    let provider: Box<dyn OAuthProvider> =
        OAuthProviderFactory::create(&payload.provider, &state.config.oauth)?;

    provider.verify_state(&payload.state)?;

    let redirect_uri = payload
        .redirect_uri
        .clone()
        .unwrap_or_else(|| state.config.oauth.redirect_uri.clone());

    let info = provider.exchange_code(&payload.code, &redirect_uri).await?;

    let user = resolve_oauth_user(&state.db, &info).await?;

    if let Err(e) = user_repo::record_successful_login(&state.db, user.id).await {
        tracing::warn!(user_id = %user.id, "failed to record login: {}", e);
    }

    let tokens = jwt::generate_token_pair(user.id, &user.email, &user.username)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(HttpResponse::Ok().json(OAuthAuthorizeResponse {
        user_id: user.id,
        username: user.username,
        email: user.email,
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        token_type: tokens.token_type,
        expires_in: tokens.expires_in,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorize_request_deserializes_without_redirect() {
        let json = r#"{
            "provider": "google",
            "code": "auth_code_123",
            "state": "state_token_456"
        }"#;

        let req: OAuthAuthorizeRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.provider, "google");
        assert_eq!(req.code, "auth_code_123");
        assert_eq!(req.state, "state_token_456");
        assert!(req.redirect_uri.is_none());
    }

    #[test]
    fn authorize_request_accepts_custom_redirect() {
        let json = r#"{
            "provider": "google",
            "code": "code_xyz",
            "state": "state_abc",
            "redirect_uri": "https://example.com/callback"
        }"#;

        let req: OAuthAuthorizeRequest = serde_json::from_str(json).unwrap();
        assert_eq!(
            req.redirect_uri.as_deref(),
            Some("https://example.com/callback")
        );
    }
}
