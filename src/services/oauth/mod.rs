/// OAuth2 social sign-on.
///
/// Providers implement [`OAuthProvider`]; [`resolve_oauth_user`] turns
/// the provider's user info into a local account, linking by email when
/// a matching local user already exists.
pub mod google;

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::config::OAuthConfig;
use crate::db::{oauth_repo, profile_repo, user_repo};
use crate::error::AppError;
use crate::models::User;

pub use google::GoogleProvider;

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("Unsupported OAuth provider: {0}")]
    UnsupportedProvider(String),

    #[error("Invalid state parameter: {0}")]
    InvalidState(String),

    #[error("Code exchange failed: {0}")]
    Exchange(String),

    #[error("Provider did not supply an email address")]
    MissingEmail,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl From<OAuthError> for AppError {
    fn from(err: OAuthError) -> Self {
        AppError::OAuth(err.to_string())
    }
}

/// Normalized user info returned by a provider after code exchange.
#[derive(Debug, Clone)]
pub struct OAuthUserInfo {
    pub provider: String,
    pub provider_user_id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

#[async_trait]
pub trait OAuthProvider: Send + Sync {
    fn provider_name(&self) -> &str;

    /// The URL to send the user to for consent.
    fn authorization_url(&self, state: &str, redirect_uri: &str) -> String;

    /// Reject obviously forged callback state before any network call.
    fn verify_state(&self, state: &str) -> Result<(), OAuthError>;

    /// Exchange an authorization code for the provider's user info.
    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<OAuthUserInfo, OAuthError>;
}

pub struct OAuthProviderFactory;

impl OAuthProviderFactory {
    pub fn create(
        provider: &str,
        config: &OAuthConfig,
    ) -> Result<Box<dyn OAuthProvider>, OAuthError> {
        match provider {
            "google" => Ok(Box::new(GoogleProvider::new(
                config.google_client_id.clone(),
                config.google_client_secret.clone(),
            ))),
            other => Err(OAuthError::UnsupportedProvider(other.to_string())),
        }
    }
}

/// Map provider user info onto a local account.
///
/// In order:
/// 1. An existing connection for (provider, provider_user_id) signs
///    that user in.
/// 2. A local user with the same email gets this provider linked to
///    their account.
/// 3. Otherwise a new user is created: username derived from the email
///    local-part, no password, profile populated from provider data.
pub async fn resolve_oauth_user(pool: &PgPool, info: &OAuthUserInfo) -> Result<User, AppError> {
    if info.email.is_empty() {
        return Err(OAuthError::MissingEmail.into());
    }

    if let Some(connection) =
        oauth_repo::find_by_provider(pool, &info.provider, &info.provider_user_id).await?
    {
        return user_repo::find_by_id(pool, connection.user_id)
            .await?
            .ok_or_else(|| {
                AppError::Internal("OAuth connection references a missing user".to_string())
            });
    }

    if let Some(user) = user_repo::find_by_email(pool, &info.email).await? {
        tracing::info!(user_id = %user.id, provider = %info.provider, "linking social account to existing user by email");
        oauth_repo::create_connection(
            pool,
            user.id,
            &info.provider,
            &info.provider_user_id,
            &info.email,
            info.display_name.as_deref(),
        )
        .await?;
        return Ok(user);
    }

    let username = derive_username(pool, &info.email).await?;
    let user = user_repo::create_with_profile(pool, &info.email, &username, "").await?;
    tracing::info!(user_id = %user.id, provider = %info.provider, "created user from social signup");

    profile_repo::apply_provider_data(
        pool,
        user.id,
        info.display_name.as_deref().unwrap_or(""),
        &info.email,
        info.avatar_url.as_deref(),
    )
    .await?;

    oauth_repo::create_connection(
        pool,
        user.id,
        &info.provider,
        &info.provider_user_id,
        &info.email,
        info.display_name.as_deref(),
    )
    .await?;

    Ok(user)
}

/// Derive a username from the email local-part, appending a random
/// suffix until it is unique.
async fn derive_username(pool: &PgPool, email: &str) -> Result<String, sqlx::Error> {
    let base = username_base(email);

    if !user_repo::username_exists(pool, &base).await? {
        return Ok(base);
    }

    loop {
        let candidate = format!("{}_{}", base, random_suffix());
        if !user_repo::username_exists(pool, &candidate).await? {
            return Ok(candidate);
        }
    }
}

fn username_base(email: &str) -> String {
    let local = email.split('@').next().unwrap_or("");
    if local.is_empty() {
        "user".to_string()
    } else {
        local.to_string()
    }
}

fn random_suffix() -> String {
    Uuid::new_v4()
        .to_string()
        .split('-')
        .next()
        .unwrap_or("0")
        .to_string()
}
