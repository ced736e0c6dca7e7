/// Google OAuth2 provider.
use async_trait::async_trait;
use serde::Deserialize;

use super::{OAuthError, OAuthProvider, OAuthUserInfo};

const AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const USERINFO_ENDPOINT: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

const MIN_STATE_LEN: usize = 8;

pub struct GoogleProvider {
    client_id: String,
    client_secret: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    id: String,
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

impl GoogleProvider {
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            client_id,
            client_secret,
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl OAuthProvider for GoogleProvider {
    fn provider_name(&self) -> &str {
        "google"
    }

    fn authorization_url(&self, state: &str, redirect_uri: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope=openid%20email%20profile&state={}",
            AUTH_ENDPOINT,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(state),
        )
    }

    fn verify_state(&self, state: &str) -> Result<(), OAuthError> {
        if state.len() < MIN_STATE_LEN {
            return Err(OAuthError::InvalidState(
                "state parameter missing or too short".to_string(),
            ));
        }
        Ok(())
    }

    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<OAuthUserInfo, OAuthError> {
        let response = self
            .http
            .post(TOKEN_ENDPOINT)
            .form(&[
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", redirect_uri),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OAuthError::Exchange(format!(
                "token endpoint returned {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = response.json().await?;

        let response = self
            .http
            .get(USERINFO_ENDPOINT)
            .bearer_auth(&token.access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(OAuthError::Exchange(format!(
                "userinfo endpoint returned {}",
                response.status()
            )));
        }

        let info: GoogleUserInfo = response.json().await?;
        let email = info.email.filter(|e| !e.is_empty()).ok_or(OAuthError::MissingEmail)?;

        Ok(OAuthUserInfo {
            provider: "google".to_string(),
            provider_user_id: info.id,
            email,
            display_name: info.name,
            avatar_url: info.picture,
        })
    }
}
