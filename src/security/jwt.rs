/// JWT token generation and validation (HS256).
///
/// Keys are derived from the configured secret once at startup via
/// [`initialize`]; every token helper reads from that process-wide
/// state, mirroring how the service treats its database pool.
use anyhow::{anyhow, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT claims carried by both access and refresh tokens.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Token type: "access" or "refresh"
    pub token_type: String,
    pub email: String,
    pub username: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

struct JwtContext {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
}

static JWT: OnceCell<JwtContext> = OnceCell::new();

/// Install the signing secret and token lifetimes. Must be called
/// during startup before any token operation; later calls are no-ops.
pub fn initialize(secret: &str, access_ttl_secs: i64, refresh_ttl_secs: i64) -> Result<()> {
    if secret.is_empty() {
        return Err(anyhow!("JWT secret must not be empty"));
    }

    let _ = JWT.set(JwtContext {
        encoding_key: EncodingKey::from_secret(secret.as_bytes()),
        decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        access_ttl_secs,
        refresh_ttl_secs,
    });

    Ok(())
}

fn context() -> Result<&'static JwtContext> {
    JWT.get()
        .ok_or_else(|| anyhow!("JWT keys not initialized. Call jwt::initialize() during startup"))
}

fn generate_token(
    user_id: Uuid,
    email: &str,
    username: &str,
    token_type: &str,
    ttl_secs: i64,
) -> Result<String> {
    let ctx = context()?;
    let now = Utc::now();

    let claims = Claims {
        sub: user_id.to_string(),
        iat: now.timestamp(),
        exp: (now + Duration::seconds(ttl_secs)).timestamp(),
        token_type: token_type.to_string(),
        email: email.to_string(),
        username: username.to_string(),
    };

    encode(&Header::new(Algorithm::HS256), &claims, &ctx.encoding_key)
        .map_err(|e| anyhow!("Failed to generate {} token: {}", token_type, e))
}

/// Generate an access/refresh token pair for a user.
pub fn generate_token_pair(user_id: Uuid, email: &str, username: &str) -> Result<TokenPair> {
    let ctx = context()?;

    Ok(TokenPair {
        access_token: generate_token(user_id, email, username, "access", ctx.access_ttl_secs)?,
        refresh_token: generate_token(user_id, email, username, "refresh", ctx.refresh_ttl_secs)?,
        token_type: "Bearer".to_string(),
        expires_in: ctx.access_ttl_secs,
    })
}

/// Validate a token's signature and expiry, returning its claims.
pub fn validate_token(token: &str) -> Result<TokenData<Claims>> {
    let ctx = context()?;

    decode::<Claims>(token, &ctx.decoding_key, &Validation::new(Algorithm::HS256))
        .map_err(|e| anyhow!("Invalid token: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        initialize("test-secret-for-unit-tests", 3600, 2_592_000).unwrap();
    }

    #[test]
    fn token_pair_round_trips() {
        init();
        let user_id = Uuid::new_v4();
        let pair = generate_token_pair(user_id, "ana@example.com", "ana").unwrap();

        assert_eq!(pair.token_type, "Bearer");
        assert_eq!(pair.expires_in, 3600);

        let access = validate_token(&pair.access_token).unwrap();
        assert_eq!(access.claims.sub, user_id.to_string());
        assert_eq!(access.claims.token_type, "access");
        assert_eq!(access.claims.username, "ana");

        let refresh = validate_token(&pair.refresh_token).unwrap();
        assert_eq!(refresh.claims.token_type, "refresh");
    }

    #[test]
    fn tampered_token_is_rejected() {
        init();
        let pair = generate_token_pair(Uuid::new_v4(), "bo@example.com", "bo").unwrap();
        let mut tampered = pair.access_token;
        tampered.push('x');
        assert!(validate_token(&tampered).is_err());
    }

    #[test]
    fn empty_secret_is_rejected() {
        assert!(initialize("", 60, 60).is_err());
    }
}
