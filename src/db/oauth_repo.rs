/// OAuth connection repository - the link between a social provider
/// account and a local user.
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::OAuthConnection;

pub async fn find_by_provider(
    pool: &PgPool,
    provider: &str,
    provider_user_id: &str,
) -> Result<Option<OAuthConnection>, sqlx::Error> {
    sqlx::query_as::<_, OAuthConnection>(
        r#"
        SELECT id, user_id, provider, provider_user_id, email, display_name, created_at
        FROM oauth_connections
        WHERE provider = $1 AND provider_user_id = $2
        "#,
    )
    .bind(provider)
    .bind(provider_user_id)
    .fetch_optional(pool)
    .await
}

pub async fn create_connection(
    pool: &PgPool,
    user_id: Uuid,
    provider: &str,
    provider_user_id: &str,
    email: &str,
    display_name: Option<&str>,
) -> Result<OAuthConnection, sqlx::Error> {
    sqlx::query_as::<_, OAuthConnection>(
        r#"
        INSERT INTO oauth_connections (id, user_id, provider, provider_user_id, email, display_name)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, user_id, provider, provider_user_id, email, display_name, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(provider)
    .bind(provider_user_id)
    .bind(email)
    .bind(display_name)
    .fetch_one(pool)
    .await
}
