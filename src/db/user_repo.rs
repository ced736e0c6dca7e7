/// User repository - account rows and their lifecycle.
///
/// Creation always goes through [`create_with_profile`] so the
/// one-profile-per-user invariant holds for every signup path, local or
/// social.
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::User;

/// Create a user together with their blank profile in one transaction.
pub async fn create_with_profile(
    pool: &PgPool,
    email: &str,
    username: &str,
    password_hash: &str,
) -> Result<User, sqlx::Error> {
    let user_id = Uuid::new_v4();
    let now = Utc::now();

    let mut tx = pool.begin().await?;

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, email, username, password_hash, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $5)
        RETURNING id, email, username, password_hash, created_at, updated_at, last_login_at
        "#,
    )
    .bind(user_id)
    .bind(email.to_lowercase())
    .bind(username)
    .bind(password_hash)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO profiles (id, user_id, updated_at)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(user)
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, username, password_hash, created_at, updated_at, last_login_at
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn find_by_username(pool: &PgPool, username: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, username, password_hash, created_at, updated_at, last_login_at
        FROM users
        WHERE username = $1
        "#,
    )
    .bind(username)
    .fetch_optional(pool)
    .await
}

/// Find a user by email, case-insensitively.
pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, username, password_hash, created_at, updated_at, last_login_at
        FROM users
        WHERE lower(email) = $1
        "#,
    )
    .bind(email.to_lowercase())
    .fetch_optional(pool)
    .await
}

/// Case-insensitive email existence check, used to reject duplicate
/// registrations before hashing a password.
pub async fn email_exists(pool: &PgPool, email: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE lower(email) = $1)")
        .bind(email.to_lowercase())
        .fetch_one(pool)
        .await
}

pub async fn username_exists(pool: &PgPool, username: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
        .bind(username)
        .fetch_one(pool)
        .await
}

pub async fn record_successful_login(pool: &PgPool, user_id: Uuid) -> Result<(), sqlx::Error> {
    let now = Utc::now();

    sqlx::query(
        r#"
        UPDATE users
        SET last_login_at = $1, updated_at = $1
        WHERE id = $2
        "#,
    )
    .bind(now)
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(())
}
