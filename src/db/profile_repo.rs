/// Profile repository - the 1:1 extension record for each account, plus
/// the member directory queries behind the dashboard.
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{MemberProfile, Profile};

pub async fn find_by_user_id(pool: &PgPool, user_id: Uuid) -> Result<Option<Profile>, sqlx::Error> {
    sqlx::query_as::<_, Profile>(
        r#"
        SELECT id, user_id, full_name, email, phone, bio, avatar_url, consistency_family, updated_at
        FROM profiles
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// Fetch the profile for a user, creating a blank one when missing.
///
/// Profiles are normally created with the user; this covers accounts
/// that predate that rule, the same way the dashboard used to
/// `get_or_create` one on first visit.
pub async fn get_or_create(pool: &PgPool, user_id: Uuid) -> Result<Profile, sqlx::Error> {
    if let Some(profile) = find_by_user_id(pool, user_id).await? {
        return Ok(profile);
    }

    sqlx::query_as::<_, Profile>(
        r#"
        INSERT INTO profiles (id, user_id, updated_at)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
        RETURNING id, user_id, full_name, email, phone, bio, avatar_url, consistency_family, updated_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(Utc::now())
    .fetch_one(pool)
    .await
}

pub async fn update_details(
    pool: &PgPool,
    user_id: Uuid,
    full_name: &str,
    email: &str,
    phone: &str,
    bio: &str,
    avatar_url: Option<&str>,
) -> Result<Profile, sqlx::Error> {
    sqlx::query_as::<_, Profile>(
        r#"
        UPDATE profiles
        SET full_name = $1,
            email = $2,
            phone = $3,
            bio = $4,
            avatar_url = COALESCE($5, avatar_url),
            updated_at = $6
        WHERE user_id = $7
        RETURNING id, user_id, full_name, email, phone, bio, avatar_url, consistency_family, updated_at
        "#,
    )
    .bind(full_name)
    .bind(email)
    .bind(phone)
    .bind(bio)
    .bind(avatar_url)
    .bind(Utc::now())
    .bind(user_id)
    .fetch_one(pool)
    .await
}

pub async fn update_consistency_family(
    pool: &PgPool,
    user_id: Uuid,
    family: &serde_json::Value,
) -> Result<Profile, sqlx::Error> {
    sqlx::query_as::<_, Profile>(
        r#"
        UPDATE profiles
        SET consistency_family = $1, updated_at = $2
        WHERE user_id = $3
        RETURNING id, user_id, full_name, email, phone, bio, avatar_url, consistency_family, updated_at
        "#,
    )
    .bind(family)
    .bind(Utc::now())
    .bind(user_id)
    .fetch_one(pool)
    .await
}

/// Fill in profile fields from a social provider's account data after a
/// social signup. Existing non-blank fields are left untouched.
pub async fn apply_provider_data(
    pool: &PgPool,
    user_id: Uuid,
    full_name: &str,
    email: &str,
    avatar_url: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE profiles
        SET full_name = CASE WHEN full_name = '' THEN $1 ELSE full_name END,
            email = CASE WHEN email = '' THEN $2 ELSE email END,
            avatar_url = COALESCE(avatar_url, $3),
            updated_at = $4
        WHERE user_id = $5
        "#,
    )
    .bind(full_name)
    .bind(email)
    .bind(avatar_url)
    .bind(Utc::now())
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn find_member_by_id(
    pool: &PgPool,
    profile_id: Uuid,
) -> Result<Option<MemberProfile>, sqlx::Error> {
    sqlx::query_as::<_, MemberProfile>(
        r#"
        SELECT p.id, p.user_id, u.username, p.full_name, p.email, p.phone, p.bio, p.avatar_url
        FROM profiles p
        JOIN users u ON u.id = p.user_id
        WHERE p.id = $1
        "#,
    )
    .bind(profile_id)
    .fetch_optional(pool)
    .await
}

/// Build an ILIKE pattern matching `query` as a literal substring.
/// LIKE metacharacters in the query are escaped so `50%` does not
/// match everything and `a_c` does not match `abc`.
fn like_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Member directory page: everyone except the viewer, optionally
/// filtered by a case-insensitive substring over username, full name,
/// or profile email.
pub async fn search_members(
    pool: &PgPool,
    viewer_id: Uuid,
    query: &str,
    limit: i64,
    offset: i64,
) -> Result<Vec<MemberProfile>, sqlx::Error> {
    sqlx::query_as::<_, MemberProfile>(
        r#"
        SELECT p.id, p.user_id, u.username, p.full_name, p.email, p.phone, p.bio, p.avatar_url
        FROM profiles p
        JOIN users u ON u.id = p.user_id
        WHERE p.user_id <> $1
          AND ($2 = '' OR u.username ILIKE $3 OR p.full_name ILIKE $3 OR p.email ILIKE $3)
        ORDER BY u.username
        LIMIT $4 OFFSET $5
        "#,
    )
    .bind(viewer_id)
    .bind(query)
    .bind(like_pattern(query))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

pub async fn count_members(
    pool: &PgPool,
    viewer_id: Uuid,
    query: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM profiles p
        JOIN users u ON u.id = p.user_id
        WHERE p.user_id <> $1
          AND ($2 = '' OR u.username ILIKE $3 OR p.full_name ILIKE $3 OR p.email ILIKE $3)
        "#,
    )
    .bind(viewer_id)
    .bind(query)
    .bind(like_pattern(query))
    .fetch_one(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern("ana"), "%ana%");
        assert_eq!(like_pattern("50%"), "%50\\%%");
        assert_eq!(like_pattern("a_c"), "%a\\_c%");
        assert_eq!(like_pattern("back\\slash"), "%back\\\\slash%");
    }
}
