use sqlx::PgPool;
use uuid::Uuid;

/// Toggle a like: create it when missing, remove it when present.
/// Returns whether the post is liked by the user afterwards.
///
/// The insert uses ON CONFLICT DO NOTHING against the (user, post)
/// unique constraint, so two racing toggles cannot produce duplicates.
pub async fn toggle_like(pool: &PgPool, post_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
    let inserted = sqlx::query(
        r#"
        INSERT INTO likes (id, user_id, post_id)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id, post_id) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(post_id)
    .execute(pool)
    .await?
    .rows_affected();

    if inserted > 0 {
        return Ok(true);
    }

    // Already liked: this toggle is an unlike.
    sqlx::query(
        r#"
        DELETE FROM likes
        WHERE user_id = $1 AND post_id = $2
        "#,
    )
    .bind(user_id)
    .bind(post_id)
    .execute(pool)
    .await?;

    Ok(false)
}

pub async fn has_liked(pool: &PgPool, post_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM likes WHERE post_id = $1 AND user_id = $2)",
    )
    .bind(post_id)
    .bind(user_id)
    .fetch_one(pool)
    .await
}

pub async fn count_likes_by_post(pool: &PgPool, post_id: Uuid) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM likes WHERE post_id = $1")
        .bind(post_id)
        .fetch_one(pool)
        .await
}
