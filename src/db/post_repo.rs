use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{FeedPost, Post};

pub async fn create_post(
    pool: &PgPool,
    author_id: Uuid,
    caption: &str,
    image_url: Option<&str>,
) -> Result<Post, sqlx::Error> {
    sqlx::query_as::<_, Post>(
        r#"
        INSERT INTO posts (id, author_id, caption, image_url)
        VALUES ($1, $2, $3, $4)
        RETURNING id, author_id, caption, image_url, created_at, updated_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(author_id)
    .bind(caption)
    .bind(image_url)
    .fetch_one(pool)
    .await
}

pub async fn find_post_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Post>, sqlx::Error> {
    sqlx::query_as::<_, Post>(
        r#"
        SELECT id, author_id, caption, image_url, created_at, updated_at
        FROM posts
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// The explore feed: every post, newest first, with like counts and
/// whether the viewer has liked each one.
pub async fn list_feed(pool: &PgPool, viewer_id: Uuid) -> Result<Vec<FeedPost>, sqlx::Error> {
    sqlx::query_as::<_, FeedPost>(
        r#"
        SELECT p.id,
               p.author_id,
               u.username AS author_username,
               p.caption,
               p.image_url,
               p.created_at,
               COUNT(l.id) AS like_count,
               COALESCE(BOOL_OR(l.user_id = $1), false) AS liked_by_me
        FROM posts p
        JOIN users u ON u.id = p.author_id
        LEFT JOIN likes l ON l.post_id = p.id
        GROUP BY p.id, u.username
        ORDER BY p.created_at DESC
        "#,
    )
    .bind(viewer_id)
    .fetch_all(pool)
    .await
}
