/// Group repository - groups, the membership edge, group posts, and the
/// chat log. Membership checks for writes live in the handlers.
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Group, GroupMessage, GroupPost};

/// Create a group and enroll the creator as its first member.
pub async fn create_group(
    pool: &PgPool,
    name: &str,
    description: &str,
    creator_id: Uuid,
    image_url: Option<&str>,
) -> Result<Group, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let group = sqlx::query_as::<_, Group>(
        r#"
        INSERT INTO groups (id, name, description, creator_id, image_url)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, name, description, creator_id, image_url, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(description)
    .bind(creator_id)
    .bind(image_url)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO group_members (group_id, user_id)
        VALUES ($1, $2)
        "#,
    )
    .bind(group.id)
    .bind(creator_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(group)
}

pub async fn find_group_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Group>, sqlx::Error> {
    sqlx::query_as::<_, Group>(
        r#"
        SELECT id, name, description, creator_id, image_url, created_at
        FROM groups
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Groups the user belongs to, newest first.
pub async fn list_groups_for_member(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<Group>, sqlx::Error> {
    sqlx::query_as::<_, Group>(
        r#"
        SELECT g.id, g.name, g.description, g.creator_id, g.image_url, g.created_at
        FROM groups g
        JOIN group_members m ON m.group_id = g.id
        WHERE m.user_id = $1
        ORDER BY g.created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Groups the user does not belong to, newest first.
pub async fn list_groups_excluding_member(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<Group>, sqlx::Error> {
    sqlx::query_as::<_, Group>(
        r#"
        SELECT g.id, g.name, g.description, g.creator_id, g.image_url, g.created_at
        FROM groups g
        WHERE NOT EXISTS (
            SELECT 1 FROM group_members m
            WHERE m.group_id = g.id AND m.user_id = $1
        )
        ORDER BY g.created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn is_member(pool: &PgPool, group_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM group_members WHERE group_id = $1 AND user_id = $2)",
    )
    .bind(group_id)
    .bind(user_id)
    .fetch_one(pool)
    .await
}

/// Add a member; joining a group you already belong to is a no-op.
pub async fn add_member(pool: &PgPool, group_id: Uuid, user_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO group_members (group_id, user_id)
        VALUES ($1, $2)
        ON CONFLICT (group_id, user_id) DO NOTHING
        "#,
    )
    .bind(group_id)
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn count_members(pool: &PgPool, group_id: Uuid) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM group_members WHERE group_id = $1")
        .bind(group_id)
        .fetch_one(pool)
        .await
}

pub async fn create_group_post(
    pool: &PgPool,
    group_id: Uuid,
    author_id: Uuid,
    content: &str,
    image_url: Option<&str>,
) -> Result<GroupPost, sqlx::Error> {
    sqlx::query_as::<_, GroupPost>(
        r#"
        WITH inserted AS (
            INSERT INTO group_posts (id, group_id, author_id, content, image_url)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, group_id, author_id, content, image_url, created_at
        )
        SELECT i.id, i.group_id, i.author_id, u.username AS author_username,
               i.content, i.image_url, i.created_at
        FROM inserted i
        JOIN users u ON u.id = i.author_id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(group_id)
    .bind(author_id)
    .bind(content)
    .bind(image_url)
    .fetch_one(pool)
    .await
}

/// A group's posts, newest first.
pub async fn list_group_posts(
    pool: &PgPool,
    group_id: Uuid,
) -> Result<Vec<GroupPost>, sqlx::Error> {
    sqlx::query_as::<_, GroupPost>(
        r#"
        SELECT gp.id, gp.group_id, gp.author_id, u.username AS author_username,
               gp.content, gp.image_url, gp.created_at
        FROM group_posts gp
        JOIN users u ON u.id = gp.author_id
        WHERE gp.group_id = $1
        ORDER BY gp.created_at DESC
        "#,
    )
    .bind(group_id)
    .fetch_all(pool)
    .await
}

pub async fn create_group_message(
    pool: &PgPool,
    group_id: Uuid,
    author_id: Uuid,
    content: &str,
) -> Result<GroupMessage, sqlx::Error> {
    sqlx::query_as::<_, GroupMessage>(
        r#"
        WITH inserted AS (
            INSERT INTO group_messages (id, group_id, author_id, content)
            VALUES ($1, $2, $3, $4)
            RETURNING id, group_id, author_id, content, created_at
        )
        SELECT i.id, i.group_id, i.author_id, u.username AS author_username,
               i.content, i.created_at
        FROM inserted i
        JOIN users u ON u.id = i.author_id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(group_id)
    .bind(author_id)
    .bind(content)
    .fetch_one(pool)
    .await
}

/// The latest `limit` chat messages in chronological order.
pub async fn list_recent_messages(
    pool: &PgPool,
    group_id: Uuid,
    limit: i64,
) -> Result<Vec<GroupMessage>, sqlx::Error> {
    let mut messages = sqlx::query_as::<_, GroupMessage>(
        r#"
        SELECT gm.id, gm.group_id, gm.author_id, u.username AS author_username,
               gm.content, gm.created_at
        FROM group_messages gm
        JOIN users u ON u.id = gm.author_id
        WHERE gm.group_id = $1
        ORDER BY gm.created_at DESC
        LIMIT $2
        "#,
    )
    .bind(group_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    messages.reverse();
    Ok(messages)
}
