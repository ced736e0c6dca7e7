/// Groups: listing, creation, detail, membership, posts, and chat.
///
/// Group content is member-only; the guard lives here rather than in
/// the data layer.
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::db::group_repo;
use crate::error::AppError;
use crate::middleware::UserId;
use crate::models::{Group, GroupMessage, GroupPost};
use crate::AppState;

/// How much of the chat log the detail view returns.
const CHAT_HISTORY_LIMIT: i64 = 50;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateGroupRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,

    #[serde(default)]
    pub description: String,

    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateGroupPostRequest {
    #[validate(length(min = 1))]
    pub content: String,

    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SendMessageRequest {
    #[validate(length(min = 1))]
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct GroupListResponse {
    pub my_groups: Vec<Group>,
    pub other_groups: Vec<Group>,
}

#[derive(Debug, Serialize)]
pub struct GroupDetailResponse {
    pub group: Group,
    pub member_count: i64,
    pub posts: Vec<GroupPost>,
    pub messages: Vec<GroupMessage>,
}

#[derive(Debug, Serialize)]
pub struct JoinGroupResponse {
    pub group_id: Uuid,
    pub message: String,
}

/// GET /api/v1/groups
pub async fn list_groups(
    state: web::Data<AppState>,
    user_id: UserId,
) -> Result<HttpResponse, AppError> {
    let my_groups = group_repo::list_groups_for_member(&state.db, user_id.0).await?;
    let other_groups = group_repo::list_groups_excluding_member(&state.db, user_id.0).await?;

    Ok(HttpResponse::Ok().json(GroupListResponse {
        my_groups,
        other_groups,
    }))
}

/// POST /api/v1/groups
///
/// The creator becomes the first member in the same transaction.
pub async fn create_group(
    state: web::Data<AppState>,
    user_id: UserId,
    payload: web::Json<CreateGroupRequest>,
) -> Result<HttpResponse, AppError> {
    payload.validate()?;

    let group = group_repo::create_group(
        &state.db,
        payload.name.trim(),
        payload.description.trim(),
        user_id.0,
        payload.image_url.as_deref(),
    )
    .await?;

    tracing::info!(group_id = %group.id, creator_id = %user_id.0, name = %group.name, "group created");

    Ok(HttpResponse::Created().json(group))
}

/// GET /api/v1/groups/{id}
///
/// Members only: the group, its posts (newest first), and the latest
/// chat messages in chronological order.
pub async fn group_detail(
    state: web::Data<AppState>,
    user_id: UserId,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let group_id = path.into_inner();

    let group = find_group(&state, group_id).await?;
    require_membership(&state, group_id, user_id.0).await?;

    let member_count = group_repo::count_members(&state.db, group_id).await?;
    let posts = group_repo::list_group_posts(&state.db, group_id).await?;
    let messages =
        group_repo::list_recent_messages(&state.db, group_id, CHAT_HISTORY_LIMIT).await?;

    Ok(HttpResponse::Ok().json(GroupDetailResponse {
        group,
        member_count,
        posts,
        messages,
    }))
}

/// POST /api/v1/groups/{id}/join
///
/// Idempotent: joining a group you already belong to is a no-op.
pub async fn join_group(
    state: web::Data<AppState>,
    user_id: UserId,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let group_id = path.into_inner();

    let group = find_group(&state, group_id).await?;
    group_repo::add_member(&state.db, group_id, user_id.0).await?;

    Ok(HttpResponse::Ok().json(JoinGroupResponse {
        group_id,
        message: format!("You joined {}!", group.name),
    }))
}

/// POST /api/v1/groups/{id}/posts
pub async fn create_group_post(
    state: web::Data<AppState>,
    user_id: UserId,
    path: web::Path<Uuid>,
    payload: web::Json<CreateGroupPostRequest>,
) -> Result<HttpResponse, AppError> {
    payload.validate()?;
    let group_id = path.into_inner();

    find_group(&state, group_id).await?;
    require_membership(&state, group_id, user_id.0).await?;

    let post = group_repo::create_group_post(
        &state.db,
        group_id,
        user_id.0,
        &payload.content,
        payload.image_url.as_deref(),
    )
    .await?;

    Ok(HttpResponse::Created().json(post))
}

/// POST /api/v1/groups/{id}/messages
pub async fn send_group_message(
    state: web::Data<AppState>,
    user_id: UserId,
    path: web::Path<Uuid>,
    payload: web::Json<SendMessageRequest>,
) -> Result<HttpResponse, AppError> {
    payload.validate()?;
    let group_id = path.into_inner();

    find_group(&state, group_id).await?;
    require_membership(&state, group_id, user_id.0).await?;

    let message =
        group_repo::create_group_message(&state.db, group_id, user_id.0, &payload.content).await?;

    Ok(HttpResponse::Created().json(message))
}

async fn find_group(state: &AppState, group_id: Uuid) -> Result<Group, AppError> {
    group_repo::find_group_by_id(&state.db, group_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Group not found".to_string()))
}

async fn require_membership(
    state: &AppState,
    group_id: Uuid,
    user_id: Uuid,
) -> Result<(), AppError> {
    if group_repo::is_member(&state.db, group_id, user_id).await? {
        Ok(())
    } else {
        Err(AppError::Authorization(
            "You are not a member of this group".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_name_length_is_enforced() {
        let empty = CreateGroupRequest {
            name: String::new(),
            description: String::new(),
            image_url: None,
        };
        assert!(empty.validate().is_err());

        let too_long = CreateGroupRequest {
            name: "x".repeat(101),
            description: String::new(),
            image_url: None,
        };
        assert!(too_long.validate().is_err());

        let ok = CreateGroupRequest {
            name: "book club".to_string(),
            description: "weekly reads".to_string(),
            image_url: None,
        };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn group_content_requires_a_body() {
        let empty_post = CreateGroupPostRequest {
            content: String::new(),
            image_url: None,
        };
        assert!(empty_post.validate().is_err());

        let empty_message = SendMessageRequest {
            content: String::new(),
        };
        assert!(empty_message.validate().is_err());
    }
}
