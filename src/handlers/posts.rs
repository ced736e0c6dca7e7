/// The post feed: create, explore, and like toggling.
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{like_repo, post_repo};
use crate::error::AppError;
use crate::middleware::UserId;
use crate::models::FeedPost;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    #[serde(default)]
    pub caption: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ExploreResponse {
    pub posts: Vec<FeedPost>,
}

#[derive(Debug, Serialize)]
pub struct LikeToggleResponse {
    pub post_id: Uuid,
    pub liked: bool,
    pub like_count: i64,
}

/// POST /api/v1/posts
pub async fn create_post(
    state: web::Data<AppState>,
    user_id: UserId,
    payload: web::Json<CreatePostRequest>,
) -> Result<HttpResponse, AppError> {
    let post = post_repo::create_post(
        &state.db,
        user_id.0,
        &payload.caption,
        payload.image_url.as_deref(),
    )
    .await?;

    tracing::info!(post_id = %post.id, author_id = %user_id.0, "post created");

    Ok(HttpResponse::Created().json(post))
}

/// GET /api/v1/explore
///
/// Every post, newest first, with like counts and the caller's like
/// state per post.
pub async fn explore(
    state: web::Data<AppState>,
    user_id: UserId,
) -> Result<HttpResponse, AppError> {
    let posts = post_repo::list_feed(&state.db, user_id.0).await?;

    Ok(HttpResponse::Ok().json(ExploreResponse { posts }))
}

/// POST /api/v1/posts/{id}/like
///
/// Toggles: a first like creates the entry, a second removes it.
pub async fn like_post(
    state: web::Data<AppState>,
    user_id: UserId,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let post_id = path.into_inner();

    post_repo::find_post_by_id(&state.db, post_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

    let liked = like_repo::toggle_like(&state.db, post_id, user_id.0).await?;
    let like_count = like_repo::count_likes_by_post(&state.db, post_id).await?;

    Ok(HttpResponse::Ok().json(LikeToggleResponse {
        post_id,
        liked,
        like_count,
    }))
}
