use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl User {
    /// Social-only accounts carry an empty password hash.
    pub fn has_password(&self) -> bool {
        !self.password_hash.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub bio: String,
    pub avatar_url: Option<String>,
    pub consistency_family: Option<serde_json::Value>,
    pub updated_at: DateTime<Utc>,
}

/// A profile joined with its account's username, as shown in the member
/// directory and on member detail pages.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MemberProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub bio: String,
    pub avatar_url: Option<String>,
}

/// The `consistency_family` JSON payload on a profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyFamily {
    pub members: Vec<String>,
    pub score: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub caption: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A feed entry: post plus author and like information for the viewer.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FeedPost {
    pub id: Uuid,
    pub author_id: Uuid,
    pub author_username: String,
    pub caption: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub like_count: i64,
    pub liked_by_me: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub creator_id: Uuid,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GroupPost {
    pub id: Uuid,
    pub group_id: Uuid,
    pub author_id: Uuid,
    pub author_username: String,
    pub content: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GroupMessage {
    pub id: Uuid,
    pub group_id: Uuid,
    pub author_id: Uuid,
    pub author_username: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OAuthConnection {
    pub id: Uuid,
    pub user_id: Uuid,
    pub provider: String,
    pub provider_user_id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
}
