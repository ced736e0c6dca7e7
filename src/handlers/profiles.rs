/// Dashboard, profile updates, and the member directory.
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::profile_repo;
use crate::error::AppError;
use crate::middleware::UserId;
use crate::models::{ConsistencyFamily, MemberProfile, Profile};
use crate::AppState;

const PAGE_SIZE: i64 = 6;

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    #[serde(default)]
    pub q: String,
    /// Kept as a raw string so junk values clamp instead of failing.
    pub page: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub profile: Profile,
    pub members: Vec<MemberProfile>,
    pub query: String,
    pub page: i64,
    pub num_pages: i64,
    pub total_members: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub bio: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConsistencyFamilyRequest {
    /// Comma-separated member names.
    #[serde(default)]
    pub members: String,
    /// Accepted only when it is an integer in 0..=100.
    #[serde(default)]
    pub score: String,
}

/// GET /api/v1/dashboard?q=&page=
///
/// The caller's profile plus a paginated member directory. The profile
/// is created on demand for accounts that somehow lack one.
pub async fn dashboard(
    state: web::Data<AppState>,
    user_id: UserId,
    query: web::Query<DashboardQuery>,
) -> Result<HttpResponse, AppError> {
    let profile = profile_repo::get_or_create(&state.db, user_id.0).await?;

    let q = query.q.trim();
    let total = profile_repo::count_members(&state.db, user_id.0, q).await?;
    let pages = num_pages(total);
    let page = clamp_page(requested_page(query.page.as_deref()), pages);
    let offset = (page - 1) * PAGE_SIZE;

    let members = profile_repo::search_members(&state.db, user_id.0, q, PAGE_SIZE, offset).await?;

    Ok(HttpResponse::Ok().json(DashboardResponse {
        profile,
        members,
        query: q.to_string(),
        page,
        num_pages: pages,
        total_members: total,
    }))
}

/// PUT /api/v1/profile
pub async fn update_profile(
    state: web::Data<AppState>,
    user_id: UserId,
    payload: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse, AppError> {
    // Make sure the row exists before updating it.
    profile_repo::get_or_create(&state.db, user_id.0).await?;

    let profile = profile_repo::update_details(
        &state.db,
        user_id.0,
        payload.full_name.trim(),
        payload.email.trim(),
        payload.phone.trim(),
        payload.bio.trim(),
        normalized_avatar(payload.avatar_url.as_deref()),
    )
    .await?;

    Ok(HttpResponse::Ok().json(profile))
}

/// PUT /api/v1/profile/consistency
pub async fn update_consistency(
    state: web::Data<AppState>,
    user_id: UserId,
    payload: web::Json<ConsistencyFamilyRequest>,
) -> Result<HttpResponse, AppError> {
    profile_repo::get_or_create(&state.db, user_id.0).await?;

    let family = ConsistencyFamily {
        members: parse_members(&payload.members),
        score: parse_score(&payload.score),
    };
    let value = serde_json::to_value(&family)
        .map_err(|e| AppError::Internal(format!("Failed to encode consistency family: {}", e)))?;

    let profile = profile_repo::update_consistency_family(&state.db, user_id.0, &value).await?;

    Ok(HttpResponse::Ok().json(profile))
}

/// GET /api/v1/members/{id}
pub async fn member_detail(
    state: web::Data<AppState>,
    _user_id: UserId,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let profile_id = path.into_inner();

    let member = profile_repo::find_member_by_id(&state.db, profile_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Member not found".to_string()))?;

    Ok(HttpResponse::Ok().json(member))
}

/// Missing and blank avatar URLs both mean "keep the stored one".
fn normalized_avatar(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|url| !url.is_empty())
}

/// Parse the requested page number; junk or sub-1 values become 1.
fn requested_page(raw: Option<&str>) -> i64 {
    raw.and_then(|p| p.trim().parse::<i64>().ok())
        .filter(|p| *p >= 1)
        .unwrap_or(1)
}

/// Requests past the end land on the last page, never on an empty one.
fn clamp_page(requested: i64, num_pages: i64) -> i64 {
    requested.min(num_pages).max(1)
}

fn num_pages(total: i64) -> i64 {
    ((total + PAGE_SIZE - 1) / PAGE_SIZE).max(1)
}

fn parse_members(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(String::from)
        .collect()
}

fn parse_score(input: &str) -> Option<u32> {
    let trimmed = input.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    trimmed.parse::<u32>().ok().filter(|score| *score <= 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_avatar_url_keeps_the_stored_one() {
        assert_eq!(normalized_avatar(None), None);
        assert_eq!(normalized_avatar(Some("")), None);
        assert_eq!(normalized_avatar(Some("   ")), None);
        assert_eq!(
            normalized_avatar(Some(" https://cdn.example.com/a.png ")),
            Some("https://cdn.example.com/a.png")
        );
    }

    #[test]
    fn page_parsing_defaults_junk_to_first_page() {
        assert_eq!(requested_page(None), 1);
        assert_eq!(requested_page(Some("")), 1);
        assert_eq!(requested_page(Some("abc")), 1);
        assert_eq!(requested_page(Some("0")), 1);
        assert_eq!(requested_page(Some("-3")), 1);
        assert_eq!(requested_page(Some("4")), 4);
    }

    #[test]
    fn page_clamps_to_last_page() {
        assert_eq!(clamp_page(99, 3), 3);
        assert_eq!(clamp_page(2, 3), 2);
        assert_eq!(clamp_page(1, 1), 1);
    }

    #[test]
    fn num_pages_rounds_up_and_never_hits_zero() {
        assert_eq!(num_pages(0), 1);
        assert_eq!(num_pages(1), 1);
        assert_eq!(num_pages(6), 1);
        assert_eq!(num_pages(7), 2);
        assert_eq!(num_pages(13), 3);
    }

    #[test]
    fn members_are_comma_split_and_trimmed() {
        assert_eq!(
            parse_members(" ana , bo ,, cy "),
            vec!["ana".to_string(), "bo".to_string(), "cy".to_string()]
        );
        assert!(parse_members("").is_empty());
        assert!(parse_members(" , , ").is_empty());
    }

    #[test]
    fn score_only_accepts_integers_within_bounds() {
        assert_eq!(parse_score("0"), Some(0));
        assert_eq!(parse_score("100"), Some(100));
        assert_eq!(parse_score(" 42 "), Some(42));
        assert_eq!(parse_score("101"), None);
        assert_eq!(parse_score("-1"), None);
        assert_eq!(parse_score("3.5"), None);
        assert_eq!(parse_score("ten"), None);
        assert_eq!(parse_score(""), None);
        assert_eq!(parse_score("99999999999999999999"), None);
    }
}
