#![cfg(feature = "db_tests")]
/// Member directory search and dashboard pagination against a live
/// database. Rows are tagged with unique markers so suites sharing the
/// database do not interfere.
mod common;

use actix_web::{test, web, App};
use common::fixtures;
use huddle_service::db::profile_repo;
use huddle_service::middleware::JwtAuthMiddleware;
use huddle_service::models::User;
use huddle_service::{handlers, AppState};
use sqlx::PgPool;

async fn spawn_app(
    pool: PgPool,
) -> impl actix_web::dev::Service<
    actix_http::Request,
    Response = actix_web::dev::ServiceResponse,
    Error = actix_web::Error,
> {
    let state = AppState {
        db: pool,
        config: fixtures::test_config(),
    };

    test::init_service(
        App::new().app_data(web::Data::new(state)).service(
            web::scope("/api/v1").service(
                web::scope("")
                    .wrap(JwtAuthMiddleware)
                    .route("/dashboard", web::get().to(handlers::dashboard)),
            ),
        ),
    )
    .await
}

async fn set_full_name(pool: &PgPool, user: &User, full_name: &str) {
    profile_repo::update_details(pool, user.id, full_name, "", "", "", None)
        .await
        .unwrap();
}

#[tokio::test]
async fn search_matches_username_name_and_email_but_not_viewer() {
    let pool = fixtures::create_test_pool().await;
    let marker = fixtures::unique("needle");

    let viewer = fixtures::create_user(&pool, "viewer").await;
    set_full_name(&pool, &viewer, &format!("Viewer {}", marker)).await;

    // Hit on username.
    let by_username = fixtures::create_user(&pool, &marker).await;
    // Hit on full name.
    let by_name = fixtures::create_user(&pool, "plain").await;
    set_full_name(&pool, &by_name, &format!("Named {}", marker)).await;
    // Hit on profile email.
    let by_email = fixtures::create_user(&pool, "mailer").await;
    profile_repo::update_details(
        &pool,
        by_email.id,
        "",
        &format!("{}@contact.example", marker),
        "",
        "",
        None,
    )
    .await
    .unwrap();
    // Miss.
    fixtures::create_user(&pool, "bystander").await;

    let found = profile_repo::search_members(&pool, viewer.id, &marker, 10, 0)
        .await
        .unwrap();
    let ids: Vec<_> = found.iter().map(|m| m.user_id).collect();

    assert_eq!(found.len(), 3);
    assert!(ids.contains(&by_username.id));
    assert!(ids.contains(&by_name.id));
    assert!(ids.contains(&by_email.id));
    assert!(!ids.contains(&viewer.id));

    assert_eq!(
        profile_repo::count_members(&pool, viewer.id, &marker)
            .await
            .unwrap(),
        3
    );

    // Matching is case-insensitive.
    let upper = profile_repo::search_members(&pool, viewer.id, &marker.to_uppercase(), 10, 0)
        .await
        .unwrap();
    assert_eq!(upper.len(), 3);
}

#[tokio::test]
async fn search_treats_like_metacharacters_literally() {
    let pool = fixtures::create_test_pool().await;
    let viewer = fixtures::create_user(&pool, "viewer").await;

    let tag = fixtures::unique("pct");
    let literal = fixtures::create_user(&pool, "literal").await;
    set_full_name(&pool, &literal, &format!("50%{}", tag)).await;
    let decoy = fixtures::create_user(&pool, "decoy").await;
    set_full_name(&pool, &decoy, &format!("50a{}", tag)).await;

    // Unescaped, "50%" would match the decoy as well.
    let found = profile_repo::search_members(&pool, viewer.id, &format!("50%{}", tag), 10, 0)
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].user_id, literal.id);

    let tag = fixtures::unique("und");
    let literal = fixtures::create_user(&pool, "underscore").await;
    set_full_name(&pool, &literal, &format!("a_c{}", tag)).await;
    let decoy = fixtures::create_user(&pool, "decoy").await;
    set_full_name(&pool, &decoy, &format!("abc{}", tag)).await;

    let found = profile_repo::search_members(&pool, viewer.id, &format!("a_c{}", tag), 10, 0)
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].user_id, literal.id);
}

#[tokio::test]
async fn dashboard_paginates_and_clamps_page_numbers() {
    let pool = fixtures::create_test_pool().await;
    let marker = fixtures::unique("page");

    let viewer = fixtures::create_user(&pool, "viewer").await;
    for _ in 0..7 {
        let member = fixtures::create_user(&pool, "member").await;
        set_full_name(&pool, &member, &format!("Member {}", marker)).await;
    }

    let app = spawn_app(pool).await;
    let token = fixtures::bearer_for(&viewer);

    // 7 matches at 6 per page: page 1 is full.
    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/dashboard?q={}", marker))
        .insert_header(("Authorization", token.clone()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["total_members"], 7);
    assert_eq!(body["num_pages"], 2);
    assert_eq!(body["page"], 1);
    assert_eq!(body["members"].as_array().unwrap().len(), 6);

    // Past the end lands on the last page.
    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/dashboard?q={}&page=99", marker))
        .insert_header(("Authorization", token.clone()))
        .to_request();
    let body: serde_json::Value =
        test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["page"], 2);
    assert_eq!(body["members"].as_array().unwrap().len(), 1);

    // Junk page values fall back to the first page.
    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/dashboard?q={}&page=banana", marker))
        .insert_header(("Authorization", token))
        .to_request();
    let body: serde_json::Value =
        test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["page"], 1);
    assert_eq!(body["members"].as_array().unwrap().len(), 6);
}
