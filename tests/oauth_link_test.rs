#![cfg(feature = "db_tests")]
/// Social sign-on resolution against a live database.
///
/// Covers the three outcomes of resolving provider user info: sign in
/// over an existing connection, link by email, and auto-signup.
mod common;

use async_trait::async_trait;
use common::fixtures;
use huddle_service::db::{oauth_repo, profile_repo, user_repo};
use huddle_service::services::oauth::{
    resolve_oauth_user, OAuthError, OAuthProvider, OAuthUserInfo,
};
use mockall::mock;
use mockall::predicate::eq;

mock! {
    Provider {}

    #[async_trait]
    impl OAuthProvider for Provider {
        fn provider_name(&self) -> &str;
        fn authorization_url(&self, state: &str, redirect_uri: &str) -> String;
        fn verify_state(&self, state: &str) -> Result<(), OAuthError>;
        async fn exchange_code(
            &self,
            code: &str,
            redirect_uri: &str,
        ) -> Result<OAuthUserInfo, OAuthError>;
    }
}

fn provider_info(email: &str, provider_user_id: &str) -> OAuthUserInfo {
    OAuthUserInfo {
        provider: "google".to_string(),
        provider_user_id: provider_user_id.to_string(),
        email: email.to_string(),
        display_name: Some("Sam Rivera".to_string()),
        avatar_url: Some("https://lh3.example.com/avatar.jpg".to_string()),
    }
}

#[tokio::test]
async fn first_social_signin_creates_user_with_profile() {
    let pool = fixtures::create_test_pool().await;
    let email = format!("{}@gmail.example", fixtures::unique("sam"));
    let info = provider_info(&email, &fixtures::unique("gid"));

    let user = resolve_oauth_user(&pool, &info).await.unwrap();

    assert_eq!(user.email, email);
    assert!(!user.has_password());
    assert!(user.username.starts_with("sam"));

    let profile = profile_repo::find_by_user_id(&pool, user.id)
        .await
        .unwrap()
        .expect("profile should be created alongside the user");
    assert_eq!(profile.full_name, "Sam Rivera");
    assert_eq!(profile.email, email);
    assert_eq!(
        profile.avatar_url.as_deref(),
        Some("https://lh3.example.com/avatar.jpg")
    );

    let connection = oauth_repo::find_by_provider(&pool, "google", &info.provider_user_id)
        .await
        .unwrap()
        .expect("connection should be recorded");
    assert_eq!(connection.user_id, user.id);
}

#[tokio::test]
async fn repeat_signin_resolves_the_same_user() {
    let pool = fixtures::create_test_pool().await;
    let email = format!("{}@gmail.example", fixtures::unique("repeat"));
    let info = provider_info(&email, &fixtures::unique("gid"));

    let first = resolve_oauth_user(&pool, &info).await.unwrap();
    let second = resolve_oauth_user(&pool, &info).await.unwrap();

    assert_eq!(first.id, second.id);
    // No duplicate account got created.
    let found = user_repo::find_by_email(&pool, &email).await.unwrap();
    assert_eq!(found.unwrap().id, first.id);
}

#[tokio::test]
async fn matching_email_links_to_existing_account() {
    let pool = fixtures::create_test_pool().await;
    let existing = fixtures::create_user(&pool, "local").await;

    let info = provider_info(&existing.email, &fixtures::unique("gid"));
    let resolved = resolve_oauth_user(&pool, &info).await.unwrap();

    assert_eq!(resolved.id, existing.id);

    let connection = oauth_repo::find_by_provider(&pool, "google", &info.provider_user_id)
        .await
        .unwrap()
        .expect("provider should now be linked");
    assert_eq!(connection.user_id, existing.id);
}

#[tokio::test]
async fn username_collision_gets_a_suffix() {
    let pool = fixtures::create_test_pool().await;
    let taken = fixtures::unique("taken");
    user_repo::create_with_profile(&pool, &format!("{}@a.example", taken), &taken, "hash")
        .await
        .unwrap();

    // Same local-part, different email domain.
    let info = provider_info(&format!("{}@b.example", taken), &fixtures::unique("gid"));
    let user = resolve_oauth_user(&pool, &info).await.unwrap();

    assert_ne!(user.username, taken);
    assert!(user.username.starts_with(&format!("{}_", taken)));
}

#[tokio::test]
async fn empty_email_from_provider_is_rejected() {
    let pool = fixtures::create_test_pool().await;
    let info = provider_info("", &fixtures::unique("gid"));
    assert!(resolve_oauth_user(&pool, &info).await.is_err());
}

#[tokio::test]
async fn resolver_consumes_mocked_provider_output() {
    let pool = fixtures::create_test_pool().await;
    let email = format!("{}@gmail.example", fixtures::unique("mocked"));
    let expected = provider_info(&email, &fixtures::unique("gid"));

    let mut provider = MockProvider::new();
    provider.expect_verify_state().returning(|_| Ok(()));
    let returned = expected.clone();
    provider
        .expect_exchange_code()
        .with(eq("auth-code"), eq("http://localhost:3000/auth/callback"))
        .returning(move |_, _| Ok(returned.clone()));

    provider.verify_state("a-long-enough-state").unwrap();
    let info = provider
        .exchange_code("auth-code", "http://localhost:3000/auth/callback")
        .await
        .unwrap();

    let user = resolve_oauth_user(&pool, &info).await.unwrap();
    assert_eq!(user.email, email);
}
