use forum_client::{ForumClient, TokenStore};
use forum_core::{
    CoreError, ForumApiError, MapSettings, SettingsProvider, TokenPair, FORUM_ACCESS_TOKEN,
    FORUM_REFRESH_TOKEN,
};
use mockito::{Matcher, Server};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

const POST_BODY: &str = r#"{
    "success": true,
    "message": "Post created",
    "data": {
        "_id": "post-1",
        "title": "Future of AI",
        "description": "AI is advancing fast",
        "userName": "eliza",
        "createdAt": "2024-03-13T10:00:00.000Z"
    }
}"#;

fn refresh_body(access: &str, refresh: &str) -> String {
    json!({
        "success": true,
        "data": { "accessToken": access, "refreshToken": refresh }
    })
    .to_string()
}

fn initial_tokens() -> TokenPair {
    TokenPair::new("a0", "r0")
}

#[tokio::test]
async fn test_create_post_refreshes_then_posts_and_persists() {
    let mut server = Server::new_async().await;
    let dir = TempDir::new().unwrap();
    let store = TokenStore::new(dir.path().join("forum-tokens.json"));

    let refresh = server
        .mock("POST", "/auth/refresh-token")
        .match_body(Matcher::PartialJson(json!({ "refreshToken": "r0" })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(refresh_body("a1", "r1"))
        .expect(1)
        .create_async()
        .await;
    let post = server
        .mock("POST", "/community/create-post")
        .match_header("authorization", "Bearer a1")
        .match_body(Matcher::Json(json!({
            "title": "Future of AI",
            "description": "AI is advancing fast"
        })))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(POST_BODY)
        .expect(1)
        .create_async()
        .await;

    let client = ForumClient::new(server.url(), initial_tokens())
        .unwrap()
        .with_token_store(store.clone());
    let record = client
        .create_post("Future of AI", "AI is advancing fast")
        .await
        .unwrap();

    assert_eq!(record.id, "post-1");
    assert_eq!(record.user_name, "eliza");
    refresh.assert_async().await;
    post.assert_async().await;

    let tokens = client.get_tokens().await;
    assert_eq!(tokens, TokenPair::new("a1", "r1"));
    assert_eq!(store.load(), Some(tokens));
}

#[tokio::test]
async fn test_unauthorized_request_is_retried_once_with_new_token() {
    let mut server = Server::new_async().await;

    let first_refresh = server
        .mock("POST", "/auth/refresh-token")
        .match_body(Matcher::PartialJson(json!({ "refreshToken": "r0" })))
        .with_status(200)
        .with_body(refresh_body("a1", "r1"))
        .expect(1)
        .create_async()
        .await;
    let second_refresh = server
        .mock("POST", "/auth/refresh-token")
        .match_body(Matcher::PartialJson(json!({ "refreshToken": "r1" })))
        .with_status(200)
        .with_body(refresh_body("a2", "r2"))
        .expect(1)
        .create_async()
        .await;
    let rejected = server
        .mock("POST", "/community/create-post")
        .match_header("authorization", "Bearer a1")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    let accepted = server
        .mock("POST", "/community/create-post")
        .match_header("authorization", "Bearer a2")
        .with_status(201)
        .with_body(POST_BODY)
        .expect(1)
        .create_async()
        .await;

    let client = ForumClient::new(server.url(), initial_tokens()).unwrap();
    let record = client
        .create_post("Future of AI", "AI is advancing fast")
        .await
        .unwrap();

    assert_eq!(record.id, "post-1");
    assert_eq!(client.get_tokens().await, TokenPair::new("a2", "r2"));
    first_refresh.assert_async().await;
    second_refresh.assert_async().await;
    rejected.assert_async().await;
    accepted.assert_async().await;

    let metrics = client.metrics().get_metrics().await;
    assert_eq!(metrics.auth_retries, 1);
    assert_eq!(metrics.token_refreshes, 2);
}

#[tokio::test]
async fn test_second_unauthorized_is_surfaced() {
    let mut server = Server::new_async().await;

    // One preemptive refresh plus one reactive refresh.
    let refresh = server
        .mock("POST", "/auth/refresh-token")
        .with_status(200)
        .with_body(refresh_body("a1", "r1"))
        .expect(2)
        .create_async()
        .await;
    let post = server
        .mock("POST", "/community/create-post")
        .with_status(401)
        .expect(2)
        .create_async()
        .await;

    let client = ForumClient::new(server.url(), initial_tokens()).unwrap();
    let result = client.create_post("Title", "Description text").await;

    assert!(matches!(
        result,
        Err(CoreError::ForumApi(ForumApiError::AuthExpired))
    ));
    refresh.assert_async().await;
    post.assert_async().await;
}

#[tokio::test]
async fn test_create_post_continues_when_refresh_fails() {
    let mut server = Server::new_async().await;

    let _refresh = server
        .mock("POST", "/auth/refresh-token")
        .with_status(500)
        .create_async()
        .await;
    let post = server
        .mock("POST", "/community/create-post")
        .match_header("authorization", "Bearer a0")
        .with_status(201)
        .with_body(POST_BODY)
        .expect(1)
        .create_async()
        .await;

    let client = ForumClient::new(server.url(), initial_tokens()).unwrap();
    assert!(client.create_post("Title", "Description text").await.is_ok());
    assert_eq!(client.get_tokens().await, initial_tokens());
    post.assert_async().await;
}

#[tokio::test]
async fn test_validation_errors_are_surfaced_unchanged() {
    let mut server = Server::new_async().await;

    let _refresh = server
        .mock("POST", "/auth/refresh-token")
        .with_status(200)
        .with_body(refresh_body("a1", "r1"))
        .create_async()
        .await;
    let _post = server
        .mock("POST", "/community/create-post")
        .with_status(422)
        .with_body("title too long")
        .create_async()
        .await;

    let client = ForumClient::new(server.url(), initial_tokens()).unwrap();
    match client.create_post("Title", "Description text").await {
        Err(CoreError::ForumApi(ForumApiError::RequestFailed { status_code, body })) => {
            assert_eq!(status_code, 422);
            assert_eq!(body, "title too long");
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_rejected_refresh_keeps_tokens() {
    let mut server = Server::new_async().await;
    let dir = TempDir::new().unwrap();
    let store = TokenStore::new(dir.path().join("forum-tokens.json"));

    let _refresh = server
        .mock("POST", "/auth/refresh-token")
        .with_status(200)
        .with_body(r#"{"success": false, "message": "expired"}"#)
        .create_async()
        .await;

    let client = ForumClient::new(server.url(), initial_tokens())
        .unwrap()
        .with_token_store(store.clone());

    assert!(!client.refresh_tokens().await);
    assert_eq!(client.get_tokens().await, initial_tokens());
    assert!(!store.exists());
}

#[tokio::test]
async fn test_malformed_refresh_response_keeps_tokens() {
    let mut server = Server::new_async().await;
    let _refresh = server
        .mock("POST", "/auth/refresh-token")
        .with_status(200)
        .with_body("<html>gateway</html>")
        .create_async()
        .await;

    let client = ForumClient::new(server.url(), initial_tokens()).unwrap();
    assert!(!client.refresh_tokens().await);
    assert_eq!(client.get_tokens().await, initial_tokens());
}

#[tokio::test]
async fn test_valid_token_skips_refresh() {
    let mut server = Server::new_async().await;

    let verify = server
        .mock("GET", "/auth/verify-token")
        .match_header("authorization", "Bearer a0")
        .with_status(200)
        .with_body(r#"{"success": true}"#)
        .expect(1)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/auth/refresh-token")
        .expect(0)
        .create_async()
        .await;

    let client = ForumClient::new(server.url(), initial_tokens()).unwrap();
    assert!(client.refresh_token_if_needed().await);
    verify.assert_async().await;
    refresh.assert_async().await;
}

#[tokio::test]
async fn test_missing_verify_endpoint_triggers_refresh() {
    let mut server = Server::new_async().await;

    let _verify = server
        .mock("GET", "/api/v1/v1/auth/verify-token")
        .with_status(404)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/api/v1/auth/refresh-token")
        .with_status(200)
        .with_body(refresh_body("a1", "r1"))
        .expect(1)
        .create_async()
        .await;

    let base_url = format!("{}/api/v1", server.url());
    let client = ForumClient::new(base_url, initial_tokens()).unwrap();
    assert!(client.refresh_token_if_needed().await);
    assert_eq!(client.get_tokens().await, TokenPair::new("a1", "r1"));
    refresh.assert_async().await;
}

#[tokio::test]
async fn test_expired_token_with_failing_refresh_is_unusable() {
    let mut server = Server::new_async().await;

    let _verify = server
        .mock("GET", "/auth/verify-token")
        .with_status(401)
        .create_async()
        .await;
    let _refresh = server
        .mock("POST", "/auth/refresh-token")
        .with_status(503)
        .create_async()
        .await;

    let client = ForumClient::new(server.url(), initial_tokens()).unwrap();
    assert!(!client.refresh_token_if_needed().await);
    assert_eq!(client.get_tokens().await, initial_tokens());
}

#[tokio::test]
async fn test_refresh_mirrors_tokens_into_settings() {
    let mut server = Server::new_async().await;
    let dir = TempDir::new().unwrap();
    let store = TokenStore::new(dir.path().join("forum-tokens.json"));
    let settings = Arc::new(
        MapSettings::new()
            .with(FORUM_ACCESS_TOKEN, "a0")
            .with(FORUM_REFRESH_TOKEN, "r0"),
    );

    let _refresh = server
        .mock("POST", "/auth/refresh-token")
        .with_status(200)
        .with_body(refresh_body("a1", "r1"))
        .create_async()
        .await;
    let _post = server
        .mock("POST", "/community/create-post")
        .with_status(503)
        .create_async()
        .await;

    let client = ForumClient::new(server.url(), initial_tokens())
        .unwrap()
        .with_token_store(store.clone())
        .with_settings(settings.clone());

    // The rotated pair must survive a failed post.
    assert!(client.create_post("Title", "Description").await.is_err());

    assert_eq!(settings.get(FORUM_ACCESS_TOKEN).as_deref(), Some("a1"));
    assert_eq!(settings.get(FORUM_REFRESH_TOKEN).as_deref(), Some("r1"));
    assert_eq!(store.load(), Some(TokenPair::new("a1", "r1")));
}

#[tokio::test]
async fn test_rejected_refresh_leaves_settings_alone() {
    let mut server = Server::new_async().await;
    let settings = Arc::new(
        MapSettings::new()
            .with(FORUM_ACCESS_TOKEN, "a0")
            .with(FORUM_REFRESH_TOKEN, "r0"),
    );

    let _refresh = server
        .mock("POST", "/auth/refresh-token")
        .with_status(200)
        .with_body(r#"{"success": false}"#)
        .create_async()
        .await;

    let client = ForumClient::new(server.url(), initial_tokens())
        .unwrap()
        .with_settings(settings.clone());

    assert!(!client.refresh_tokens().await);
    assert_eq!(settings.get(FORUM_ACCESS_TOKEN).as_deref(), Some("a0"));
    assert_eq!(settings.get(FORUM_REFRESH_TOKEN).as_deref(), Some("r0"));

    let metrics = client.metrics().get_metrics().await;
    assert_eq!(metrics.failed_token_refreshes, 1);
    assert_eq!(metrics.token_refreshes, 0);
}
