//! REST backend tests against a mock database server.

use futures_util::StreamExt;
use memoria_core::error::{AuthError, RemoteErrorKind};
use memoria_core::model::Idea;
use memoria_core::{
    AccessToken, AuthProvider, AuthState, Credentials, Error, FieldPatch, Identity, ListBinding,
    PathMode, StoragePath, Store, StoreUrl, SyncStatus,
};
use memoria_rest::{RestAuth, RestStore};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn mock_db_url(server: &MockServer) -> StoreUrl {
    StoreUrl::new(format!("http://127.0.0.1:{}", server.address().port())).unwrap()
}

fn store(server: &MockServer) -> RestStore {
    RestStore::new(mock_db_url(server))
        .unwrap()
        .with_token(AccessToken::new("id-token"))
}

fn storage(s: &str) -> StoragePath {
    StoragePath::new(s).unwrap()
}

fn sse(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/event-stream")
        .set_body_string(body)
}

// ============================================================================
// Writes
// ============================================================================

#[tokio::test]
async fn set_is_an_authenticated_put() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/users/u1/ideas/a.json"))
        .and(query_param("auth", "id-token"))
        .and(query_param("print", "silent"))
        .and(body_json(json!({"text": "buy milk"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    store(&server)
        .set(&storage("users/u1/ideas/a"), &json!({"text": "buy milk"}))
        .await
        .unwrap();
}

#[tokio::test]
async fn update_sends_nulls_for_removed_fields() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/users/u1/familyMembers/m1.json"))
        .and(body_json(json!({"customName": null, "avatarUrl": "x.png"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let patch = FieldPatch::new()
        .remove("customName")
        .set("avatarUrl", "x.png");
    store(&server)
        .update(&storage("users/u1/familyMembers/m1"), &patch)
        .await
        .unwrap();
}

#[tokio::test]
async fn remove_is_a_delete() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/commonNotes/n1.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(null)))
        .expect(1)
        .mount(&server)
        .await;

    store(&server)
        .remove(&storage("commonNotes/n1"))
        .await
        .unwrap();
}

#[tokio::test]
async fn rule_rejection_is_permission_denied() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"error": "Permission denied"})),
        )
        .mount(&server)
        .await;

    let err = store(&server)
        .set(&storage("users/u2/ideas/a"), &json!({"text": "x"}))
        .await
        .unwrap_err();
    assert_eq!(err.remote_kind(), Some(RemoteErrorKind::PermissionDenied));
    assert!(err.to_string().contains("Permission denied"));
}

#[tokio::test]
async fn server_errors_are_unavailable() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = store(&server)
        .remove(&storage("ideas/a"))
        .await
        .unwrap_err();
    assert_eq!(err.remote_kind(), Some(RemoteErrorKind::Unavailable));
}

// ============================================================================
// Subscriptions
// ============================================================================

#[tokio::test]
async fn subscription_applies_put_and_patch_events() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/u1/ideas.json"))
        .and(header("accept", "text/event-stream"))
        .and(query_param("auth", "id-token"))
        .respond_with(sse(concat!(
            "event: put\n",
            "data: {\"path\":\"/\",\"data\":{\"a\":{\"text\":\"x\",\"status\":\"pending\"}}}\n\n",
            "event: keep-alive\n",
            "data: null\n\n",
            "event: patch\n",
            "data: {\"path\":\"/a\",\"data\":{\"status\":\"done\"}}\n\n",
            "event: put\n",
            "data: {\"path\":\"/a\",\"data\":null}\n\n",
        )))
        .mount(&server)
        .await;

    let mut sub = store(&server).subscribe(&storage("users/u1/ideas")).unwrap();

    let first = sub.next().await.unwrap().unwrap();
    assert_eq!(first.get("a"), Some(&json!({"text": "x", "status": "pending"})));

    let second = sub.next().await.unwrap().unwrap();
    assert_eq!(second.get("a"), Some(&json!({"text": "x", "status": "done"})));

    let third = sub.next().await.unwrap().unwrap();
    assert!(third.is_empty());

    let closed = sub.next().await.unwrap().unwrap_err();
    assert_eq!(closed.remote_kind(), Some(RemoteErrorKind::Unavailable));
    assert!(sub.next().await.is_none());
}

#[tokio::test]
async fn cancel_event_is_permission_denied() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(sse("event: put\ndata: {\"path\":\"/\",\"data\":null}\n\nevent: cancel\ndata: null\n\n"))
        .mount(&server)
        .await;

    let mut sub = store(&server).subscribe(&storage("commonNotes")).unwrap();
    assert!(sub.next().await.unwrap().unwrap().is_empty());

    let err = sub.next().await.unwrap().unwrap_err();
    assert_eq!(err.remote_kind(), Some(RemoteErrorKind::PermissionDenied));
    assert!(sub.next().await.is_none());
}

#[tokio::test]
async fn refused_stream_is_reported_once() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"error": "Permission denied"})),
        )
        .mount(&server)
        .await;

    let mut sub = store(&server).subscribe(&storage("users/u2/ideas")).unwrap();
    let err = sub.next().await.unwrap().unwrap_err();
    assert_eq!(err.remote_kind(), Some(RemoteErrorKind::PermissionDenied));
    assert!(sub.next().await.is_none());
}

#[tokio::test]
async fn binding_errors_when_the_server_closes_the_stream() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/u1/ideas.json"))
        .respond_with(sse(concat!(
            "event: put\n",
            "data: {\"path\":\"/\",\"data\":{\"a\":{\"text\":\"x\",\"createdAt\":\"2024-05-01T09:30:00.000Z\",\"status\":\"pending\",\"category\":\"Home\"}}}\n\n",
        )))
        .mount(&server)
        .await;

    let auth = AuthState::signed_in(Identity::new("u1", "Alice"));
    let binding: ListBinding<_, Idea> =
        ListBinding::open(Arc::new(store(&server)), "ideas", PathMode::UserScoped, &auth)
            .unwrap();

    let mut rx = binding.watch();
    let state = tokio::time::timeout(
        Duration::from_secs(5),
        rx.wait_for(|s| s.status == SyncStatus::Errored),
    )
    .await
    .unwrap()
    .unwrap()
    .clone();
    assert!(state.items.is_empty());
    assert_eq!(
        state.error.unwrap().remote_kind(),
        Some(RemoteErrorKind::Unavailable)
    );
}

// ============================================================================
// Accounts
// ============================================================================

#[tokio::test]
async fn sign_up_sets_display_name() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/accounts:signUp"))
        .and(query_param("key", "api-key"))
        .and(body_json(json!({
            "email": "bob@example.com",
            "password": "secret123",
            "returnSecureToken": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "localId": "u2",
            "idToken": "bob-token",
            "email": "bob@example.com",
            "refreshToken": "r",
            "expiresIn": "3600"
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/accounts:update"))
        .and(body_json(json!({
            "idToken": "bob-token",
            "displayName": "Bob",
            "returnSecureToken": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"localId": "u2"})))
        .expect(1)
        .mount(&server)
        .await;

    let auth = RestAuth::new("api-key")
        .unwrap()
        .with_endpoint(format!("{}/v1", server.uri()));
    let session = auth
        .sign_up(&Credentials::new("bob@example.com", "secret123"), Some("Bob"))
        .await
        .unwrap();

    assert_eq!(session.identity.user_id, "u2");
    assert_eq!(session.identity.display_name, "Bob");
    assert_eq!(session.access_token.as_str(), "bob-token");
}

#[tokio::test]
async fn sign_in_with_wrong_password() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/accounts:signInWithPassword"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"code": 400, "message": "INVALID_LOGIN_CREDENTIALS", "errors": []}
        })))
        .mount(&server)
        .await;

    let auth = RestAuth::new("api-key")
        .unwrap()
        .with_endpoint(format!("{}/v1", server.uri()));
    let err = auth
        .sign_in(&Credentials::new("bob@example.com", "nope"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Auth(AuthError::InvalidCredentials(_))));
}
