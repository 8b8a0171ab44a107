//! Contract tests for the HTTP adapters against a mock backend.

use linkvault::backend::{Backend, HttpAuthService, HttpRecordService};
use linkvault::{AuthService, NewBookmark, RecordService, ServiceError};
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn backend(server: &MockServer) -> Backend {
    Backend::new(
        &server.uri(),
        SecretString::from("anon-key"),
        SecretString::from("access-token"),
    )
    .unwrap()
}

fn bookmark_json(id: &str, user_id: &str) -> serde_json::Value {
    json!({
        "id": id,
        "title": format!("Title {id}"),
        "url": format!("https://example.com/{id}"),
        "user_id": user_id,
        "created_at": "2026-08-01T12:00:00Z"
    })
}

// ============================================================================
// Record Service
// ============================================================================

#[tokio::test]
async fn test_fetch_all_sends_filters_and_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/bookmarks"))
        .and(query_param("select", "*"))
        .and(query_param("user_id", "eq.u1"))
        .and(query_param("order", "created_at.desc"))
        .and(header("apikey", "anon-key"))
        .and(header("authorization", "Bearer access-token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([bookmark_json("b1", "u1"), bookmark_json("b2", "u1")])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let service = HttpRecordService::new(backend(&server).await);
    let rows = service.fetch_all("u1").await.unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].id, "b1");
}

#[tokio::test]
async fn test_insert_posts_fields_and_returns_representation() {
    let server = MockServer::start().await;
    let fields = NewBookmark {
        title: "Example".to_string(),
        url: "https://example.com".to_string(),
        user_id: "u1".to_string(),
    };
    Mock::given(method("POST"))
        .and(path("/rest/v1/bookmarks"))
        .and(header("Prefer", "return=representation"))
        .and(body_json(json!({
            "title": "Example",
            "url": "https://example.com",
            "user_id": "u1"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
            "id": "b9",
            "title": "Example",
            "url": "https://example.com",
            "user_id": "u1",
            "created_at": "2026-08-01T12:00:00Z"
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let service = HttpRecordService::new(backend(&server).await);
    let row = service.insert(&fields).await.unwrap();

    assert_eq!(row.id, "b9");
    assert_eq!(row.title, "Example");
}

#[tokio::test]
async fn test_insert_with_empty_representation_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/bookmarks"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .mount(&server)
        .await;

    let service = HttpRecordService::new(backend(&server).await);
    let result = service
        .insert(&NewBookmark {
            title: "t".to_string(),
            url: "https://example.com".to_string(),
            user_id: "u1".to_string(),
        })
        .await;

    assert!(matches!(result, Err(ServiceError::Decode(_))));
}

#[tokio::test]
async fn test_delete_targets_row_by_id() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/bookmarks"))
        .and(query_param("id", "eq.b1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let service = HttpRecordService::new(backend(&server).await);
    service.delete("b1").await.unwrap();
}

#[tokio::test]
async fn test_401_maps_to_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/bookmarks"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let service = HttpRecordService::new(backend(&server).await);
    let result = service.fetch_all("u1").await;

    assert!(matches!(result, Err(ServiceError::Unauthorized)));
}

#[tokio::test]
async fn test_server_error_maps_to_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/bookmarks"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let service = HttpRecordService::new(backend(&server).await);
    let result = service.fetch_all("u1").await;

    match result {
        Err(ServiceError::Http(503)) => {}
        other => panic!("expected Http(503), got {other:?}"),
    }
    assert!(ServiceError::Http(503).is_retryable());
}

// ============================================================================
// Auth Service
// ============================================================================

#[tokio::test]
async fn test_get_session_returns_user() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header("apikey", "anon-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "u1",
            "email": "u1@example.com",
            "role": "authenticated"
        })))
        .mount(&server)
        .await;

    let auth = HttpAuthService::new(backend(&server).await);
    let session = auth.get_session().await.unwrap().unwrap();

    assert_eq!(session.user_id, "u1");
    assert_eq!(session.email, "u1@example.com");
}

#[tokio::test]
async fn test_get_session_with_expired_token_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let auth = HttpAuthService::new(backend(&server).await);
    assert!(auth.get_session().await.unwrap().is_none());
}

#[tokio::test]
async fn test_sign_out_posts_logout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .and(header("authorization", "Bearer access-token"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let auth = HttpAuthService::new(backend(&server).await);
    auth.sign_out().await.unwrap();
}
