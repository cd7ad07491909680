//! GraphQL directory client against a mocked Hasura endpoint.

use serde_json::json;
use session_auth::config::GraphqlConfig;
use session_auth::directory::{GraphqlDirectory, IdentityDirectory, NewUser};
use session_auth::error::DirectoryError;
use session_auth::roles::Role;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SECRET: &str = "hasura-admin-secret";

fn directory(server: &MockServer) -> GraphqlDirectory {
    let config = GraphqlConfig {
        url: format!("{}/v1/graphql", server.uri()).parse().unwrap(),
        admin_secret: SECRET.into(),
    };
    GraphqlDirectory::new(reqwest::Client::new(), &config)
}

fn graphql_endpoint() -> wiremock::MockBuilder {
    Mock::given(method("POST"))
        .and(path("/v1/graphql"))
        .and(header("x-hasura-admin-secret", SECRET))
}

#[tokio::test]
async fn lookup_returns_first_user() {
    let server = MockServer::start().await;
    graphql_endpoint()
        .and(body_partial_json(
            json!({ "variables": { "email": "a@example.com" } }),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "users": [{ "id": "u-1", "role": "admin" }] }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let user = directory(&server)
        .find_user_by_email("a@example.com")
        .await
        .unwrap();
    assert_eq!(user.id, "u-1");
    assert_eq!(user.role, "admin");
}

#[tokio::test]
async fn empty_result_is_not_found() {
    let server = MockServer::start().await;
    graphql_endpoint()
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "data": { "users": [] } })),
        )
        .mount(&server)
        .await;

    let err = directory(&server)
        .find_user_by_email("nobody@example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, DirectoryError::NotFound(ref email) if email == "nobody@example.com"));
}

#[tokio::test]
async fn null_result_is_unexpected() {
    let server = MockServer::start().await;
    graphql_endpoint()
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "data": { "users": null } })),
        )
        .mount(&server)
        .await;

    let err = directory(&server)
        .find_user_by_email("a@example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, DirectoryError::UnexpectedResponse(_)));
    assert!(!err.is_not_found());
}

#[tokio::test]
async fn graphql_errors_are_reported() {
    let server = MockServer::start().await;
    graphql_endpoint()
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errors": [
                { "message": "field 'users' not found in type: 'query_root'" },
                { "message": "second problem" }
            ]
        })))
        .mount(&server)
        .await;

    let err = directory(&server)
        .find_user_by_email("a@example.com")
        .await
        .unwrap_err();
    match err {
        DirectoryError::Graphql(messages) => assert_eq!(messages.len(), 2),
        other => panic!("expected graphql errors, got {other}"),
    }
}

#[tokio::test]
async fn wrong_secret_is_a_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let config = GraphqlConfig {
        url: format!("{}/v1/graphql", server.uri()).parse().unwrap(),
        admin_secret: "wrong".into(),
    };
    let err = GraphqlDirectory::new(reqwest::Client::new(), &config)
        .find_user_by_email("a@example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, DirectoryError::Transport(_)));
}

#[tokio::test]
async fn insert_sends_role_and_returns_record() {
    let server = MockServer::start().await;
    graphql_endpoint()
        .and(body_partial_json(json!({
            "variables": { "email": "new@example.com", "name": "New User", "role": "student" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "insert_users": { "returning": [{
                "id": "u-2",
                "role": "student",
                "name": "New User",
                "email": "new@example.com",
                "created_at": "2024-03-01T10:15:30.123456+00:00",
                "updated_at": "2024-03-01T10:15:30.123456+00:00"
            }] } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let user = directory(&server)
        .insert_user(NewUser {
            email: "new@example.com".into(),
            name: "New User".into(),
            role: Role::Student,
        })
        .await
        .unwrap();
    assert_eq!(user.id, "u-2");
    assert_eq!(user.email.as_deref(), Some("new@example.com"));
    assert!(user.created_at.is_some());
}

#[tokio::test]
async fn insert_without_returning_rows_is_unexpected() {
    let server = MockServer::start().await;
    graphql_endpoint()
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "insert_users": { "returning": [] } }
        })))
        .mount(&server)
        .await;

    let err = directory(&server)
        .insert_user(NewUser {
            email: "new@example.com".into(),
            name: "New User".into(),
            role: Role::Student,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DirectoryError::UnexpectedResponse(_)));
}
