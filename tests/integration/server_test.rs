//! Integration tests for the HTTP backend over a real socket.

use std::sync::Arc;

use axum::routing::post;
use axum::{Json, Router};
use giant::auth::{OAuthClient, OAuthConfig};
use giant::server::{self, ServerState};
use giant::warehouse::{MockWarehouseClient, MockWarehouseFactory};
use pretty_assertions::assert_eq;
use reqwest::StatusCode;
use serde_json::{json, Value};

use super::spawn_stub;

async fn token_stub() -> String {
    let app = Router::new().route(
        "/token",
        post(|| async {
            Json(json!({
                "access_token": "ya29.server",
                "token_type": "Bearer",
                "expires_in": 3599,
                "refresh_token": "1//server"
            }))
        }),
    );
    format!("http://{}/token", spawn_stub(app).await)
}

async fn start(oauth: Option<OAuthClient>) -> (String, Arc<MockWarehouseClient>) {
    let client = Arc::new(MockWarehouseClient::new());
    let state = ServerState {
        oauth: oauth.map(Arc::new),
        warehouse: Arc::new(MockWarehouseFactory::new(client.clone())),
        default_project_id: Some("proj-default".to_string()),
    };
    let addr = spawn_stub(server::router(state)).await;
    (format!("http://{addr}"), client)
}

fn oauth_client(token_url: String) -> OAuthClient {
    OAuthClient::new(OAuthConfig {
        client_id: "client-123".to_string(),
        client_secret: None,
        redirect_uri: "http://localhost:5173/oauth-callback".to_string(),
        auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
        token_url,
        scopes: vec!["https://www.googleapis.com/auth/bigquery".to_string()],
    })
}

#[tokio::test]
async fn test_auth_url_then_token_exchange() {
    let (base, _) = start(Some(oauth_client(token_stub().await))).await;
    let http = reqwest::Client::new();

    let body: Value = http
        .get(format!("{base}/api/auth/url"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let auth_url = url::Url::parse(body["authUrl"].as_str().unwrap()).unwrap();
    let state = auth_url
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.into_owned())
        .unwrap();

    let response = http
        .post(format!("{base}/api/auth/token"))
        .json(&json!({ "code": "4/abc", "state": state }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["tokens"]["accessToken"], "ya29.server");
    assert_eq!(body["tokens"]["refreshToken"], "1//server");
}

#[tokio::test]
async fn test_token_exchange_with_forged_state_fails() {
    let (base, _) = start(Some(oauth_client(token_stub().await))).await;
    let http = reqwest::Client::new();
    http.get(format!("{base}/api/auth/url")).send().await.unwrap();

    let response = http
        .post(format!("{base}/api/auth/token"))
        .json(&json!({ "code": "4/abc", "state": "forged" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Failed to get token" }));
}

#[tokio::test]
async fn test_query_uses_default_project() {
    let (base, client) = start(None).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/api/query"))
        .json(&json!({ "query": "SELECT 1", "accessToken": "ya29.token" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body,
        json!({ "results": [{ "result": "Mock result for: SELECT 1" }] })
    );
    assert_eq!(client.executed_queries()[0].project_id, "proj-default");
}

#[tokio::test]
async fn test_cross_origin_preflight_and_request() {
    let (base, _) = start(None).await;
    let http = reqwest::Client::new();

    let preflight = http
        .request(reqwest::Method::OPTIONS, format!("{base}/api/query"))
        .header("Origin", "http://localhost:5173")
        .header("Access-Control-Request-Method", "POST")
        .header("Access-Control-Request-Headers", "content-type")
        .send()
        .await
        .unwrap();
    assert_eq!(preflight.status(), StatusCode::OK);
    let headers = preflight.headers();
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert!(headers.contains_key("access-control-allow-methods"));
    assert!(headers.contains_key("access-control-allow-headers"));

    let response = http
        .post(format!("{base}/api/query"))
        .header("Origin", "http://localhost:5173")
        .json(&json!({ "query": "SELECT 1", "accessToken": "ya29.token" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
}
