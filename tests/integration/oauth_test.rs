//! Integration tests for the OAuth token exchange against a local stub.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use chrono::Utc;
use giant::auth::{
    AccessTokenProvider, OAuthClient, OAuthConfig, OAuthToken, RefreshingToken, TokenStore,
};
use giant::config::WarehouseSettings;
use giant::warehouse::{BigQueryClient, WarehouseClient};
use pretty_assertions::assert_eq;
use serde_json::json;

use super::spawn_stub;

type Forms = Arc<Mutex<Vec<HashMap<String, String>>>>;

#[derive(Clone, Default)]
struct Stub {
    forms: Forms,
    bearers: Arc<Mutex<Vec<String>>>,
}

async fn token(State(stub): State<Stub>, Form(form): Form<HashMap<String, String>>) -> Response {
    stub.forms.lock().unwrap().push(form.clone());

    let grant = form.get("grant_type").map(String::as_str);
    let code = form
        .get("code")
        .or_else(|| form.get("refresh_token"))
        .map(String::as_str);
    match (grant, code) {
        (Some("authorization_code"), Some("bad-code"))
        | (Some("refresh_token"), Some("1//revoked")) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_grant" })),
        )
            .into_response(),
        (Some("authorization_code"), _) => Json(json!({
            "access_token": "ya29.access",
            "token_type": "Bearer",
            "expires_in": 3599,
            "refresh_token": "1//refresh",
            "scope": "https://www.googleapis.com/auth/bigquery"
        }))
        .into_response(),
        // Google leaves the refresh token out of refresh responses
        _ => Json(json!({
            "access_token": "ya29.refreshed",
            "expires_in": 3599
        }))
        .into_response(),
    }
}

async fn datasets(State(stub): State<Stub>, headers: HeaderMap) -> Json<serde_json::Value> {
    if let Some(value) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
        stub.bearers.lock().unwrap().push(value.to_string());
    }
    Json(json!({ "datasets": [] }))
}

async fn start() -> (OAuthClient, Forms) {
    let (client, stub, _) = start_stub().await;
    (client, stub.forms)
}

async fn start_stub() -> (OAuthClient, Stub, String) {
    let stub = Stub::default();
    let app = Router::new()
        .route("/token", post(token))
        .route("/bigquery/v2/projects/:project/datasets", get(datasets))
        .with_state(stub.clone());
    let addr = spawn_stub(app).await;

    let client = OAuthClient::new(OAuthConfig {
        client_id: "client-123".to_string(),
        client_secret: Some("shh".to_string()),
        redirect_uri: "http://127.0.0.1:8085/oauth-callback".to_string(),
        auth_url: format!("http://{addr}/auth"),
        token_url: format!("http://{addr}/token"),
        scopes: vec!["https://www.googleapis.com/auth/bigquery".to_string()],
    });
    (client, stub, format!("http://{addr}/bigquery/v2"))
}

fn expired(refresh_token: &str) -> OAuthToken {
    OAuthToken {
        access_token: "ya29.stale".to_string(),
        token_type: "Bearer".to_string(),
        expires_at: Some(Utc::now() - chrono::Duration::minutes(5)),
        refresh_token: Some(refresh_token.to_string()),
        scope: None,
    }
}

#[tokio::test]
async fn test_exchange_code_posts_form_and_parses_tokens() {
    let (client, forms) = start().await;
    let url = url::Url::parse(&client.authorization_url().unwrap()).unwrap();
    let state = url
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.into_owned())
        .unwrap();

    let token = client.exchange_code("4/code", Some(&state)).await.unwrap();

    assert_eq!(token.access_token, "ya29.access");
    assert_eq!(token.refresh_token.as_deref(), Some("1//refresh"));
    assert!(token.expires_at.is_some());
    assert!(!token.is_expired());

    let form = forms.lock().unwrap()[0].clone();
    assert_eq!(form["grant_type"], "authorization_code");
    assert_eq!(form["code"], "4/code");
    assert_eq!(form["client_id"], "client-123");
    assert_eq!(form["client_secret"], "shh");
    assert_eq!(form["redirect_uri"], "http://127.0.0.1:8085/oauth-callback");
}

#[tokio::test]
async fn test_refresh_keeps_previous_refresh_token() {
    let (client, forms) = start().await;

    let token = client.refresh("1//refresh").await.unwrap();

    assert_eq!(token.access_token, "ya29.refreshed");
    assert_eq!(token.token_type, "Bearer");
    assert_eq!(token.refresh_token.as_deref(), Some("1//refresh"));
    assert_eq!(forms.lock().unwrap()[0]["grant_type"], "refresh_token");
}

#[tokio::test]
async fn test_rejected_code_is_auth_error() {
    let (client, _forms) = start().await;

    let err = client.exchange_code("bad-code", None).await.unwrap_err();

    assert_eq!(err.category(), "Authentication Error");
    assert!(err.to_string().contains("invalid_grant"));
}

#[tokio::test]
async fn test_expired_token_is_refreshed_before_warehouse_calls() {
    let (oauth, stub, base_url) = start_stub().await;
    let store = Arc::new(TokenStore::in_memory());
    store.save(&expired("1//refresh")).unwrap();

    let tokens = Arc::new(RefreshingToken::new(store.clone(), oauth));
    let client = BigQueryClient::with_provider(
        reqwest::Client::new(),
        tokens,
        WarehouseSettings {
            base_url,
            ..WarehouseSettings::default()
        },
    );

    client.list_datasets("proj-a").await.unwrap();
    client.list_datasets("proj-a").await.unwrap();

    assert_eq!(
        *stub.bearers.lock().unwrap(),
        vec!["Bearer ya29.refreshed".to_string(), "Bearer ya29.refreshed".to_string()]
    );
    // Only the first call needed a refresh
    assert_eq!(stub.forms.lock().unwrap().len(), 1);

    let saved = store.load().unwrap().unwrap();
    assert_eq!(saved.access_token, "ya29.refreshed");
    assert_eq!(saved.refresh_token.as_deref(), Some("1//refresh"));
    assert!(!saved.is_expired());
}

#[tokio::test]
async fn test_revoked_refresh_token_clears_store() {
    let (oauth, _stub, _) = start_stub().await;
    let store = Arc::new(TokenStore::in_memory());
    store.save(&expired("1//revoked")).unwrap();

    let tokens = RefreshingToken::new(store.clone(), oauth);
    let err = tokens.access_token().await.unwrap_err();

    assert_eq!(err.category(), "Authentication Error");
    assert!(store.load().unwrap().is_none());
}
