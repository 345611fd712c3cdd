//! HTTP backend for browser front ends.
//!
//! Exposes the OAuth consent/exchange steps and a query pass-through as a
//! small JSON API. Failures are logged and answered with a generic message.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::auth::{OAuthClient, OAuthConfig};
use crate::config::Config;
use crate::error::{GiantError, Result};
use crate::warehouse::{QueryRequest, WarehouseFactory};

/// Shared state of the HTTP handlers.
#[derive(Clone)]
pub struct ServerState {
    pub oauth: Option<Arc<OAuthClient>>,
    pub warehouse: Arc<dyn WarehouseFactory>,
    pub default_project_id: Option<String>,
}

impl ServerState {
    /// Builds state from configuration. A missing OAuth client id disables
    /// the auth endpoints instead of failing startup.
    pub fn from_config(config: &Config, warehouse: Arc<dyn WarehouseFactory>) -> Self {
        let oauth = match OAuthConfig::from_settings(&config.oauth) {
            Ok(oauth) => Some(Arc::new(OAuthClient::new(oauth))),
            Err(e) => {
                error!("Auth endpoints disabled: {e}");
                None
            }
        };

        Self {
            oauth,
            warehouse,
            default_project_id: config.project.default_project_id.clone(),
        }
    }
}

/// JSON error reply: `{"error": message}`.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: &'static str,
}

impl ApiError {
    fn new(status: StatusCode, message: &'static str) -> Self {
        Self { status, message }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct TokenBody {
    code: String,
    #[serde(default)]
    state: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryBody {
    #[serde(default)]
    query: String,
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    project_id: Option<String>,
    #[serde(default)]
    location: Option<String>,
}

/// Builds the API router. Any origin may call it.
pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/api/auth/url", get(auth_url))
        .route("/api/auth/token", post(auth_token))
        .route("/api/query", post(run_query))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn auth_url(State(state): State<ServerState>) -> std::result::Result<Response, ApiError> {
    let failed = || ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Failed to generate auth URL");

    let oauth = state.oauth.as_ref().ok_or_else(|| {
        error!("Error generating auth URL: OAuth is not configured");
        failed()
    })?;

    match oauth.authorization_url() {
        Ok(url) => Ok(Json(json!({ "authUrl": url })).into_response()),
        Err(e) => {
            error!("Error generating auth URL: {e}");
            Err(failed())
        }
    }
}

async fn auth_token(
    State(state): State<ServerState>,
    Json(body): Json<TokenBody>,
) -> std::result::Result<Response, ApiError> {
    let failed = || ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Failed to get token");

    let oauth = state.oauth.as_ref().ok_or_else(|| {
        error!("Error getting token: OAuth is not configured");
        failed()
    })?;

    match oauth.exchange_code(&body.code, body.state.as_deref()).await {
        Ok(tokens) => Ok(Json(json!({ "tokens": tokens })).into_response()),
        Err(e) => {
            error!("Error getting token: {e}");
            Err(failed())
        }
    }
}

async fn run_query(
    State(state): State<ServerState>,
    Json(body): Json<QueryBody>,
) -> std::result::Result<Response, ApiError> {
    let access_token = body
        .access_token
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::new(StatusCode::UNAUTHORIZED, "Authentication required"))?;

    let project_id = body
        .project_id
        .filter(|p| !p.trim().is_empty())
        .or(state.default_project_id.clone())
        .ok_or_else(|| ApiError::new(StatusCode::BAD_REQUEST, "Project id required"))?;

    let request = QueryRequest {
        location: body.location,
        ..QueryRequest::new(body.query, project_id)
    };

    let client = state.warehouse.connect(&access_token);
    match client.execute_query(&request).await {
        Ok(response) => {
            Ok(Json(json!({ "results": response.result.to_json_rows() })).into_response())
        }
        Err(e) => {
            error!("Error executing query: {e}");
            Err(ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to execute query",
            ))
        }
    }
}

/// Binds the configured address and serves until the process exits.
pub async fn serve(config: &Config, warehouse: Arc<dyn WarehouseFactory>) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| GiantError::config(format!("Invalid server address: {e}")))?;

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| GiantError::internal(format!("Failed to bind {addr}: {e}")))?;

    info!("Server running on {addr}");

    axum::serve(listener, router(ServerState::from_config(config, warehouse)))
        .await
        .map_err(|e| GiantError::internal(format!("Server error: {e}")))
}
