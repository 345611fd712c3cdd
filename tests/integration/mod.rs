//! Integration tests across the shell, warehouse, auth and server layers.

pub mod bigquery_test;
pub mod dispatch_test;
pub mod oauth_test;
pub mod project_test;
pub mod server_test;

use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;

/// Serves `app` on an ephemeral local port and returns its address.
pub async fn spawn_stub(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}
