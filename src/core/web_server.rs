//! HTTP status server.
//!
//! Keeps the process reachable on WEB_PORT for the hosting platform's health
//! checks, serves the mini-app pages under /static and exposes a read-only user
//! lookup for them.

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::path::Path as FsPath;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

use crate::core::config;
use crate::storage::UserStore;

/// Shared state for the web server.
#[derive(Clone)]
struct WebState {
    store: Arc<UserStore>,
}

/// Builds the router; files under `static_dir` are served at /static.
pub fn router(store: Arc<UserStore>, static_dir: &FsPath) -> Router {
    Router::new()
        .route("/", get(health_handler))
        .route("/health", get(health_handler))
        .route("/api/health", get(health_handler))
        .route("/user/{id}", get(user_handler))
        .nest_service("/static", ServeDir::new(static_dir))
        .with_state(WebState { store })
}

/// Start the web server on all interfaces.
pub async fn start_web_server(port: u16, store: Arc<UserStore>) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(&addr).await?;
    let static_dir = FsPath::new(config::STATIC_DIR.as_str());

    log::info!("Starting web server on http://{}", addr);
    log::info!("  /health     - Health check");
    log::info!("  /user/{{id}}  - User record (JSON)");
    log::info!("  /static     - Mini-app files from {}", static_dir.display());

    serve(listener, router(store, static_dir)).await
}

/// Serves on an already bound listener.
pub async fn serve(listener: TcpListener, app: Router) -> anyhow::Result<()> {
    axum::serve(listener, app).await?;
    Ok(())
}

/// GET /health: static health payload.
async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "bot": "running",
    }))
}

/// GET /user/{id}: the stored record, or a bare guest role for unknown ids.
async fn user_handler(Path(id): Path<String>, State(state): State<WebState>) -> impl IntoResponse {
    let record = match id.parse::<i64>() {
        Ok(user_id) => state.store.get(user_id).await,
        Err(_) => None,
    };
    match record {
        Some(record) => Json(json!(record)),
        None => Json(json!({ "role": "GUEST" })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::Language;
    use crate::storage::Registration;
    use chrono::Utc;
    use tempfile::TempDir;

    async fn spawn_server(store: Arc<UserStore>, static_dir: &FsPath) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve(listener, router(store, static_dir)));
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_health_routes() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(UserStore::load(dir.path().join("users.json")).await);
        let base = spawn_server(store, dir.path()).await;

        for path in ["/", "/health", "/api/health"] {
            let body: serde_json::Value = reqwest::get(format!("{}{}", base, path))
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
            assert_eq!(body["status"], "ok");
            assert_eq!(body["bot"], "running");
            assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
        }
    }

    #[tokio::test]
    async fn test_user_lookup() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(UserStore::load(dir.path().join("users.json")).await);
        store
            .register(Registration {
                user_id: 77,
                name: "Айгерим".to_string(),
                age: 30,
                skill: "логистика".to_string(),
                language: Language::Kz,
                registered_at: Utc::now(),
            })
            .await
            .unwrap();
        let base = spawn_server(store, dir.path()).await;

        let member: serde_json::Value = reqwest::get(format!("{}/user/77", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(member["role"], "MEMBER");
        assert_eq!(member["lang"], "kz");

        let unknown: serde_json::Value = reqwest::get(format!("{}/user/5", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(unknown, json!({ "role": "GUEST" }));
    }

    #[tokio::test]
    async fn test_static_files() {
        let dir = TempDir::new().unwrap();
        let static_dir = dir.path().join("static");
        std::fs::create_dir(&static_dir).unwrap();
        std::fs::write(static_dir.join("landing.html"), "<h1>QAIYRYM</h1>").unwrap();
        let store = Arc::new(UserStore::load(dir.path().join("users.json")).await);
        let base = spawn_server(store, &static_dir).await;

        let page = reqwest::get(format!("{}/static/landing.html", base)).await.unwrap();
        assert!(page.status().is_success());
        assert_eq!(page.text().await.unwrap(), "<h1>QAIYRYM</h1>");

        let missing = reqwest::get(format!("{}/static/nope.html", base)).await.unwrap();
        assert_eq!(missing.status().as_u16(), 404);
    }
}
