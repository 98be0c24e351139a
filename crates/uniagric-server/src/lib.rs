//! HTTP server assembly for Uniagric.
//!
//! Mounts the JSON API under `/api`, serves generated images and uploaded
//! farmer documents from their configured directories, and answers
//! `/health`.

use std::path::PathBuf;

use axum::{Json, Router, routing::get};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::{services::ServeDir, trace::TraceLayer};
use uniagric_api::{ApiState, api_router};
use uniagric_core::{identity::IdentityProvider, store::MarketStore, tools::FarmTools};
use uniagric_tools::{DocumentConfig, PredictionConfig, RiskConfig, ScriptConfig};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `UNIAGRIC_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
  pub scripts:    ScriptConfig,
  pub prediction: PredictionConfig,
  pub risk:       RiskConfig,
  pub documents:  DocumentConfig,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:       "127.0.0.1".into(),
      port:       3000,
      store_path: PathBuf::from("uniagric.db"),
      scripts:    ScriptConfig::default(),
      prediction: PredictionConfig::default(),
      risk:       RiskConfig::default(),
      documents:  DocumentConfig::default(),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

async fn health() -> Json<Value> { Json(json!({ "status": "ok" })) }

/// Build the complete application router.
///
/// Documents are served only under a non-empty prefix; an empty images
/// prefix makes the images directory the fallback.
pub fn app<S, T>(state: ApiState<S, T>, scripts: &ScriptConfig) -> Router
where
  S: MarketStore + IdentityProvider + 'static,
  T: FarmTools + 'static,
{
  let images = ServeDir::new(&scripts.images_dir);
  let prefix = scripts.images_url_prefix.trim_end_matches('/');
  let documents = state.documents.config().clone();
  let documents_prefix = documents.url_prefix.trim_end_matches('/');

  let mut router = Router::new()
    .route("/health", get(health))
    .nest("/api", api_router(state));

  if documents_prefix.is_empty() {
    tracing::warn!("documents.url_prefix is empty; uploaded documents are not served");
  } else {
    router = router.nest_service(documents_prefix, ServeDir::new(&documents.dir));
  }

  let router = if prefix.is_empty() {
    router.fallback_service(images)
  } else {
    router.nest_service(prefix, images)
  };

  router.layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use tower::ServiceExt as _;
  use uniagric_store_sqlite::SqliteStore;
  use uniagric_tools::{DocumentStorage, PredictionClient, RiskClient, ScriptRunner};

  use super::*;

  async fn make_app(root: PathBuf) -> Router {
    let scripts = ScriptConfig { images_dir: root.clone(), ..ScriptConfig::default() };
    let documents = DocumentConfig { dir: root.join("documents"), ..DocumentConfig::default() };
    let state = ApiState {
      store:      Arc::new(SqliteStore::open_in_memory().await.unwrap()),
      tools:      Arc::new(ScriptRunner::new(scripts.clone())),
      prediction: PredictionClient::new(PredictionConfig::default()).unwrap(),
      risk:       RiskClient::new(RiskConfig::default()).unwrap(),
      documents:  Arc::new(DocumentStorage::new(documents)),
    };
    app(state, &scripts)
  }

  async fn get(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
  }

  #[test]
  fn config_defaults() {
    let cfg: ServerConfig = serde_json::from_value(json!({})).unwrap();
    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.port, 3000);
    assert_eq!(cfg.store_path, PathBuf::from("uniagric.db"));
    assert_eq!(cfg.scripts.interpreter, "python3");
    assert_eq!(cfg.scripts.dir, PathBuf::from("backend/scripts"));
    assert_eq!(cfg.scripts.images_dir, PathBuf::from("public/generated-images"));
    assert_eq!(cfg.scripts.images_url_prefix, "/generated-images");
    assert_eq!(cfg.scripts.timeout_secs, 120);
    assert_eq!(cfg.prediction.base_url, "http://localhost:8000");
    assert_eq!(cfg.risk.url, "https://api.reka.ai/analyze");
    assert_eq!(cfg.risk.api_key, None);
    assert_eq!(cfg.documents.dir, PathBuf::from("uploads/farmer-documents"));
    assert_eq!(cfg.documents.url_prefix, "/farmer-documents");
  }

  #[test]
  fn nested_config_overrides_keep_other_defaults() {
    let cfg: ServerConfig = serde_json::from_value(json!({
      "port": 8080,
      "scripts": { "timeout_secs": 30 },
    }))
    .unwrap();
    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.scripts.timeout_secs, 30);
    assert_eq!(cfg.scripts.interpreter, "python3");
  }

  #[tokio::test]
  async fn health_is_ok() {
    let tmp = tempfile::tempdir().unwrap();
    let (status, body) = get(make_app(tmp.path().to_path_buf()).await, "/health").await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["status"], "ok");
  }

  #[tokio::test]
  async fn api_is_mounted_under_api() {
    let tmp = tempfile::tempdir().unwrap();
    let (status, body) = get(make_app(tmp.path().to_path_buf()).await, "/api/farms").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"[]");
  }

  #[tokio::test]
  async fn generated_images_are_served() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("farm_layout_test.png"), b"png-bytes").unwrap();

    let app = make_app(tmp.path().to_path_buf()).await;
    let (status, body) = get(app.clone(), "/generated-images/farm_layout_test.png").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"png-bytes");

    let (status, _) = get(app, "/generated-images/missing.png").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn uploaded_documents_are_served() {
    let tmp = tempfile::tempdir().unwrap();
    let farmer_dir = tmp.path().join("documents").join("f-1");
    std::fs::create_dir_all(&farmer_dir).unwrap();
    std::fs::write(farmer_dir.join("deed.pdf"), b"%PDF").unwrap();

    let app = make_app(tmp.path().to_path_buf()).await;
    let (status, body) = get(app, "/farmer-documents/f-1/deed.pdf").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"%PDF");
  }
}
