//! Router tests against a temporary asset directory.

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use daemon::media::{MediaEngine, RenderError};
use daemon::store::AssetStore;
use daemon::{app, AppState};
use engine::render::{FrameSize, RenderCommand};
use engine::PlannerConfig;

struct FakeEngine {
    fail: bool,
}

#[async_trait]
impl MediaEngine for FakeEngine {
    async fn probe_frame_size(&self, _media_path: &Path) -> anyhow::Result<FrameSize> {
        Ok(FrameSize { width: 1920, height: 1080 })
    }

    async fn render(&self, command: &RenderCommand) -> Result<(), RenderError> {
        if self.fail {
            return Err(RenderError::EngineInvocation {
                bin: "ffmpeg".to_string(),
                status: "exit status: 1".to_string(),
                stderr: "Invalid data found when processing input".to_string(),
            });
        }
        tokio::fs::write(&command.output_path, b"rendered").await.unwrap();
        Ok(())
    }
}

const VECTOR_STORE: &str = r#"{
    "transcriptSegments": [
        {"id": 0, "start": 10.0, "end": 14.0, "text": "we reached the old lighthouse", "embedding": [0.9, 0.1, 0.0]}
    ],
    "brolls": [
        {"id": "lighthouse", "metadata": "lighthouse on a cliff", "embedding": [1.0, 0.0, 0.0]},
        {"id": "forest", "metadata": "pine forest", "embedding": [0.0, 1.0, 0.0]},
        {"id": "city", "metadata": "city skyline", "embedding": [0.0, 0.0, 1.0]}
    ]
}"#;

const MANIFEST: &str = r#"{
    "asset_id": "coast",
    "a_roll": {"technical_metadata": {"duration": 30.0, "resolution": "1280x720", "fps": 25}}
}"#;

async fn setup(fail_render: bool) -> (TempDir, Router) {
    let root = tempfile::tempdir().unwrap();
    let dir = root.path().join("coast");
    tokio::fs::create_dir_all(dir.join("brolls")).await.unwrap();
    tokio::fs::write(dir.join("vector_store.json"), VECTOR_STORE).await.unwrap();
    tokio::fs::write(dir.join("manifest.json"), MANIFEST).await.unwrap();
    tokio::fs::write(dir.join("a_roll.mp4"), b"a-roll").await.unwrap();

    let state = Arc::new(AppState {
        store: AssetStore::new(root.path()),
        media: Arc::new(FakeEngine { fail: fail_render }),
        planner: PlannerConfig::default(),
    });
    (root, app(state))
}

async fn send(app: &Router, method: Method, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn test_health_endpoint() {
    let (_root, app) = setup(false).await;
    let (status, body) = send(&app, Method::GET, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn test_plan_then_fetch_artifact() {
    let (_root, app) = setup(false).await;

    let (status, body) = send(&app, Method::POST, "/api/assets/coast/plan").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["asset_id"], "coast");
    let insertions = body["insertions"].as_array().unwrap();
    assert_eq!(insertions.len(), 1);
    assert_eq!(insertions[0]["broll_id"], "lighthouse");
    assert_eq!(insertions[0]["start_sec"], 10.0);
    assert_eq!(insertions[0]["duration_sec"], 3.0);
    assert!(insertions[0]["explanation"]
        .as_str()
        .unwrap()
        .contains("lighthouse on a cliff"));

    let (status, plan) = send(&app, Method::GET, "/api/assets/coast/files/plan").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(plan, body["insertions"]);

    let (status, manifest) = send(&app, Method::GET, "/api/assets/coast/files/manifest").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(manifest["asset_id"], "coast");
}

#[tokio::test]
async fn test_unknown_asset_and_file_type() {
    let (_root, app) = setup(false).await;

    let (status, body) = send(&app, Method::POST, "/api/assets/missing/plan").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("missing"));

    let (status, _) = send(&app, Method::GET, "/api/assets/coast/files/final_video").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::GET, "/api/assets/coast/files/plan").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::POST, "/api/assets/co.ast/plan").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_mismatched_embeddings_are_rejected() {
    let (root, app) = setup(false).await;
    tokio::fs::write(
        root.path().join("coast").join("vector_store.json"),
        r#"{"transcriptSegments": [{"id": "s", "start": 10.0, "end": 12.0, "text": "x", "embedding": [1.0, 0.0]}],
            "brolls": [{"id": "b", "embedding": [1.0]}]}"#,
    )
    .await
    .unwrap();

    let (status, body) = send(&app, Method::POST, "/api/assets/coast/plan").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("dimension mismatch"));
    assert!(!root.path().join("coast").join("plan.json").exists());
}

#[tokio::test]
async fn test_render_graph_preview_and_render() {
    let (root, app) = setup(false).await;
    send(&app, Method::POST, "/api/assets/coast/plan").await;

    let (status, body) = send(&app, Method::GET, "/api/assets/coast/render/graph").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["graph"]["mode"], "composite");
    let filters = body["filters"].as_array().unwrap();
    assert_eq!(filters.len(), 3);
    assert_eq!(
        filters[2],
        "[0:v][delayed_broll_0]overlay=enable='gte(t,10)*lt(t,13)':eof_action=pass[v0]"
    );

    let (status, body) = send(&app, Method::POST, "/api/assets/coast/render").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["insertion_count"], 1);
    assert!(body.get("insertions").is_none());
    let output = root.path().join("coast").join("final_video.mp4");
    assert_eq!(tokio::fs::read(&output).await.unwrap(), b"rendered");
}

#[tokio::test]
async fn test_render_without_plan_is_not_found() {
    let (_root, app) = setup(false).await;
    let (status, _) = send(&app, Method::POST, "/api/assets/coast/render").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_encoder_failure_is_bad_gateway() {
    let (_root, app) = setup(true).await;
    send(&app, Method::POST, "/api/assets/coast/plan").await;

    let (status, body) = send(&app, Method::POST, "/api/assets/coast/render").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().contains("Invalid data"));
}
