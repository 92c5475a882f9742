//! HTTP surface.
//!
//! - `GET /get-image-filename/:request` runs the pipeline for `live` or a
//!   `YYYY-MM-DD_HHMMSS` reference and answers with the artifact filename
//! - `GET /get-latest-image/:filename` serves a cached artifact
//! - `GET /health`, `GET /metrics`

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use imagery::ImageRequest;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::state::AppState;

pub const NOT_AVAILABLE: &str = "Image not available";
pub const PROCESSING_ERROR: &str = "Error processing image";

pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let artifacts = ServeDir::new(state.orchestrator.cache().root());

    Router::new()
        .route("/get-image-filename/:request", get(image_filename_handler))
        .nest_service("/get-latest-image", artifacts)
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(Extension(state))
}

pub async fn run_server(state: Arc<AppState>, port: u16) -> anyhow::Result<()> {
    let app = create_router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    info!(port = port, "Starting imagery server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// GET /get-image-filename/:request
async fn image_filename_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(token): Path<String>,
) -> Response {
    let request: ImageRequest = match token.parse() {
        Ok(r) => r,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };

    match tokio::time::timeout(state.timeout, state.orchestrator.latest(request)).await {
        Ok(Ok(artifact)) => (StatusCode::OK, artifact.name.to_string()).into_response(),
        Ok(Err(e)) if e.is_not_yet_available() => {
            (StatusCode::OK, NOT_AVAILABLE).into_response()
        }
        Ok(Err(_)) => (StatusCode::INTERNAL_SERVER_ERROR, PROCESSING_ERROR).into_response(),
        Err(_) => {
            warn!(request = %request, timeout_secs = state.timeout.as_secs_f64(), "Pipeline run timed out");
            (StatusCode::INTERNAL_SERVER_ERROR, PROCESSING_ERROR).into_response()
        }
    }
}

/// GET /health
async fn health_handler(Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    let orchestrator = &state.orchestrator;
    let cached = orchestrator.cache().list().await.map(|names| names.len()).unwrap_or(0);
    let claims = orchestrator.claims().stats();

    Json(serde_json::json!({
        "status": "ok",
        "service": "imagery-api",
        "product": orchestrator.config().product.file_token(),
        "dataset": orchestrator.config().dataset.name,
        "cached_artifacts": cached,
        "runs_in_flight": orchestrator.claims().in_flight(),
        "claims_total": claims.total,
        "claims_contended": claims.contended,
    }))
}

/// GET /metrics
async fn metrics_handler(Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    match &state.prometheus {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::OK, String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path as FsPath, PathBuf};
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use imagery::{
        ArchiveClient, DatasetConfig, Orchestrator, PipelineConfig, ProductSpec, SceneDecoder,
    };
    use imagery_common::{Crs, DecodedScene, GeoTransform, Raster};
    use tempfile::TempDir;
    use tower::ServiceExt;

    const KEY: &str = "ABI-L1b-RadC/2025/095/12/OR_ABI-L1b-RadC-M6C13_G16_s20250951230007_e20250951232380_c20250951232431.nc";

    struct OneScanArchive {
        keys: Vec<String>,
    }

    #[async_trait]
    impl ArchiveClient for OneScanArchive {
        async fn list(&self, _bucket: &str, prefix: &str) -> anyhow::Result<Vec<String>> {
            Ok(self.keys.iter().filter(|k| k.starts_with(prefix)).cloned().collect())
        }

        async fn download(&self, _bucket: &str, key: &str, dest: &FsPath) -> anyhow::Result<u64> {
            tokio::fs::write(dest, key.as_bytes()).await?;
            Ok(key.len() as u64)
        }
    }

    struct GridDecoder {
        fail: bool,
        delay: Duration,
    }

    impl SceneDecoder for GridDecoder {
        fn decode(&self, _files: &[PathBuf], dataset: &DatasetConfig) -> anyhow::Result<DecodedScene> {
            std::thread::sleep(self.delay);
            if self.fail {
                anyhow::bail!("NetCDF: HDF error");
            }
            let values = (0..64).map(|i| i as f32).collect();
            let raster = Raster::new(
                dataset.name.clone(),
                Crs::Geographic,
                GeoTransform::north_up(-90.0, 1.0, 40.0, -1.0),
                8,
                8,
                vec![values],
            )?;
            Ok(DecodedScene::new(raster))
        }
    }

    fn app(root: &TempDir, keys: &[&str], decoder: GridDecoder, timeout: Duration) -> Router {
        let config = PipelineConfig {
            product: ProductSpec {
                satellite: 16,
                product: "ABI-L1b-Rad".to_string(),
                domain: "C".to_string(),
                channels: vec![13],
            },
            dataset: DatasetConfig::default(),
            lookback_hours: 1,
            target_crs: Crs::WebMercator,
            download_dir: root.path().join("raw"),
            artifacts_dir: root.path().join("artifacts"),
            work_dir: root.path().join("work"),
        };
        let archive = Arc::new(OneScanArchive {
            keys: keys.iter().map(|k| k.to_string()).collect(),
        });
        let orchestrator = Orchestrator::new(config, archive).with_decoder(Arc::new(decoder));
        create_router(Arc::new(AppState::new(Arc::new(orchestrator), timeout)))
    }

    fn decoder() -> GridDecoder {
        GridDecoder {
            fail: false,
            delay: Duration::ZERO,
        }
    }

    async fn get(app: &Router, uri: &str) -> (StatusCode, Vec<u8>) {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn test_filename_then_image() {
        let root = TempDir::new().unwrap();
        let app = app(&root, &[KEY], decoder(), Duration::from_secs(30));

        let (status, body) = get(&app, "/get-image-filename/2025-04-05_124500").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"20250405_123000_merc.png");

        let (status, body) = get(&app, "/get-latest-image/20250405_123000_merc.png").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(&body[1..4], b"PNG");

        let (status, _) = get(&app, "/get-latest-image/20250405_120000_merc.png").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_nothing_upstream() {
        let root = TempDir::new().unwrap();
        let app = app(&root, &[], decoder(), Duration::from_secs(30));

        let (status, body) = get(&app, "/get-image-filename/live").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, NOT_AVAILABLE.as_bytes());
    }

    #[tokio::test]
    async fn test_bad_request_token() {
        let root = TempDir::new().unwrap();
        let app = app(&root, &[KEY], decoder(), Duration::from_secs(30));

        let (status, _) = get(&app, "/get-image-filename/yesterday").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_stage_failure_is_500() {
        let root = TempDir::new().unwrap();
        let failing = GridDecoder {
            fail: true,
            delay: Duration::ZERO,
        };
        let app = app(&root, &[KEY], failing, Duration::from_secs(30));

        let (status, body) = get(&app, "/get-image-filename/2025-04-05_124500").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, PROCESSING_ERROR.as_bytes());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_timeout_is_500() {
        let root = TempDir::new().unwrap();
        let slow = GridDecoder {
            fail: false,
            delay: Duration::from_millis(500),
        };
        let app = app(&root, &[KEY], slow, Duration::from_millis(50));

        let (status, body) = get(&app, "/get-image-filename/2025-04-05_124500").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, PROCESSING_ERROR.as_bytes());
        assert!(!root.path().join("artifacts/20250405_123000_merc.png").exists());
    }

    #[tokio::test]
    async fn test_health() {
        let root = TempDir::new().unwrap();
        let app = app(&root, &[KEY], decoder(), Duration::from_secs(30));

        let (status, body) = get(&app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["product"], "ABI-L1b-RadC");
        assert_eq!(json["cached_artifacts"], 0);
    }
}
