//! キャプチャ対象のサンプルアプリケーション

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Path},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::stream;
use httplog::bootstrap::build_state;
use httplog::capture::{CaptureLogWriterConfig, HandlerGroup, HandlerRegistry};
use httplog::config::CaptureConfig;
use httplog::AppState;
use serde_json::{json, Value};
use tempfile::TempDir;

use super::http::{spawn_server, TestServer};

/// ログ対象のハンドラーグループ
pub struct Orders;
impl HandlerGroup for Orders {
    const NAME: &'static str = "Orders";
    const API_LOGGABLE: bool = true;
}

/// ログ対象外のハンドラーグループ
pub struct Health;
impl HandlerGroup for Health {
    const NAME: &'static str = "Health";
}

async fn show_order(Path(id): Path<u64>) -> Json<Value> {
    Json(json!({"id": id, "status": "shipped"}))
}

async fn create_order(Json(payload): Json<Value>) -> (StatusCode, Json<Value>) {
    (
        StatusCode::CREATED,
        Json(json!({"id": 1, "sku": payload["sku"]})),
    )
}

/// 請求書アップロードで受け付ける最大サイズ
pub const INVOICE_UPLOAD_LIMIT: usize = 16 * 1024 * 1024;

async fn upload_invoice(mut multipart: Multipart) -> Json<Value> {
    let mut parts = 0;
    let mut bytes = 0;
    while let Ok(Some(field)) = multipart.next_field().await {
        if let Ok(data) = field.bytes().await {
            bytes += data.len();
        }
        parts += 1;
    }
    Json(json!({"parts": parts, "bytes": bytes}))
}

async fn stream_report() -> Response {
    let chunks = stream::iter(vec![
        Ok::<_, std::io::Error>("line-1\n"),
        Ok("line-2\n"),
        Ok("line-3\n"),
    ]);
    (
        [(header::CONTENT_TYPE, "text/plain")],
        Body::from_stream(chunks),
    )
        .into_response()
}

async fn explode() -> &'static str {
    panic!("payment gateway unreachable")
}

async fn health() -> &'static str {
    "ok"
}

/// アプリケーションルートとレジストリ
pub fn routes() -> (Router, HandlerRegistry) {
    let router = Router::new()
        .route("/orders", post(create_order))
        .route("/orders/:id", get(show_order))
        .route(
            "/orders/invoice",
            post(upload_invoice).layer(DefaultBodyLimit::max(INVOICE_UPLOAD_LIMIT)),
        )
        .route("/orders/report", get(stream_report))
        .route("/orders/explode", get(explode))
        .route("/health", get(health));

    let registry = HandlerRegistry::builder()
        .register::<Orders>("/orders", "create")
        .register::<Orders>("/orders/:id", "show")
        .register::<Orders>("/orders/invoice", "uploadInvoice")
        .register::<Orders>("/orders/report", "report")
        .register::<Orders>("/orders/explode", "explode")
        .register::<Health>("/health", "check")
        .build();

    (router, registry)
}

/// 起動済みのテストアプリケーション
pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    _db_dir: TempDir,
}

impl TestApp {
    /// キャプチャログを即時にDBへ書き出す
    pub async fn flush(&self) {
        self.state.capture_log_writer.flush().await.unwrap();
    }
}

/// 一時DBを使ってアプリケーション全体を起動する
pub async fn spawn_test_app(capture_config: CaptureConfig) -> TestApp {
    let db_dir = tempfile::tempdir().unwrap();
    let db_url = format!("sqlite:{}", db_dir.path().join("httplog.db").display());
    let pool = httplog::db::migrations::initialize_database(&db_url)
        .await
        .unwrap();

    let (router, registry) = routes();
    let state = build_state(
        pool,
        registry,
        capture_config,
        CaptureLogWriterConfig {
            flush_interval_secs: 300,
            buffer_capacity: 1000,
        },
    );
    let app = httplog::api::create_app(state.clone(), router);
    let server = spawn_server(app).await;

    TestApp {
        server,
        state,
        _db_dir: db_dir,
    }
}
