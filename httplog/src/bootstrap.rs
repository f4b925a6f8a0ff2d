//! サーバー初期化
//!
//! 環境変数の読み込みからDB接続、キャプチャパイプラインの組み立てまでを行い、
//! [`AppState`] を返す。

use crate::capture::{
    CaptureLogWriter, CaptureLogWriterConfig, CapturePipeline, CaptureSinks, HandlerRegistry,
    TracingSink,
};
use crate::common::error::HttpLogResult;
use crate::config::{self, CaptureConfig};
use crate::db::capture_log::CaptureLogStorage;
use crate::shutdown::ShutdownController;
use crate::AppState;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::info;

/// 環境変数から設定を読み込み、アプリケーション状態を初期化する
///
/// `registry` にはキャプチャ対象にするハンドラーを登録しておく。
pub async fn initialize(registry: HandlerRegistry) -> HttpLogResult<AppState> {
    info!("httplog v{}", env!("CARGO_PKG_VERSION"));

    let database_url = config::database_url()?;
    let db_pool = crate::db::migrations::initialize_database(&database_url).await?;
    info!(database_url = %database_url, "Database initialized");

    let capture_config = CaptureConfig::from_env();
    let writer_config = CaptureLogWriterConfig::default();
    info!(
        filter_type = ?capture_config.filter_type,
        cancelled_policy = ?capture_config.cancelled_policy,
        max_body_bytes = capture_config.max_body_bytes,
        flush_interval_secs = writer_config.flush_interval_secs,
        buffer_capacity = writer_config.buffer_capacity,
        "Capture pipeline configured"
    );

    Ok(build_state(db_pool, registry, capture_config, writer_config))
}

/// 接続済みプールからアプリケーション状態を組み立てる
///
/// キャプチャレコードはコンソール（tracing）とDBライターの両方に出力される。
/// ライターのバックグラウンドタスクを起動するため、Tokioランタイム上で呼ぶこと。
pub fn build_state(
    db_pool: SqlitePool,
    registry: HandlerRegistry,
    capture_config: CaptureConfig,
    writer_config: CaptureLogWriterConfig,
) -> AppState {
    let storage = CaptureLogStorage::new(db_pool);
    let capture_log_writer = CaptureLogWriter::new(storage.clone(), writer_config);

    let sinks = CaptureSinks::new()
        .with(Arc::new(TracingSink))
        .with(Arc::new(capture_log_writer.clone()));
    let capture = CapturePipeline::new(registry, Arc::new(sinks), capture_config);

    AppState {
        capture_log_storage: Arc::new(storage),
        capture_log_writer,
        capture,
        shutdown: ShutdownController::default(),
    }
}
