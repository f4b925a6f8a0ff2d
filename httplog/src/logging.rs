//! ロギング初期化
//!
//! 標準出力（人間向け）と日次ローテーションのJSONファイルの2系統に出力する。
//! キャプチャレコードも `httplog::capture` ターゲットのイベントとしてここに流れる。

use crate::common::error::{CommonError, CommonResult};
use crate::config::data_dir;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const LOG_FILE_PREFIX: &str = "httplog.jsonl";

/// ログ出力先ディレクトリ
///
/// `HTTPLOG_LOG_DIR` が未設定なら `~/.httplog/logs`。
pub fn log_dir() -> CommonResult<PathBuf> {
    match std::env::var("HTTPLOG_LOG_DIR") {
        Ok(dir) if !dir.trim().is_empty() => Ok(PathBuf::from(dir)),
        _ => Ok(data_dir()?.join("logs")),
    }
}

/// ログレベルのフィルタを作成
///
/// `HTTPLOG_LOG_LEVEL` → `RUST_LOG` → `info` の順に採用する。
pub fn build_filter() -> EnvFilter {
    let directive = std::env::var("HTTPLOG_LOG_LEVEL")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());
    EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// グローバルなtracing subscriberを設定する
///
/// 戻り値のガードはプロセス終了まで保持すること（ドロップするとファイル出力が止まる）。
pub fn init() -> CommonResult<WorkerGuard> {
    let dir = log_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| {
        CommonError::Config(format!(
            "Failed to create log directory {}: {}",
            dir.display(),
            e
        ))
    })?;

    let file_appender = tracing_appender::rolling::daily(&dir, LOG_FILE_PREFIX);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(build_filter())
        .with(fmt::layer().with_target(true))
        .with(
            fmt::layer()
                .json()
                .with_current_span(false)
                .with_writer(file_writer),
        )
        .try_init()
        .map_err(|e| CommonError::Config(format!("Failed to initialize logging: {}", e)))?;

    tracing::debug!(log_dir = %dir.display(), "Logging initialized");
    Ok(guard)
}
