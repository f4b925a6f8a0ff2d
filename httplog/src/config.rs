//! Configuration management via environment variables
//!
//! Provides helper functions for reading environment variables with fallback
//! to deprecated variable names with warning logs.

use crate::common::error::{CommonError, CommonResult};
use std::path::PathBuf;
use std::str::FromStr;

/// Get an environment variable with fallback to a deprecated name
///
/// If the new variable name is set, returns its value.
/// If only the old (deprecated) variable name is set, returns its value
/// and logs a deprecation warning.
///
/// # Example
/// ```
/// use httplog::config::get_env_with_fallback;
///
/// let url = get_env_with_fallback("HTTPLOG_DATABASE_URL", "DATABASE_URL");
/// ```
pub fn get_env_with_fallback(new_name: &str, old_name: &str) -> Option<String> {
    if let Ok(val) = std::env::var(new_name) {
        return Some(val);
    }
    if let Ok(val) = std::env::var(old_name) {
        tracing::warn!(
            "Environment variable '{}' is deprecated, use '{}' instead",
            old_name,
            new_name
        );
        return Some(val);
    }
    None
}

/// Get an environment variable without a deprecated alias, parsing to a specific type
pub fn get_env_parse<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// ホームディレクトリ配下のデータディレクトリ（`~/.httplog`）
pub fn data_dir() -> CommonResult<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| CommonError::Config("Failed to get home directory".to_string()))?;
    Ok(PathBuf::from(home).join(".httplog"))
}

/// データベースURLを取得
///
/// `HTTPLOG_DATABASE_URL`（旧: `DATABASE_URL`）、未設定なら `~/.httplog/httplog.db`。
pub fn database_url() -> CommonResult<String> {
    if let Some(url) = get_env_with_fallback("HTTPLOG_DATABASE_URL", "DATABASE_URL") {
        return Ok(url);
    }
    let path = data_dir()?.join("httplog.db");
    Ok(format!("sqlite:{}", path.display()))
}

/// 処理途中でキャンセルされたやり取りの扱い
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CancelledCapturePolicy {
    /// キャンセルを例外詳細として部分的なレコードを記録する
    #[default]
    Record,
    /// 何も記録しない
    Discard,
}

impl FromStr for CancelledCapturePolicy {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "record" => Ok(Self::Record),
            "discard" => Ok(Self::Discard),
            other => Err(CommonError::Config(format!(
                "Unknown cancelled capture policy '{}', expected 'record' or 'discard'",
                other
            ))),
        }
    }
}

/// リクエスト・レスポンスボディを記録する上限のデフォルト（8 MiB）
pub const DEFAULT_MAX_CAPTURE_BODY_BYTES: usize = 8 * 1024 * 1024;

/// キャプチャパイプラインの設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    /// 全レコードに付与するルーティングタグ
    pub filter_type: Option<String>,
    /// キャンセル時の扱い
    pub cancelled_policy: CancelledCapturePolicy,
    /// メモリに読み込んで記録するボディの上限バイト数
    pub max_body_bytes: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            filter_type: None,
            cancelled_policy: CancelledCapturePolicy::default(),
            max_body_bytes: DEFAULT_MAX_CAPTURE_BODY_BYTES,
        }
    }
}

impl CaptureConfig {
    /// 環境変数から読み込む
    ///
    /// 不正な `HTTPLOG_CANCELLED_CAPTURE` は警告を出してデフォルトを使う。
    pub fn from_env() -> Self {
        let filter_type = get_env_with_fallback("HTTPLOG_FILTER_TYPE", "FILTER_TYPE")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        let cancelled_policy = match std::env::var("HTTPLOG_CANCELLED_CAPTURE") {
            Ok(value) => value.parse().unwrap_or_else(|e: CommonError| {
                tracing::warn!("{}; falling back to 'record'", e);
                CancelledCapturePolicy::Record
            }),
            Err(_) => CancelledCapturePolicy::default(),
        };

        Self {
            filter_type,
            cancelled_policy,
            max_body_bytes: get_env_parse(
                "HTTPLOG_CAPTURE_MAX_BODY_BYTES",
                DEFAULT_MAX_CAPTURE_BODY_BYTES,
            ),
        }
    }
}

/// クエリAPIサーバーのバインド設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// バインドホスト
    pub host: String,
    /// ポート
    pub port: u16,
}

impl ServerConfig {
    /// 環境変数から読み込む
    pub fn from_env() -> Self {
        Self {
            host: get_env_parse("HTTPLOG_HOST", "0.0.0.0".to_string()),
            port: get_env_parse("HTTPLOG_PORT", 32780u16),
        }
    }

    /// `host:port` 形式のバインドアドレス
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
