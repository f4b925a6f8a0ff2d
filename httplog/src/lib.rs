//! httplog
//!
//! axumアプリケーション向けのHTTPリクエスト/レスポンス監査ログ。
//! 対象ルートのやり取りをキャプチャしてSQLiteに保存し、参照APIを提供する。

#![warn(missing_docs)]

/// 共通型定義（エラー・IP正規化・相対時刻）
pub mod common;

/// REST APIハンドラー
pub mod api;

/// リクエスト/レスポンスのキャプチャパイプライン
pub mod capture;

/// データベースアクセス
pub mod db;

/// ロギング初期化ユーティリティ
pub mod logging;

/// 設定管理（環境変数ヘルパー）
pub mod config;

/// CLIインターフェース
pub mod cli;

/// 初期化処理
pub mod bootstrap;

/// axumサーバー起動
pub mod server;

/// Shutdown controller
pub mod shutdown;

/// アプリケーション状態
#[derive(Clone)]
pub struct AppState {
    /// キャプチャログストレージ
    pub capture_log_storage: std::sync::Arc<db::capture_log::CaptureLogStorage>,
    /// キャプチャログライター
    pub capture_log_writer: capture::CaptureLogWriter,
    /// キャプチャパイプライン（ミドルウェア状態）
    pub capture: capture::CapturePipeline,
    /// Cooperative shutdown controller
    pub shutdown: shutdown::ShutdownController,
}
