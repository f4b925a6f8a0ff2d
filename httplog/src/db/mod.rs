//! データベースアクセス層
//!
//! SQLiteベースのキャプチャログ永続化

/// データベースマイグレーション
pub mod migrations;

/// キャプチャログストレージ
pub mod capture_log;
