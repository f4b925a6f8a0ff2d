//! 共通型・ユーティリティ

/// エラー型定義
pub mod error;

/// IPアドレス正規化
pub mod ip;

/// 経過時間の表記
pub mod time_ago;
