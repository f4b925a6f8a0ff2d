//! エラー型定義
//!
//! 統一エラー型（thiserror使用）
//!
//! キャプチャパイプライン自体はエラーを呼び出し元に返さない（欠損フィールドは `None` に
//! 縮退させる）。ここで定義するエラーはストレージ・クエリAPI・設定読み込み用。

use axum::http::StatusCode;
use thiserror::Error;

/// Common layer error type
#[derive(Debug, Error)]
pub enum CommonError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

/// httplog error type
#[derive(Debug, Error)]
pub enum HttpLogError {
    /// Common layer error
    #[error(transparent)]
    Common(#[from] CommonError),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl HttpLogError {
    /// Returns a safe error message for external clients.
    ///
    /// Full error details (SQL errors, file paths) stay in the server logs via
    /// the `Display` implementation.
    pub fn external_message(&self) -> &'static str {
        match self {
            Self::Common(CommonError::Validation(_)) => "Invalid request",
            Self::Common(_) => "Request error",
            Self::NotFound(_) => "Not found",
            Self::Database(_) => "Database error",
            Self::Internal(_) => "Internal server error",
        }
    }

    /// Returns the error type string used in API responses.
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Common(_) => "invalid_request_error",
            Self::NotFound(_) => "not_found_error",
            Self::Database(_) => "server_error",
            Self::Internal(_) => "server_error",
        }
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Common(CommonError::Validation(_)) => StatusCode::BAD_REQUEST,
            Self::Common(CommonError::Serialization(_)) => StatusCode::BAD_REQUEST,
            Self::Common(CommonError::Config(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for HttpLogError {
    fn from(err: sqlx::Error) -> Self {
        HttpLogError::Database(err.to_string())
    }
}

/// Result type alias (Common)
pub type CommonResult<T> = Result<T, CommonError>;

/// Result type alias (httplog)
pub type HttpLogResult<T> = Result<T, HttpLogError>;
