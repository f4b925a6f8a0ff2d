//! APIエラーレスポンス型
//!
//! axum用の共通エラーハンドリング

use crate::common::error::{CommonError, HttpLogError};
use axum::{response::IntoResponse, Json};
use serde_json::json;

/// Axum用のエラーレスポンス型
#[derive(Debug)]
pub struct AppError(pub HttpLogError);

impl From<HttpLogError> for AppError {
    fn from(err: HttpLogError) -> Self {
        AppError(err)
    }
}

impl From<CommonError> for AppError {
    fn from(err: CommonError) -> Self {
        AppError(HttpLogError::Common(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        // 詳細（SQLエラー等）はログにのみ出し、クライアントには external_message() を返す
        let status = self.0.status_code();
        if status.is_server_error() {
            tracing::error!(error_type = self.0.error_type(), error = %self.0, "Request failed");
        } else {
            tracing::debug!(error_type = self.0.error_type(), error = %self.0, "Request rejected");
        }

        let payload = json!({
            "error": self.0.external_message()
        });

        (status, Json(payload)).into_response()
    }
}
