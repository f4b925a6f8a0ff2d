//! キャプチャログAPIハンドラー
//!
//! `/api/capture-logs` 系のエンドポイント

use super::error::AppError;
use crate::capture::types::{
    CaptureRecord, CaptureRecordView, DateFilter, Paginated, PaginationRequest, DEFAULT_PAGE_SIZE,
};
use crate::common::error::{CommonError, HttpLogError};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

/// 一覧取得のクエリパラメータ
#[derive(Debug, Default, Deserialize)]
pub struct CaptureLogQueryParams {
    /// ページ番号（1始まり、デフォルト: 1）
    pub page: Option<i64>,
    /// ページあたり件数（デフォルト: 10）
    pub size: Option<i64>,
    /// 開始日（YYYY-MM-DD、当日を含む）
    pub from_date: Option<NaiveDate>,
    /// 終了日（YYYY-MM-DD、当日を含む）
    pub to_date: Option<NaiveDate>,
}

impl CaptureLogQueryParams {
    fn pagination(&self) -> Result<PaginationRequest, CommonError> {
        let page = to_positive_u32("page", self.page.unwrap_or(1))?;
        let size = to_positive_u32("size", self.size.unwrap_or(i64::from(DEFAULT_PAGE_SIZE)))?;
        Ok(PaginationRequest::new(page, size))
    }

    fn date_filter(&self) -> DateFilter {
        DateFilter {
            from_date: self.from_date,
            to_date: self.to_date,
        }
    }
}

fn to_positive_u32(name: &str, value: i64) -> Result<u32, CommonError> {
    if value < 1 {
        return Err(CommonError::Validation(format!(
            "{} must be greater than or equal to 1",
            name
        )));
    }
    u32::try_from(value)
        .map_err(|_| CommonError::Validation(format!("{} is too large", name)))
}

fn to_views(page: Paginated<CaptureRecord>) -> Paginated<CaptureRecordView> {
    let now = Utc::now();
    page.map(|record| CaptureRecordView::new(record, now))
}

/// GET /api/capture-logs - キャプチャログ一覧（新しい順）
pub async fn list_capture_logs(
    State(state): State<AppState>,
    Query(params): Query<CaptureLogQueryParams>,
) -> Result<Json<Paginated<CaptureRecordView>>, AppError> {
    let pagination = params.pagination()?;
    let page = state
        .capture_log_storage
        .list(&pagination, &params.date_filter())
        .await?;
    Ok(Json(to_views(page)))
}

/// GET /api/capture-logs/exceptions - 例外を含むキャプチャログ一覧（新しい順）
pub async fn list_exception_logs(
    State(state): State<AppState>,
    Query(params): Query<CaptureLogQueryParams>,
) -> Result<Json<Paginated<CaptureRecordView>>, AppError> {
    let pagination = params.pagination()?;
    let page = state
        .capture_log_storage
        .list_exceptions_only(&pagination, &params.date_filter())
        .await?;
    Ok(Json(to_views(page)))
}

/// GET /api/capture-logs/:id - キャプチャログ詳細
pub async fn get_capture_log(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<CaptureRecord>, AppError> {
    state
        .capture_log_storage
        .get_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError(HttpLogError::NotFound(format!("Capture log {} not found", id))))
}

/// DELETE /api/capture-logs/:id - キャプチャログ削除
pub async fn delete_capture_log(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    if state.capture_log_storage.delete_by_id(id).await? {
        tracing::info!(id, "Capture log deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError(HttpLogError::NotFound(format!(
            "Capture log {} not found",
            id
        ))))
    }
}
