//! キャプチャログストレージ
//!
//! `http_request_logs` テーブルへの一括挿入とページング検索・削除。

use crate::capture::types::{
    CaptureRecord, DateFilter, Paginated, PaginationDetails, PaginationRequest,
};
use crate::common::error::{HttpLogError, HttpLogResult};
use sqlx::SqlitePool;

const SELECT_COLUMNS: &str = "id, timestamp, http_method, request_path, query_string, \
     request_headers, request_body, status_code, response_headers, response_body, \
     elapsed_secs, exception_details, memory_usage_mb, hostname, controller_action, \
     client_ip, user_agent, filter_type";

/// キャプチャログストレージ
#[derive(Clone)]
pub struct CaptureLogStorage {
    pool: SqlitePool,
}

/// sqlx::FromRow用の行構造体
#[derive(Debug, sqlx::FromRow)]
struct CaptureLogRow {
    id: i64,
    timestamp: String,
    http_method: String,
    request_path: String,
    query_string: Option<String>,
    request_headers: Option<String>,
    request_body: Option<String>,
    status_code: Option<i64>,
    response_headers: Option<String>,
    response_body: Option<String>,
    elapsed_secs: f64,
    exception_details: Option<String>,
    memory_usage_mb: Option<f64>,
    hostname: Option<String>,
    controller_action: Option<String>,
    client_ip: Option<String>,
    user_agent: Option<String>,
    filter_type: Option<String>,
}

impl TryFrom<CaptureLogRow> for CaptureRecord {
    type Error = HttpLogError;

    fn try_from(row: CaptureLogRow) -> Result<Self, Self::Error> {
        let timestamp = chrono::DateTime::parse_from_rfc3339(&row.timestamp)
            .map(|dt| dt.with_timezone(&chrono::Utc))
            .map_err(|e| HttpLogError::Database(format!("Failed to parse timestamp: {}", e)))?;

        let status_code = row
            .status_code
            .map(u16::try_from)
            .transpose()
            .map_err(|e| HttpLogError::Database(format!("Invalid status_code: {}", e)))?;

        Ok(CaptureRecord {
            id: Some(row.id),
            timestamp,
            http_method: row.http_method,
            request_path: row.request_path,
            query_string: row.query_string,
            request_headers: row.request_headers,
            request_body: row.request_body,
            status_code,
            response_headers: row.response_headers,
            response_body: row.response_body,
            elapsed_secs: row.elapsed_secs,
            exception_details: row.exception_details,
            memory_usage_mb: row.memory_usage_mb,
            hostname: row.hostname,
            controller_action: row.controller_action,
            client_ip: row.client_ip,
            user_agent: row.user_agent,
            filter_type: row.filter_type,
        })
    }
}

impl CaptureLogStorage {
    /// 新しいCaptureLogStorageを作成
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// キャプチャレコードを一括挿入
    pub async fn insert_batch(&self, records: &[CaptureRecord]) -> HttpLogResult<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| HttpLogError::Database(format!("Failed to begin transaction: {}", e)))?;

        for record in records {
            sqlx::query(
                r#"INSERT INTO http_request_logs (
                    timestamp, http_method, request_path, query_string,
                    request_headers, request_body, status_code, response_headers,
                    response_body, elapsed_secs, exception_details, memory_usage_mb,
                    hostname, controller_action, client_ip, user_agent, filter_type
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            )
            .bind(record.timestamp_key())
            .bind(&record.http_method)
            .bind(&record.request_path)
            .bind(&record.query_string)
            .bind(&record.request_headers)
            .bind(&record.request_body)
            .bind(record.status_code.map(i64::from))
            .bind(&record.response_headers)
            .bind(&record.response_body)
            .bind(record.elapsed_secs.max(0.0))
            .bind(&record.exception_details)
            .bind(record.memory_usage_mb)
            .bind(&record.hostname)
            .bind(&record.controller_action)
            .bind(&record.client_ip)
            .bind(&record.user_agent)
            .bind(&record.filter_type)
            .execute(&mut *tx)
            .await
            .map_err(|e| HttpLogError::Database(format!("Failed to insert capture log: {}", e)))?;
        }

        tx.commit()
            .await
            .map_err(|e| HttpLogError::Database(format!("Failed to commit transaction: {}", e)))?;

        Ok(())
    }

    /// 新しい順にページング取得
    pub async fn list(
        &self,
        pagination: &PaginationRequest,
        date_filter: &DateFilter,
    ) -> HttpLogResult<Paginated<CaptureRecord>> {
        self.paginate(pagination, date_filter, false).await
    }

    /// 例外を含むレコードのみを新しい順にページング取得
    pub async fn list_exceptions_only(
        &self,
        pagination: &PaginationRequest,
        date_filter: &DateFilter,
    ) -> HttpLogResult<Paginated<CaptureRecord>> {
        self.paginate(pagination, date_filter, true).await
    }

    /// フィルタ条件に一致する件数
    pub async fn count(&self, date_filter: &DateFilter, exceptions_only: bool) -> HttpLogResult<i64> {
        let (where_clause, bind_values) = build_where_clause(date_filter, exceptions_only);
        let sql = format!(
            "SELECT COUNT(*) as cnt FROM http_request_logs {}",
            where_clause
        );

        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        for val in &bind_values {
            query = query.bind(val.as_str());
        }

        query
            .fetch_one(&self.pool)
            .await
            .map_err(|e| HttpLogError::Database(format!("Failed to count capture logs: {}", e)))
    }

    /// IDでキャプチャレコードを取得
    pub async fn get_by_id(&self, id: i64) -> HttpLogResult<Option<CaptureRecord>> {
        let sql = format!("SELECT {} FROM http_request_logs WHERE id = ?", SELECT_COLUMNS);
        let row = sqlx::query_as::<_, CaptureLogRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| HttpLogError::Database(format!("Failed to get capture log by id: {}", e)))?;

        row.map(CaptureRecord::try_from).transpose()
    }

    /// IDでキャプチャレコードを削除
    ///
    /// 存在しなかった場合は `false`。
    pub async fn delete_by_id(&self, id: i64) -> HttpLogResult<bool> {
        let result = sqlx::query("DELETE FROM http_request_logs WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| HttpLogError::Database(format!("Failed to delete capture log: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn paginate(
        &self,
        pagination: &PaginationRequest,
        date_filter: &DateFilter,
        exceptions_only: bool,
    ) -> HttpLogResult<Paginated<CaptureRecord>> {
        pagination.validate()?;

        let total_items = self.count(date_filter, exceptions_only).await?;

        let (where_clause, bind_values) = build_where_clause(date_filter, exceptions_only);
        let sql = format!(
            "SELECT {} FROM http_request_logs {} ORDER BY timestamp DESC, id DESC LIMIT ? OFFSET ?",
            SELECT_COLUMNS, where_clause
        );

        let mut query = sqlx::query_as::<_, CaptureLogRow>(&sql);
        for val in &bind_values {
            query = query.bind(val.as_str());
        }
        query = query.bind(pagination.limit()).bind(pagination.offset());

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| HttpLogError::Database(format!("Failed to query capture logs: {}", e)))?;

        let data = rows
            .into_iter()
            .map(CaptureRecord::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Paginated {
            data,
            pagination: PaginationDetails::new(pagination, total_items),
        })
    }
}

fn build_where_clause(date_filter: &DateFilter, exceptions_only: bool) -> (String, Vec<String>) {
    let mut conditions: Vec<String> = Vec::new();
    let mut bind_values: Vec<String> = Vec::new();

    if exceptions_only {
        conditions.push("exception_details IS NOT NULL AND exception_details <> ''".to_string());
    }

    if let Some(from) = date_filter.lower_bound() {
        conditions.push("timestamp >= ?".to_string());
        bind_values.push(from);
    }

    if let Some(to) = date_filter.upper_bound_exclusive() {
        conditions.push("timestamp < ?".to_string());
        bind_values.push(to);
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    (where_clause, bind_values)
}
