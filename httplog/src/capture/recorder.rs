//! やり取り単位のレコーダー
//!
//! 計時開始からレコードの組み立て・出力までを担当する。
//! ハンドラーの完了・失敗のどちらでも出力してから制御を返し、
//! 途中でドロップ（キャンセル）された場合は [`CancelledCapturePolicy`] に従う。

use crate::capture::memory::sample_process_memory_mb;
use crate::capture::request::RequestSnapshot;
use crate::capture::response::ResponseCaptureSink;
use crate::capture::sink::CaptureSink;
use crate::capture::types::CaptureRecord;
use crate::config::CancelledCapturePolicy;
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use std::any::Any;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// キャンセル時に記録する例外詳細
pub const CANCELLED_DETAILS: &str = "request cancelled before the exchange completed";

/// 1回のやり取りを記録するレコーダー
pub struct ExchangeRecorder {
    sink: Arc<dyn CaptureSink>,
    filter_type: Option<String>,
    cancelled_policy: CancelledCapturePolicy,
    started: Instant,
    timestamp: DateTime<Utc>,
    snapshot: RequestSnapshot,
    controller_action: Option<String>,
    finished: bool,
}

impl ExchangeRecorder {
    /// 計時を開始する
    pub fn begin(
        sink: Arc<dyn CaptureSink>,
        filter_type: Option<String>,
        cancelled_policy: CancelledCapturePolicy,
        snapshot: RequestSnapshot,
        controller_action: Option<String>,
    ) -> Self {
        Self {
            sink,
            filter_type,
            cancelled_policy,
            started: Instant::now(),
            timestamp: Utc::now(),
            snapshot,
            controller_action,
            finished: false,
        }
    }

    /// リクエスト側の記録内容（ボディ読み取り用）
    pub fn snapshot_mut(&mut self) -> &mut RequestSnapshot {
        &mut self.snapshot
    }

    /// ハンドラーがレスポンスを返した場合の記録
    ///
    /// レスポンスボディの生成がエラーで終わっていれば例外として記録する。
    pub fn record_completed(mut self, response: &ResponseCaptureSink) {
        let exception_details = response
            .stream_error()
            .map(|message| format!("response body stream failed: {}", message));
        let record = self.assemble(
            response.status_code(),
            response.headers_json(),
            response.body_text(),
            exception_details,
        );
        self.emit(record);
    }

    /// ハンドラーがパニックした場合の記録
    ///
    /// レスポンスが存在しないためステータスは500とする。
    pub fn record_panicked(mut self, payload: &(dyn Any + Send)) {
        let details = format!("handler panicked: {}", panic_message(payload));
        let record = self.assemble(
            Some(StatusCode::INTERNAL_SERVER_ERROR.as_u16()),
            None,
            None,
            Some(details),
        );
        self.emit(record);
    }

    fn assemble(
        &mut self,
        status_code: Option<u16>,
        response_headers: Option<String>,
        response_body: Option<String>,
        exception_details: Option<String>,
    ) -> CaptureRecord {
        self.finished = true;
        let snapshot = std::mem::take(&mut self.snapshot);

        CaptureRecord {
            id: None,
            timestamp: self.timestamp,
            http_method: snapshot.http_method,
            request_path: snapshot.request_path,
            query_string: snapshot.query_string,
            request_headers: snapshot.request_headers,
            request_body: snapshot.request_body,
            status_code,
            response_headers,
            response_body,
            elapsed_secs: self.started.elapsed().as_secs_f64(),
            exception_details,
            memory_usage_mb: sample_process_memory_mb(),
            hostname: snapshot.hostname,
            controller_action: self.controller_action.take(),
            client_ip: snapshot.client_ip,
            user_agent: snapshot.user_agent,
            filter_type: self.filter_type.take(),
        }
    }

    fn emit(&self, record: CaptureRecord) {
        let path = record.request_path.clone();
        if let Err(e) = self.sink.emit(record) {
            warn!(request_path = %path, "Failed to emit capture record: {}", e);
        }
    }
}

impl Drop for ExchangeRecorder {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        match self.cancelled_policy {
            CancelledCapturePolicy::Record => {
                let record = self.assemble(None, None, None, Some(CANCELLED_DETAILS.to_string()));
                self.emit(record);
            }
            CancelledCapturePolicy::Discard => {
                self.finished = true;
                debug!(
                    request_path = %self.snapshot.request_path,
                    "Exchange cancelled; discarding partial capture"
                );
            }
        }
    }
}

/// パニックのペイロードからメッセージを取り出す
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
