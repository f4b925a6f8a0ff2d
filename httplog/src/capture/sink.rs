//! キャプチャレコードの出力先
//!
//! レコードは組み立て後にムーブで出力先へ渡される。出力はブロックしない同期呼び出しで、
//! キャンセル時のドロップ処理からも呼ばれる。

use crate::capture::types::CaptureRecord;
use crate::common::error::HttpLogResult;
use std::sync::{Arc, Mutex};
use tracing::{error, info};

/// レコード出力先
pub trait CaptureSink: Send + Sync {
    /// レコードを出力する（ブロックしない）
    fn emit(&self, record: CaptureRecord) -> HttpLogResult<()>;
}

/// コンソール出力（`httplog::capture` ターゲットのtracingイベント）
///
/// 正常完了はINFO、例外はERRORで出力する。
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl CaptureSink for TracingSink {
    fn emit(&self, record: CaptureRecord) -> HttpLogResult<()> {
        if record.is_faulted() {
            error!(
                target: "httplog::capture",
                http_method = %record.http_method,
                request_path = %record.request_path,
                query_string = record.query_string.as_deref(),
                status_code = record.status_code,
                elapsed_secs = record.elapsed_secs,
                memory_usage_mb = record.memory_usage_mb,
                hostname = record.hostname.as_deref(),
                controller_action = record.controller_action.as_deref(),
                client_ip = record.client_ip.as_deref(),
                user_agent = record.user_agent.as_deref(),
                filter_type = record.filter_type.as_deref(),
                exception_details = record.exception_details.as_deref(),
                "HTTP exchange failed"
            );
        } else {
            info!(
                target: "httplog::capture",
                http_method = %record.http_method,
                request_path = %record.request_path,
                query_string = record.query_string.as_deref(),
                status_code = record.status_code,
                elapsed_secs = record.elapsed_secs,
                memory_usage_mb = record.memory_usage_mb,
                hostname = record.hostname.as_deref(),
                controller_action = record.controller_action.as_deref(),
                client_ip = record.client_ip.as_deref(),
                user_agent = record.user_agent.as_deref(),
                filter_type = record.filter_type.as_deref(),
                "HTTP exchange captured"
            );
        }
        Ok(())
    }
}

/// 複数の出力先へ順に出力する
///
/// 途中の出力先が失敗しても残りには出力し、最初のエラーを返す。
#[derive(Clone, Default)]
pub struct CaptureSinks {
    sinks: Vec<Arc<dyn CaptureSink>>,
}

impl CaptureSinks {
    /// 空の出力先リストを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// 出力先を追加
    pub fn with(mut self, sink: Arc<dyn CaptureSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl CaptureSink for CaptureSinks {
    fn emit(&self, record: CaptureRecord) -> HttpLogResult<()> {
        let mut result = Ok(());
        let Some((last, rest)) = self.sinks.split_last() else {
            return result;
        };
        for sink in rest {
            if let Err(e) = sink.emit(record.clone()) {
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }
        if let Err(e) = last.emit(record) {
            if result.is_ok() {
                result = Err(e);
            }
        }
        result
    }
}

/// メモリ上に保持する出力先（埋め込み用途・テスト用）
#[derive(Debug, Clone, Default)]
pub struct InMemorySink {
    records: Arc<Mutex<Vec<CaptureRecord>>>,
}

impl InMemorySink {
    /// 空の出力先を作成
    pub fn new() -> Self {
        Self::default()
    }

    /// 出力されたレコードのコピー
    pub fn records(&self) -> Vec<CaptureRecord> {
        match self.records.lock() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl CaptureSink for InMemorySink {
    fn emit(&self, record: CaptureRecord) -> HttpLogResult<()> {
        match self.records.lock() {
            Ok(mut records) => records.push(record),
            Err(poisoned) => poisoned.into_inner().push(record),
        }
        Ok(())
    }
}
