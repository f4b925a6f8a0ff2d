//! キャプチャログの非同期バッファライター
//!
//! レコードは送信側で上限付きの共有バッファに積み、バックグラウンドタスクが
//! 定期的にDBへ一括書き込みする。DB書き込みが遅れてバッファが溢れた場合は
//! 最も古いレコードから破棄する。mpscチャネルは明示フラッシュの要求と
//! 終了の検知にだけ使う。

use crate::capture::sink::CaptureSink;
use crate::capture::types::CaptureRecord;
use crate::common::error::{HttpLogError, HttpLogResult};
use crate::config::get_env_parse;
use crate::db::capture_log::CaptureLogStorage;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// キャプチャログライター設定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureLogWriterConfig {
    /// フラッシュ間隔（秒）。デフォルト: 5
    pub flush_interval_secs: u64,
    /// バッファ上限レコード数。デフォルト: 10000
    pub buffer_capacity: usize,
}

impl Default for CaptureLogWriterConfig {
    fn default() -> Self {
        Self {
            flush_interval_secs: get_env_parse("HTTPLOG_WRITER_FLUSH_INTERVAL_SECS", 5),
            buffer_capacity: get_env_parse("HTTPLOG_WRITER_BUFFER_CAPACITY", 10_000),
        }
    }
}

type SharedBuffer = Arc<Mutex<VecDeque<CaptureRecord>>>;

/// フラッシュ要求を溜めておける数
const FLUSH_REQUEST_CAPACITY: usize = 64;

/// キャプチャログの非同期ライター
///
/// Clone可能。全クローンがドロップされると残りをフラッシュして終了する。
#[derive(Clone)]
pub struct CaptureLogWriter {
    buffer: SharedBuffer,
    capacity: usize,
    flush_requests: mpsc::Sender<oneshot::Sender<()>>,
}

impl CaptureLogWriter {
    /// 新しいCaptureLogWriterを作成し、バックグラウンドタスクを起動
    pub fn new(storage: CaptureLogStorage, config: CaptureLogWriterConfig) -> Self {
        let config = CaptureLogWriterConfig {
            flush_interval_secs: config.flush_interval_secs.max(1),
            buffer_capacity: config.buffer_capacity.max(1),
        };
        let buffer: SharedBuffer = Arc::new(Mutex::new(VecDeque::with_capacity(
            config.buffer_capacity.min(1024),
        )));
        let (tx, rx) = mpsc::channel(FLUSH_REQUEST_CAPACITY);

        tokio::spawn(Self::background_task(rx, buffer.clone(), storage, config));

        Self {
            buffer,
            capacity: config.buffer_capacity,
            flush_requests: tx,
        }
    }

    /// レコードをバッファに追加（ブロックしない）
    ///
    /// バッファが上限に達している場合は最も古いレコードを破棄する。
    pub fn send(&self, record: CaptureRecord) -> HttpLogResult<()> {
        if self.flush_requests.is_closed() {
            return Err(HttpLogError::Internal(
                "Capture log writer stopped".to_string(),
            ));
        }
        let Ok(mut buffer) = self.buffer.lock() else {
            return Err(HttpLogError::Internal(
                "Capture log buffer is poisoned".to_string(),
            ));
        };
        push_bounded(&mut buffer, record, self.capacity);
        Ok(())
    }

    /// 送信済みのレコードをすべてDBへ書き込むまで待つ
    pub async fn flush(&self) -> HttpLogResult<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.flush_requests
            .send(ack_tx)
            .await
            .map_err(|_| HttpLogError::Internal("Capture log writer stopped".to_string()))?;
        ack_rx
            .await
            .map_err(|_| HttpLogError::Internal("Capture log writer stopped".to_string()))
    }

    /// バックグラウンドフラッシュタスク
    async fn background_task(
        mut rx: mpsc::Receiver<oneshot::Sender<()>>,
        buffer: SharedBuffer,
        storage: CaptureLogStorage,
        config: CaptureLogWriterConfig,
    ) {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(config.flush_interval_secs));
        // 最初のtickはすぐに発火するのでスキップ
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    Self::flush_buffer(&buffer, &storage).await;
                }
                request = rx.recv() => {
                    match request {
                        Some(ack) => {
                            Self::flush_buffer(&buffer, &storage).await;
                            let _ = ack.send(());
                        }
                        None => {
                            // 全ライターがドロップされた → 残りをフラッシュして終了
                            let remaining = Self::flush_buffer(&buffer, &storage).await;
                            if remaining > 0 {
                                info!("Capture log writer shut down after flushing {} remaining records", remaining);
                            }
                            info!("Capture log writer background task stopped");
                            return;
                        }
                    }
                }
            }
        }
    }

    /// バッファ内レコードをDBに一括書き込みし、取り出した件数を返す
    async fn flush_buffer(buffer: &SharedBuffer, storage: &CaptureLogStorage) -> usize {
        let records: Vec<CaptureRecord> = match buffer.lock() {
            Ok(mut buffer) => buffer.drain(..).collect(),
            Err(_) => {
                warn!("Capture log buffer is poisoned; skipping flush");
                return 0;
            }
        };
        let count = records.len();
        if count == 0 {
            return 0;
        }

        if let Err(e) = storage.insert_batch(&records).await {
            warn!(
                "Failed to flush capture log records: {}. {} records lost.",
                e, count
            );
            return count;
        }

        debug!("Flushed {} capture log records to database", count);
        count
    }
}

impl CaptureSink for CaptureLogWriter {
    fn emit(&self, record: CaptureRecord) -> HttpLogResult<()> {
        self.send(record)
    }
}

/// 上限付きでバッファに追加する
///
/// 上限に達している場合は最も古いレコードを破棄して返す。
fn push_bounded(
    buffer: &mut VecDeque<CaptureRecord>,
    record: CaptureRecord,
    capacity: usize,
) -> Option<CaptureRecord> {
    let discarded = if buffer.len() >= capacity {
        let discarded = buffer.pop_front();
        warn!(
            "Capture log buffer overflow (capacity: {}), discarding oldest record: {:?}",
            capacity,
            discarded.as_ref().map(|r| r.request_path.as_str())
        );
        discarded
    } else {
        None
    };
    buffer.push_back(record);
    discarded
}
