//! キャプチャレコードとクエリ用の型定義

use crate::common::error::{CommonError, CommonResult};
use crate::common::time_ago::format_time_ago;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// 一覧APIのデフォルトページサイズ
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// 1回のHTTPやり取りを記録したレコード
///
/// 組み立て後は変更されない。シンクへはムーブで渡される。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureRecord {
    /// レコードID（ストア挿入後に設定）
    pub id: Option<i64>,
    /// キャプチャ開始時刻
    pub timestamp: DateTime<Utc>,
    /// HTTPメソッド
    pub http_method: String,
    /// リクエストパス
    pub request_path: String,
    /// クエリ文字列（先頭の `?` なし）
    pub query_string: Option<String>,
    /// リクエストヘッダー（JSONオブジェクト文字列）
    pub request_headers: Option<String>,
    /// リクエストボディ（テキスト、またはmultipartの構造化説明）
    pub request_body: Option<String>,
    /// HTTPステータスコード
    pub status_code: Option<u16>,
    /// レスポンスヘッダー（JSONオブジェクト文字列）
    pub response_headers: Option<String>,
    /// レスポンスボディ
    pub response_body: Option<String>,
    /// 処理時間（秒）
    pub elapsed_secs: f64,
    /// 例外詳細（正常完了時は `None`）
    pub exception_details: Option<String>,
    /// プロセスのメモリ使用量（MB）
    pub memory_usage_mb: Option<f64>,
    /// ホスト名
    pub hostname: Option<String>,
    /// `{group}@{action}` 形式のハンドラー識別子
    pub controller_action: Option<String>,
    /// クライアントIPアドレス
    pub client_ip: Option<String>,
    /// 呼び出し元の識別子、なければUser-Agent
    pub user_agent: Option<String>,
    /// 設定で指定されたルーティングタグ
    pub filter_type: Option<String>,
}

impl CaptureRecord {
    /// 例外で終了したやり取りかどうか
    pub fn is_faulted(&self) -> bool {
        self.exception_details
            .as_deref()
            .is_some_and(|details| !details.is_empty())
    }

    /// ストア保存用のタイムスタンプ文字列
    ///
    /// 固定幅のため文字列比較で時刻順になる。
    pub fn timestamp_key(&self) -> String {
        format_timestamp(&self.timestamp)
    }
}

/// タイムスタンプを保存形式（マイクロ秒、`Z` 終端）に変換
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// 一覧表示用のレコード（経過時間表記付き）
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureRecordView {
    /// レコード本体
    #[serde(flatten)]
    pub record: CaptureRecord,
    /// 「3 min ago」などの経過時間表記
    pub time_ago: String,
}

impl CaptureRecordView {
    /// 現在時刻を基準に表示用レコードを作成
    pub fn new(record: CaptureRecord, now: DateTime<Utc>) -> Self {
        let time_ago = format_time_ago(record.timestamp, now);
        Self { record, time_ago }
    }
}

/// ページ指定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PaginationRequest {
    /// ページ番号（1始まり）
    #[serde(default = "default_page")]
    pub page: u32,
    /// ページサイズ
    #[serde(default = "default_page_size")]
    pub size: u32,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl Default for PaginationRequest {
    fn default() -> Self {
        Self {
            page: default_page(),
            size: default_page_size(),
        }
    }
}

impl PaginationRequest {
    /// ページ指定を作成（検証なし）
    pub fn new(page: u32, size: u32) -> Self {
        Self { page, size }
    }

    /// ページ番号・サイズが1以上であることを検証
    pub fn validate(&self) -> CommonResult<()> {
        if self.page < 1 {
            return Err(CommonError::Validation(
                "page must be greater than or equal to 1".to_string(),
            ));
        }
        if self.size < 1 {
            return Err(CommonError::Validation(
                "size must be greater than or equal to 1".to_string(),
            ));
        }
        if self.checked_offset().is_none() {
            return Err(CommonError::Validation(
                "page is out of range for the given size".to_string(),
            ));
        }
        Ok(())
    }

    fn checked_offset(&self) -> Option<i64> {
        (i64::from(self.page.max(1)) - 1).checked_mul(i64::from(self.size))
    }

    /// SQLのOFFSET値
    ///
    /// i64に収まらない場合は `i64::MAX` に丸める（該当行なしになる）。
    pub fn offset(&self) -> i64 {
        self.checked_offset().unwrap_or(i64::MAX)
    }

    /// SQLのLIMIT値
    pub fn limit(&self) -> i64 {
        i64::from(self.size)
    }
}

/// ページング結果のメタ情報
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationDetails {
    /// 現在ページ
    pub current_page: u32,
    /// ページサイズ
    pub page_size: u32,
    /// フィルタに一致した総件数
    pub total_items: i64,
    /// 総ページ数
    pub total_pages: i64,
    /// 前ページが存在するか
    pub has_previous_page: bool,
    /// 次ページが存在するか
    pub has_next_page: bool,
}

impl PaginationDetails {
    /// 総件数とページ指定から導出
    pub fn new(request: &PaginationRequest, total_items: i64) -> Self {
        let size = i64::from(request.size.max(1));
        let total_pages = (total_items + size - 1) / size;
        let current = i64::from(request.page);
        Self {
            current_page: request.page,
            page_size: request.size,
            total_items,
            total_pages,
            has_previous_page: current > 1,
            has_next_page: current < total_pages,
        }
    }
}

/// ページング結果
#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    /// ページ内のアイテム
    pub data: Vec<T>,
    /// ページング情報
    pub pagination: PaginationDetails,
}

impl<T> Paginated<T> {
    /// アイテムを変換する
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            data: self.data.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }
}

/// 日付範囲フィルタ（UTC、両端を含む）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct DateFilter {
    /// 開始日
    pub from_date: Option<NaiveDate>,
    /// 終了日
    pub to_date: Option<NaiveDate>,
}

impl DateFilter {
    /// `timestamp >= ?` に使う下限
    pub fn lower_bound(&self) -> Option<String> {
        self.from_date
            .map(|date| format_timestamp(&date.and_time(NaiveTime::MIN).and_utc()))
    }

    /// `timestamp < ?` に使う上限（終了日の翌日0時）
    pub fn upper_bound_exclusive(&self) -> Option<String> {
        self.to_date.map(|date| {
            let next = date.and_time(NaiveTime::MIN).and_utc() + Duration::days(1);
            format_timestamp(&next)
        })
    }
}
