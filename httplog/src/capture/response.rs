//! レスポンスキャプチャシンク
//!
//! ハンドラーの出力をすべてバッファしてから記録し、呼び出し元へちょうど1回転送する。
//! 上限以内の本文は、ハンドラーが出力を終えるまで呼び出し元には1バイトも流れない。
//!
//! バッファした本文は長さが確定しているため、ハンドラーがチャンク形式で流していても
//! 転送時には `content-length` 付きになる（バイト列は同一、フレーミングのみ異なる）。
//! キャプチャ上限を超えた本文は上限までをバッファし、残りはハンドラーのストリームを
//! そのまま流すので、この場合はチャンク形式のまま転送される。

use crate::capture::body::DrainedBody;
use crate::capture::request::headers_to_json;
use axum::http::response::Parts;
use axum::response::Response;

/// ハンドラーのレスポンスを受け取るバッファ
///
/// ハンドラー実行前に作成し、完了後に [`absorb`](Self::absorb) で中身を受け取る。
/// ハンドラーがレスポンスを返さずに失敗した場合は空のまま。
#[derive(Debug, Default)]
pub struct ResponseCaptureSink {
    captured: Option<(Parts, DrainedBody)>,
}

impl ResponseCaptureSink {
    /// 空のシンクを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// ハンドラーのレスポンスをボディの最後（またはエラー）まで読み込む
    ///
    /// `max_body_bytes` を超えた時点で読み込みを止め、本文は記録しない。
    pub async fn absorb(&mut self, response: Response, max_body_bytes: usize) {
        let (parts, body) = response.into_parts();
        let drained = DrainedBody::drain_limited(body, max_body_bytes).await;
        self.captured = Some((parts, drained));
    }

    /// ステータスコード
    pub fn status_code(&self) -> Option<u16> {
        self.captured
            .as_ref()
            .map(|(parts, _)| parts.status.as_u16())
    }

    /// レスポンスヘッダー（JSON）
    pub fn headers_json(&self) -> Option<String> {
        self.captured
            .as_ref()
            .and_then(|(parts, _)| headers_to_json(&parts.headers))
    }

    /// レスポンスボディのテキスト
    pub fn body_text(&self) -> Option<String> {
        self.captured.as_ref().and_then(|(_, body)| body.text())
    }

    /// ボディの生成中にハンドラー側で発生したエラー
    pub fn stream_error(&self) -> Option<String> {
        self.captured
            .as_ref()
            .and_then(|(_, body)| body.error_message())
    }

    /// バッファした内容を呼び出し元向けのレスポンスとして返す
    ///
    /// ボディがエラーで終わっていた場合は、バッファ済みの部分に続けて同じエラーを流す。
    pub fn forward(self) -> Option<Response> {
        self.captured
            .map(|(parts, body)| Response::from_parts(parts, body.into_body()))
    }
}
