//! キャプチャミドルウェア
//!
//! 対象ルートのリクエスト/レスポンスを記録する。対象外のリクエストは何もせずに通過させる。

use crate::capture::eligibility::{Eligibility, HandlerRegistry};
use crate::capture::recorder::ExchangeRecorder;
use crate::capture::request::RequestSnapshot;
use crate::capture::response::ResponseCaptureSink;
use crate::capture::sink::CaptureSink;
use crate::config::CaptureConfig;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::warn;

/// キャプチャパイプライン（ミドルウェアの状態）
#[derive(Clone)]
pub struct CapturePipeline {
    registry: Arc<HandlerRegistry>,
    sink: Arc<dyn CaptureSink>,
    config: CaptureConfig,
}

impl CapturePipeline {
    /// パイプラインを作成
    pub fn new(registry: HandlerRegistry, sink: Arc<dyn CaptureSink>, config: CaptureConfig) -> Self {
        Self {
            registry: Arc::new(registry),
            sink,
            config,
        }
    }

    /// 1回のやり取りを処理する
    ///
    /// ハンドラーのパニックは記録後にそのまま再送出する。
    pub async fn handle(&self, request: Request, next: Next) -> Response {
        let controller_action = match self.registry.resolve(&request) {
            Eligibility::NotEligible => return next.run(request).await,
            Eligibility::Eligible { controller_action } => controller_action,
        };

        let (parts, body) = request.into_parts();
        let mut recorder = ExchangeRecorder::begin(
            self.sink.clone(),
            self.config.filter_type.clone(),
            self.config.cancelled_policy,
            RequestSnapshot::from_parts(&parts),
            controller_action,
        );
        let body = recorder
            .snapshot_mut()
            .capture_body(&parts.headers, body, self.config.max_body_bytes)
            .await;
        let request = Request::from_parts(parts, body);

        let mut response_sink = ResponseCaptureSink::new();
        let outcome = AssertUnwindSafe(async {
            let response = next.run(request).await;
            response_sink
                .absorb(response, self.config.max_body_bytes)
                .await;
        })
        .catch_unwind()
        .await;

        match outcome {
            Ok(()) => {
                recorder.record_completed(&response_sink);
                response_sink.forward().unwrap_or_else(|| {
                    warn!("Capture sink was empty after the handler completed");
                    StatusCode::INTERNAL_SERVER_ERROR.into_response()
                })
            }
            Err(payload) => {
                recorder.record_panicked(payload.as_ref());
                std::panic::resume_unwind(payload)
            }
        }
    }
}

/// キャプチャミドルウェア
///
/// `axum::middleware::from_fn_with_state(pipeline, capture_middleware)` で適用する。
/// `MatchedPath` を参照するため `Router::layer` でルートごとに適用すること。
pub async fn capture_middleware(
    State(pipeline): State<CapturePipeline>,
    request: Request,
    next: Next,
) -> Response {
    pipeline.handle(request, next).await
}
