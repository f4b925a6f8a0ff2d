//! REST APIルーター
//!
//! キャプチャログ参照APIと、キャプチャ対象となるアプリケーションルートを組み立てる。

pub mod capture_logs;
pub mod error;

use crate::capture::capture_middleware;
use crate::AppState;
use axum::{middleware::from_fn_with_state, routing::get, Router};
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

/// キャプチャログ参照APIのルーター
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/capture-logs", get(capture_logs::list_capture_logs))
        .route(
            "/api/capture-logs/exceptions",
            get(capture_logs::list_exception_logs),
        )
        .route(
            "/api/capture-logs/:id",
            get(capture_logs::get_capture_log).delete(capture_logs::delete_capture_log),
        )
        .with_state(state)
}

/// アプリケーション全体のルーターを作成
///
/// `routes` はキャプチャ対象になり得るアプリケーションルート。
/// キャプチャ層はルート単位で適用されるため、ハンドラーからは `MatchedPath` が見える。
/// パニックはキャプチャ層が記録したうえで再送出し、`CatchPanicLayer` が500に変換する。
pub fn create_app(state: AppState, routes: Router) -> Router {
    let capture = state.capture.clone();

    create_router(state)
        .merge(routes)
        .layer(from_fn_with_state(capture, capture_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::new())
}
