//! axumサーバー起動・シャットダウンハンドリング

use crate::common::error::{HttpLogError, HttpLogResult};
use crate::shutdown::ShutdownController;
use crate::AppState;
use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// 指定アドレスでサーバーを起動し、シャットダウンシグナルを待機する
pub async fn run(state: AppState, bind_addr: &str, routes: Router) -> HttpLogResult<()> {
    let listener = TcpListener::bind(bind_addr)
        .await
        .map_err(|e| HttpLogError::Internal(format!("Failed to bind {}: {}", bind_addr, e)))?;
    serve(state, listener, routes).await
}

/// バインド済みのリスナーでサーバーを起動する
///
/// 停止後、キャプチャログライターに残っているレコードをフラッシュしてから戻る。
pub async fn serve(state: AppState, listener: TcpListener, routes: Router) -> HttpLogResult<()> {
    let shutdown = state.shutdown.clone();
    let writer = state.capture_log_writer.clone();
    let app = crate::api::create_app(state, routes);

    if let Ok(addr) = listener.local_addr() {
        info!("httplog server listening on {}", addr);
    }

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(shutdown))
    .await
    .map_err(|e| HttpLogError::Internal(format!("Server error: {}", e)))?;

    if let Err(e) = writer.flush().await {
        warn!("Failed to flush capture logs on shutdown: {}", e);
    }

    info!("Server shutdown complete");
    Ok(())
}

/// シャットダウンシグナルを待機
async fn shutdown_signal(shutdown: ShutdownController) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down...");
        }
        _ = shutdown.wait() => {
            info!("Shutdown requested, shutting down...");
        }
    }
}
