//! httplog server entry point

use clap::Parser;
use httplog::capture::HandlerRegistry;
use httplog::cli::{Cli, Commands};
use httplog::config::ServerConfig;
use httplog::{bootstrap, logging, server};
use tracing::error;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match cli.command {
        Some(Commands::Serve(args)) => ServerConfig::from(args),
        // No subcommand - default to serve
        None => ServerConfig::from_env(),
    };

    let _log_guard = match logging::init() {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run_server(config).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run_server(config: ServerConfig) -> httplog::common::error::HttpLogResult<()> {
    // スタンドアロン起動では参照APIのみを提供する（キャプチャ対象のルートは組み込み側で登録）
    let state = bootstrap::initialize(HandlerRegistry::default()).await?;
    server::run(state, &config.bind_addr(), axum::Router::new()).await
}
