//! serve サブコマンド
//!
//! キャプチャログ参照APIサーバーを起動します。

use crate::config::ServerConfig;
use clap::Args;

/// serve サブコマンドの引数
#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Listen port
    #[arg(short, long, default_value = "32780", env = "HTTPLOG_PORT")]
    pub port: u16,

    /// Bind address
    #[arg(short = 'H', long, default_value = "0.0.0.0", env = "HTTPLOG_HOST")]
    pub host: String,
}

impl From<ServeArgs> for ServerConfig {
    fn from(args: ServeArgs) -> Self {
        ServerConfig {
            host: args.host,
            port: args.port,
        }
    }
}
