//! CLI module for httplog
//!
//! Provides the command-line interface for the capture log query server.

pub mod serve;

use clap::{Parser, Subcommand};

/// httplog - HTTP request/response capture log server
#[derive(Parser, Debug)]
#[command(name = "httplog")]
#[command(version, about, long_about = None)]
#[command(after_help = r#"ENVIRONMENT VARIABLES:
    HTTPLOG_HOST                        Bind address (default: 0.0.0.0)
    HTTPLOG_PORT                        Listen port (default: 32780)
    HTTPLOG_DATABASE_URL                Database URL (default: sqlite:~/.httplog/httplog.db)
    HTTPLOG_FILTER_TYPE                 Tag attached to every capture record
    HTTPLOG_CANCELLED_CAPTURE           record | discard (default: record)
    HTTPLOG_CAPTURE_MAX_BODY_BYTES      Largest body recorded per exchange (default: 8388608)
    HTTPLOG_WRITER_FLUSH_INTERVAL_SECS  Capture writer flush interval (default: 5)
    HTTPLOG_WRITER_BUFFER_CAPACITY      Capture writer buffer size (default: 10000)
    HTTPLOG_LOG_LEVEL                   Log level (default: info)
    HTTPLOG_LOG_DIR                     Log directory (default: ~/.httplog/logs)
"#)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the capture log query server
    Serve(serve::ServeArgs),
}
