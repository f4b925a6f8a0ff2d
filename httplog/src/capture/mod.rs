//! HTTPリクエスト/レスポンスのキャプチャ
//!
//! 対象ルートのやり取りをヘッダー・ボディ・処理時間・例外情報ごと記録し、
//! 出力先（コンソール・DBライター）へ渡す。

pub mod body;
pub mod eligibility;
pub mod memory;
pub mod middleware;
pub mod recorder;
pub mod request;
pub mod response;
pub mod sink;
pub mod types;
pub mod writer;

pub use eligibility::{HandlerGroup, HandlerName, HandlerRegistry};
pub use middleware::{capture_middleware, CapturePipeline};
pub use request::CallerIdentity;
pub use sink::{CaptureSink, CaptureSinks, InMemorySink, TracingSink};
pub use types::CaptureRecord;
pub use writer::{CaptureLogWriter, CaptureLogWriterConfig};
