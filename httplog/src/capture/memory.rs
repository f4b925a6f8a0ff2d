//! プロセスメモリ使用量の取得

use sysinfo::{ProcessesToUpdate, System};

const BYTES_PER_MB: f64 = 1_048_576.0;

/// 現在プロセスの常駐メモリ使用量（MB）を取得
///
/// 取得できない環境では `None`。
pub fn sample_process_memory_mb() -> Option<f64> {
    let pid = sysinfo::get_current_pid().ok()?;
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
    let bytes = system.process(pid)?.memory();
    Some(bytes as f64 / BYTES_PER_MB)
}
