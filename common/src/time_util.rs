use std::time::{Instant, SystemTime, UNIX_EPOCH};

use chrono::Local;
use lazy_static::lazy_static;

lazy_static! {
    /// 单调时钟的进程内锚点
    static ref MONOTONIC_ANCHOR: Instant = Instant::now();
}

/// 获取当前时间的秒数
pub fn now() -> u64 {
    let now = SystemTime::now();

    let duration_since_epoch = now
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards"); // 如果时间回拨了，这会 panic

    duration_since_epoch.as_secs()
}

/// 获取当前时间的格式化输出
pub fn now_str() -> String {
    let chrono_time = Local::now();

    chrono_time.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// 真实时钟，自 UNIX 纪元以来的微秒数
pub fn realtime_time() -> u64 {
    let duration_since_epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards");

    duration_since_epoch.as_micros() as u64
}

/// 单调时钟的微秒数。只用于计算时间差，锚点是进程内首次调用时刻。
pub fn monotonic_time() -> u64 {
    MONOTONIC_ANCHOR.elapsed().as_micros() as u64
}
