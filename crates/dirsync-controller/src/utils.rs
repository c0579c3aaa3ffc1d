//! 控制平面工具函数
//!
//! 墙钟时间与持续时间格式化等小工具。

use std::time::Duration;

/// 当前墙钟时间（Unix 毫秒）
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// 格式化持续时间为人类可读的字符串
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        return format!("{} 毫秒", millis);
    }

    let seconds = duration.as_secs();
    if seconds < 60 {
        return format!("{} 秒", seconds);
    }

    let minutes = seconds / 60;
    if minutes < 60 {
        return format!("{} 分钟 {} 秒", minutes, seconds % 60);
    }

    let hours = minutes / 60;
    if hours < 24 {
        return format!("{} 小时 {} 分钟", hours, minutes % 60);
    }

    let days = hours / 24;
    format!("{} 天 {} 小时", days, hours % 24)
}
