//! 冷却门
//!
//! 集群共享的最早可开始时间。只有真正执行了刷新的成员才推进它。

use dirsync_common::Result;
use std::sync::Arc;
use std::time::Duration;

use super::SharedTimestamp;

/// 冷却门
#[derive(Clone)]
pub struct CooldownGate {
    timestamp: Arc<dyn SharedTimestamp>,
}

impl CooldownGate {
    pub fn new(timestamp: Arc<dyn SharedTimestamp>) -> Self {
        Self { timestamp }
    }

    /// 下一次刷新最早开始时间（Unix 毫秒）
    pub async fn next_allowed(&self) -> Result<i64> {
        self.timestamp.get().await
    }

    /// `now >= 门值` 时门是开的
    pub async fn is_open(&self, now: i64) -> Result<bool> {
        Ok(now >= self.next_allowed().await?)
    }

    /// 把门推进到 `now + interval`，返回新的门值
    pub async fn close_for(&self, now: i64, interval: Duration) -> Result<i64> {
        let interval_ms = i64::try_from(interval.as_millis()).unwrap_or(i64::MAX);
        let next = now.saturating_add(interval_ms);
        self.timestamp.set(next).await?;
        Ok(next)
    }
}
