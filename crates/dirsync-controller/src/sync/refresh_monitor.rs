//! 刷新监控模块
//!
//! 如果某个成员在环首位置时崩溃，它的标识会一直停在环首，其他成员永远拿不到执行资格。
//! 监控器在本地观察环首与冷却门：当冷却门已开、环首是其他成员，并且两者连续
//! `stale_after_intervals` 个间隔都没有变化时，把该环首移到环尾，让下一个成员接手。
//! 被移走的成员如果仍然存活，只是错过一轮。

use dirsync_common::{MemberId, Result};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::cluster::{CooldownGate, TokenRing};
use crate::config::RefreshConfig;
use crate::utils::format_duration;

/// 本地观察到的环首与冷却门
#[derive(Debug, Clone, PartialEq, Eq)]
struct Observation {
    /// 环首成员
    head: String,
    /// 冷却门值
    gate: i64,
    /// 首次观察到该组合的时间
    since: i64,
}

/// 刷新监控器
pub struct RefreshMonitor {
    /// 本成员标识
    member: MemberId,
    /// 成员令牌环
    ring: TokenRing,
    /// 冷却门
    gate: CooldownGate,
    /// 判定环首失联所需的时长
    stale_after: Duration,
    /// 最近一次观察
    observation: Mutex<Option<Observation>>,
}

impl RefreshMonitor {
    /// 创建新的刷新监控器
    pub fn new(
        member: MemberId,
        ring: TokenRing,
        gate: CooldownGate,
        config: &RefreshConfig,
    ) -> Self {
        Self {
            member,
            ring,
            gate,
            stale_after: config
                .interval()
                .checked_mul(config.stale_after_intervals)
                .unwrap_or(Duration::MAX),
            observation: Mutex::new(None),
        }
    }

    /// 检查环首是否失联，失联时把它移到环尾并返回其标识
    pub async fn check(&self, now: i64) -> Result<Option<String>> {
        let mut observation = self.observation.lock().await;

        let gate = self.gate.next_allowed().await?;
        if now < gate {
            *observation = None;
            return Ok(None);
        }

        let head = match self.ring.head().await? {
            Some(head) if head != self.member.as_str() => head,
            _ => {
                *observation = None;
                return Ok(None);
            }
        };

        let stale_after_ms = i64::try_from(self.stale_after.as_millis()).unwrap_or(i64::MAX);
        let unchanged_since = match &*observation {
            Some(seen) if seen.head == head && seen.gate == gate => Some(seen.since),
            _ => None,
        };

        match unchanged_since {
            Some(since) if now.saturating_sub(since) >= stale_after_ms => {
                warn!(
                    "环首成员 {} 已超过 {} 未执行刷新，将其移到环尾",
                    head,
                    format_duration(self.stale_after)
                );
                let skipped = self.ring.skip_head().await?;
                *observation = None;
                Ok(skipped)
            }
            Some(_) => Ok(None),
            None => {
                debug!("开始观察环首成员 {}，冷却门 {}", head, gate);
                *observation = Some(Observation { head, gate, since: now });
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{InMemoryQueue, InMemoryTimestamp, SharedTimestamp};
    use std::sync::Arc;

    const INTERVAL: i64 = 30_000;

    struct Fixture {
        queue: Arc<InMemoryQueue>,
        timestamp: Arc<InMemoryTimestamp>,
        monitor: RefreshMonitor,
    }

    async fn fixture(members: &[&str], local: &str) -> Fixture {
        let queue = Arc::new(InMemoryQueue::new());
        let timestamp = Arc::new(InMemoryTimestamp::default());
        let ring = TokenRing::new(queue.clone());
        for id in members {
            ring.enqueue(&MemberId::new(*id).unwrap()).await.unwrap();
        }
        let monitor = RefreshMonitor::new(
            MemberId::new(local).unwrap(),
            ring,
            CooldownGate::new(timestamp.clone()),
            &RefreshConfig::default(),
        );
        Fixture { queue, timestamp, monitor }
    }

    #[tokio::test]
    async fn test_stale_head_is_moved_to_tail() {
        let fx = fixture(&["dead", "b", "c"], "b").await;

        assert_eq!(fx.monitor.check(0).await.unwrap(), None);
        assert_eq!(fx.monitor.check(2 * INTERVAL).await.unwrap(), None);
        let skipped = fx.monitor.check(3 * INTERVAL).await.unwrap();

        assert_eq!(skipped.as_deref(), Some("dead"));
        assert_eq!(fx.queue.snapshot().await, vec!["b", "c", "dead"]);
    }

    #[tokio::test]
    async fn test_progressing_gate_resets_observation() {
        let fx = fixture(&["a", "b"], "b").await;

        fx.monitor.check(0).await.unwrap();
        // 其他成员推进了冷却门，说明环首仍在工作
        fx.timestamp.set(INTERVAL).await.unwrap();
        fx.monitor.check(INTERVAL).await.unwrap();

        assert_eq!(fx.monitor.check(3 * INTERVAL).await.unwrap(), None);
        assert_eq!(fx.queue.snapshot().await, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_never_skips_itself() {
        let fx = fixture(&["a", "b"], "a").await;

        for tick in 0..10 {
            assert_eq!(fx.monitor.check(tick * INTERVAL).await.unwrap(), None);
        }
        assert_eq!(fx.queue.snapshot().await, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_cooling_down_is_healthy() {
        let fx = fixture(&["a", "b"], "b").await;
        fx.timestamp.set(i64::MAX).await.unwrap();

        for tick in 0..10 {
            assert_eq!(fx.monitor.check(tick * INTERVAL).await.unwrap(), None);
        }
    }

    #[tokio::test]
    async fn test_huge_threshold_saturates() {
        let queue = Arc::new(InMemoryQueue::new());
        let ring = TokenRing::new(queue.clone());
        for id in ["a", "b"] {
            ring.enqueue(&MemberId::new(id).unwrap()).await.unwrap();
        }
        let config = RefreshConfig {
            interval_ms: u64::MAX,
            stale_after_intervals: 10_000,
            ..RefreshConfig::default()
        };
        config.validate().unwrap();

        let monitor = RefreshMonitor::new(
            MemberId::new("b").unwrap(),
            ring,
            CooldownGate::new(Arc::new(InMemoryTimestamp::default())),
            &config,
        );

        assert_eq!(monitor.stale_after, Duration::MAX);
        assert_eq!(monitor.check(0).await.unwrap(), None);
        assert_eq!(monitor.check(i64::MAX - 1).await.unwrap(), None);
        assert_eq!(queue.snapshot().await, vec!["a", "b"]);
    }
}
