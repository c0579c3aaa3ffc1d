//! 刷新协调模块
//!
//! 集群里每个成员都有自己的定时器，但同一个冷却窗口内只应有一个成员真正执行刷新。
//! 这里不使用分布式锁，而是靠令牌环加冷却门：环首成员且冷却门已开时才执行，
//! 执行前把令牌交给下一个成员，执行结束（无论成败）后把冷却门推进一个间隔。
//!
//! 两个共享原语之间没有原子性。集群成员变化时可能短暂出现两个成员都认为自己
//! 有资格的情况，这被视为可以接受的近似，而不是需要消除的错误。

use chrono::{DateTime, Utc};
use dirsync_common::{Error, MemberId, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{error, info};

use super::directory_sync::{DirectorySync, SyncReport};
use crate::cluster::{CooldownGate, TokenRing};
use crate::config::RefreshConfig;

/// 本成员未执行刷新的原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// 环首是其他成员（或环为空）
    NotHead {
        /// 当前环首
        head: Option<String>,
    },
    /// 冷却中
    CoolingDown {
        /// 冷却门值
        until: i64,
    },
}

/// 一次刷新尝试的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// 未获得执行资格
    Skipped(SkipReason),
    /// 执行并完成同步
    Completed(SyncReport),
    /// 执行了同步但失败
    Failed(String),
}

impl RefreshOutcome {
    /// 本次是否由本成员执行了同步
    pub fn ran(&self) -> bool {
        !matches!(self, RefreshOutcome::Skipped(_))
    }
}

/// 同步状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// 同步成功
    Success,
    /// 同步失败
    Failed,
    /// 同步中
    InProgress,
    /// 未同步
    NotSynced,
}

/// 本成员的刷新状态
#[derive(Debug, Clone)]
pub struct RefreshStatus {
    /// 最近一次执行的状态
    pub status: SyncStatus,
    /// 最近一次执行完成的时间
    pub last_run: Option<DateTime<Utc>>,
    /// 本成员累计执行次数
    pub runs: u64,
    /// 最近一次成功同步的统计
    pub last_report: Option<SyncReport>,
}

impl Default for RefreshStatus {
    fn default() -> Self {
        Self {
            status: SyncStatus::NotSynced,
            last_run: None,
            runs: 0,
            last_report: None,
        }
    }
}

/// 刷新协调器
pub struct RefreshCoordinator {
    /// 本成员标识
    member: MemberId,
    /// 成员令牌环
    ring: TokenRing,
    /// 冷却门
    gate: CooldownGate,
    /// 目录同步例程
    sync: Arc<DirectorySync>,
    /// 刷新间隔
    interval: Duration,
    /// 本成员的刷新状态
    status: RwLock<RefreshStatus>,
}

impl RefreshCoordinator {
    /// 创建刷新协调器并把本成员加入令牌环
    pub async fn join(
        member: MemberId,
        ring: TokenRing,
        gate: CooldownGate,
        sync: Arc<DirectorySync>,
        config: &RefreshConfig,
    ) -> Result<Self> {
        config.validate()?;
        ring.enqueue(&member).await?;
        info!("成员 {} 已加入刷新令牌环", member);

        Ok(Self {
            member,
            ring,
            gate,
            sync,
            interval: config.interval(),
            status: RwLock::new(RefreshStatus::default()),
        })
    }

    pub fn member(&self) -> &MemberId {
        &self.member
    }

    /// 尝试执行一次刷新
    ///
    /// 只有共享原语本身出错时才返回 `Err`；同步失败体现为 [`RefreshOutcome::Failed`]，
    /// 冷却门照样推进，下一次尝试至少等待一个完整间隔。同步结束后冷却门推进失败时，
    /// 刷新状态仍会先记录下来，再返回 [`Error::Coordination`]。
    pub async fn attempt_refresh(&self, now: i64) -> Result<RefreshOutcome> {
        info!("尝试获取用户目录刷新资格");

        let head = self.ring.head().await?;
        if head.as_deref() != Some(self.member.as_str()) {
            info!("未被选中执行用户刷新，当前环首: {:?}", head);
            return Ok(RefreshOutcome::Skipped(SkipReason::NotHead { head }));
        }

        let until = self.gate.next_allowed().await?;
        if now < until {
            info!("刷新冷却中，还需等待 {} 毫秒", until - now);
            return Ok(RefreshOutcome::Skipped(SkipReason::CoolingDown { until }));
        }

        self.ring.rotate(&self.member).await?;
        self.status.write().await.status = SyncStatus::InProgress;

        info!("开始从外部目录刷新用户列表");
        let sync = self.sync.clone();
        let outcome = match tokio::spawn(async move { sync.sync_all().await }).await {
            Ok(Ok(report)) => RefreshOutcome::Completed(report),
            Ok(Err(e)) => {
                error!("用户目录刷新失败: {}", e);
                RefreshOutcome::Failed(e.to_string())
            }
            Err(e) => {
                error!("用户目录刷新任务异常退出: {}", e);
                RefreshOutcome::Failed(e.to_string())
            }
        };

        let closed = self.gate.close_for(now, self.interval).await;
        self.record(&outcome).await;

        let next = closed.map_err(|e| Error::Coordination(format!("无法推进冷却门: {}", e)))?;
        info!("已调度下一次刷新，最早开始时间: {}", next);
        Ok(outcome)
    }

    async fn record(&self, outcome: &RefreshOutcome) {
        let mut status = self.status.write().await;
        status.runs += 1;
        status.last_run = Some(Utc::now());
        match outcome {
            RefreshOutcome::Completed(report) => {
                status.status = SyncStatus::Success;
                status.last_report = Some(report.clone());
            }
            RefreshOutcome::Failed(_) => status.status = SyncStatus::Failed,
            RefreshOutcome::Skipped(_) => {}
        }
    }

    /// 获取本成员的刷新状态
    pub async fn status(&self) -> RefreshStatus {
        self.status.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{InMemoryQueue, InMemoryTimestamp, SharedTimestamp};
    use crate::config::RolesConfig;
    use async_trait::async_trait;
    use crate::directory::{DirectoryUserCache, MockDirectoryClient};
    use crate::identity::{InMemoryCredentialService, InMemoryPrincipalStore, PrincipalReconciler};
    use dirsync_common::DirectoryUser;

    const NOW: i64 = 1_700_000_000_000;

    async fn sync_with(directory: MockDirectoryClient) -> Arc<DirectorySync> {
        let roles = RolesConfig::default();
        let store = Arc::new(InMemoryPrincipalStore::with_roles(&roles));
        let reconciler = Arc::new(PrincipalReconciler::new(store, &roles).await.unwrap());
        Arc::new(DirectorySync::new(
            Arc::new(directory),
            Arc::new(InMemoryCredentialService::new()),
            reconciler,
            DirectoryUserCache::new(Duration::from_secs(60)),
            &RefreshConfig::default(),
        ))
    }

    fn one_page_directory() -> MockDirectoryClient {
        let mut directory = MockDirectoryClient::new();
        directory.expect_fetch_page().returning(|page, _| {
            Ok(if page == 0 {
                vec![DirectoryUser::new("auth0|1").with_role("AuthenticatedUser")]
            } else {
                Vec::new()
            })
        });
        directory
    }

    #[tokio::test]
    async fn test_head_member_runs_and_closes_gate() {
        let queue = Arc::new(InMemoryQueue::new());
        let timestamp = Arc::new(InMemoryTimestamp::new(NOW));
        let coordinator = RefreshCoordinator::join(
            MemberId::new("a").unwrap(),
            TokenRing::new(queue.clone()),
            CooldownGate::new(timestamp.clone()),
            sync_with(one_page_directory()).await,
            &RefreshConfig::default(),
        )
        .await
        .unwrap();

        let outcome = coordinator.attempt_refresh(NOW).await.unwrap();

        match outcome {
            RefreshOutcome::Completed(report) => assert_eq!(report.principals_reconciled, 1),
            other => panic!("unexpected outcome: {:?}", other),
        }
        let gate = CooldownGate::new(timestamp);
        assert_eq!(gate.next_allowed().await.unwrap(), NOW + 30_000);

        let status = coordinator.status().await;
        assert_eq!(status.status, SyncStatus::Success);
        assert_eq!(status.runs, 1);
        assert!(status.last_run.is_some());
    }

    #[tokio::test]
    async fn test_cooldown_blocks_head_member() {
        let queue = Arc::new(InMemoryQueue::new());
        let mut directory = MockDirectoryClient::new();
        directory.expect_fetch_page().never();
        let coordinator = RefreshCoordinator::join(
            MemberId::new("a").unwrap(),
            TokenRing::new(queue.clone()),
            CooldownGate::new(Arc::new(InMemoryTimestamp::new(NOW + 1))),
            sync_with(directory).await,
            &RefreshConfig::default(),
        )
        .await
        .unwrap();

        let outcome = coordinator.attempt_refresh(NOW).await.unwrap();

        assert_eq!(
            outcome,
            RefreshOutcome::Skipped(SkipReason::CoolingDown { until: NOW + 1 })
        );
        // 冷却中不轮转令牌
        assert_eq!(queue.snapshot().await, vec!["a"]);
        assert_eq!(coordinator.status().await.status, SyncStatus::NotSynced);
    }

    #[test_log::test(tokio::test)]
    async fn test_failed_sync_still_advances_gate() {
        let mut directory = MockDirectoryClient::new();
        directory
            .expect_fetch_page()
            .times(1)
            .returning(|_, _| Err(Error::Directory("连接超时".to_string())));
        let timestamp = Arc::new(InMemoryTimestamp::default());
        let coordinator = RefreshCoordinator::join(
            MemberId::new("a").unwrap(),
            TokenRing::new(Arc::new(InMemoryQueue::new())),
            CooldownGate::new(timestamp.clone()),
            sync_with(directory).await,
            &RefreshConfig::default(),
        )
        .await
        .unwrap();

        let outcome = coordinator.attempt_refresh(NOW).await.unwrap();

        assert!(matches!(outcome, RefreshOutcome::Failed(_)));
        assert!(outcome.ran());
        assert_eq!(CooldownGate::new(timestamp).next_allowed().await.unwrap(), NOW + 30_000);
        assert_eq!(coordinator.status().await.status, SyncStatus::Failed);

        // 同一时刻再次尝试不会立即重试
        let retry = coordinator.attempt_refresh(NOW).await.unwrap();
        assert!(matches!(retry, RefreshOutcome::Skipped(SkipReason::CoolingDown { .. })));
    }

    #[tokio::test]
    async fn test_join_rejects_invalid_config() {
        let config = RefreshConfig {
            interval_ms: 0,
            ..RefreshConfig::default()
        };
        let result = RefreshCoordinator::join(
            MemberId::new("a").unwrap(),
            TokenRing::new(Arc::new(InMemoryQueue::new())),
            CooldownGate::new(Arc::new(InMemoryTimestamp::default())),
            sync_with(MockDirectoryClient::new()).await,
            &config,
        )
        .await;
        assert!(matches!(result, Err(Error::Config(_))));
    }

    /// 可读但不可写的共享时间戳
    struct ReadOnlyTimestamp;

    #[async_trait]
    impl SharedTimestamp for ReadOnlyTimestamp {
        async fn get(&self) -> Result<i64> {
            Ok(0)
        }

        async fn set(&self, _value: i64) -> Result<()> {
            Err(Error::Coordination("时间戳存储只读".to_string()))
        }
    }

    #[tokio::test]
    async fn test_gate_failure_after_sync_still_records_status() {
        let coordinator = RefreshCoordinator::join(
            MemberId::new("a").unwrap(),
            TokenRing::new(Arc::new(InMemoryQueue::new())),
            CooldownGate::new(Arc::new(ReadOnlyTimestamp)),
            sync_with(one_page_directory()).await,
            &RefreshConfig::default(),
        )
        .await
        .unwrap();

        let result = coordinator.attempt_refresh(NOW).await;

        assert!(matches!(result, Err(Error::Coordination(_))));
        let status = coordinator.status().await;
        assert_eq!(status.status, SyncStatus::Success);
        assert_eq!(status.runs, 1);
        assert!(status.last_report.is_some());
    }
}
