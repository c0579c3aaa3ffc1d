//! 集群刷新模块
//!
//! 该模块负责用户目录的集群协调刷新：刷新协调器决定由谁执行，目录同步例程执行实际同步，
//! 刷新监控器处理失联的环首成员。定时任务在独立的 tokio 任务中按固定频率驱动它们。

mod directory_sync;
mod refresh_coordinator;
mod refresh_monitor;

pub use directory_sync::{DirectorySync, SyncReport};
pub use refresh_coordinator::{
    RefreshCoordinator, RefreshOutcome, RefreshStatus, SkipReason, SyncStatus,
};
pub use refresh_monitor::RefreshMonitor;

use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::utils::{format_duration, now_millis};

/// 启动刷新定时任务
///
/// 每个成员只启动一个。任务运行在独立的 tokio 任务上，同步期间不会阻塞其他定时工作；
/// `shutdown` 变为 `true` 或发送端被丢弃时退出。
pub fn start_refresh_task(
    coordinator: Arc<RefreshCoordinator>,
    monitor: Option<Arc<RefreshMonitor>>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    info!(
        "用户目录刷新任务已启动，成员: {}，间隔: {}",
        coordinator.member(),
        format_duration(period)
    );

    tokio::spawn(async move {
        let mut timer = interval(period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = timer.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("用户目录刷新任务已停止");
                        break;
                    }
                    continue;
                }
            }

            let now = now_millis();
            match coordinator.attempt_refresh(now).await {
                Ok(outcome) => debug!("刷新尝试结束: {:?}", outcome),
                Err(e) => error!("用户目录刷新任务出错: {}", e),
            }

            if let Some(monitor) = &monitor {
                if let Err(e) = monitor.check(now).await {
                    error!("刷新监控检查出错: {}", e);
                }
            }
        }
    })
}
