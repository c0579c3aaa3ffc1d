//! 目录同步例程
//!
//! 从第 0 页开始逐页拉取外部用户目录，直到拿到空页为止。同一页内的记录并发处理，
//! 单条记录失败只记录日志，不影响同页其他记录和后续页面。

use dirsync_common::{DirectoryUser, Result};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::config::RefreshConfig;
use crate::directory::{DirectoryClient, DirectoryUserCache};
use crate::identity::{CredentialService, PrincipalReconciler};

/// 一次同步的统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// 拉取页面的调用次数（包括最后的空页）
    pub pages_fetched: u32,
    /// 处理的记录数
    pub records_seen: usize,
    /// 完成主体协调的记录数
    pub principals_reconciled: usize,
    /// 凭据已存在而跳过协调的记录数
    pub existing_skipped: usize,
    /// 处理失败的记录数
    pub failures: usize,
}

/// 单条记录的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordResult {
    Reconciled,
    Skipped,
}

/// 单条记录的处理逻辑，在各个并发任务间共享
struct RecordSync {
    cache: DirectoryUserCache,
    credentials: Arc<dyn CredentialService>,
    reconciler: Arc<PrincipalReconciler>,
    reconcile_existing_users: bool,
}

impl RecordSync {
    async fn sync_record(&self, user: DirectoryUser) -> Result<RecordResult> {
        self.cache.put(user.clone()).await;

        let created = self.credentials.create_if_not_exists(&user.user_id).await?;
        if !created && !self.reconcile_existing_users {
            debug!("用户 {} 的凭据已存在，跳过主体协调", user.user_id);
            return Ok(RecordResult::Skipped);
        }

        self.reconciler.reconcile(&user).await?;
        Ok(RecordResult::Reconciled)
    }
}

/// 目录同步例程
pub struct DirectorySync {
    /// 外部目录客户端
    directory: Arc<dyn DirectoryClient>,
    /// 记录处理逻辑
    records: Arc<RecordSync>,
    /// 分页大小
    page_size: u32,
}

impl DirectorySync {
    /// 创建新的目录同步例程
    pub fn new(
        directory: Arc<dyn DirectoryClient>,
        credentials: Arc<dyn CredentialService>,
        reconciler: Arc<PrincipalReconciler>,
        cache: DirectoryUserCache,
        config: &RefreshConfig,
    ) -> Self {
        Self {
            directory,
            records: Arc::new(RecordSync {
                cache,
                credentials,
                reconciler,
                reconcile_existing_users: config.reconcile_existing_users,
            }),
            page_size: config.page_size,
        }
    }

    /// 完整遍历外部目录
    ///
    /// 页面拉取失败会中止本轮同步并返回错误，已经处理过的记录保持不变。
    pub async fn sync_all(&self) -> Result<SyncReport> {
        let mut report = SyncReport::default();
        let mut page = 0u32;

        loop {
            let users = self.directory.fetch_page(page, self.page_size).await?;
            report.pages_fetched += 1;
            if users.is_empty() {
                break;
            }

            info!("加载第 {} 页目录用户，共 {} 条", page, users.len());
            self.sync_page(users, &mut report).await;
            page += 1;
        }

        info!(
            "目录同步完成: 页面 {}，记录 {}，协调 {}，跳过 {}，失败 {}",
            report.pages_fetched,
            report.records_seen,
            report.principals_reconciled,
            report.existing_skipped,
            report.failures
        );
        Ok(report)
    }

    /// 并发处理一页记录，等待全部完成后返回
    async fn sync_page(&self, users: Vec<DirectoryUser>, report: &mut SyncReport) {
        let mut tasks = JoinSet::new();
        for user in users {
            report.records_seen += 1;
            let records = self.records.clone();
            tasks.spawn(async move {
                let user_id = user.user_id.clone();
                (user_id, records.sync_record(user).await)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(RecordResult::Reconciled))) => report.principals_reconciled += 1,
                Ok((_, Ok(RecordResult::Skipped))) => report.existing_skipped += 1,
                Ok((user_id, Err(e))) => {
                    error!("同步用户 {} 失败: {}", user_id, e);
                    report.failures += 1;
                }
                Err(e) => {
                    error!("用户同步任务异常退出: {}", e);
                    report.failures += 1;
                }
            }
        }
    }
}
