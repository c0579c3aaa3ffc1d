//! DirSync Agent - 运行用户目录同步的守护进程
//!
//! 该模块负责把配置与外部协作者装配成刷新协调器、刷新监控器和目录用户缓存，
//! 并管理刷新定时任务与缓存清理任务的生命周期。

pub mod config;

use anyhow::{Context, Result};
use dirsync_common::MemberId;
use dirsync_controller::{
    start_refresh_task, CooldownGate, CredentialService, DirectoryClient, DirectorySync,
    DirectoryUserCache, HttpDirectoryClient, InMemoryCredentialService, InMemoryPrincipalStore,
    InMemoryQueue, InMemoryTimestamp, PrincipalReconciler, PrincipalStore, RefreshCoordinator,
    RefreshMonitor, RefreshStatus, SharedQueue, SharedTimestamp, TokenRing,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::AgentConfig;

/// Agent 依赖的外部协作者
pub struct Collaborators {
    /// 令牌环载体
    pub queue: Arc<dyn SharedQueue>,
    /// 冷却门载体
    pub timestamp: Arc<dyn SharedTimestamp>,
    /// 外部目录客户端
    pub directory: Arc<dyn DirectoryClient>,
    /// 凭据服务
    pub credentials: Arc<dyn CredentialService>,
    /// 主体存储
    pub principals: Arc<dyn PrincipalStore>,
}

impl Collaborators {
    /// 单节点部署：共享原语与身份后端都在进程内，目录走 HTTP 管理 API
    pub fn standalone(config: &AgentConfig) -> Result<Self> {
        let directory = HttpDirectoryClient::new(config.directory.clone())
            .context("无法创建目录客户端")?;
        Ok(Self {
            queue: Arc::new(InMemoryQueue::new()),
            timestamp: Arc::new(InMemoryTimestamp::default()),
            directory: Arc::new(directory),
            credentials: Arc::new(InMemoryCredentialService::new()),
            principals: Arc::new(InMemoryPrincipalStore::with_roles(&config.roles)),
        })
    }
}

/// 运行中的后台任务
struct RunningTasks {
    /// 刷新定时任务
    refresh: JoinHandle<()>,
    /// 缓存清理任务
    cleanup: JoinHandle<()>,
}

/// Agent 主结构体
pub struct Agent {
    /// 配置
    config: AgentConfig,
    /// 刷新协调器
    coordinator: Arc<RefreshCoordinator>,
    /// 刷新监控器
    monitor: Arc<RefreshMonitor>,
    /// 目录用户缓存
    cache: DirectoryUserCache,
    /// 停止信号
    shutdown: watch::Sender<bool>,
    /// 后台任务
    tasks: Mutex<Option<RunningTasks>>,
}

impl Agent {
    /// 创建新的 Agent 实例，本成员在此时加入令牌环
    pub async fn new(config: AgentConfig, collaborators: Collaborators) -> Result<Self> {
        let member = match &config.member_id {
            Some(id) => MemberId::new(id.as_str()).context("配置的成员标识无效")?,
            None => MemberId::generate(),
        };
        info!("本成员标识: {}", member);

        let reconciler = PrincipalReconciler::new(collaborators.principals, &config.roles)
            .await
            .context("无法初始化主体协调器")?;
        let cache = DirectoryUserCache::new(config.refresh.cache_ttl());
        let sync = Arc::new(DirectorySync::new(
            collaborators.directory,
            collaborators.credentials,
            Arc::new(reconciler),
            cache.clone(),
            &config.refresh,
        ));

        let ring = TokenRing::new(collaborators.queue);
        let gate = CooldownGate::new(collaborators.timestamp);
        let monitor = Arc::new(RefreshMonitor::new(
            member.clone(),
            ring.clone(),
            gate.clone(),
            &config.refresh,
        ));
        let coordinator = Arc::new(
            RefreshCoordinator::join(member, ring, gate, sync, &config.refresh)
                .await
                .context("无法加入刷新令牌环")?,
        );

        let (shutdown, _) = watch::channel(false);
        Ok(Self {
            config,
            coordinator,
            monitor,
            cache,
            shutdown,
            tasks: Mutex::new(None),
        })
    }

    /// 启动 Agent
    pub async fn start(&self) -> Result<()> {
        let mut tasks = self.tasks.lock().await;
        if tasks.is_some() {
            return Err(anyhow::anyhow!("Agent 已经在运行"));
        }

        // 启动刷新定时任务
        let refresh = start_refresh_task(
            self.coordinator.clone(),
            Some(self.monitor.clone()),
            self.config.refresh.interval(),
            self.shutdown.subscribe(),
        );

        // 启动缓存清理任务
        let cleanup = self
            .cache
            .start_cleanup_task(Duration::from_secs(self.config.cache_cleanup_secs.max(1)));

        *tasks = Some(RunningTasks { refresh, cleanup });
        info!("DirSync Agent 已启动");
        Ok(())
    }

    /// 停止 Agent
    ///
    /// 正在进行的同步会先执行完，刷新任务在两次定时之间退出。
    pub async fn stop(&self) -> Result<()> {
        let Some(running) = self.tasks.lock().await.take() else {
            return Ok(());
        };

        let _ = self.shutdown.send(true);
        running.refresh.await.context("刷新任务异常退出")?;

        running.cleanup.abort();
        let _ = running.cleanup.await;

        info!("DirSync Agent 已停止");
        Ok(())
    }

    /// 本成员的刷新状态
    pub async fn status(&self) -> RefreshStatus {
        self.coordinator.status().await
    }

    pub fn member(&self) -> &MemberId {
        self.coordinator.member()
    }

    pub fn cache(&self) -> &DirectoryUserCache {
        &self.cache
    }
}
