//! DirSync 控制平面
//!
//! 该模块实现集群协调的用户目录周期同步：令牌环与冷却门决定由哪个成员执行刷新，
//! 目录同步例程分页拉取外部用户目录，主体协调器把每个用户幂等地落到本地授权存储。
//!
//! 同步链路：定时器 → 刷新协调器（读取令牌环与冷却门）→ 目录同步例程（分页拉取）
//! → 主体协调器（逐用户写入）→ 推进冷却门。

pub mod cluster;
pub mod config;
pub mod directory;
pub mod identity;
pub mod sync;
pub mod utils;

pub use cluster::{
    CooldownGate, InMemoryQueue, InMemoryTimestamp, SharedQueue, SharedTimestamp, TokenRing,
};
pub use config::{RefreshConfig, RoleMapping, RolesConfig};
pub use directory::{DirectoryClient, DirectoryUserCache, HttpDirectoryClient, HttpDirectoryConfig};
pub use identity::{
    CredentialService, InMemoryCredentialService, InMemoryPrincipalStore, PrincipalReconciler,
    PrincipalStore, ReconcileOutcome,
};
pub use sync::{
    start_refresh_task, DirectorySync, RefreshCoordinator, RefreshMonitor, RefreshOutcome,
    RefreshStatus, SkipReason, SyncReport, SyncStatus,
};
