//! 刷新配置模块
//!
//! 协调器、同步例程和主体协调器消费的配置项。配置本身由 Agent 负责加载。

use dirsync_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 用户目录刷新配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// 刷新间隔（毫秒），同时也是冷却时长
    pub interval_ms: u64,
    /// 分页大小
    pub page_size: u32,
    /// 目录用户缓存有效期（秒）
    pub cache_ttl_secs: u64,
    /// 凭据已存在的用户是否仍然协调主体与角色
    pub reconcile_existing_users: bool,
    /// 冷却门过期多少个间隔后认为环首成员已失联
    pub stale_after_intervals: u32,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_ms: 30_000,
            page_size: 100,
            cache_ttl_secs: 600,
            reconcile_existing_users: false,
            stale_after_intervals: 3,
        }
    }
}

impl RefreshConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// 校验配置取值
    pub fn validate(&self) -> Result<()> {
        if self.interval_ms == 0 {
            return Err(Error::Config("refresh.interval_ms 必须大于 0".to_string()));
        }
        if self.page_size == 0 {
            return Err(Error::Config("refresh.page_size 必须大于 0".to_string()));
        }
        if self.stale_after_intervals == 0 {
            return Err(Error::Config("refresh.stale_after_intervals 必须大于 0".to_string()));
        }
        Ok(())
    }
}

/// 目录角色名到本地角色主体的映射
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleMapping {
    /// 目录记录中的角色名
    pub directory_role: String,
    /// 本地角色主体标识
    pub principal_id: String,
}

/// 两个固定角色的映射配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RolesConfig {
    /// 已认证用户角色
    pub authenticated_user: RoleMapping,
    /// 管理员角色
    pub admin: RoleMapping,
}

impl Default for RolesConfig {
    fn default() -> Self {
        Self {
            authenticated_user: RoleMapping {
                directory_role: "AuthenticatedUser".to_string(),
                principal_id: "dirsync.user".to_string(),
            },
            admin: RoleMapping {
                directory_role: "admin".to_string(),
                principal_id: "dirsync.admin".to_string(),
            },
        }
    }
}
