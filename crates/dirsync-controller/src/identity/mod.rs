//! 身份管理模块
//!
//! 该模块定义凭据服务与主体存储两个外部协作者接口，实现把目录用户幂等落到
//! 本地主体与角色关系的主体协调器，并提供进程内的开发用实现。

mod memory;
mod principal_reconciler;

pub use memory::{InMemoryCredentialService, InMemoryPrincipalStore};
pub use principal_reconciler::{PrincipalReconciler, ReconcileOutcome};

use async_trait::async_trait;
use dirsync_common::{AclKey, Principal, Result, SecurablePrincipal};

/// 凭据服务
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialService: Send + Sync {
    /// 为用户创建凭据；返回 `true` 表示本次新建，`false` 表示已经存在
    async fn create_if_not_exists(&self, user_id: &str) -> Result<bool>;
}

/// 主体存储
///
/// 同一主体并发调用 `create_if_not_exists` 时不得产生两个不同的主体，这一点由存储实现保证。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PrincipalStore: Send + Sync {
    /// 主体不存在时创建
    async fn create_if_not_exists(
        &self,
        principal: &Principal,
        details: SecurablePrincipal,
    ) -> Result<()>;

    /// 查找主体的键
    async fn lookup(&self, principal: &Principal) -> Result<AclKey>;

    /// 把 `child` 加为 `parent` 的成员，重复调用不产生重复关系
    async fn add_principal_to_principal(&self, parent: &AclKey, child: &AclKey) -> Result<()>;
}
