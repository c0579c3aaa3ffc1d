//! 主体协调模块
//!
//! 把一条目录用户记录映射为本地用户主体以及它与固定角色之间的成员关系。
//! 只会新增关系，从不撤销；目录里去掉的角色不会在这里被回收。

use dirsync_common::{AclKey, DirectoryUser, Error, Principal, Result, SecurablePrincipal};
use std::sync::Arc;
use tracing::{debug, info};

use super::PrincipalStore;
use crate::config::{RoleMapping, RolesConfig};

/// 已解析出存储键的固定角色
#[derive(Debug, Clone)]
struct ResolvedRole {
    /// 目录角色名
    directory_role: String,
    /// 本地角色主体
    principal: Principal,
    /// 角色主体的键
    acl_key: AclKey,
}

/// 单个用户的协调结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// 用户主体
    pub principal: Principal,
    /// 用户主体的键
    pub acl_key: AclKey,
    /// 本次确保存在的角色关系
    pub roles_granted: Vec<Principal>,
}

/// 主体协调器
pub struct PrincipalReconciler {
    /// 主体存储
    store: Arc<dyn PrincipalStore>,
    /// 已认证用户角色与管理员角色，构造时解析一次
    roles: [ResolvedRole; 2],
}

impl PrincipalReconciler {
    /// 创建主体协调器，角色主体必须已经存在
    pub async fn new(store: Arc<dyn PrincipalStore>, roles: &RolesConfig) -> Result<Self> {
        let authenticated_user = Self::resolve(store.as_ref(), &roles.authenticated_user).await?;
        let admin = Self::resolve(store.as_ref(), &roles.admin).await?;
        info!(
            "固定角色已解析: {} -> {}, {} -> {}",
            authenticated_user.directory_role,
            authenticated_user.acl_key,
            admin.directory_role,
            admin.acl_key
        );

        Ok(Self {
            store,
            roles: [authenticated_user, admin],
        })
    }

    async fn resolve(store: &dyn PrincipalStore, mapping: &RoleMapping) -> Result<ResolvedRole> {
        let principal = Principal::role(&mapping.principal_id);
        let acl_key = store.lookup(&principal).await.map_err(|e| {
            Error::PrincipalStore(format!("无法解析角色 {}: {}", principal, e))
        })?;
        Ok(ResolvedRole {
            directory_role: mapping.directory_role.clone(),
            principal,
            acl_key,
        })
    }

    /// 协调单个目录用户
    pub async fn reconcile(&self, user: &DirectoryUser) -> Result<ReconcileOutcome> {
        let principal = Principal::user(&user.user_id);
        let details = SecurablePrincipal::new(principal.clone(), user.display_title());

        self.store.create_if_not_exists(&principal, details).await?;
        let acl_key = self.store.lookup(&principal).await?;

        let mut roles_granted = Vec::new();
        for role in &self.roles {
            if user.has_role(&role.directory_role) {
                self.store
                    .add_principal_to_principal(&role.acl_key, &acl_key)
                    .await?;
                roles_granted.push(role.principal.clone());
            }
        }

        debug!("用户 {} 协调完成，角色: {:?}", principal, roles_granted);
        Ok(ReconcileOutcome {
            principal,
            acl_key,
            roles_granted,
        })
    }
}
