//! 进程内身份后端
//!
//! 单节点部署与测试使用的凭据服务和主体存储。写操作都在同一把写锁内完成，
//! 因此 “不存在时创建” 对并发调用者也只会生效一次。

use async_trait::async_trait;
use dirsync_common::{AclKey, Error, Principal, PrincipalType, Result, SecurablePrincipal};
use std::collections::{BTreeSet, HashMap};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{CredentialService, PrincipalStore};
use crate::config::RolesConfig;

/// 进程内凭据服务
#[derive(Debug, Default)]
pub struct InMemoryCredentialService {
    /// 用户 ID 到凭据的映射
    credentials: RwLock<HashMap<String, String>>,
}

impl InMemoryCredentialService {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已发放凭据的用户数
    pub async fn len(&self) -> usize {
        self.credentials.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.credentials.read().await.is_empty()
    }

    pub async fn contains(&self, user_id: &str) -> bool {
        self.credentials.read().await.contains_key(user_id)
    }
}

#[async_trait]
impl CredentialService for InMemoryCredentialService {
    async fn create_if_not_exists(&self, user_id: &str) -> Result<bool> {
        let mut credentials = self.credentials.write().await;
        if credentials.contains_key(user_id) {
            return Ok(false);
        }
        credentials.insert(user_id.to_string(), Uuid::new_v4().simple().to_string());
        debug!("为用户 {} 创建凭据", user_id);
        Ok(true)
    }
}

/// 主体存储状态
#[derive(Debug, Default)]
struct PrincipalState {
    /// 主体到键与描述信息
    principals: HashMap<Principal, (AclKey, SecurablePrincipal)>,
    /// 父主体键到成员键集合
    members: HashMap<AclKey, BTreeSet<AclKey>>,
}

impl PrincipalState {
    fn insert_if_absent(&mut self, principal: &Principal, details: SecurablePrincipal) -> bool {
        if self.principals.contains_key(principal) {
            return false;
        }
        self.principals.insert(principal.clone(), (AclKey::random(), details));
        true
    }

    fn contains_key(&self, key: &AclKey) -> bool {
        self.principals.values().any(|(k, _)| k == key)
    }
}

/// 进程内主体存储
#[derive(Debug, Default)]
pub struct InMemoryPrincipalStore {
    state: RwLock<PrincipalState>,
}

impl InMemoryPrincipalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建预置了两个固定角色主体的存储
    pub fn with_roles(roles: &RolesConfig) -> Self {
        let mut state = PrincipalState::default();
        for mapping in [&roles.authenticated_user, &roles.admin] {
            let principal = Principal::role(&mapping.principal_id);
            let details = SecurablePrincipal::new(principal.clone(), &mapping.directory_role);
            state.insert_if_absent(&principal, details);
        }
        Self {
            state: RwLock::new(state),
        }
    }

    /// 指定类型的主体数量
    pub async fn count_of(&self, principal_type: PrincipalType) -> usize {
        let state = self.state.read().await;
        state
            .principals
            .keys()
            .filter(|p| p.principal_type == principal_type)
            .count()
    }

    /// 成员关系总数
    pub async fn edge_count(&self) -> usize {
        let state = self.state.read().await;
        state.members.values().map(BTreeSet::len).sum()
    }

    /// `child` 是否是 `parent` 的成员
    pub async fn has_member(&self, parent: &AclKey, child: &AclKey) -> bool {
        let state = self.state.read().await;
        state
            .members
            .get(parent)
            .is_some_and(|children| children.contains(child))
    }

    /// 主体的描述信息
    pub async fn details_of(&self, principal: &Principal) -> Option<SecurablePrincipal> {
        let state = self.state.read().await;
        state.principals.get(principal).map(|(_, d)| d.clone())
    }
}

#[async_trait]
impl PrincipalStore for InMemoryPrincipalStore {
    async fn create_if_not_exists(
        &self,
        principal: &Principal,
        details: SecurablePrincipal,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        if state.insert_if_absent(principal, details) {
            debug!("创建主体 {}", principal);
        }
        Ok(())
    }

    async fn lookup(&self, principal: &Principal) -> Result<AclKey> {
        let state = self.state.read().await;
        state
            .principals
            .get(principal)
            .map(|(key, _)| key.clone())
            .ok_or_else(|| Error::PrincipalStore(format!("主体 {} 不存在", principal)))
    }

    async fn add_principal_to_principal(&self, parent: &AclKey, child: &AclKey) -> Result<()> {
        let mut state = self.state.write().await;
        for key in [parent, child] {
            if !state.contains_key(key) {
                return Err(Error::PrincipalStore(format!("主体键 {} 不存在", key)));
            }
        }
        state
            .members
            .entry(parent.clone())
            .or_default()
            .insert(child.clone());
        Ok(())
    }
}
