//! 目录用户模型
//!
//! 外部身份提供方（用户目录）中一条用户记录的本地表示。
//! 该记录只做短期缓存，不是权威数据源。

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// 目录用户记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryUser {
    /// 目录中的用户 ID
    pub user_id: String,
    /// 昵称
    #[serde(default)]
    pub nickname: Option<String>,
    /// 邮箱
    #[serde(default)]
    pub email: Option<String>,
    /// 目录中分配给该用户的角色名
    #[serde(default)]
    pub roles: BTreeSet<String>,
}

impl DirectoryUser {
    /// 创建只有 ID 的目录用户
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            nickname: None,
            email: None,
            roles: BTreeSet::new(),
        }
    }

    pub fn with_nickname(mut self, nickname: impl Into<String>) -> Self {
        self.nickname = Some(nickname.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.insert(role.into());
        self
    }

    /// 显示标题：优先使用非空昵称，其次邮箱，都没有时退回用户 ID
    pub fn display_title(&self) -> &str {
        self.nickname
            .as_deref()
            .filter(|n| !n.is_empty())
            .or_else(|| self.email.as_deref().filter(|e| !e.is_empty()))
            .unwrap_or(&self.user_id)
    }

    /// 是否拥有指定的目录角色
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}
