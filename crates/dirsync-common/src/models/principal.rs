//! 主体模型
//!
//! 本地身份与授权体系中的主体（用户或角色）、主体在存储中的键，
//! 以及随主体一起保存的描述信息。

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// 主体类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrincipalType {
    /// 用户
    User,
    /// 角色
    Role,
}

/// 主体
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Principal {
    /// 主体类型
    pub principal_type: PrincipalType,
    /// 主体标识
    pub id: String,
}

impl Principal {
    pub fn user(id: impl Into<String>) -> Self {
        Self {
            principal_type: PrincipalType::User,
            id: id.into(),
        }
    }

    pub fn role(id: impl Into<String>) -> Self {
        Self {
            principal_type: PrincipalType::Role,
            id: id.into(),
        }
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.principal_type {
            PrincipalType::User => "user",
            PrincipalType::Role => "role",
        };
        write!(f, "{}:{}", kind, self.id)
    }
}

/// 主体在授权存储中的键
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AclKey(Vec<Uuid>);

impl AclKey {
    pub fn new(ids: Vec<Uuid>) -> Self {
        Self(ids)
    }

    /// 生成单段随机键
    pub fn random() -> Self {
        Self(vec![Uuid::new_v4()])
    }

    pub fn ids(&self) -> &[Uuid] {
        &self.0
    }
}

impl fmt::Display for AclKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(Uuid::to_string).collect();
        write!(f, "[{}]", parts.join(","))
    }
}

/// 随主体保存的描述信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurablePrincipal {
    /// 主体
    pub principal: Principal,
    /// 标题
    pub title: String,
    /// 描述
    #[serde(default)]
    pub description: Option<String>,
}

impl SecurablePrincipal {
    pub fn new(principal: Principal, title: impl Into<String>) -> Self {
        Self {
            principal,
            title: title.into(),
            description: None,
        }
    }
}
