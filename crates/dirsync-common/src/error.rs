//! 错误处理模块
//!
//! 该模块提供 DirSync 项目的统一错误处理机制，包括自定义错误类型
//! 和从字符串构造错误的辅助 trait。

use thiserror::Error;

/// DirSync 统一错误类型
#[derive(Error, Debug)]
pub enum Error {
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    /// 外部目录访问错误
    #[error("目录服务错误: {0}")]
    Directory(String),

    /// 凭据服务错误
    #[error("凭据服务错误: {0}")]
    Credential(String),

    /// 主体存储错误
    #[error("主体存储错误: {0}")]
    PrincipalStore(String),

    /// 集群共享状态（令牌环、冷却门）访问错误
    #[error("集群协调错误: {0}")]
    Coordination(String),

    /// 成员标识无效
    #[error("无效的成员标识: {0}")]
    InvalidMemberId(String),

    /// JSON 错误
    #[error("JSON 错误: {0}")]
    Json(#[from] serde_json::Error),
}

/// DirSync 结果类型别名
pub type Result<T> = std::result::Result<T, Error>;

/// 从字符串创建错误
pub trait IntoError<T> {
    /// 将当前类型转换为错误
    fn into_error(self, kind: fn(String) -> Error) -> Result<T>;
}

impl<T> IntoError<T> for String {
    fn into_error(self, kind: fn(String) -> Error) -> Result<T> {
        Err(kind(self))
    }
}

impl<T> IntoError<T> for &str {
    fn into_error(self, kind: fn(String) -> Error) -> Result<T> {
        Err(kind(self.to_string()))
    }
}
