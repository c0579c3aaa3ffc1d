//! 数据模型模块
//!
//! 该模块定义了 DirSync 项目中使用的核心数据模型，包括集群成员标识、
//! 外部目录用户记录以及本地主体，并提供序列化/反序列化功能。

pub mod member;
pub mod directory;
pub mod principal;
