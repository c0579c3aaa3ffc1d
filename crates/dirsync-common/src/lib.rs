//! DirSync Common - 跨模块共享工具与数据结构
//!
//! 该模块提供 DirSync 项目中所有组件共享的数据结构和错误处理。
//! 包括集群成员标识、目录用户记录、主体模型以及统一的错误类型。

pub mod models;
pub mod error;

/// 重新导出常用类型，方便使用
pub use error::Error;
pub use error::Result;
pub use models::directory::*;
pub use models::member::*;
pub use models::principal::*;
