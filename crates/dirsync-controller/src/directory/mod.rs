//! 外部用户目录模块
//!
//! 该模块定义外部用户目录客户端接口，提供基于 HTTP 管理 API 的实现，
//! 以及目录用户记录的本地短期缓存。

mod http_client;
mod user_cache;

pub use http_client::{HttpDirectoryClient, HttpDirectoryConfig};
pub use user_cache::{create_default_cache, DirectoryUserCache};

use async_trait::async_trait;
use dirsync_common::{DirectoryUser, Result};

/// 外部用户目录客户端
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// 拉取第 `page` 页（从 0 开始），空页表示已经到底
    async fn fetch_page(&self, page: u32, page_size: u32) -> Result<Vec<DirectoryUser>>;
}
