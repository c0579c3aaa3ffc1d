//! 目录用户缓存模块
//!
//! 该模块实现目录用户记录的本地缓存，供其他组件读取，减少对外部目录的请求。
//! 缓存不是权威数据源，条目到期后由清理任务移除。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use dirsync_common::DirectoryUser;

/// 缓存条目
#[derive(Debug, Clone)]
struct CacheEntry {
    /// 目录用户记录
    user: DirectoryUser,
    /// 过期时间
    expires_at: SystemTime,
}

/// 目录用户缓存
#[derive(Clone)]
pub struct DirectoryUserCache {
    /// 缓存数据
    cache: Arc<RwLock<HashMap<String, CacheEntry>>>,
    /// 缓存有效期
    ttl: Duration,
}

impl DirectoryUserCache {
    /// 创建新的目录用户缓存
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// 写入或覆盖一条用户记录
    pub async fn put(&self, user: DirectoryUser) {
        let expires_at = SystemTime::now() + self.ttl;
        let mut cache = self.cache.write().await;
        cache.insert(user.user_id.clone(), CacheEntry { user, expires_at });
    }

    /// 读取未过期的用户记录
    pub async fn get(&self, user_id: &str) -> Option<DirectoryUser> {
        let cache = self.cache.read().await;
        let now = SystemTime::now();
        cache
            .get(user_id)
            .filter(|entry| now < entry.expires_at)
            .map(|entry| entry.user.clone())
    }

    /// 当前缓存条目数（包括尚未清理的过期条目）
    pub async fn len(&self) -> usize {
        self.cache.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.cache.read().await.is_empty()
    }

    /// 移除过期条目，返回移除数量
    pub async fn purge_expired(&self) -> usize {
        let now = SystemTime::now();
        let mut cache = self.cache.write().await;

        let expired: Vec<String> = cache.iter()
            .filter(|(_, entry)| now >= entry.expires_at)
            .map(|(id, _)| id.clone())
            .collect();

        for id in &expired {
            cache.remove(id);
            debug!("移除过期缓存条目: {}", id);
        }

        expired.len()
    }

    /// 启动缓存清理任务
    pub fn start_cleanup_task(&self, every: Duration) -> JoinHandle<()> {
        let cache = self.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                let removed = cache.purge_expired().await;
                if removed > 0 {
                    info!(
                        "缓存清理完成，移除 {} 条，当前缓存条目数: {}",
                        removed,
                        cache.len().await
                    );
                }
            }
        })
    }
}

/// 创建默认的目录用户缓存
pub fn create_default_cache() -> DirectoryUserCache {
    DirectoryUserCache::new(Duration::from_secs(600)) // 默认缓存 10 分钟
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_then_get() {
        let cache = create_default_cache();
        cache.put(DirectoryUser::new("auth0|1").with_nickname("alice")).await;

        let user = cache.get("auth0|1").await.unwrap();
        assert_eq!(user.display_title(), "alice");
        assert!(cache.get("auth0|2").await.is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites_existing_entry() {
        let cache = create_default_cache();
        cache.put(DirectoryUser::new("auth0|1").with_nickname("old")).await;
        cache.put(DirectoryUser::new("auth0|1").with_nickname("new")).await;

        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.get("auth0|1").await.unwrap().display_title(), "new");
    }

    #[tokio::test]
    async fn test_zero_ttl_entries_expire_immediately() {
        let cache = DirectoryUserCache::new(Duration::ZERO);
        cache.put(DirectoryUser::new("auth0|1")).await;

        assert!(cache.get("auth0|1").await.is_none());
        assert_eq!(cache.purge_expired().await, 1);
        assert!(cache.is_empty().await);
    }
}
