//! 进程内共享原语
//!
//! 单进程内多个协调器共享同一个实例即可模拟多成员集群。

use async_trait::async_trait;
use dirsync_common::Result;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::Mutex;

use super::{SharedQueue, SharedTimestamp};

/// 进程内有序队列
#[derive(Debug, Default)]
pub struct InMemoryQueue {
    items: Mutex<VecDeque<String>>,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前队列内容快照（队首在前）
    pub async fn snapshot(&self) -> Vec<String> {
        self.items.lock().await.iter().cloned().collect()
    }
}

#[async_trait]
impl SharedQueue for InMemoryQueue {
    async fn peek(&self) -> Result<Option<String>> {
        Ok(self.items.lock().await.front().cloned())
    }

    async fn offer(&self, item: String) -> Result<()> {
        self.items.lock().await.push_back(item);
        Ok(())
    }

    async fn poll(&self) -> Result<Option<String>> {
        Ok(self.items.lock().await.pop_front())
    }
}

/// 进程内共享时间戳，初始值为 0（即立即可用）
#[derive(Debug, Default)]
pub struct InMemoryTimestamp {
    value: AtomicI64,
}

impl InMemoryTimestamp {
    pub fn new(initial: i64) -> Self {
        Self {
            value: AtomicI64::new(initial),
        }
    }
}

#[async_trait]
impl SharedTimestamp for InMemoryTimestamp {
    async fn get(&self) -> Result<i64> {
        Ok(self.value.load(Ordering::SeqCst))
    }

    async fn set(&self, value: i64) -> Result<()> {
        self.value.store(value, Ordering::SeqCst);
        Ok(())
    }
}
