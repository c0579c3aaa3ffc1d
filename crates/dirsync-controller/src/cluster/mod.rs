//! 集群共享状态模块
//!
//! 该模块定义刷新协调依赖的两个集群可见原语：有序队列（令牌环的载体）与共享时间戳
//! （冷却门的载体）。两者都只保证最终一致，没有跨原语的原子性，也没有比较并交换。
//! 具体实现由所在平台提供；这里附带进程内实现，供单节点部署与测试使用。

mod cooldown_gate;
mod memory;
mod token_ring;

pub use cooldown_gate::CooldownGate;
pub use memory::{InMemoryQueue, InMemoryTimestamp};
pub use token_ring::TokenRing;

use async_trait::async_trait;
use dirsync_common::Result;

/// 集群可见的有序队列
#[async_trait]
pub trait SharedQueue: Send + Sync {
    /// 查看队首元素，不移除
    async fn peek(&self) -> Result<Option<String>>;

    /// 追加到队尾
    async fn offer(&self, item: String) -> Result<()>;

    /// 移除并返回队首元素
    async fn poll(&self) -> Result<Option<String>>;
}

/// 集群可见的共享整数时间戳
#[async_trait]
pub trait SharedTimestamp: Send + Sync {
    async fn get(&self) -> Result<i64>;

    async fn set(&self, value: i64) -> Result<()>;
}
