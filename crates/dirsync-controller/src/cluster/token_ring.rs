//! 成员令牌环
//!
//! 令牌环是集群共享队列上的一层语义封装：队首成员是下一个有资格执行刷新的成员。
//! 允许重复出现同一成员；环的不一致会在后续轮转中自行修复。

use dirsync_common::{MemberId, Result};
use std::sync::Arc;
use tracing::{debug, warn};

use super::SharedQueue;

/// 成员令牌环
#[derive(Clone)]
pub struct TokenRing {
    queue: Arc<dyn SharedQueue>,
}

impl TokenRing {
    pub fn new(queue: Arc<dyn SharedQueue>) -> Self {
        Self { queue }
    }

    /// 将成员加入环尾
    pub async fn enqueue(&self, member: &MemberId) -> Result<()> {
        self.queue.offer(member.to_string()).await
    }

    /// 当前环首成员的原始标识
    pub async fn head(&self) -> Result<Option<String>> {
        self.queue.peek().await
    }

    /// 环首是否为指定成员
    pub async fn is_head(&self, member: &MemberId) -> Result<bool> {
        Ok(self.head().await?.as_deref() == Some(member.as_str()))
    }

    /// 使用令牌后重新入环：先把自己加到环尾，再弹出环首
    ///
    /// 两步之间没有原子性，如果期间有其他成员改动了队列，弹出的可能不是自己，
    /// 这种不一致被接受。
    pub async fn rotate(&self, member: &MemberId) -> Result<()> {
        self.queue.offer(member.to_string()).await?;
        match self.queue.poll().await? {
            Some(popped) if popped == member.as_str() => {
                debug!("令牌环已轮转，成员 {} 回到环尾", member);
            }
            Some(popped) => {
                warn!("轮转时弹出的环首 {} 不是本成员 {}，接受该不一致", popped, member);
            }
            None => {
                warn!("轮转时令牌环为空，成员 {}", member);
            }
        }
        Ok(())
    }

    /// 把失联的环首移到环尾，返回被移动的成员
    pub async fn skip_head(&self) -> Result<Option<String>> {
        let head = self.queue.poll().await?;
        if let Some(id) = &head {
            self.queue.offer(id.clone()).await?;
        }
        Ok(head)
    }
}
