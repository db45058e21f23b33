//! 指令状态存储
//!
//! 使用 `ArcSwap` 存放不可变快照：写入是一次原子指针替换，
//! 读取永远拿到完整的新值或完整的旧值，`raw` 与 `mapped` 不会来自不同数据包。
//! 读写双方都不会阻塞对方。

use crate::clock::Clock;
use arc_swap::ArcSwap;
use autokart_protocol::{MappedCommand, RawPacket};
use std::sync::Arc;
use std::time::Duration;

/// 当前指令状态（不可变快照）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandState {
    /// 最近一次有效数据包
    pub raw: RawPacket,
    /// `raw` 映射后的指令
    pub mapped: MappedCommand,
    /// 发布序号（启动默认值为 0，每次发布加 1）
    pub sequence: u64,
    /// 发布时刻（时钟时间），启动默认值为 `None`
    pub received_at: Option<Duration>,
}

impl CommandState {
    /// 启动默认状态
    ///
    /// 急停均未触发、刹车松开；不会被监督器视为急停。
    pub fn initial() -> Self {
        Self {
            raw: RawPacket::DEFAULT,
            mapped: MappedCommand::default(),
            sequence: 0,
            received_at: None,
        }
    }

    /// 是否仍是启动默认状态（尚未收到任何有效数据包）
    pub fn is_initial(&self) -> bool {
        self.received_at.is_none()
    }

    /// 距最近一次发布经过的时间
    ///
    /// 尚未收到数据包时返回 `None`。
    pub fn age(&self, now: Duration) -> Option<Duration> {
        self.received_at.map(|at| now.saturating_sub(at))
    }
}

impl Default for CommandState {
    fn default() -> Self {
        Self::initial()
    }
}

/// 指令状态存储
///
/// 只保存一个值（后写覆盖），没有队列和历史。
pub struct CommandStore {
    state: ArcSwap<CommandState>,
    clock: Arc<dyn Clock>,
}

impl CommandStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: ArcSwap::from_pointee(CommandState::initial()),
            clock,
        }
    }

    /// 发布新指令，返回其序号
    ///
    /// 返回前新值已对所有读者可见。
    pub fn publish(&self, raw: RawPacket, mapped: MappedCommand) -> u64 {
        let received_at = Some(self.clock.now());
        let previous = self.state.rcu(|current| CommandState {
            raw,
            mapped,
            sequence: current.sequence + 1,
            received_at,
        });
        previous.sequence + 1
    }

    /// 获取一致的快照
    #[inline]
    pub fn snapshot(&self) -> CommandState {
        **self.state.load()
    }

    /// 当前序号
    pub fn sequence(&self) -> u64 {
        self.state.load().sequence
    }
}

impl std::fmt::Debug for CommandStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandStore")
            .field("state", &self.snapshot())
            .finish_non_exhaustive()
    }
}
