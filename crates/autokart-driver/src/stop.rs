//! 停止标志
//!
//! 由安全监督器写入，执行器工作线程读取。
//! 标志值由最新指令的 `estop_a || estop_b`（以及过期/故障判定）推导，
//! 监督器在接触任何执行器之前先置位。

use std::sync::atomic::{AtomicU64, Ordering};

/// 可检测边沿的停止标志
///
/// 只用一个计数器：每个边沿加一，奇数表示停止中。
/// 工作线程记住上次看到的计数，即使急停在两拍之间开始又结束，
/// 计数的变化也能让它知道执行器已被监督器接管过。
#[derive(Debug, Default)]
pub struct StopSignal {
    edges: AtomicU64,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前是否处于停止状态
    #[inline]
    pub fn is_active(&self) -> bool {
        Self::active_at(self.edge_count())
    }

    /// 给定边沿计数时是否处于停止状态
    #[inline]
    pub const fn active_at(edges: u64) -> bool {
        edges % 2 == 1
    }

    /// 置位，返回是否产生了上升沿
    pub(crate) fn raise(&self) -> bool {
        self.edges
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (!Self::active_at(n)).then_some(n + 1)
            })
            .is_ok()
    }

    /// 清除，返回是否产生了下降沿
    pub(crate) fn clear(&self) -> bool {
        self.edges
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                Self::active_at(n).then_some(n + 1)
            })
            .is_ok()
    }

    /// 累计边沿数
    #[inline]
    pub fn edge_count(&self) -> u64 {
        self.edges.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edges_reported_once() {
        let stop = StopSignal::new();
        assert!(!stop.is_active());

        assert!(stop.raise());
        assert!(!stop.raise());
        assert!(stop.is_active());

        assert!(stop.clear());
        assert!(!stop.clear());
        assert!(!stop.is_active());

        assert_eq!(stop.edge_count(), 2);
    }

    #[test]
    fn test_edge_count_parity_tracks_state() {
        let stop = StopSignal::new();
        let seen = stop.edge_count();

        stop.raise();
        stop.clear();

        // 短暂急停之后标志已清除，但计数记录了这次停止
        assert!(!stop.is_active());
        assert_ne!(stop.edge_count(), seen);
        assert!(!StopSignal::active_at(stop.edge_count()));
        assert!(StopSignal::active_at(seen + 1));
    }
}
