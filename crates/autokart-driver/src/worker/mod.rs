//! 执行器工作线程
//!
//! 每个执行器一个工作线程，按各自节拍读取指令快照并驱动执行器。
//!
//! 共同规则：
//!
//! - 停止标志置位（或最新指令本身请求急停）时不向执行器发出任何运动指令
//! - 记住上次看到的停止边沿计数；计数变化说明期间发生过急停
//!   （哪怕短于本线程的周期），执行器已被监督器关闭，需要重新接管
//! - 拿到执行器之后再比较一次边沿计数，与监督器的"先置位、后接管"配合，
//!   保证监督器决定停止之后不会再有运动指令落到硬件上
//! - 驱动错误只记录（日志 + 计数），下个节拍重试
//!
//! | 工作线程 | 默认周期 | 触发方式 |
//! |---|---|---|
//! | [`ThrottleWorker`] | 20ms | 每拍连续输出 |
//! | [`SteeringWorker`] | 50ms | 非居中每拍点动，居中只发一次 |
//! | [`BrakeWorker`] | 50ms | 边沿触发 |

mod brake;
mod steering;
mod throttle;

pub use brake::BrakeWorker;
pub use steering::SteeringWorker;
pub use throttle::ThrottleWorker;

use crate::error::KartError;
use crate::metrics::KartMetrics;
use crate::stop::StopSignal;
use crate::store::{CommandState, CommandStore};
use std::sync::Arc;
use tracing::warn;

/// 工作线程共享的上下文
#[derive(Clone)]
pub struct WorkerContext {
    pub store: Arc<CommandStore>,
    pub stop: Arc<StopSignal>,
    pub metrics: Arc<KartMetrics>,
}

impl WorkerContext {
    pub fn new(
        store: Arc<CommandStore>,
        stop: Arc<StopSignal>,
        metrics: Arc<KartMetrics>,
    ) -> Self {
        Self {
            store,
            stop,
            metrics,
        }
    }

    /// 当前停止边沿计数，工作线程创建时用作初值
    fn stop_edges(&self) -> u64 {
        self.stop.edge_count()
    }

    /// 读取指令快照，并把 `seen_edges` 更新为当前边沿计数
    fn observe(&self, seen_edges: &mut u64) -> Observation {
        let edges = self.stop.edge_count();
        let interrupted = edges != *seen_edges;
        *seen_edges = edges;

        let state = self.store.snapshot();
        if StopSignal::active_at(edges) || state.mapped.stop_requested() {
            Observation::Stopped
        } else {
            Observation::Running { state, interrupted }
        }
    }

    /// 自 `seen_edges` 之后是否发生过停止（或仍在停止中）
    fn stopped_since(&self, seen_edges: u64) -> bool {
        self.stop.edge_count() != seen_edges
    }

    fn report(&self, worker: &'static str, err: KartError) {
        KartMetrics::inc(&self.metrics.driver_errors);
        warn!("{} worker: {}", worker, err);
    }
}

/// 一拍开始时看到的状态
enum Observation {
    Stopped,
    /// `interrupted`：上一拍之后发生过急停，执行器已被监督器关闭
    Running {
        state: CommandState,
        interrupted: bool,
    },
}

/// 一次执行器调用的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dispatch {
    /// 指令已发出
    Issued,
    /// 拿到执行器时已发生新的停止，未发出
    Preempted,
}
