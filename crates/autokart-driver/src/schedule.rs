//! 周期调度
//!
//! 每个控制单元实现 [`PeriodicTask`]，由 [`run_periodic`] 在独立线程中按固定节拍驱动。
//! 节拍按截止时间推进（不累积漂移），时间和休眠都来自注入的 [`Clock`]。

use crate::clock::Clock;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, trace};

/// 周期任务
pub trait PeriodicTask: Send {
    /// 线程 / 日志中使用的名称
    fn name(&self) -> &'static str;

    /// 节拍周期
    fn period(&self) -> Duration;

    /// 执行一个节拍
    fn tick(&mut self, now: Duration);
}

/// 固定节拍
///
/// 第一次 `wait()` 立即返回；之后每次等到上一个截止时间加一个周期。
/// 如果某个节拍超时超过一整个周期，跳过错过的节拍并从当前时刻重新对齐。
#[derive(Debug)]
pub struct Cadence {
    period: Duration,
    next_deadline: Option<Duration>,
    overruns: u64,
}

impl Cadence {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            next_deadline: None,
            overruns: 0,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// 累计超时节拍数
    pub fn overruns(&self) -> u64 {
        self.overruns
    }

    /// 等待下一个节拍，返回节拍开始时刻
    pub fn wait(&mut self, clock: &dyn Clock) -> Duration {
        let now = clock.now();
        let deadline = self.next_deadline.unwrap_or(now);

        if deadline > now {
            clock.sleep(deadline - now);
            self.next_deadline = Some(deadline + self.period);
            deadline
        } else {
            if now - deadline >= self.period {
                self.overruns += 1;
                self.next_deadline = Some(now + self.period);
            } else {
                self.next_deadline = Some(deadline + self.period);
            }
            now
        }
    }
}

/// 在当前线程中循环执行周期任务，直到 `is_running` 变为 false
pub fn run_periodic<T: PeriodicTask>(
    mut task: T,
    clock: Arc<dyn Clock>,
    is_running: Arc<AtomicBool>,
) {
    let name = task.name();
    let mut cadence = Cadence::new(task.period());
    debug!("{} loop started (period {:?})", name, cadence.period());

    while is_running.load(Ordering::Acquire) {
        let now = cadence.wait(clock.as_ref());
        if !is_running.load(Ordering::Acquire) {
            break;
        }
        task.tick(now);
        trace!("{} tick at {:?}", name, now);
    }

    debug!(
        "{} loop stopped ({} overrun ticks)",
        name,
        cadence.overruns()
    );
}
