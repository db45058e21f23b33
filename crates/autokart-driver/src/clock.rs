//! 时钟抽象
//!
//! 所有控制循环通过 [`Clock`] 获取时间和休眠，测试中使用 [`ManualClock`]
//! 以虚拟时间驱动，无需真实延迟。

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// 单调时钟
pub trait Clock: Send + Sync {
    /// 自时钟起点以来经过的时间
    fn now(&self) -> Duration;

    /// 休眠指定时长
    fn sleep(&self, duration: Duration);
}

/// 系统单调时钟
///
/// 休眠使用 spin_sleep，精度远高于 `std::thread::sleep` 的 1-2ms。
#[derive(Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        spin_sleep::sleep(duration);
    }
}

/// 手动时钟（测试用）
///
/// `sleep()` 不阻塞，直接把虚拟时间向前推进。
#[derive(Debug, Default)]
pub struct ManualClock {
    nanos: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// 推进虚拟时间
    pub fn advance(&self, duration: Duration) {
        self.nanos
            .fetch_add(duration.as_nanos() as u64, Ordering::AcqRel);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::Acquire))
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}
