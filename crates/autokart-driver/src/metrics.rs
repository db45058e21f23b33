//! 运行指标（原子计数器）
//!
//! 各线程以 `Relaxed` 顺序累加，读取时通过 [`KartMetrics::snapshot`] 得到一份普通值。

use std::sync::atomic::{AtomicU64, Ordering};

/// 运行指标
#[derive(Debug, Default)]
pub struct KartMetrics {
    /// 成功解码并发布的数据包
    pub packets_decoded: AtomicU64,
    /// 因格式错误被丢弃的行
    pub packets_malformed: AtomicU64,
    pub transport_timeouts: AtomicU64,
    pub transport_errors: AtomicU64,

    pub supervisor_ticks: AtomicU64,
    /// 进入急停次数
    pub estop_entries: AtomicU64,
    /// 解除急停次数
    pub estop_clears: AtomicU64,

    /// 执行器调用失败次数（含 panic）
    pub driver_errors: AtomicU64,
    /// 监督器等待执行器超时次数
    pub actuator_busy: AtomicU64,

    pub throttle_commands: AtomicU64,
    pub steering_commands: AtomicU64,
    pub brake_commands: AtomicU64,
}

impl KartMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn inc(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// 读取当前指标
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            packets_decoded: self.packets_decoded.load(Ordering::Relaxed),
            packets_malformed: self.packets_malformed.load(Ordering::Relaxed),
            transport_timeouts: self.transport_timeouts.load(Ordering::Relaxed),
            transport_errors: self.transport_errors.load(Ordering::Relaxed),
            supervisor_ticks: self.supervisor_ticks.load(Ordering::Relaxed),
            estop_entries: self.estop_entries.load(Ordering::Relaxed),
            estop_clears: self.estop_clears.load(Ordering::Relaxed),
            driver_errors: self.driver_errors.load(Ordering::Relaxed),
            actuator_busy: self.actuator_busy.load(Ordering::Relaxed),
            throttle_commands: self.throttle_commands.load(Ordering::Relaxed),
            steering_commands: self.steering_commands.load(Ordering::Relaxed),
            brake_commands: self.brake_commands.load(Ordering::Relaxed),
        }
    }
}

/// 指标快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub packets_decoded: u64,
    pub packets_malformed: u64,
    pub transport_timeouts: u64,
    pub transport_errors: u64,
    pub supervisor_ticks: u64,
    pub estop_entries: u64,
    pub estop_clears: u64,
    pub driver_errors: u64,
    pub actuator_busy: u64,
    pub throttle_commands: u64,
    pub steering_commands: u64,
    pub brake_commands: u64,
}

impl std::fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "packets={} malformed={} timeouts={} transport_errors={} estops={} driver_errors={} busy={}",
            self.packets_decoded,
            self.packets_malformed,
            self.transport_timeouts,
            self.transport_errors,
            self.estop_entries,
            self.driver_errors,
            self.actuator_busy
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_counters() {
        let metrics = KartMetrics::new();
        KartMetrics::inc(&metrics.packets_decoded);
        KartMetrics::inc(&metrics.packets_decoded);
        KartMetrics::inc(&metrics.estop_entries);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.packets_decoded, 2);
        assert_eq!(snapshot.estop_entries, 1);
        assert_eq!(snapshot.packets_malformed, 0);
        assert!(snapshot.to_string().contains("packets=2"));
    }
}
