//! 控制核心配置
//!
//! 所有周期均可配置，默认值与参考实现一致：
//! 监督器 10ms，油门 20ms，转向 50ms，刹车 50ms。

use crate::error::KartError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// 控制核心配置
///
/// # Example
///
/// ```
/// use autokart_driver::KartConfig;
///
/// let config = KartConfig::from_toml_str(r#"
///     supervisor_period_ms = 5
///     stale_timeout_ms = 500
/// "#).unwrap();
/// assert_eq!(config.supervisor_period_ms, 5);
/// assert_eq!(config.throttle_period_ms, 20);
/// assert_eq!(config.stale_timeout_ms, Some(500));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KartConfig {
    /// 安全监督器周期（毫秒）
    pub supervisor_period_ms: u64,
    /// 油门工作线程周期（毫秒）
    pub throttle_period_ms: u64,
    /// 转向工作线程周期（毫秒）
    pub steering_period_ms: u64,
    /// 刹车工作线程周期（毫秒）
    pub brake_period_ms: u64,
    /// 指令过期超时（毫秒）
    ///
    /// `None`（默认）表示最后一个指令永远有效；
    /// 设置后，收到过数据包且最新指令超过此时长未刷新时强制急停。
    pub stale_timeout_ms: Option<u64>,
    /// 监督器等待执行器空闲的最长时间（毫秒）
    pub actuator_lock_timeout_ms: u64,
    /// 传输错误后的重试间隔（毫秒）
    pub transport_retry_ms: u64,
    /// 监督器边沿事件通道容量
    pub event_capacity: usize,
    /// 关闭时等待线程退出的最长时间（毫秒）
    pub shutdown_timeout_ms: u64,
}

impl Default for KartConfig {
    fn default() -> Self {
        Self {
            supervisor_period_ms: 10,
            throttle_period_ms: 20,
            steering_period_ms: 50,
            brake_period_ms: 50,
            stale_timeout_ms: None,
            actuator_lock_timeout_ms: 5,
            transport_retry_ms: 100,
            event_capacity: 64,
            shutdown_timeout_ms: 2000,
        }
    }
}

impl KartConfig {
    /// 从 TOML 文本解析（缺省字段使用默认值）
    pub fn from_toml_str(content: &str) -> Result<Self, KartError> {
        let config: KartConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 文件加载
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, KartError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// 校验配置
    ///
    /// 周期为 0 会让控制循环空转，过期超时不得短于监督器周期。
    pub fn validate(&self) -> Result<(), KartError> {
        let periods = [
            ("supervisor_period_ms", self.supervisor_period_ms),
            ("throttle_period_ms", self.throttle_period_ms),
            ("steering_period_ms", self.steering_period_ms),
            ("brake_period_ms", self.brake_period_ms),
        ];
        for (name, value) in periods {
            if value == 0 {
                return Err(KartError::Config(format!("{} must be greater than 0", name)));
            }
        }

        if let Some(stale) = self.stale_timeout_ms
            && stale < self.supervisor_period_ms
        {
            return Err(KartError::Config(format!(
                "stale_timeout_ms ({}) must not be shorter than supervisor_period_ms ({})",
                stale, self.supervisor_period_ms
            )));
        }

        if self.event_capacity == 0 {
            return Err(KartError::Config(
                "event_capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn supervisor_period(&self) -> Duration {
        Duration::from_millis(self.supervisor_period_ms)
    }

    pub fn throttle_period(&self) -> Duration {
        Duration::from_millis(self.throttle_period_ms)
    }

    pub fn steering_period(&self) -> Duration {
        Duration::from_millis(self.steering_period_ms)
    }

    pub fn brake_period(&self) -> Duration {
        Duration::from_millis(self.brake_period_ms)
    }

    pub fn stale_timeout(&self) -> Option<Duration> {
        self.stale_timeout_ms.map(Duration::from_millis)
    }

    pub fn actuator_lock_timeout(&self) -> Duration {
        Duration::from_millis(self.actuator_lock_timeout_ms)
    }

    pub fn transport_retry(&self) -> Duration {
        Duration::from_millis(self.transport_retry_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}
