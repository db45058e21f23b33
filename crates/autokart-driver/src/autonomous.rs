//! 自主模式指令来源
//!
//! `mode == Autonomous` 时油门和转向工作线程从这里取值。
//! 目前没有接入任何自主控制器，[`NoAutonomousSource`] 始终返回 `None`：
//! 油门输出 0，转向保持居中。

use autokart_protocol::SteeringDirection;

/// 自主模式指令来源
pub trait AutonomousSource: Send + Sync {
    /// 自主油门（0-255），`None` 表示无可用指令
    fn throttle(&self) -> Option<u8>;

    /// 自主转向，`None` 表示无可用指令
    fn steering(&self) -> Option<SteeringDirection>;
}

/// 未接入自主控制器
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAutonomousSource;

impl AutonomousSource for NoAutonomousSource {
    fn throttle(&self) -> Option<u8> {
        None
    }

    fn steering(&self) -> Option<SteeringDirection> {
        None
    }
}
