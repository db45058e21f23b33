//! 执行器驱动接口
//!
//! 每个执行器由外部驱动实现。所有方法都可能阻塞（SPI 写入、点动脉冲、刹车行程），
//! 调用方不得在持有共享状态锁时调用。
//!
//! 约定：`disable()` / `apply()` / `set_enabled(false)` 必须是幂等的，
//! 监督器在急停期间会每个周期重复调用。

use crate::error::DriverError;
use autokart_protocol::SteeringDirection;

/// 油门驱动（数字电位器）
pub trait ThrottleDriver: Send {
    /// 设置油门输出（0-255）
    fn set(&mut self, value: u8) -> Result<(), DriverError>;

    /// 使能输出
    fn enable(&mut self) -> Result<(), DriverError>;

    /// 失能：输出归零并断电
    fn disable(&mut self) -> Result<(), DriverError>;
}

/// 转向驱动（点动伺服）
pub trait SteeringDriver: Send {
    /// 发送方向指令
    ///
    /// 非居中方向会产生一个有限时长的点动脉冲，之后总是跟随一个故障复位脉冲；
    /// 居中指令不产生点动脉冲，但仍发送故障复位脉冲。调用阻塞至脉冲结束。
    fn set_direction(&mut self, direction: SteeringDirection) -> Result<(), DriverError>;

    /// 使能驱动器
    fn enable(&mut self) -> Result<(), DriverError>;

    /// 失能驱动器（停止所有点动）
    fn disable(&mut self) -> Result<(), DriverError>;
}

/// 刹车驱动（双稳态直线执行器）
pub trait BrakeDriver: Send {
    /// 伸出执行器踩下刹车，阻塞至行程结束
    fn apply(&mut self) -> Result<(), DriverError>;

    /// 收回执行器松开刹车，阻塞至行程结束
    fn release(&mut self) -> Result<(), DriverError>;
}

/// 动力系统使能线（仅由监督器控制）
pub trait DrivetrainEnable: Send {
    /// 拉高 / 拉低使能线
    fn set_enabled(&mut self, enabled: bool) -> Result<(), DriverError>;
}

impl<T: ThrottleDriver + ?Sized> ThrottleDriver for Box<T> {
    fn set(&mut self, value: u8) -> Result<(), DriverError> {
        (**self).set(value)
    }

    fn enable(&mut self) -> Result<(), DriverError> {
        (**self).enable()
    }

    fn disable(&mut self) -> Result<(), DriverError> {
        (**self).disable()
    }
}

impl<T: SteeringDriver + ?Sized> SteeringDriver for Box<T> {
    fn set_direction(&mut self, direction: SteeringDirection) -> Result<(), DriverError> {
        (**self).set_direction(direction)
    }

    fn enable(&mut self) -> Result<(), DriverError> {
        (**self).enable()
    }

    fn disable(&mut self) -> Result<(), DriverError> {
        (**self).disable()
    }
}

impl<T: BrakeDriver + ?Sized> BrakeDriver for Box<T> {
    fn apply(&mut self) -> Result<(), DriverError> {
        (**self).apply()
    }

    fn release(&mut self) -> Result<(), DriverError> {
        (**self).release()
    }
}

impl<T: DrivetrainEnable + ?Sized> DrivetrainEnable for Box<T> {
    fn set_enabled(&mut self, enabled: bool) -> Result<(), DriverError> {
        (**self).set_enabled(enabled)
    }
}
