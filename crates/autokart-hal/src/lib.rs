//! # AutoKart HAL
//!
//! 硬件抽象层：执行器驱动接口 + 遥控数据传输接口。
//!
//! 控制核心只通过这里定义的窄接口调用外部硬件：
//!
//! | 执行器 | 接口 |
//! |--------|------|
//! | 油门 | [`ThrottleDriver`]：`set(0..=255)` / `enable()` / `disable()` |
//! | 转向 | [`SteeringDriver`]：`set_direction(-1/0/+1)`（阻塞至脉冲结束）/ `enable()` / `disable()` |
//! | 刹车 | [`BrakeDriver`]：`apply()` / `release()`（阻塞至行程结束） |
//! | 动力使能 | [`DrivetrainEnable`]：单根使能线 |
//!
//! 遥控数据通过 [`LineTransport`] 按行读取。
//!
//! ## Features
//!
//! - `mock`: 记录调用的模拟执行器 + 通道传输（测试 / 空跑）
//! - `rpi`: Raspberry Pi GPIO/SPI 驱动

mod actuator;
mod error;
pub mod transport;

#[cfg(target_os = "linux")]
pub mod serial;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

#[cfg(feature = "rpi")]
pub mod rpi;

pub use actuator::{BrakeDriver, DrivetrainEnable, SteeringDriver, ThrottleDriver};
pub use error::{DriverError, TransportError};
pub use transport::{LineTransport, ReaderTransport};

#[cfg(target_os = "linux")]
pub use serial::{SerialConfig, SerialTransport};

// 重新导出协议层中执行器接口用到的类型
pub use autokart_protocol::SteeringDirection;
