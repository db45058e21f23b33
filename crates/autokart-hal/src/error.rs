//! HAL 错误类型定义

use thiserror::Error;

/// 执行器驱动错误（一次硬件调用失败）
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    /// GPIO 访问失败
    #[error("GPIO Error: {0}")]
    Gpio(String),

    /// SPI 传输失败
    #[error("SPI Error: {0}")]
    Spi(String),

    /// 驱动拒绝执行的指令
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    /// 执行器故障（包括模拟驱动注入的故障）
    #[error("Actuator fault: {0}")]
    Fault(String),
}

/// 传输层错误
#[derive(Error, Debug)]
pub enum TransportError {
    /// 在读超时内没有收到完整的一行
    #[error("Read timeout")]
    Timeout,

    /// 数据源已关闭（EOF / 通道断开）
    #[error("Transport disconnected")]
    Disconnected,

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    /// 串口参数无效
    #[error("Transport configuration error: {0}")]
    Config(String),
}

impl TransportError {
    /// 是否为读超时（正常情况，发射机暂时无数据）
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout)
    }
}

#[cfg(feature = "rpi")]
impl From<rppal::gpio::Error> for DriverError {
    fn from(e: rppal::gpio::Error) -> Self {
        DriverError::Gpio(e.to_string())
    }
}

#[cfg(feature = "rpi")]
impl From<rppal::spi::Error> for DriverError {
    fn from(e: rppal::spi::Error) -> Self {
        DriverError::Spi(e.to_string())
    }
}
