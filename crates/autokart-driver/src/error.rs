//! 控制核心错误类型定义

use autokart_hal::{DriverError, TransportError};
use autokart_protocol::DecodeError;
use thiserror::Error;

/// 控制核心错误类型
///
/// 控制循环内部不会向外传播错误：所有错误在循环内记录（日志 + 计数）后继续运行。
/// 这里的错误只在构建 / 配置 / 关闭等边界操作中返回给调用方。
#[derive(Error, Debug)]
pub enum KartError {
    /// 执行器硬件调用失败
    #[error("Actuator driver error ({actuator}): {source}")]
    Driver {
        actuator: &'static str,
        #[source]
        source: DriverError,
    },

    /// 执行器正被其他线程占用（有界等待超时）
    #[error("Actuator {actuator} busy")]
    ActuatorBusy { actuator: &'static str },

    /// 执行器驱动在调用中 panic
    #[error("Actuator {actuator} driver panicked")]
    ActuatorPanicked { actuator: &'static str },

    /// 传输层错误
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// 数据包解码错误
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// 配置值无效
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// 配置文件解析失败
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 线程创建失败
    #[error("Failed to spawn {name} thread: {source}")]
    ThreadSpawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// 已经关闭
    #[error("Kart already shut down")]
    AlreadyShutdown,
}
