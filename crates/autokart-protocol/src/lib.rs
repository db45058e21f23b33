//! # AutoKart Protocol
//!
//! 遥控发射机数据包编解码（无硬件依赖）
//!
//! ## 模块
//!
//! - `constants`: 原始通道值常量
//! - `packet`: 原始数据包 `RawPacket` 及文本解析
//! - `command`: 映射后的执行器指令 `MappedCommand`
//! - `error`: 解码错误
//!
//! ## 数据格式
//!
//! 每行一个数据包，6 个逗号分隔的有符号整数，以换行结尾：
//!
//! ```text
//! throttle,steering,brake,estop_a,estop_b,mode
//! 1500,992,1809,1809,1809,1809
//! ```
//!
//! 解码是纯函数：相同输入永远得到相同的 `MappedCommand`，没有副作用。

pub mod command;
pub mod constants;
mod error;
pub mod packet;

pub use command::{BrakeCommand, ControlMode, MappedCommand, SteeringDirection};
pub use constants::*;
pub use error::{DecodeError, MalformedReason};
pub use packet::{FIELD_COUNT, RawPacket, parse_packet};

/// 解码一行遥控数据
///
/// 解析 + 映射的组合入口。任何解析失败都返回 `DecodeError::Malformed`，
/// 调用方必须整行丢弃（不做部分更新）。
///
/// # Example
///
/// ```
/// use autokart_protocol::{decode, BrakeCommand, ControlMode};
///
/// let (raw, cmd) = decode("992,992,992,1808,1809,172").unwrap();
/// assert_eq!(raw.values(), [992, 992, 992, 1808, 1809, 172]);
/// assert_eq!(cmd.brake(), BrakeCommand::Apply);
/// assert!(cmd.estop_a());
/// assert_eq!(cmd.mode(), ControlMode::Autonomous);
/// assert_eq!(cmd.to_array(), [0, 0, 1, 1, 0, 1]);
/// ```
pub fn decode(line: &str) -> Result<(RawPacket, MappedCommand), DecodeError> {
    let raw = parse_packet(line)?;
    let mapped = MappedCommand::from_raw(&raw);
    Ok((raw, mapped))
}
