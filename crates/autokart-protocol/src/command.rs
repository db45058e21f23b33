//! 映射后的执行器指令
//!
//! 将原始通道值映射为带语义的执行器指令。映射规则是确定性的纯函数：
//!
//! | 字段 | 规则 |
//! |------|------|
//! | 油门 | `round((817 - clamp(1809 - raw, 0, 817)) / 817 * 255)` |
//! | 转向 | `> 992` → +1，`< 992` → -1，否则 0 |
//! | 刹车 | `> 992` → 松开，否则刹车 |
//! | 急停 A/B | `< 1809` → 触发 |
//! | 模式 | `== 172` → 自动驾驶，否则遥控 |

use crate::constants::*;
use crate::packet::RawPacket;

/// 转向方向
///
/// 与转向驱动器的点动引脚对应：+1 点动负向引脚（左转），-1 点动正向引脚（右转）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(i8)]
pub enum SteeringDirection {
    /// 右转（-1）
    Right = -1,
    /// 居中 / 停止点动（0）
    #[default]
    Centre = 0,
    /// 左转（+1）
    Left = 1,
}

impl SteeringDirection {
    /// 从 -1 / 0 / +1 转换
    ///
    /// 其他值返回 `None`。
    pub fn from_i8(value: i8) -> Option<Self> {
        match value {
            -1 => Some(Self::Right),
            0 => Some(Self::Centre),
            1 => Some(Self::Left),
            _ => None,
        }
    }

    /// 转换为 -1 / 0 / +1
    pub fn as_i8(self) -> i8 {
        self as i8
    }

    /// 是否为居中指令
    pub fn is_centre(self) -> bool {
        self == Self::Centre
    }
}

/// 刹车指令
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum BrakeCommand {
    /// 松开刹车（0）
    Release = 0,
    /// 踩下刹车（1）
    Apply = 1,
}

impl BrakeCommand {
    /// 转换为 0 / 1
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// 是否为刹车
    pub fn is_apply(self) -> bool {
        self == Self::Apply
    }
}

/// 控制模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum ControlMode {
    /// 遥控（人工驾驶，0）
    #[default]
    Remote = 0,
    /// 自动驾驶（1）
    Autonomous = 1,
}

impl ControlMode {
    /// 转换为 0 / 1
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// 映射后的执行器指令（不可变）
///
/// 只能通过 [`MappedCommand::from_raw`]（或 [`crate::decode`]）从原始数据包得到，
/// 字段不对外可写。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MappedCommand {
    throttle: u8,
    steering: SteeringDirection,
    brake: BrakeCommand,
    estop_a: bool,
    estop_b: bool,
    mode: ControlMode,
}

impl MappedCommand {
    /// 从原始数据包映射
    pub fn from_raw(raw: &RawPacket) -> Self {
        Self {
            throttle: map_throttle(raw.throttle_raw()),
            steering: map_steering(raw.steering_raw()),
            brake: map_brake(raw.brake_raw()),
            estop_a: map_estop(raw.estop_a_raw()),
            estop_b: map_estop(raw.estop_b_raw()),
            mode: map_mode(raw.mode_raw()),
        }
    }

    /// 油门（0-255）
    pub fn throttle(&self) -> u8 {
        self.throttle
    }

    /// 转向方向
    pub fn steering(&self) -> SteeringDirection {
        self.steering
    }

    /// 刹车指令
    pub fn brake(&self) -> BrakeCommand {
        self.brake
    }

    /// 急停 A 是否触发
    pub fn estop_a(&self) -> bool {
        self.estop_a
    }

    /// 急停 B 是否触发
    pub fn estop_b(&self) -> bool {
        self.estop_b
    }

    /// 控制模式
    pub fn mode(&self) -> ControlMode {
        self.mode
    }

    /// 是否请求急停（`estop_a || estop_b`）
    #[inline]
    pub fn stop_requested(&self) -> bool {
        self.estop_a || self.estop_b
    }

    /// 按 `[throttle, steering, brake, estop_a, estop_b, mode]` 输出整数数组
    ///
    /// 用于日志和状态上报。
    pub fn to_array(&self) -> [i32; 6] {
        [
            i32::from(self.throttle),
            i32::from(self.steering.as_i8()),
            i32::from(self.brake.as_u8()),
            i32::from(self.estop_a),
            i32::from(self.estop_b),
            i32::from(self.mode.as_u8()),
        ]
    }
}

impl Default for MappedCommand {
    /// 启动默认指令（由 [`RawPacket::DEFAULT`] 映射得到）
    fn default() -> Self {
        Self::from_raw(&RawPacket::DEFAULT)
    }
}

impl std::fmt::Display for MappedCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.to_array())
    }
}

/// 油门映射（反向：原始值越接近 992 油门越小）
///
/// 使用整数四舍五入，避免浮点误差。
fn map_throttle(raw: i32) -> u8 {
    let span = i64::from(THROTTLE_SPAN);
    let offset = (i64::from(CHANNEL_HIGH) - i64::from(raw)).clamp(0, span);
    let scaled = ((span - offset) * i64::from(THROTTLE_MAX) + span / 2) / span;
    scaled.clamp(0, i64::from(THROTTLE_MAX)) as u8
}

fn map_steering(raw: i32) -> SteeringDirection {
    match raw.cmp(&CHANNEL_CENTRE) {
        std::cmp::Ordering::Greater => SteeringDirection::Left,
        std::cmp::Ordering::Less => SteeringDirection::Right,
        std::cmp::Ordering::Equal => SteeringDirection::Centre,
    }
}

fn map_brake(raw: i32) -> BrakeCommand {
    if raw > CHANNEL_CENTRE {
        BrakeCommand::Release
    } else {
        BrakeCommand::Apply
    }
}

fn map_estop(raw: i32) -> bool {
    raw < CHANNEL_HIGH
}

fn map_mode(raw: i32) -> ControlMode {
    if raw == AUTONOMOUS_MODE_RAW {
        ControlMode::Autonomous
    } else {
        ControlMode::Remote
    }
}
