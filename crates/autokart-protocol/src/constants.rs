//! 原始通道值常量
//!
//! 遥控接收机输出的通道值范围为 172..=1809，中位为 992。

/// 通道中位值（摇杆居中 / 开关中间档）
pub const CHANNEL_CENTRE: i32 = 992;

/// 通道高位值（开关常态位置，急停未触发）
pub const CHANNEL_HIGH: i32 = 1809;

/// 通道低位值（模式开关拨到自动驾驶时的取值）
pub const CHANNEL_LOW: i32 = 172;

/// 油门通道有效行程（`CHANNEL_HIGH - CHANNEL_CENTRE`）
pub const THROTTLE_SPAN: i32 = CHANNEL_HIGH - CHANNEL_CENTRE;

/// 油门输出最大值（数字电位器 8 位分辨率）
pub const THROTTLE_MAX: u8 = 255;

/// 自动驾驶模式对应的模式通道原始值
pub const AUTONOMOUS_MODE_RAW: i32 = CHANNEL_LOW;

/// 字段分隔符
pub const FIELD_DELIMITER: char = ',';
