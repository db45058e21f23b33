//! 原始数据包
//!
//! 遥控接收机每行输出 6 个通道的原始值。

use crate::constants::{CHANNEL_CENTRE, CHANNEL_HIGH, FIELD_DELIMITER};
use crate::error::{DecodeError, MalformedReason};

/// 每个数据包的字段数量
pub const FIELD_COUNT: usize = 6;

/// 原始数据包（6 个有符号整数，按接收顺序）
///
/// 字段顺序：油门、转向、刹车、急停 A、急停 B、模式。
///
/// 只能通过 [`parse_packet`] 或 [`RawPacket::new`] 构造，构造后不可变。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawPacket([i32; FIELD_COUNT]);

impl RawPacket {
    /// 启动默认值（收到第一个有效数据包之前使用）
    ///
    /// 油门 / 转向居中，刹车通道高位，两路急停未触发，遥控模式。
    pub const DEFAULT: RawPacket = RawPacket([
        CHANNEL_CENTRE,
        CHANNEL_CENTRE,
        CHANNEL_HIGH,
        CHANNEL_HIGH,
        CHANNEL_HIGH,
        CHANNEL_HIGH,
    ]);

    /// 从 6 个原始值构造
    pub const fn new(values: [i32; FIELD_COUNT]) -> Self {
        Self(values)
    }

    /// 全部原始值
    pub const fn values(&self) -> [i32; FIELD_COUNT] {
        self.0
    }

    /// 油门通道原始值
    pub const fn throttle_raw(&self) -> i32 {
        self.0[0]
    }

    /// 转向通道原始值
    pub const fn steering_raw(&self) -> i32 {
        self.0[1]
    }

    /// 刹车通道原始值
    pub const fn brake_raw(&self) -> i32 {
        self.0[2]
    }

    /// 急停 A 通道原始值
    pub const fn estop_a_raw(&self) -> i32 {
        self.0[3]
    }

    /// 急停 B 通道原始值
    pub const fn estop_b_raw(&self) -> i32 {
        self.0[4]
    }

    /// 模式通道原始值
    pub const fn mode_raw(&self) -> i32 {
        self.0[5]
    }
}

impl Default for RawPacket {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl std::fmt::Display for RawPacket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

/// 解析一行文本为原始数据包
///
/// - 去除行首尾空白（包括 `\r`）
/// - 按 `,` 分割，每个字段去除空白后按十进制解析
/// - 字段数量必须恰好为 6
///
/// # Example
///
/// ```
/// use autokart_protocol::{parse_packet, RawPacket};
///
/// let raw = parse_packet("992, 992, 1809, 1809, 1809, 1809\r\n").unwrap();
/// assert_eq!(raw, RawPacket::DEFAULT);
/// assert!(parse_packet("992,992,1809").is_err());
/// ```
pub fn parse_packet(line: &str) -> Result<RawPacket, DecodeError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(DecodeError::Malformed(MalformedReason::Empty));
    }

    let found = line.split(FIELD_DELIMITER).count();
    if found != FIELD_COUNT {
        return Err(DecodeError::Malformed(MalformedReason::FieldCount { found }));
    }

    let mut values = [0i32; FIELD_COUNT];
    for (index, token) in line.split(FIELD_DELIMITER).enumerate() {
        let token = token.trim();
        values[index] = token.parse::<i32>().map_err(|_| {
            DecodeError::Malformed(MalformedReason::InvalidField {
                index,
                token: token.to_string(),
            })
        })?;
    }

    Ok(RawPacket(values))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_packet() {
        let raw = parse_packet("1500,993,900,1809,1808,172").unwrap();
        assert_eq!(raw.throttle_raw(), 1500);
        assert_eq!(raw.steering_raw(), 993);
        assert_eq!(raw.brake_raw(), 900);
        assert_eq!(raw.estop_a_raw(), 1809);
        assert_eq!(raw.estop_b_raw(), 1808);
        assert_eq!(raw.mode_raw(), 172);
    }

    #[test]
    fn test_parse_tolerates_whitespace_and_crlf() {
        let raw = parse_packet("  992 ,992,1809, 1809,1809 ,1809\r\n").unwrap();
        assert_eq!(raw, RawPacket::DEFAULT);
    }

    #[test]
    fn test_parse_negative_values() {
        let raw = parse_packet("-1,0,-992,+5,1809,1809").unwrap();
        assert_eq!(raw.values(), [-1, 0, -992, 5, 1809, 1809]);
    }

    #[test]
    fn test_parse_empty_line() {
        assert_eq!(
            parse_packet("   \r\n"),
            Err(DecodeError::Malformed(MalformedReason::Empty))
        );
    }

    #[test]
    fn test_parse_wrong_field_count() {
        assert_eq!(
            parse_packet("992,992,1809,1809,1809"),
            Err(DecodeError::Malformed(MalformedReason::FieldCount { found: 5 }))
        );
        // 尾部多余的分隔符也算一个字段
        assert_eq!(
            parse_packet("992,992,1809,1809,1809,1809,"),
            Err(DecodeError::Malformed(MalformedReason::FieldCount { found: 7 }))
        );
    }

    #[test]
    fn test_parse_non_numeric_token() {
        let err = parse_packet("992,992,abc,1809,1809,1809").unwrap_err();
        assert_eq!(
            err.reason(),
            &MalformedReason::InvalidField {
                index: 2,
                token: "abc".to_string()
            }
        );

        // 浮点数、空字段、溢出都视为非法
        assert!(parse_packet("992.5,992,1809,1809,1809,1809").is_err());
        assert!(parse_packet("992,,1809,1809,1809,1809").is_err());
        assert!(parse_packet("99999999999,992,1809,1809,1809,1809").is_err());
    }

    #[test]
    fn test_default_packet() {
        assert_eq!(RawPacket::default().values(), [992, 992, 1809, 1809, 1809, 1809]);
        assert_eq!(RawPacket::DEFAULT.to_string(), "[992, 992, 1809, 1809, 1809, 1809]");
    }
}
