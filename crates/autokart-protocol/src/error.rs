//! 解码错误类型定义

use thiserror::Error;

/// 数据包格式错误的具体原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MalformedReason {
    /// 空行（去除空白后无内容）
    Empty,
    /// 字段数量不是 6
    FieldCount { found: usize },
    /// 某个字段不是合法的 32 位有符号整数
    InvalidField { index: usize, token: String },
}

impl std::fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MalformedReason::Empty => write!(f, "empty line"),
            MalformedReason::FieldCount { found } => {
                write!(f, "expected 6 fields, found {}", found)
            },
            MalformedReason::InvalidField { index, token } => {
                write!(f, "field {} is not an integer: {:?}", index, token)
            },
        }
    }
}

/// 解码错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// 数据包格式错误，调用方必须整行丢弃
    #[error("Malformed packet: {0}")]
    Malformed(MalformedReason),
}

impl DecodeError {
    /// 获取格式错误原因
    pub fn reason(&self) -> &MalformedReason {
        match self {
            DecodeError::Malformed(reason) => reason,
        }
    }
}
