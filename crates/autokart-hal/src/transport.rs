//! 遥控数据传输接口
//!
//! 以行为单位读取遥控接收机输出。传输层不做任何协议解析，
//! 解码由 `autokart-protocol` 完成。

use crate::error::TransportError;
use std::io::BufRead;

/// 单行最大长度（字节）
///
/// 6 个 i32 字段加分隔符不会超过 72 字节，超过此长度的数据视为线路噪声。
pub const MAX_LINE_LEN: usize = 256;

/// 按行读取的传输接口
pub trait LineTransport: Send {
    /// 读取一行（不含换行符）
    ///
    /// 阻塞时间有上限：在读超时内没有完整的一行时返回 [`TransportError::Timeout`]。
    fn read_line(&mut self) -> Result<String, TransportError>;
}

impl<T: LineTransport + ?Sized> LineTransport for Box<T> {
    fn read_line(&mut self) -> Result<String, TransportError> {
        (**self).read_line()
    }
}

/// 基于任意 `BufRead` 的传输（标准输入、文件回放、测试）
///
/// 非法 UTF-8 字节按替换字符处理，交由解码层丢弃。
/// 读到 EOF 时返回 [`TransportError::Disconnected`]。
pub struct ReaderTransport<R> {
    reader: R,
    buf: Vec<u8>,
}

impl<R: BufRead + Send> ReaderTransport<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::with_capacity(MAX_LINE_LEN),
        }
    }
}

impl<R: BufRead + Send> LineTransport for ReaderTransport<R> {
    fn read_line(&mut self) -> Result<String, TransportError> {
        self.buf.clear();
        let n = self.reader.read_until(b'\n', &mut self.buf)?;
        if n == 0 {
            return Err(TransportError::Disconnected);
        }
        while matches!(self.buf.last(), Some(b'\n') | Some(b'\r')) {
            self.buf.pop();
        }
        Ok(String::from_utf8_lossy(&self.buf).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_reader_transport_reads_lines() {
        let input = "992,992,1809,1809,1809,1809\r\n1500,993,900,1809,1808,172\n";
        let mut transport = ReaderTransport::new(Cursor::new(input.as_bytes().to_vec()));

        assert_eq!(transport.read_line().unwrap(), "992,992,1809,1809,1809,1809");
        assert_eq!(transport.read_line().unwrap(), "1500,993,900,1809,1808,172");
        assert!(matches!(
            transport.read_line(),
            Err(TransportError::Disconnected)
        ));
    }

    #[test]
    fn test_reader_transport_last_line_without_newline() {
        let mut transport = ReaderTransport::new(Cursor::new(b"1,2,3".to_vec()));
        assert_eq!(transport.read_line().unwrap(), "1,2,3");
    }

    #[test]
    fn test_reader_transport_invalid_utf8_is_lossy() {
        let mut transport = ReaderTransport::new(Cursor::new(vec![b'9', 0xFF, b'2', b'\n']));
        let line = transport.read_line().unwrap();
        assert!(line.starts_with('9') && line.ends_with('2'));
        assert!(line.contains('\u{FFFD}'));
    }
}
