//! 串口传输（Linux termios）
//!
//! 遥控接收机通过 UART 输出数据（默认 `/dev/ttyAMA0`，1200 波特）。
//! 串口以原始模式打开，`VMIN = 0` / `VTIME = 1`，单次 `read` 最多阻塞 100ms，
//! 整行读取受 `read_timeout` 限制。

use crate::error::TransportError;
use crate::transport::{LineTransport, MAX_LINE_LEN};
use nix::sys::termios::{self, BaudRate, SetArg, SpecialCharacterIndices};
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read};
use std::os::unix::fs::OpenOptionsExt;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// 串口配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// 设备路径
    pub device: PathBuf,
    /// 波特率
    pub baud: u32,
    /// 整行读超时（毫秒）
    pub read_timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            device: PathBuf::from("/dev/ttyAMA0"),
            baud: 1200,
            read_timeout_ms: 1000,
        }
    }
}

/// 串口行传输
pub struct SerialTransport {
    port: File,
    pending: Vec<u8>,
    read_timeout: Duration,
}

impl SerialTransport {
    /// 打开并配置串口
    ///
    /// # 错误
    /// - `TransportError::Io`: 设备不存在或无权限
    /// - `TransportError::Config`: 不支持的波特率
    pub fn open(config: &SerialConfig) -> Result<Self, TransportError> {
        let baud = baud_rate(config.baud)?;

        let port = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY)
            .open(&config.device)?;

        let mut attrs = termios::tcgetattr(&port).map_err(std::io::Error::from)?;
        termios::cfmakeraw(&mut attrs);
        termios::cfsetspeed(&mut attrs, baud).map_err(std::io::Error::from)?;
        attrs.control_chars[SpecialCharacterIndices::VMIN as usize] = 0;
        attrs.control_chars[SpecialCharacterIndices::VTIME as usize] = 1;
        termios::tcsetattr(&port, SetArg::TCSANOW, &attrs).map_err(std::io::Error::from)?;

        debug!(
            "Serial port {} opened at {} baud",
            config.device.display(),
            config.baud
        );

        Ok(Self {
            port,
            pending: Vec::with_capacity(MAX_LINE_LEN),
            read_timeout: Duration::from_millis(config.read_timeout_ms),
        })
    }
}

impl LineTransport for SerialTransport {
    fn read_line(&mut self) -> Result<String, TransportError> {
        let deadline = Instant::now() + self.read_timeout;
        let mut chunk = [0u8; 64];

        loop {
            if let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = self.pending.drain(..=pos).collect();
                return Ok(String::from_utf8_lossy(&line[..pos]).into_owned());
            }

            if self.pending.len() > MAX_LINE_LEN {
                warn!(
                    "Serial line exceeded {} bytes without newline, discarding",
                    MAX_LINE_LEN
                );
                self.pending.clear();
            }

            if Instant::now() >= deadline {
                return Err(TransportError::Timeout);
            }

            match self.port.read(&mut chunk) {
                // VTIME 到期，没有数据
                Ok(0) => continue,
                Ok(n) => self.pending.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

fn baud_rate(baud: u32) -> Result<BaudRate, TransportError> {
    let rate = match baud {
        1200 => BaudRate::B1200,
        2400 => BaudRate::B2400,
        4800 => BaudRate::B4800,
        9600 => BaudRate::B9600,
        19200 => BaudRate::B19200,
        38400 => BaudRate::B38400,
        57600 => BaudRate::B57600,
        115200 => BaudRate::B115200,
        other => {
            return Err(TransportError::Config(format!(
                "unsupported baud rate {}",
                other
            )));
        },
    };
    Ok(rate)
}
