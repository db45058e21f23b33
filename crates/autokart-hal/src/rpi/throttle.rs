//! MCP4162 数字电位器油门

use super::SharedPin;
use crate::actuator::{DrivetrainEnable, ThrottleDriver};
use crate::error::DriverError;
use rppal::gpio::OutputPin;
use rppal::spi::Spi;
use tracing::trace;

/// 写易失性寄存器 P0 的指令字节
const WRITE_WIPER0: u8 = 0x00;

/// MCP4162 油门
///
/// 片选为低有效，由独立 GPIO 控制。输出使能与动力系统使能共用同一引脚
/// （GPIO24），`enable()` 只把电位器写回 0，拉高使能由监督器负责。
pub struct RpiThrottle {
    spi: Spi,
    cs: OutputPin,
    enable: SharedPin,
}

impl RpiThrottle {
    pub(crate) fn new(spi: Spi, cs: OutputPin, enable: SharedPin) -> Self {
        Self { spi, cs, enable }
    }

    fn write_wiper(&mut self, value: u8) -> Result<(), DriverError> {
        self.cs.set_low();
        let result = self.spi.write(&[WRITE_WIPER0, value]);
        self.cs.set_high();
        result?;
        trace!("[Throttle] Wiper set to {}", value);
        Ok(())
    }
}

impl ThrottleDriver for RpiThrottle {
    fn set(&mut self, value: u8) -> Result<(), DriverError> {
        self.write_wiper(value)
    }

    fn enable(&mut self) -> Result<(), DriverError> {
        // 使能引脚归监督器所有；这里只把电位器写回 0，恢复后从静止开始
        self.write_wiper(0)
    }

    fn disable(&mut self) -> Result<(), DriverError> {
        // 先断电再归零：即使 SPI 写失败，输出也已失能
        self.enable.lock().set_low();
        self.write_wiper(0)
    }
}

/// 动力系统使能线
pub struct RpiDrivetrainEnable {
    pin: SharedPin,
}

impl RpiDrivetrainEnable {
    pub(crate) fn new(pin: SharedPin) -> Self {
        Self { pin }
    }
}

impl DrivetrainEnable for RpiDrivetrainEnable {
    fn set_enabled(&mut self, enabled: bool) -> Result<(), DriverError> {
        let mut pin = self.pin.lock();
        if enabled {
            pin.set_high();
        } else {
            pin.set_low();
        }
        Ok(())
    }
}
