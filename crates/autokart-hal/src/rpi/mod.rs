//! Raspberry Pi 执行器驱动
//!
//! 接线（BCM 编号）：
//!
//! ```text
//! GPIO 24  动力系统使能（急停时拉低，与油门输出使能共用）
//! GPIO 27  MCP4162 片选（低有效）
//! GPIO 11  SPI0 SCLK
//! GPIO 10  SPI0 MOSI
//! GPIO 19  转向驱动器使能
//! GPIO 12  转向故障复位（每次指令后 1ms 脉冲）
//! GPIO 26  转向点动负向（左）
//! GPIO 22  转向点动正向（右）
//! GPIO 16  刹车执行器伸出
//! GPIO 17  刹车执行器收回
//! ```

mod brake;
mod steering;
mod throttle;

pub use brake::RpiBrake;
pub use steering::RpiSteering;
pub use throttle::{RpiDrivetrainEnable, RpiThrottle};

use crate::error::DriverError;
use parking_lot::Mutex;
use rppal::gpio::{Gpio, OutputPin};
use rppal::spi::{Bus, Mode, SlaveSelect, Spi};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// 油门与动力系统共用的使能引脚（GPIO24）
///
/// 只有 [`RpiDrivetrainEnable`] 会拉高它，也就是只有安全监督器能让动力系统上电。
/// [`RpiThrottle`] 持有它只为在 `disable()` 时一并拉低；`enable()` 不碰这个引脚，
/// 油门工作线程恢复时不能绕过监督器重新给动力系统上电。
pub(crate) type SharedPin = Arc<Mutex<OutputPin>>;

/// 引脚分配（BCM 编号）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpiPins {
    pub drivetrain_enable: u8,
    pub throttle_cs: u8,
    pub throttle_spi_hz: u32,
    pub steering_enable: u8,
    pub steering_fault_reset: u8,
    pub steering_jog_neg: u8,
    pub steering_jog_pos: u8,
    pub brake_extend: u8,
    pub brake_retract: u8,
}

impl Default for RpiPins {
    fn default() -> Self {
        Self {
            drivetrain_enable: 24,
            throttle_cs: 27,
            throttle_spi_hz: 1_000_000,
            steering_enable: 19,
            steering_fault_reset: 12,
            steering_jog_neg: 26,
            steering_jog_pos: 22,
            brake_extend: 16,
            brake_retract: 17,
        }
    }
}

/// 脉冲 / 行程时序
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RpiTiming {
    /// 转向点动脉冲时长
    pub jog_pulse: Duration,
    /// 转向故障复位脉冲时长
    pub fault_reset_pulse: Duration,
    /// 刹车伸出行程
    pub brake_apply_stroke: Duration,
    /// 刹车收回行程
    pub brake_release_stroke: Duration,
}

impl Default for RpiTiming {
    fn default() -> Self {
        Self {
            jog_pulse: Duration::from_millis(200),
            fault_reset_pulse: Duration::from_millis(1),
            brake_apply_stroke: Duration::from_millis(1000),
            brake_release_stroke: Duration::from_millis(5000),
        }
    }
}

/// 全部 Raspberry Pi 执行器
pub struct RpiActuators {
    pub throttle: RpiThrottle,
    pub steering: RpiSteering,
    pub brake: RpiBrake,
    pub drivetrain: RpiDrivetrainEnable,
}

impl RpiActuators {
    /// 打开 GPIO / SPI 并初始化所有执行器
    ///
    /// 初始状态：动力使能低、油门为 0、转向驱动器使能、刹车两路均断电。
    pub fn open(pins: &RpiPins, timing: RpiTiming) -> Result<Self, DriverError> {
        let gpio = Gpio::new()?;

        let enable: SharedPin = Arc::new(Mutex::new(
            gpio.get(pins.drivetrain_enable)?.into_output_low(),
        ));

        let spi = Spi::new(Bus::Spi0, SlaveSelect::Ss0, pins.throttle_spi_hz, Mode::Mode0)?;
        let cs = gpio.get(pins.throttle_cs)?.into_output_high();
        let throttle = RpiThrottle::new(spi, cs, enable.clone());

        let steering = RpiSteering::new(
            gpio.get(pins.steering_enable)?.into_output_low(),
            gpio.get(pins.steering_fault_reset)?.into_output_low(),
            gpio.get(pins.steering_jog_neg)?.into_output_low(),
            gpio.get(pins.steering_jog_pos)?.into_output_low(),
            timing,
        )?;

        let brake = RpiBrake::new(
            gpio.get(pins.brake_extend)?.into_output_low(),
            gpio.get(pins.brake_retract)?.into_output_low(),
            timing,
        );

        info!(
            "Raspberry Pi actuators initialised (enable GPIO{}, brake EXT GPIO{} RET GPIO{})",
            pins.drivetrain_enable, pins.brake_extend, pins.brake_retract
        );

        Ok(Self {
            throttle,
            steering,
            brake,
            drivetrain: RpiDrivetrainEnable::new(enable),
        })
    }
}

/// 输出一个高电平脉冲
pub(crate) fn pulse(pin: &mut OutputPin, width: Duration) {
    pin.set_high();
    spin_sleep::sleep(width);
    pin.set_low();
}
