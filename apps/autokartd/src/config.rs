//! 守护进程配置文件（TOML）
//!
//! ```toml
//! [control]   # autokart_driver::KartConfig
//! [serial]    # 遥控接收机串口
//! [pins]      # Raspberry Pi 引脚（BCM 编号）
//! [timing]    # 转向脉冲 / 刹车行程
//! ```
//!
//! 所有字段都有默认值，缺省的段使用默认配置。

use anyhow::{Context, Result};
use autokart_driver::KartConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DaemonConfig {
    pub control: KartConfig,
    pub serial: SerialSection,
    pub pins: PinsSection,
    pub timing: TimingSection,
}

impl DaemonConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: DaemonConfig = toml::from_str(content)?;
        config.control.validate()?;
        Ok(config)
    }
}

/// 串口
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SerialSection {
    pub device: PathBuf,
    pub baud: u32,
    pub read_timeout_ms: u64,
}

impl Default for SerialSection {
    fn default() -> Self {
        Self {
            device: PathBuf::from("/dev/ttyAMA0"),
            baud: 1200,
            read_timeout_ms: 1000,
        }
    }
}

#[cfg(target_os = "linux")]
impl From<&SerialSection> for autokart_hal::SerialConfig {
    fn from(section: &SerialSection) -> Self {
        Self {
            device: section.device.clone(),
            baud: section.baud,
            read_timeout_ms: section.read_timeout_ms,
        }
    }
}

/// 引脚分配（BCM 编号）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PinsSection {
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

impl Default for PinsSection {
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

#[cfg(feature = "rpi")]
impl From<&PinsSection> for autokart_hal::rpi::RpiPins {
    fn from(pins: &PinsSection) -> Self {
        Self {
            drivetrain_enable: pins.drivetrain_enable,
            throttle_cs: pins.throttle_cs,
            throttle_spi_hz: pins.throttle_spi_hz,
            steering_enable: pins.steering_enable,
            steering_fault_reset: pins.steering_fault_reset,
            steering_jog_neg: pins.steering_jog_neg,
            steering_jog_pos: pins.steering_jog_pos,
            brake_extend: pins.brake_extend,
            brake_retract: pins.brake_retract,
        }
    }
}

/// 脉冲 / 行程时序（毫秒）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimingSection {
    pub jog_pulse_ms: u64,
    pub fault_reset_pulse_ms: u64,
    pub brake_apply_ms: u64,
    pub brake_release_ms: u64,
}

impl Default for TimingSection {
    fn default() -> Self {
        Self {
            jog_pulse_ms: 200,
            fault_reset_pulse_ms: 1,
            brake_apply_ms: 1000,
            brake_release_ms: 5000,
        }
    }
}

#[cfg(feature = "rpi")]
impl From<&TimingSection> for autokart_hal::rpi::RpiTiming {
    fn from(timing: &TimingSection) -> Self {
        use std::time::Duration;

        Self {
            jog_pulse: Duration::from_millis(timing.jog_pulse_ms),
            fault_reset_pulse: Duration::from_millis(timing.fault_reset_pulse_ms),
            brake_apply_stroke: Duration::from_millis(timing.brake_apply_ms),
            brake_release_stroke: Duration::from_millis(timing.brake_release_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_shipped_config_matches_defaults() {
        let config = DaemonConfig::from_toml_str(include_str!("../autokart.toml")).unwrap();
        assert_eq!(config, DaemonConfig::default());
    }

    #[test]
    fn test_empty_config_is_default() {
        assert_eq!(DaemonConfig::from_toml_str("").unwrap(), DaemonConfig::default());
    }

    #[test]
    fn test_partial_sections() {
        let config = DaemonConfig::from_toml_str(
            r#"
            [control]
            stale_timeout_ms = 500

            [serial]
            device = "/dev/ttyUSB0"
            "#,
        )
        .unwrap();

        assert_eq!(config.control.stale_timeout_ms, Some(500));
        assert_eq!(config.control.supervisor_period_ms, 10);
        assert_eq!(config.serial.device, PathBuf::from("/dev/ttyUSB0"));
        assert_eq!(config.serial.baud, 1200);
        assert_eq!(config.pins, PinsSection::default());
    }

    #[test]
    fn test_invalid_control_rejected() {
        let result = DaemonConfig::from_toml_str("[control]\nbrake_period_ms = 0\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_section_rejected() {
        assert!(DaemonConfig::from_toml_str("[telemetry]\nport = 1\n").is_err());
    }

    #[test]
    fn test_load_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[timing]").unwrap();
        writeln!(file, "jog_pulse_ms = 150").unwrap();

        let config = DaemonConfig::load(file.path()).unwrap();
        assert_eq!(config.timing.jog_pulse_ms, 150);

        let err = DaemonConfig::load(Path::new("/nonexistent/autokart.toml")).unwrap_err();
        assert!(format!("{:#}", err).contains("/nonexistent/autokart.toml"));
    }
}
