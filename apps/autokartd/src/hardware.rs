//! 硬件选择：执行器（Raspberry Pi / 模拟）和数据源（串口 / 标准输入）

use crate::config::DaemonConfig;
use anyhow::Result;
use autokart_driver::ActuatorSet;
use autokart_hal::LineTransport;
use autokart_hal::mock::MockActuators;
use tracing::info;

/// 打开执行器
///
/// `dry_run` 时使用模拟执行器，所有调用只写日志。
pub fn open_actuators(config: &DaemonConfig, dry_run: bool) -> Result<ActuatorSet> {
    if dry_run {
        info!("Dry run: using mock actuators (no hardware access)");
        return Ok(ActuatorSet::from(MockActuators::new()));
    }
    open_rpi(config)
}

#[cfg(feature = "rpi")]
fn open_rpi(config: &DaemonConfig) -> Result<ActuatorSet> {
    use anyhow::Context;
    use autokart_hal::rpi::{RpiActuators, RpiPins, RpiTiming};

    let pins = RpiPins::from(&config.pins);
    let timing = RpiTiming::from(&config.timing);
    let hw = RpiActuators::open(&pins, timing).context("Failed to open Raspberry Pi GPIO/SPI")?;
    Ok(ActuatorSet::new(hw.throttle, hw.steering, hw.brake, hw.drivetrain))
}

#[cfg(not(feature = "rpi"))]
fn open_rpi(_config: &DaemonConfig) -> Result<ActuatorSet> {
    anyhow::bail!(
        "autokartd was built without the `rpi` feature; \
        use --dry-run or rebuild with `--features rpi`"
    )
}

/// 打开数据源
pub fn open_transport(config: &DaemonConfig, use_stdin: bool) -> Result<Box<dyn LineTransport>> {
    if use_stdin {
        info!("Reading packets from standard input");
        let reader = std::io::BufReader::new(std::io::stdin());
        return Ok(Box::new(autokart_hal::ReaderTransport::new(reader)));
    }
    open_serial(config)
}

#[cfg(target_os = "linux")]
fn open_serial(config: &DaemonConfig) -> Result<Box<dyn LineTransport>> {
    use anyhow::Context;
    use autokart_hal::{SerialConfig, SerialTransport};

    let serial = SerialConfig::from(&config.serial);
    let transport = SerialTransport::open(&serial)
        .with_context(|| format!("Failed to open serial port {}", serial.device.display()))?;
    info!(
        "Listening on {} at {} baud",
        serial.device.display(),
        serial.baud
    );
    Ok(Box::new(transport))
}

#[cfg(not(target_os = "linux"))]
fn open_serial(_config: &DaemonConfig) -> Result<Box<dyn LineTransport>> {
    anyhow::bail!("Serial input is only supported on Linux; use --stdin")
}
