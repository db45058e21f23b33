//! 点动伺服转向
//!
//! 方向映射：+1 点动负向引脚（左转），-1 点动正向引脚（右转），0 不点动。
//! 每条指令之后都跟随一个故障复位脉冲。

use super::{RpiTiming, pulse};
use crate::actuator::SteeringDriver;
use crate::error::DriverError;
use autokart_protocol::SteeringDirection;
use rppal::gpio::OutputPin;
use tracing::{info, trace};

pub struct RpiSteering {
    enable: OutputPin,
    fault_reset: OutputPin,
    jog_neg: OutputPin,
    jog_pos: OutputPin,
    timing: RpiTiming,
}

impl RpiSteering {
    /// 创建转向驱动并立即锁存使能
    pub(crate) fn new(
        enable: OutputPin,
        fault_reset: OutputPin,
        jog_neg: OutputPin,
        jog_pos: OutputPin,
        timing: RpiTiming,
    ) -> Result<Self, DriverError> {
        let mut steering = Self {
            enable,
            fault_reset,
            jog_neg,
            jog_pos,
            timing,
        };
        steering.enable()?;
        Ok(steering)
    }

    fn jog_pins_low(&mut self) {
        self.jog_neg.set_low();
        self.jog_pos.set_low();
    }
}

impl SteeringDriver for RpiSteering {
    fn set_direction(&mut self, direction: SteeringDirection) -> Result<(), DriverError> {
        self.jog_pins_low();

        match direction {
            SteeringDirection::Left => {
                trace!("[Steering] Jog LEFT");
                pulse(&mut self.jog_neg, self.timing.jog_pulse);
            },
            SteeringDirection::Right => {
                trace!("[Steering] Jog RIGHT");
                pulse(&mut self.jog_pos, self.timing.jog_pulse);
            },
            SteeringDirection::Centre => trace!("[Steering] Centre / stop"),
        }

        pulse(&mut self.fault_reset, self.timing.fault_reset_pulse);
        Ok(())
    }

    fn enable(&mut self) -> Result<(), DriverError> {
        self.enable.set_high();
        info!("[Steering] Enabled");
        Ok(())
    }

    fn disable(&mut self) -> Result<(), DriverError> {
        self.jog_pins_low();
        self.enable.set_low();
        Ok(())
    }
}

impl Drop for RpiSteering {
    fn drop(&mut self) {
        self.jog_pins_low();
        self.fault_reset.set_low();
        self.enable.set_low();
    }
}
