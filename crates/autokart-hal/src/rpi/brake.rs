//! 直线执行器刹车
//!
//! 两路输出分别驱动执行器伸出（刹车）和收回（松开），同一时刻最多一路通电。

use super::RpiTiming;
use crate::actuator::BrakeDriver;
use crate::error::DriverError;
use rppal::gpio::OutputPin;
use std::time::Duration;
use tracing::debug;

pub struct RpiBrake {
    extend: OutputPin,
    retract: OutputPin,
    timing: RpiTiming,
}

impl RpiBrake {
    pub(crate) fn new(extend: OutputPin, retract: OutputPin, timing: RpiTiming) -> Self {
        Self {
            extend,
            retract,
            timing,
        }
    }

    /// 两路输出立即断电
    pub fn de_energize(&mut self) {
        self.extend.set_low();
        self.retract.set_low();
    }

    fn stroke(active: &mut OutputPin, idle: &mut OutputPin, duration: Duration) {
        idle.set_low();
        active.set_high();
        spin_sleep::sleep(duration);
        active.set_low();
    }
}

impl BrakeDriver for RpiBrake {
    fn apply(&mut self) -> Result<(), DriverError> {
        debug!("[Brake] Extending actuator");
        Self::stroke(
            &mut self.extend,
            &mut self.retract,
            self.timing.brake_apply_stroke,
        );
        Ok(())
    }

    fn release(&mut self) -> Result<(), DriverError> {
        debug!("[Brake] Retracting actuator");
        Self::stroke(
            &mut self.retract,
            &mut self.extend,
            self.timing.brake_release_stroke,
        );
        Ok(())
    }
}

impl Drop for RpiBrake {
    fn drop(&mut self) {
        self.de_energize();
    }
}
