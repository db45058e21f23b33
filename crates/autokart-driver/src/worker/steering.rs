//! 转向工作线程
//!
//! 点动是有限时长的脉冲而不是保持状态，所以非居中方向每拍都重新发出；
//! 居中只在方向回到居中（或停止恢复）后发出一次。

use super::{Dispatch, Observation, WorkerContext};
use crate::actuators::SteeringHandle;
use crate::autonomous::AutonomousSource;
use crate::metrics::KartMetrics;
use crate::schedule::PeriodicTask;
use autokart_protocol::{ControlMode, SteeringDirection};
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

pub struct SteeringWorker {
    ctx: WorkerContext,
    steering: SteeringHandle,
    autonomous: Arc<dyn AutonomousSource>,
    period: Duration,
    needs_enable: bool,
    /// 上一次成功发出的是居中
    centred: bool,
    seen_edges: u64,
}

impl SteeringWorker {
    pub fn new(
        ctx: WorkerContext,
        steering: SteeringHandle,
        autonomous: Arc<dyn AutonomousSource>,
        period: Duration,
    ) -> Self {
        let seen_edges = ctx.stop_edges();
        Self {
            ctx,
            steering,
            autonomous,
            period,
            needs_enable: true,
            centred: false,
            seen_edges,
        }
    }

    pub fn step(&mut self) {
        let state = match self.ctx.observe(&mut self.seen_edges) {
            Observation::Stopped => {
                self.needs_enable = true;
                self.centred = false;
                return;
            },
            Observation::Running { state, interrupted } => {
                if interrupted {
                    self.needs_enable = true;
                    self.centred = false;
                }
                state
            },
        };

        let direction = match state.mapped.mode() {
            ControlMode::Remote => state.mapped.steering(),
            ControlMode::Autonomous => self
                .autonomous
                .steering()
                .unwrap_or(SteeringDirection::Centre),
        };

        if direction.is_centre() && self.centred && !self.needs_enable {
            return;
        }

        let ctx = &self.ctx;
        let seen_edges = self.seen_edges;
        let needs_enable = self.needs_enable;
        let result = self.steering.call(|driver| {
            if ctx.stopped_since(seen_edges) {
                return Ok(Dispatch::Preempted);
            }
            if needs_enable {
                driver.enable()?;
            }
            driver.set_direction(direction)?;
            Ok(Dispatch::Issued)
        });

        match result {
            Ok(Dispatch::Issued) => {
                self.needs_enable = false;
                self.centred = direction.is_centre();
                KartMetrics::inc(&self.ctx.metrics.steering_commands);
                trace!("Steering {:?}", direction);
            },
            Ok(Dispatch::Preempted) => {
                self.needs_enable = true;
                self.centred = false;
            },
            Err(err) => self.ctx.report("Steering", err),
        }
    }
}

impl PeriodicTask for SteeringWorker {
    fn name(&self) -> &'static str {
        "steering"
    }

    fn period(&self) -> Duration {
        self.period
    }

    fn tick(&mut self, _now: Duration) {
        self.step();
    }
}
