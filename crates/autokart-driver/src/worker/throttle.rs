//! 油门工作线程
//!
//! 运行时每拍都调用 `set()`（设备不保证保持上次的输出值）。
//! 自主模式下从 [`AutonomousSource`] 取值，无可用值时输出 0。
//! 停止后恢复的第一拍先 `enable()` 再 `set()`。

use super::{Dispatch, Observation, WorkerContext};
use crate::actuators::ThrottleHandle;
use crate::autonomous::AutonomousSource;
use crate::metrics::KartMetrics;
use crate::schedule::PeriodicTask;
use autokart_protocol::ControlMode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

pub struct ThrottleWorker {
    ctx: WorkerContext,
    throttle: ThrottleHandle,
    autonomous: Arc<dyn AutonomousSource>,
    period: Duration,
    needs_enable: bool,
    seen_edges: u64,
}

impl ThrottleWorker {
    pub fn new(
        ctx: WorkerContext,
        throttle: ThrottleHandle,
        autonomous: Arc<dyn AutonomousSource>,
        period: Duration,
    ) -> Self {
        let seen_edges = ctx.stop_edges();
        Self {
            ctx,
            throttle,
            autonomous,
            period,
            needs_enable: true,
            seen_edges,
        }
    }

    pub fn step(&mut self) {
        let state = match self.ctx.observe(&mut self.seen_edges) {
            Observation::Stopped => {
                if !self.needs_enable {
                    debug!("Throttle worker holding while stopped");
                }
                self.needs_enable = true;
                return;
            },
            Observation::Running { state, interrupted } => {
                if interrupted && !self.needs_enable {
                    debug!("Throttle worker re-enabling after a missed stop");
                }
                self.needs_enable |= interrupted;
                state
            },
        };

        let value = match state.mapped.mode() {
            ControlMode::Remote => state.mapped.throttle(),
            ControlMode::Autonomous => self.autonomous.throttle().unwrap_or(0),
        };

        let ctx = &self.ctx;
        let seen_edges = self.seen_edges;
        let needs_enable = self.needs_enable;
        let result = self.throttle.call(|driver| {
            if ctx.stopped_since(seen_edges) {
                return Ok(Dispatch::Preempted);
            }
            if needs_enable {
                driver.enable()?;
            }
            driver.set(value)?;
            Ok(Dispatch::Issued)
        });

        match result {
            Ok(Dispatch::Issued) => {
                self.needs_enable = false;
                KartMetrics::inc(&self.ctx.metrics.throttle_commands);
                trace!("Throttle set to {}", value);
            },
            Ok(Dispatch::Preempted) => self.needs_enable = true,
            Err(err) => self.ctx.report("Throttle", err),
        }
    }
}

impl PeriodicTask for ThrottleWorker {
    fn name(&self) -> &'static str {
        "throttle"
    }

    fn period(&self) -> Duration {
        self.period
    }

    fn tick(&mut self, _now: Duration) {
        self.step();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuators::ActuatorSet;
    use crate::autonomous::NoAutonomousSource;
    use crate::clock::ManualClock;
    use crate::stop::StopSignal;
    use crate::store::CommandStore;
    use autokart_hal::mock::{ActuatorCall, CallLog, MockActuators};
    use autokart_protocol::{SteeringDirection, decode};

    struct FixedSource(u8);

    impl AutonomousSource for FixedSource {
        fn throttle(&self) -> Option<u8> {
            Some(self.0)
        }

        fn steering(&self) -> Option<SteeringDirection> {
            None
        }
    }

    fn worker(source: Arc<dyn AutonomousSource>) -> (WorkerContext, CallLog, ThrottleWorker) {
        let clock = Arc::new(ManualClock::new());
        let ctx = WorkerContext::new(
            Arc::new(CommandStore::new(clock)),
            Arc::new(StopSignal::new()),
            Arc::new(KartMetrics::new()),
        );
        let mock = MockActuators::new();
        let log = mock.log.clone();
        let set = ActuatorSet::from(mock);
        let worker = ThrottleWorker::new(ctx.clone(), set.throttle, source, Duration::from_millis(20));
        (ctx, log, worker)
    }

    fn publish(ctx: &WorkerContext, line: &str) {
        let (raw, mapped) = decode(line).unwrap();
        ctx.store.publish(raw, mapped);
    }

    #[test]
    fn test_remote_throttle_is_continuous() {
        let (ctx, log, mut worker) = worker(Arc::new(NoAutonomousSource));
        publish(&ctx, "1401,992,1809,1809,1809,992");

        worker.step();
        worker.step();
        worker.step();

        assert_eq!(
            log.calls(),
            vec![
                ActuatorCall::ThrottleEnable,
                ActuatorCall::ThrottleSet(128),
                ActuatorCall::ThrottleSet(128),
                ActuatorCall::ThrottleSet(128),
            ]
        );
        assert_eq!(ctx.metrics.snapshot().throttle_commands, 3);
    }

    #[test]
    fn test_autonomous_without_source_outputs_zero() {
        let (ctx, log, mut worker) = worker(Arc::new(NoAutonomousSource));
        publish(&ctx, "1809,992,1809,1809,1809,172");

        worker.step();
        assert_eq!(log.last_matching(ActuatorCall::is_throttle), Some(ActuatorCall::ThrottleSet(0)));
    }

    #[test]
    fn test_autonomous_source_is_used() {
        let (ctx, log, mut worker) = worker(Arc::new(FixedSource(77)));
        publish(&ctx, "1809,992,1809,1809,1809,172");

        worker.step();
        assert_eq!(log.last_matching(ActuatorCall::is_throttle), Some(ActuatorCall::ThrottleSet(77)));
    }

    #[test]
    fn test_no_commands_while_stopped() {
        let (ctx, log, mut worker) = worker(Arc::new(NoAutonomousSource));
        publish(&ctx, "1809,992,1809,1809,1809,992");
        worker.step();
        log.take();

        // 指令本身请求急停（监督器尚未响应）也不输出
        publish(&ctx, "1809,992,1809,1000,1809,992");
        worker.step();
        assert!(log.is_empty());

        // 停止标志置位
        publish(&ctx, "1809,992,1809,1809,1809,992");
        ctx.stop.raise();
        worker.step();
        assert!(log.is_empty());

        // 恢复后重新使能
        ctx.stop.clear();
        worker.step();
        assert_eq!(
            log.take(),
            vec![ActuatorCall::ThrottleEnable, ActuatorCall::ThrottleSet(255)]
        );
    }

    #[test]
    fn test_stop_between_ticks_reenables() {
        let (ctx, log, mut worker) = worker(Arc::new(NoAutonomousSource));
        publish(&ctx, "1809,992,1809,1809,1809,992");
        worker.step();
        log.take();

        // 急停在两拍之间开始又结束，工作线程从未看到标志置位
        ctx.stop.raise();
        ctx.stop.clear();

        worker.step();
        worker.step();
        assert_eq!(
            log.take(),
            vec![
                ActuatorCall::ThrottleEnable,
                ActuatorCall::ThrottleSet(255),
                ActuatorCall::ThrottleSet(255),
            ]
        );
    }

    #[test]
    fn test_driver_error_is_retried() {
        let clock = Arc::new(ManualClock::new());
        let ctx = WorkerContext::new(
            Arc::new(CommandStore::new(clock)),
            Arc::new(StopSignal::new()),
            Arc::new(KartMetrics::new()),
        );
        let mock = MockActuators::new();
        let log = mock.log.clone();
        let fault = mock.throttle.fault_switch();
        let set = ActuatorSet::from(mock);
        let mut worker = ThrottleWorker::new(
            ctx.clone(),
            set.throttle,
            Arc::new(NoAutonomousSource),
            Duration::from_millis(20),
        );

        fault.set(true);
        worker.step();
        assert!(log.is_empty());
        assert_eq!(ctx.metrics.snapshot().driver_errors, 1);

        fault.set(false);
        worker.step();
        assert_eq!(
            log.take(),
            vec![ActuatorCall::ThrottleEnable, ActuatorCall::ThrottleSet(0)]
        );
    }
}
