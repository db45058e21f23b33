//! 安全监督器
//!
//! 两状态状态机（`Run` / `Estop`），以固定短周期轮询指令存储：
//!
//! - 每个节拍计算是否应停止（`estop_a || estop_b`，可选的指令过期判定）
//! - 停止时先置位停止标志，再按固定顺序驱动执行器进入安全状态：
//!   动力使能拉低、油门禁用、转向禁用、刹车施加。在 `Estop` 期间**每个节拍**都重复发出
//! - 运行时每个节拍拉高动力使能；拉高失败视为驱动故障，当拍即进入急停
//! - 状态切换时发出一次边沿事件（日志 + 有界通道）
//!
//! 任何驱动错误都只记录，不会让监督器退出。

use crate::actuators::ActuatorSet;
use crate::error::KartError;
use crate::metrics::KartMetrics;
use crate::schedule::PeriodicTask;
use crate::stop::StopSignal;
use crate::store::{CommandState, CommandStore};
use crossbeam_channel::{Sender, TrySendError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, trace, warn};

/// 监督器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SupervisorState {
    #[default]
    Run,
    Estop,
}

/// 急停原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopCause {
    /// 急停 A 触发
    EstopA,
    /// 急停 B 触发
    EstopB,
    /// 两路急停同时触发
    Both,
    /// 指令超过过期时限未刷新
    StaleCommand,
    /// 动力使能线驱动失败
    DriverFault,
}

impl StopCause {
    /// 根据指令判定急停原因
    fn from_command(state: &CommandState) -> Option<Self> {
        match (state.mapped.estop_a(), state.mapped.estop_b()) {
            (true, true) => Some(StopCause::Both),
            (true, false) => Some(StopCause::EstopA),
            (false, true) => Some(StopCause::EstopB),
            (false, false) => None,
        }
    }
}

impl std::fmt::Display for StopCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StopCause::EstopA => "e-stop A",
            StopCause::EstopB => "e-stop B",
            StopCause::Both => "e-stop A+B",
            StopCause::StaleCommand => "stale command",
            StopCause::DriverFault => "driver fault",
        };
        f.write_str(s)
    }
}

/// 监督器边沿事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorEvent {
    /// `Run` -> `Estop`
    EstopEntered {
        cause: StopCause,
        at: Duration,
        sequence: u64,
    },
    /// `Estop` -> `Run`
    EstopCleared { at: Duration, sequence: u64 },
}

/// 安全监督器
pub struct Supervisor {
    store: Arc<CommandStore>,
    stop: Arc<StopSignal>,
    actuators: ActuatorSet,
    metrics: Arc<KartMetrics>,
    events: Sender<SupervisorEvent>,
    state: SupervisorState,
    period: Duration,
    stale_timeout: Option<Duration>,
    lock_timeout: Duration,
}

impl Supervisor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<CommandStore>,
        stop: Arc<StopSignal>,
        actuators: ActuatorSet,
        metrics: Arc<KartMetrics>,
        events: Sender<SupervisorEvent>,
        period: Duration,
        stale_timeout: Option<Duration>,
        lock_timeout: Duration,
    ) -> Self {
        Self {
            store,
            stop,
            actuators,
            metrics,
            events,
            state: SupervisorState::Run,
            period,
            stale_timeout,
            lock_timeout,
        }
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    /// 执行一个监督节拍，返回节拍结束后的状态
    pub fn step(&mut self, now: Duration) -> SupervisorState {
        KartMetrics::inc(&self.metrics.supervisor_ticks);

        let snapshot = self.store.snapshot();
        match self.stop_cause(&snapshot, now) {
            Some(cause) => self.hold_estop(cause, now, snapshot.sequence),
            None => self.hold_run(now, snapshot.sequence),
        }
        self.state
    }

    fn stop_cause(&self, snapshot: &CommandState, now: Duration) -> Option<StopCause> {
        if let Some(cause) = StopCause::from_command(snapshot) {
            return Some(cause);
        }

        // 启动默认指令没有发布时刻，永远不会过期
        if let Some(timeout) = self.stale_timeout
            && let Some(age) = snapshot.age(now)
            && age > timeout
        {
            return Some(StopCause::StaleCommand);
        }

        None
    }

    fn hold_estop(&mut self, cause: StopCause, now: Duration, sequence: u64) {
        // 先置位停止标志：此后拿到执行器的工作线程都能看到停止
        self.stop.raise();

        if self.state == SupervisorState::Run {
            self.state = SupervisorState::Estop;
            KartMetrics::inc(&self.metrics.estop_entries);
            warn!(">>> E-STOP TRIGGERED ({}) <<<", cause);
            self.emit(SupervisorEvent::EstopEntered {
                cause,
                at: now,
                sequence,
            });
        }

        for err in self.actuators.force_safe_state(self.lock_timeout) {
            self.report(err);
        }
    }

    fn hold_run(&mut self, now: Duration, sequence: u64) {
        let result = self
            .actuators
            .drivetrain
            .call_within(self.lock_timeout, |d| d.set_enabled(true));

        match result {
            Ok(()) => {
                if self.state == SupervisorState::Estop {
                    self.state = SupervisorState::Run;
                    self.stop.clear();
                    KartMetrics::inc(&self.metrics.estop_clears);
                    info!("E-stop cleared, drivetrain re-enabled");
                    self.emit(SupervisorEvent::EstopCleared { at: now, sequence });
                }
            },
            Err(err) => {
                self.report(err);
                self.hold_estop(StopCause::DriverFault, now, sequence);
            },
        }
    }

    fn report(&self, err: KartError) {
        match err {
            KartError::ActuatorBusy { actuator } => {
                KartMetrics::inc(&self.metrics.actuator_busy);
                trace!("Supervisor: {} busy, retrying next tick", actuator);
            },
            err => {
                KartMetrics::inc(&self.metrics.driver_errors);
                error!("Supervisor: {}", err);
            },
        }
    }

    fn emit(&self, event: SupervisorEvent) {
        match self.events.try_send(event) {
            Ok(()) => {},
            Err(TrySendError::Full(event)) => {
                trace!("Supervisor event channel full, dropping {:?}", event);
            },
            Err(TrySendError::Disconnected(_)) => {},
        }
    }
}

impl PeriodicTask for Supervisor {
    fn name(&self) -> &'static str {
        "supervisor"
    }

    fn period(&self) -> Duration {
        self.period
    }

    fn tick(&mut self, now: Duration) {
        self.step(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use autokart_hal::mock::{ActuatorCall, CallLog, FaultSwitch, MockActuators};
    use autokart_protocol::decode;
    use crossbeam_channel::Receiver;

    struct Fixture {
        clock: Arc<ManualClock>,
        store: Arc<CommandStore>,
        stop: Arc<StopSignal>,
        metrics: Arc<KartMetrics>,
        log: CallLog,
        drivetrain_fault: FaultSwitch,
        events: Receiver<SupervisorEvent>,
        supervisor: Supervisor,
    }

    fn fixture(stale_timeout: Option<Duration>) -> Fixture {
        let clock = Arc::new(ManualClock::new());
        let store = Arc::new(CommandStore::new(clock.clone()));
        let stop = Arc::new(StopSignal::new());
        let metrics = Arc::new(KartMetrics::new());
        let mock = MockActuators::new();
        let log = mock.log.clone();
        let drivetrain_fault = mock.drivetrain.fault_switch();
        let (tx, rx) = crossbeam_channel::bounded(16);

        let supervisor = Supervisor::new(
            store.clone(),
            stop.clone(),
            ActuatorSet::from(mock),
            metrics.clone(),
            tx,
            Duration::from_millis(10),
            stale_timeout,
            Duration::from_millis(5),
        );

        Fixture {
            clock,
            store,
            stop,
            metrics,
            log,
            drivetrain_fault,
            events: rx,
            supervisor,
        }
    }

    fn publish(store: &CommandStore, line: &str) {
        let (raw, mapped) = decode(line).unwrap();
        store.publish(raw, mapped);
    }

    const RUN_LINE: &str = "1500,992,1809,1809,1809,992";
    const ESTOP_A_LINE: &str = "992,992,992,1808,1809,172";

    #[test]
    fn test_default_command_is_not_estop() {
        let mut f = fixture(None);
        assert_eq!(f.supervisor.step(f.clock.now()), SupervisorState::Run);
        assert!(!f.stop.is_active());
        assert_eq!(f.log.calls(), vec![ActuatorCall::Drivetrain(true)]);
        assert!(f.events.try_recv().is_err());
    }

    #[test]
    fn test_estop_forces_safe_state_regardless_of_mode() {
        let mut f = fixture(None);
        f.supervisor.step(f.clock.now());
        f.log.take();

        publish(&f.store, ESTOP_A_LINE);
        assert_eq!(f.supervisor.step(f.clock.now()), SupervisorState::Estop);
        assert!(f.stop.is_active());
        assert_eq!(
            f.log.take(),
            vec![
                ActuatorCall::Drivetrain(false),
                ActuatorCall::ThrottleDisable,
                ActuatorCall::SteeringDisable,
                ActuatorCall::BrakeApply,
            ]
        );

        match f.events.try_recv().unwrap() {
            SupervisorEvent::EstopEntered { cause, sequence, .. } => {
                assert_eq!(cause, StopCause::EstopA);
                assert_eq!(sequence, 1);
            },
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_safe_state_reissued_every_tick_but_event_once() {
        let mut f = fixture(None);
        publish(&f.store, "992,992,992,1809,1000,992");

        for _ in 0..3 {
            f.supervisor.step(f.clock.now());
            f.clock.advance(Duration::from_millis(10));
        }

        assert_eq!(f.log.count(|c| *c == ActuatorCall::BrakeApply), 3);
        assert_eq!(f.log.count(|c| *c == ActuatorCall::ThrottleDisable), 3);
        assert_eq!(f.log.count(|c| *c == ActuatorCall::Drivetrain(true)), 0);
        assert_eq!(f.events.try_iter().count(), 1);
        assert_eq!(f.metrics.snapshot().estop_entries, 1);
    }

    #[test]
    fn test_both_estops_cause() {
        let mut f = fixture(None);
        publish(&f.store, "992,992,992,172,172,992");
        f.supervisor.step(f.clock.now());
        assert!(matches!(
            f.events.try_recv().unwrap(),
            SupervisorEvent::EstopEntered {
                cause: StopCause::Both,
                ..
            }
        ));
    }

    #[test]
    fn test_recovery_raises_drivetrain_only() {
        let mut f = fixture(None);
        publish(&f.store, ESTOP_A_LINE);
        f.supervisor.step(f.clock.now());
        f.log.take();

        publish(&f.store, RUN_LINE);
        assert_eq!(f.supervisor.step(f.clock.now()), SupervisorState::Run);
        assert!(!f.stop.is_active());
        // 恢复时只拉高动力使能，不重新使能油门 / 转向
        assert_eq!(f.log.take(), vec![ActuatorCall::Drivetrain(true)]);

        let events: Vec<_> = f.events.try_iter().collect();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            events[1],
            SupervisorEvent::EstopCleared { sequence: 2, .. }
        ));
    }

    #[test]
    fn test_driver_fault_enters_estop_and_recovers() {
        let mut f = fixture(None);
        publish(&f.store, RUN_LINE);

        f.drivetrain_fault.set(true);
        assert_eq!(f.supervisor.step(f.clock.now()), SupervisorState::Estop);
        assert!(f.stop.is_active());
        // 动力使能失败，其余安全动作仍然执行
        assert_eq!(f.log.count(|c| *c == ActuatorCall::BrakeApply), 1);
        assert!(f.metrics.snapshot().driver_errors >= 1);
        assert!(matches!(
            f.events.try_recv().unwrap(),
            SupervisorEvent::EstopEntered {
                cause: StopCause::DriverFault,
                ..
            }
        ));

        f.drivetrain_fault.set(false);
        assert_eq!(f.supervisor.step(f.clock.now()), SupervisorState::Run);
        assert!(!f.stop.is_active());
    }

    #[test]
    fn test_stale_command_forces_estop() {
        let mut f = fixture(Some(Duration::from_millis(500)));

        // 尚未收到数据包：默认指令不会过期
        f.clock.advance(Duration::from_secs(5));
        assert_eq!(f.supervisor.step(f.clock.now()), SupervisorState::Run);

        publish(&f.store, RUN_LINE);
        f.clock.advance(Duration::from_millis(400));
        assert_eq!(f.supervisor.step(f.clock.now()), SupervisorState::Run);

        f.clock.advance(Duration::from_millis(200));
        assert_eq!(f.supervisor.step(f.clock.now()), SupervisorState::Estop);
        assert!(matches!(
            f.events.try_recv().unwrap(),
            SupervisorEvent::EstopEntered {
                cause: StopCause::StaleCommand,
                ..
            }
        ));

        // 新数据包刷新后恢复
        publish(&f.store, RUN_LINE);
        assert_eq!(f.supervisor.step(f.clock.now()), SupervisorState::Run);
    }

    #[test]
    fn test_stale_disabled_keeps_last_command() {
        let mut f = fixture(None);
        publish(&f.store, RUN_LINE);
        f.clock.advance(Duration::from_secs(3600));
        assert_eq!(f.supervisor.step(f.clock.now()), SupervisorState::Run);
    }

    #[test]
    fn test_busy_actuator_is_retried() {
        let mut f = fixture(None);
        publish(&f.store, ESTOP_A_LINE);

        let brake = f.supervisor.actuators.brake.clone();
        let lock_holder = std::thread::spawn(move || {
            brake
                .call(|_d| {
                    std::thread::sleep(Duration::from_millis(100));
                    Ok(())
                })
                .unwrap();
        });
        std::thread::sleep(Duration::from_millis(20));

        // 刹车被占用：本拍记为 busy，其余执行器照常处理
        f.supervisor.step(f.clock.now());
        assert_eq!(f.log.count(|c| *c == ActuatorCall::BrakeApply), 0);
        assert_eq!(f.log.count(|c| *c == ActuatorCall::ThrottleDisable), 1);
        assert_eq!(f.metrics.snapshot().actuator_busy, 1);

        lock_holder.join().unwrap();
        f.supervisor.step(f.clock.now());
        assert_eq!(f.log.count(|c| *c == ActuatorCall::BrakeApply), 1);
    }

    #[test]
    fn test_full_event_channel_does_not_block() {
        let clock = Arc::new(ManualClock::new());
        let store = Arc::new(CommandStore::new(clock.clone()));
        let (tx, _rx) = crossbeam_channel::bounded(1);
        let mut supervisor = Supervisor::new(
            store.clone(),
            Arc::new(StopSignal::new()),
            ActuatorSet::from(MockActuators::new()),
            Arc::new(KartMetrics::new()),
            tx,
            Duration::from_millis(10),
            None,
            Duration::from_millis(5),
        );

        for line in [ESTOP_A_LINE, RUN_LINE, ESTOP_A_LINE, RUN_LINE] {
            publish(&store, line);
            supervisor.step(clock.now());
        }
        assert_eq!(supervisor.state(), SupervisorState::Run);
    }
}
