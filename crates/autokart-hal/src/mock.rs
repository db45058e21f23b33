//! 模拟执行器与传输
//!
//! 所有模拟驱动共享一个 [`CallLog`]，按调用顺序记录每一次执行器调用，
//! 用于测试断言和无硬件空跑（`--dry-run`）。
//!
//! 每个模拟驱动都可以通过 [`FaultSwitch`] 注入故障，
//! 也可以设置调用耗时来模拟点动脉冲 / 刹车行程的阻塞。

use crate::actuator::{BrakeDriver, DrivetrainEnable, SteeringDriver, ThrottleDriver};
use crate::error::{DriverError, TransportError};
use crate::transport::LineTransport;
use autokart_protocol::SteeringDirection;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::debug;

/// 一次执行器调用
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorCall {
    ThrottleSet(u8),
    ThrottleEnable,
    ThrottleDisable,
    SteeringSet(SteeringDirection),
    SteeringEnable,
    SteeringDisable,
    BrakeApply,
    BrakeRelease,
    Drivetrain(bool),
}

impl ActuatorCall {
    /// 是否为油门调用
    pub fn is_throttle(&self) -> bool {
        matches!(
            self,
            ActuatorCall::ThrottleSet(_) | ActuatorCall::ThrottleEnable | ActuatorCall::ThrottleDisable
        )
    }

    /// 是否为转向调用
    pub fn is_steering(&self) -> bool {
        matches!(
            self,
            ActuatorCall::SteeringSet(_)
                | ActuatorCall::SteeringEnable
                | ActuatorCall::SteeringDisable
        )
    }

    /// 是否为刹车调用
    pub fn is_brake(&self) -> bool {
        matches!(self, ActuatorCall::BrakeApply | ActuatorCall::BrakeRelease)
    }

    /// 是否为“有动作”的指令：非零油门 / 非居中点动 / 使能
    ///
    /// 急停期间不允许出现此类调用。
    pub fn is_motion(&self) -> bool {
        matches!(
            self,
            ActuatorCall::ThrottleSet(v) if *v != 0
        ) || matches!(
            self,
            ActuatorCall::SteeringSet(d) if !d.is_centre()
        ) || matches!(
            self,
            ActuatorCall::ThrottleEnable | ActuatorCall::SteeringEnable | ActuatorCall::Drivetrain(true)
        )
    }
}

/// 共享调用记录
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<ActuatorCall>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, call: ActuatorCall) {
        self.calls.lock().push(call);
    }

    /// 全部调用（按时间顺序）
    pub fn calls(&self) -> Vec<ActuatorCall> {
        self.calls.lock().clone()
    }

    /// 清空并返回全部调用
    pub fn take(&self) -> Vec<ActuatorCall> {
        std::mem::take(&mut *self.calls.lock())
    }

    /// 满足条件的调用次数
    pub fn count(&self, pred: impl Fn(&ActuatorCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| pred(c)).count()
    }

    /// 最后一次满足条件的调用
    pub fn last_matching(&self, pred: impl Fn(&ActuatorCall) -> bool) -> Option<ActuatorCall> {
        self.calls.lock().iter().rev().find(|c| pred(c)).copied()
    }

    pub fn len(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.lock().is_empty()
    }
}

/// 故障注入开关
///
/// 打开时，对应的模拟驱动所有调用都返回 `DriverError::Fault`（调用不记录）。
#[derive(Debug, Clone, Default)]
pub struct FaultSwitch(Arc<AtomicBool>);

impl FaultSwitch {
    pub fn set(&self, failing: bool) {
        self.0.store(failing, Ordering::Release);
    }

    pub fn is_failing(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn check(&self, what: &str) -> Result<(), DriverError> {
        if self.is_failing() {
            Err(DriverError::Fault(format!("injected {} failure", what)))
        } else {
            Ok(())
        }
    }
}

/// 模拟油门
pub struct MockThrottle {
    log: CallLog,
    fault: FaultSwitch,
}

impl MockThrottle {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            fault: FaultSwitch::default(),
        }
    }

    pub fn fault_switch(&self) -> FaultSwitch {
        self.fault.clone()
    }
}

impl ThrottleDriver for MockThrottle {
    fn set(&mut self, value: u8) -> Result<(), DriverError> {
        self.fault.check("throttle set")?;
        debug!("[Throttle] Wiper set to {}", value);
        self.log.record(ActuatorCall::ThrottleSet(value));
        Ok(())
    }

    fn enable(&mut self) -> Result<(), DriverError> {
        self.fault.check("throttle enable")?;
        debug!("[Throttle] Enabled");
        self.log.record(ActuatorCall::ThrottleEnable);
        Ok(())
    }

    fn disable(&mut self) -> Result<(), DriverError> {
        self.fault.check("throttle disable")?;
        debug!("[Throttle] Disabling throttle");
        self.log.record(ActuatorCall::ThrottleDisable);
        Ok(())
    }
}

/// 模拟转向
pub struct MockSteering {
    log: CallLog,
    fault: FaultSwitch,
    pulse: Duration,
}

impl MockSteering {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            fault: FaultSwitch::default(),
            pulse: Duration::ZERO,
        }
    }

    /// 设置点动脉冲耗时（非居中指令阻塞此时长）
    pub fn with_pulse(mut self, pulse: Duration) -> Self {
        self.pulse = pulse;
        self
    }

    pub fn fault_switch(&self) -> FaultSwitch {
        self.fault.clone()
    }
}

impl SteeringDriver for MockSteering {
    fn set_direction(&mut self, direction: SteeringDirection) -> Result<(), DriverError> {
        self.fault.check("steering set_direction")?;
        match direction {
            SteeringDirection::Left => debug!("[Steering] Jog LEFT"),
            SteeringDirection::Right => debug!("[Steering] Jog RIGHT"),
            SteeringDirection::Centre => debug!("[Steering] Centre / stop"),
        }
        self.log.record(ActuatorCall::SteeringSet(direction));
        if !direction.is_centre() && !self.pulse.is_zero() {
            std::thread::sleep(self.pulse);
        }
        Ok(())
    }

    fn enable(&mut self) -> Result<(), DriverError> {
        self.fault.check("steering enable")?;
        debug!("[Steering] Enable");
        self.log.record(ActuatorCall::SteeringEnable);
        Ok(())
    }

    fn disable(&mut self) -> Result<(), DriverError> {
        self.fault.check("steering disable")?;
        debug!("[Steering] Disable");
        self.log.record(ActuatorCall::SteeringDisable);
        Ok(())
    }
}

/// 模拟刹车
pub struct MockBrake {
    log: CallLog,
    fault: FaultSwitch,
    stroke: Duration,
}

impl MockBrake {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            fault: FaultSwitch::default(),
            stroke: Duration::ZERO,
        }
    }

    /// 设置行程耗时
    pub fn with_stroke(mut self, stroke: Duration) -> Self {
        self.stroke = stroke;
        self
    }

    pub fn fault_switch(&self) -> FaultSwitch {
        self.fault.clone()
    }

    fn stroke(&self) {
        if !self.stroke.is_zero() {
            std::thread::sleep(self.stroke);
        }
    }
}

impl BrakeDriver for MockBrake {
    fn apply(&mut self) -> Result<(), DriverError> {
        self.fault.check("brake apply")?;
        debug!("[Brake] Extending actuator");
        self.log.record(ActuatorCall::BrakeApply);
        self.stroke();
        Ok(())
    }

    fn release(&mut self) -> Result<(), DriverError> {
        self.fault.check("brake release")?;
        debug!("[Brake] Retracting actuator");
        self.log.record(ActuatorCall::BrakeRelease);
        self.stroke();
        Ok(())
    }
}

/// 模拟动力使能线
pub struct MockDrivetrain {
    log: CallLog,
    fault: FaultSwitch,
    level: Arc<AtomicBool>,
}

impl MockDrivetrain {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            fault: FaultSwitch::default(),
            level: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn fault_switch(&self) -> FaultSwitch {
        self.fault.clone()
    }

    /// 使能线电平观察句柄
    pub fn level(&self) -> Arc<AtomicBool> {
        self.level.clone()
    }
}

impl DrivetrainEnable for MockDrivetrain {
    fn set_enabled(&mut self, enabled: bool) -> Result<(), DriverError> {
        self.fault.check("drivetrain enable")?;
        // 每个监督周期都会调用，只在电平变化时输出日志
        if self.level.swap(enabled, Ordering::AcqRel) != enabled {
            debug!("[Drivetrain] Enable line {}", if enabled { "HIGH" } else { "LOW" });
        }
        self.log.record(ActuatorCall::Drivetrain(enabled));
        Ok(())
    }
}

/// 一组共享同一调用记录的模拟执行器
pub struct MockActuators {
    pub log: CallLog,
    pub throttle: MockThrottle,
    pub steering: MockSteering,
    pub brake: MockBrake,
    pub drivetrain: MockDrivetrain,
}

impl MockActuators {
    pub fn new() -> Self {
        let log = CallLog::new();
        Self {
            throttle: MockThrottle::new(log.clone()),
            steering: MockSteering::new(log.clone()),
            brake: MockBrake::new(log.clone()),
            drivetrain: MockDrivetrain::new(log.clone()),
            log,
        }
    }
}

impl Default for MockActuators {
    fn default() -> Self {
        Self::new()
    }
}

/// 基于通道的传输（测试中由发送端逐行推送数据）
///
/// 发送端全部 drop 后返回 [`TransportError::Disconnected`]。
pub struct ChannelTransport {
    rx: Receiver<String>,
    read_timeout: Duration,
}

impl ChannelTransport {
    /// 创建发送端 + 传输
    pub fn pair(read_timeout: Duration) -> (Sender<String>, Self) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (tx, Self { rx, read_timeout })
    }
}

impl LineTransport for ChannelTransport {
    fn read_line(&mut self) -> Result<String, TransportError> {
        match self.rx.recv_timeout(self.read_timeout) {
            Ok(line) => Ok(line),
            Err(RecvTimeoutError::Timeout) => Err(TransportError::Timeout),
            Err(RecvTimeoutError::Disconnected) => Err(TransportError::Disconnected),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_call_log_order() {
        let mut act = MockActuators::new();
        act.drivetrain.set_enabled(false).unwrap();
        act.throttle.disable().unwrap();
        act.steering.disable().unwrap();
        act.brake.apply().unwrap();

        assert_eq!(
            act.log.calls(),
            vec![
                ActuatorCall::Drivetrain(false),
                ActuatorCall::ThrottleDisable,
                ActuatorCall::SteeringDisable,
                ActuatorCall::BrakeApply,
            ]
        );
        assert_eq!(act.log.count(ActuatorCall::is_brake), 1);
    }

    #[test]
    fn test_fault_injection() {
        let log = CallLog::new();
        let mut throttle = MockThrottle::new(log.clone());
        let fault = throttle.fault_switch();

        fault.set(true);
        assert!(matches!(throttle.set(100), Err(DriverError::Fault(_))));
        assert!(log.is_empty());

        fault.set(false);
        throttle.set(100).unwrap();
        assert_eq!(log.calls(), vec![ActuatorCall::ThrottleSet(100)]);
    }

    #[test]
    fn test_motion_classification() {
        assert!(ActuatorCall::ThrottleSet(1).is_motion());
        assert!(!ActuatorCall::ThrottleSet(0).is_motion());
        assert!(ActuatorCall::SteeringSet(SteeringDirection::Left).is_motion());
        assert!(!ActuatorCall::SteeringSet(SteeringDirection::Centre).is_motion());
        assert!(ActuatorCall::Drivetrain(true).is_motion());
        assert!(!ActuatorCall::Drivetrain(false).is_motion());
        assert!(!ActuatorCall::BrakeApply.is_motion());
    }

    #[test]
    fn test_drivetrain_level_tracking() {
        let log = CallLog::new();
        let mut drivetrain = MockDrivetrain::new(log);
        let level = drivetrain.level();
        assert!(!level.load(Ordering::Acquire));
        drivetrain.set_enabled(true).unwrap();
        assert!(level.load(Ordering::Acquire));
    }

    #[test]
    fn test_channel_transport() {
        let (tx, mut transport) = ChannelTransport::pair(Duration::from_millis(10));
        tx.send("1,2,3,4,5,6".to_string()).unwrap();
        assert_eq!(transport.read_line().unwrap(), "1,2,3,4,5,6");
        assert!(transport.read_line().unwrap_err().is_timeout());
        drop(tx);
        assert!(matches!(
            transport.read_line(),
            Err(TransportError::Disconnected)
        ));
    }
}
