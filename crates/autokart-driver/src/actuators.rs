//! 共享执行器句柄
//!
//! 每个执行器由对应的工作线程和安全监督器共同持有，但任意时刻只有一方在调用。
//! 工作线程阻塞等待，监督器只做有界等待（超时记为 `ActuatorBusy`，下个节拍重试）。
//!
//! 驱动调用中的 panic 被捕获并转换为 [`KartError::ActuatorPanicked`]，
//! 控制线程不会因为某个驱动崩溃而退出。

use crate::error::KartError;
use autokart_hal::{BrakeDriver, DriverError, DrivetrainEnable, SteeringDriver, ThrottleDriver};
use parking_lot::Mutex;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// 共享执行器句柄
pub struct SharedActuator<T> {
    name: &'static str,
    inner: Arc<Mutex<T>>,
}

impl<T> Clone for SharedActuator<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            inner: self.inner.clone(),
        }
    }
}

impl<T> SharedActuator<T> {
    pub fn new(name: &'static str, driver: T) -> Self {
        Self {
            name,
            inner: Arc::new(Mutex::new(driver)),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 独占执行器完成一次调用（阻塞等待）
    pub fn call<R>(
        &self,
        f: impl FnOnce(&mut T) -> Result<R, DriverError>,
    ) -> Result<R, KartError> {
        let mut guard = self.inner.lock();
        guarded(self.name, || f(&mut *guard))
    }

    /// 独占执行器完成一次调用，最多等待 `timeout`
    ///
    /// # 错误
    ///
    /// - `KartError::ActuatorBusy`: 等待超时
    /// - `KartError::Driver`: 驱动返回错误
    /// - `KartError::ActuatorPanicked`: 驱动 panic
    pub fn call_within<R>(
        &self,
        timeout: Duration,
        f: impl FnOnce(&mut T) -> Result<R, DriverError>,
    ) -> Result<R, KartError> {
        let mut guard = self
            .inner
            .try_lock_for(timeout)
            .ok_or(KartError::ActuatorBusy {
                actuator: self.name,
            })?;
        guarded(self.name, || f(&mut *guard))
    }
}

fn guarded<R>(
    actuator: &'static str,
    f: impl FnOnce() -> Result<R, DriverError>,
) -> Result<R, KartError> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result.map_err(|source| KartError::Driver { actuator, source }),
        Err(_) => {
            warn!("Actuator {} driver panicked", actuator);
            Err(KartError::ActuatorPanicked { actuator })
        },
    }
}

pub type ThrottleHandle = SharedActuator<Box<dyn ThrottleDriver>>;
pub type SteeringHandle = SharedActuator<Box<dyn SteeringDriver>>;
pub type BrakeHandle = SharedActuator<Box<dyn BrakeDriver>>;
pub type DrivetrainHandle = SharedActuator<Box<dyn DrivetrainEnable>>;

/// 一组执行器
#[derive(Clone)]
pub struct ActuatorSet {
    pub throttle: ThrottleHandle,
    pub steering: SteeringHandle,
    pub brake: BrakeHandle,
    pub drivetrain: DrivetrainHandle,
}

impl ActuatorSet {
    pub fn new(
        throttle: impl ThrottleDriver + 'static,
        steering: impl SteeringDriver + 'static,
        brake: impl BrakeDriver + 'static,
        drivetrain: impl DrivetrainEnable + 'static,
    ) -> Self {
        Self {
            throttle: SharedActuator::new("throttle", Box::new(throttle) as Box<dyn ThrottleDriver>),
            steering: SharedActuator::new("steering", Box::new(steering) as Box<dyn SteeringDriver>),
            brake: SharedActuator::new("brake", Box::new(brake) as Box<dyn BrakeDriver>),
            drivetrain: SharedActuator::new(
                "drivetrain",
                Box::new(drivetrain) as Box<dyn DrivetrainEnable>,
            ),
        }
    }

    /// 驱动所有执行器进入安全状态
    ///
    /// 顺序固定：动力使能拉低、油门禁用、转向禁用、刹车施加。
    /// 单个执行器失败不影响后续调用，返回全部失败。
    pub fn force_safe_state(&self, timeout: Duration) -> Vec<KartError> {
        let results = [
            self.drivetrain
                .call_within(timeout, |d| d.set_enabled(false)),
            self.throttle.call_within(timeout, |d| d.disable()),
            self.steering.call_within(timeout, |d| d.disable()),
            self.brake.call_within(timeout, |d| d.apply()),
        ];
        results.into_iter().filter_map(Result::err).collect()
    }
}

#[cfg(any(test, feature = "mock"))]
impl From<autokart_hal::mock::MockActuators> for ActuatorSet {
    fn from(mock: autokart_hal::mock::MockActuators) -> Self {
        Self::new(mock.throttle, mock.steering, mock.brake, mock.drivetrain)
    }
}
