//! Builder 模式实现

use crate::actuators::ActuatorSet;
use crate::autonomous::{AutonomousSource, NoAutonomousSource};
use crate::clock::{Clock, SystemClock};
use crate::config::KartConfig;
use crate::error::KartError;
use crate::ingestion::IngestionLoop;
use crate::kart::Kart;
use crate::metrics::KartMetrics;
use crate::schedule::run_periodic;
use crate::stop::StopSignal;
use crate::store::CommandStore;
use crate::supervisor::Supervisor;
use crate::worker::{BrakeWorker, SteeringWorker, ThrottleWorker, WorkerContext};
use autokart_hal::LineTransport;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tracing::info;

/// Kart 构建器
///
/// # Example
///
/// ```no_run
/// use autokart_driver::{ActuatorSet, KartBuilder, KartConfig};
/// use autokart_hal::mock::{ChannelTransport, MockActuators};
/// use std::time::Duration;
///
/// let mock = MockActuators::new();
/// let actuators = ActuatorSet::new(mock.throttle, mock.steering, mock.brake, mock.drivetrain);
/// let (tx, transport) = ChannelTransport::pair(Duration::from_millis(100));
/// let mut kart = KartBuilder::new()
///     .config(KartConfig::default())
///     .build(actuators, transport)
///     .unwrap();
///
/// tx.send("1500,992,1809,1809,1809,992".to_string()).unwrap();
/// kart.shutdown().unwrap();
/// ```
pub struct KartBuilder {
    config: KartConfig,
    clock: Option<Arc<dyn Clock>>,
    autonomous: Option<Arc<dyn AutonomousSource>>,
}

impl KartBuilder {
    pub fn new() -> Self {
        Self {
            config: KartConfig::default(),
            clock: None,
            autonomous: None,
        }
    }

    /// 设置控制核心配置
    pub fn config(mut self, config: KartConfig) -> Self {
        self.config = config;
        self
    }

    /// 设置时钟（默认为 [`SystemClock`]）
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// 设置自主模式指令来源（默认为 [`NoAutonomousSource`]）
    pub fn autonomous_source(mut self, source: Arc<dyn AutonomousSource>) -> Self {
        self.autonomous = Some(source);
        self
    }

    /// 启动控制核心
    ///
    /// 线程启动顺序：监督器、刹车、转向、油门、接收。
    /// 任一线程创建失败时，已启动的线程会被停止并进入安全状态。
    ///
    /// # 错误
    ///
    /// - `KartError::Config`: 配置无效
    /// - `KartError::ThreadSpawn`: 线程创建失败
    pub fn build(
        self,
        actuators: ActuatorSet,
        transport: impl LineTransport + 'static,
    ) -> Result<Kart, KartError> {
        self.config.validate()?;

        let config = self.config;
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock::new()));
        let autonomous = self
            .autonomous
            .unwrap_or_else(|| Arc::new(NoAutonomousSource));

        let store = Arc::new(CommandStore::new(clock.clone()));
        let stop = Arc::new(StopSignal::new());
        let metrics = Arc::new(KartMetrics::new());
        let is_running = Arc::new(AtomicBool::new(true));
        let (event_tx, event_rx) = crossbeam_channel::bounded(config.event_capacity);

        let mut kart = Kart {
            store: store.clone(),
            stop: stop.clone(),
            metrics: metrics.clone(),
            actuators: actuators.clone(),
            events: event_rx,
            is_running: is_running.clone(),
            threads: Vec::with_capacity(5),
            config: config.clone(),
            shut_down: false,
        };

        let supervisor = Supervisor::new(
            store.clone(),
            stop.clone(),
            actuators.clone(),
            metrics.clone(),
            event_tx,
            config.supervisor_period(),
            config.stale_timeout(),
            config.actuator_lock_timeout(),
        );
        {
            let clock = clock.clone();
            let running = is_running.clone();
            spawn_named(&mut kart, "supervisor", move || {
                set_realtime_priority();
                run_periodic(supervisor, clock, running);
            })?;
        }

        let ctx = WorkerContext::new(store.clone(), stop.clone(), metrics.clone());

        let brake = BrakeWorker::new(ctx.clone(), actuators.brake.clone(), config.brake_period());
        spawn_periodic(&mut kart, "brake", brake, &clock, &is_running)?;

        let steering = SteeringWorker::new(
            ctx.clone(),
            actuators.steering.clone(),
            autonomous.clone(),
            config.steering_period(),
        );
        spawn_periodic(&mut kart, "steering", steering, &clock, &is_running)?;

        let throttle = ThrottleWorker::new(
            ctx,
            actuators.throttle.clone(),
            autonomous,
            config.throttle_period(),
        );
        spawn_periodic(&mut kart, "throttle", throttle, &clock, &is_running)?;

        let ingestion = IngestionLoop::new(
            Box::new(transport),
            store,
            metrics,
            clock,
            config.transport_retry(),
        );
        {
            let running = is_running.clone();
            spawn_named(&mut kart, "ingestion", move || ingestion.run(running))?;
        }

        info!(
            "Kart started (supervisor {:?}, throttle {:?}, steering {:?}, brake {:?})",
            config.supervisor_period(),
            config.throttle_period(),
            config.steering_period(),
            config.brake_period()
        );
        Ok(kart)
    }
}

impl Default for KartBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn spawn_named<F>(kart: &mut Kart, name: &'static str, f: F) -> Result<(), KartError>
where
    F: FnOnce() + Send + 'static,
{
    let handle = std::thread::Builder::new()
        .name(format!("autokart-{}", name))
        .spawn(f)
        .map_err(|source| KartError::ThreadSpawn { name, source })?;
    kart.threads.push((name, handle));
    Ok(())
}

fn spawn_periodic<T>(
    kart: &mut Kart,
    name: &'static str,
    task: T,
    clock: &Arc<dyn Clock>,
    is_running: &Arc<AtomicBool>,
) -> Result<(), KartError>
where
    T: crate::schedule::PeriodicTask + 'static,
{
    let clock = clock.clone();
    let running = is_running.clone();
    spawn_named(kart, name, move || run_periodic(task, clock, running))
}

/// 提升监督器线程优先级（可选 feature）
fn set_realtime_priority() {
    #[cfg(feature = "realtime")]
    {
        use thread_priority::*;
        use tracing::warn;

        match set_current_thread_priority(ThreadPriority::Max) {
            Ok(_) => {
                info!("Supervisor thread priority set to MAX (realtime)");
            },
            Err(e) => {
                warn!(
                    "Failed to set supervisor thread priority: {}. \
                    On Linux, you may need to run with CAP_SYS_NICE or use rtkit.",
                    e
                );
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autokart_hal::mock::{ActuatorCall, ChannelTransport, MockActuators};
    use std::time::Duration;

    #[test]
    fn test_invalid_config_rejected_before_spawn() {
        let (_tx, transport) = ChannelTransport::pair(Duration::from_millis(10));
        let config = KartConfig {
            supervisor_period_ms: 0,
            ..KartConfig::default()
        };
        let result = KartBuilder::new()
            .config(config)
            .build(ActuatorSet::from(MockActuators::new()), transport);
        assert!(matches!(result, Err(KartError::Config(_))));
    }

    #[test]
    fn test_build_and_shutdown() {
        let mock = MockActuators::new();
        let log = mock.log.clone();
        let (_tx, transport) = ChannelTransport::pair(Duration::from_millis(10));

        let mut kart = KartBuilder::new()
            .build(ActuatorSet::from(mock), transport)
            .unwrap();
        assert!(kart.is_healthy());
        std::thread::sleep(Duration::from_millis(50));

        kart.shutdown().unwrap();
        assert!(!kart.is_healthy());
        assert!(matches!(kart.shutdown(), Err(KartError::AlreadyShutdown)));

        // 关闭后的最后一组调用是安全状态
        let calls = log.calls();
        let tail = &calls[calls.len() - 4..];
        assert_eq!(
            tail,
            &[
                ActuatorCall::Drivetrain(false),
                ActuatorCall::ThrottleDisable,
                ActuatorCall::SteeringDisable,
                ActuatorCall::BrakeApply,
            ]
        );
    }
}
