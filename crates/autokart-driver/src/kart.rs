//! 控制核心运行时
//!
//! [`Kart`] 持有五个后台线程（接收、监督器、油门、转向、刹车），
//! 并对外提供指令快照、监督器事件和运行指标。
//!
//! 关闭（显式调用 [`Kart::shutdown`] 或 drop）时：停止所有循环，限时等待线程退出，
//! 然后把所有执行器驱动到安全状态。

use crate::actuators::ActuatorSet;
use crate::config::KartConfig;
use crate::error::KartError;
use crate::metrics::{KartMetrics, MetricsSnapshot};
use crate::stop::StopSignal;
use crate::store::{CommandState, CommandStore};
use crate::supervisor::SupervisorEvent;
use crossbeam_channel::Receiver;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{JoinHandle, spawn};
use std::time::Duration;
use tracing::{error, info, warn};

/// 带超时的线程 join
trait JoinTimeout {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()>;
}

impl<T: Send + 'static> JoinTimeout for JoinHandle<T> {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()> {
        let (tx, rx) = crossbeam_channel::bounded(1);

        // 由看门狗线程 join，本线程只做有界等待
        spawn(move || {
            let result = self.join();
            let _ = tx.send(result);
        });

        match rx.recv_timeout(timeout) {
            Ok(join_result) => join_result.map(|_| ()),
            // 超时：看门狗线程继续等待，进程退出时回收
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => Err(Box::new(
                std::io::Error::new(std::io::ErrorKind::TimedOut, "Thread join timeout"),
            )),
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => Err(Box::new(
                std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "Thread panicked during join",
                ),
            )),
        }
    }
}

/// 控制核心运行时
pub struct Kart {
    pub(crate) store: Arc<CommandStore>,
    pub(crate) stop: Arc<StopSignal>,
    pub(crate) metrics: Arc<KartMetrics>,
    pub(crate) actuators: ActuatorSet,
    pub(crate) events: Receiver<SupervisorEvent>,
    pub(crate) is_running: Arc<AtomicBool>,
    pub(crate) threads: Vec<(&'static str, JoinHandle<()>)>,
    pub(crate) config: KartConfig,
    pub(crate) shut_down: bool,
}

impl Kart {
    /// 指令存储（可用于外部发布指令，例如本地遥控）
    pub fn store(&self) -> &Arc<CommandStore> {
        &self.store
    }

    /// 当前指令快照
    pub fn snapshot(&self) -> CommandState {
        self.store.snapshot()
    }

    /// 当前是否处于停止状态
    pub fn is_stopped(&self) -> bool {
        self.stop.is_active()
    }

    /// 监督器边沿事件接收端
    ///
    /// 通道有界，消费过慢时新事件被丢弃（事件同时写入日志）。
    pub fn events(&self) -> Receiver<SupervisorEvent> {
        self.events.clone()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn config(&self) -> &KartConfig {
        &self.config
    }

    /// 所有后台线程是否都还在运行
    pub fn is_healthy(&self) -> bool {
        !self.shut_down && self.threads.iter().all(|(_, handle)| !handle.is_finished())
    }

    /// 停止所有控制循环并进入安全状态
    ///
    /// # 错误
    ///
    /// - `KartError::AlreadyShutdown`: 重复调用
    /// - 安全状态中第一个失败的执行器调用（其余执行器仍会被处理）
    pub fn shutdown(&mut self) -> Result<(), KartError> {
        if self.shut_down {
            return Err(KartError::AlreadyShutdown);
        }
        self.shut_down = true;

        info!("Shutting down kart control loops");
        // 先置位停止标志，正在执行节拍的工作线程不会再发出运动指令
        self.stop.raise();
        self.is_running.store(false, Ordering::Release);

        let join_timeout = self.config.shutdown_timeout();
        for (name, handle) in self.threads.drain(..) {
            if let Err(_e) = handle.join_timeout(join_timeout) {
                error!(
                    "{} thread panicked or failed to shut down within {:?}",
                    name, join_timeout
                );
            }
        }

        let mut errors = self.actuators.force_safe_state(join_timeout);
        for err in &errors {
            warn!("Safe state on shutdown: {}", err);
        }
        info!("Kart stopped: drivetrain disabled, brake applied");

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.swap_remove(0))
        }
    }
}

impl Drop for Kart {
    fn drop(&mut self) {
        if !self.shut_down {
            let _ = self.shutdown();
        }
    }
}
