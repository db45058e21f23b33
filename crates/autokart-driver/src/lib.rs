//! # AutoKart Driver
//!
//! 线控底盘控制核心：指令存储、安全监督器、执行器工作线程和数据包接收循环。
//!
//! ## 线程模型
//!
//! ```text
//! transport ──> IngestionLoop ──publish──> CommandStore (ArcSwap)
//!                                              │ snapshot
//!              ┌───────────────┬───────────────┼───────────────┐
//!              ▼               ▼               ▼               ▼
//!         Supervisor     ThrottleWorker  SteeringWorker   BrakeWorker
//!          (10ms)           (20ms)          (50ms)          (50ms)
//!              │ StopSignal ───┴───────────────┴───────────────┘
//!              └──> drivetrain / throttle / steering / brake (safe state)
//! ```
//!
//! - 指令存储是唯一的共享可变状态，读写都不阻塞
//! - 执行器由对应工作线程和监督器共享，任意时刻只有一方在调用
//! - 控制循环内的所有错误都只记录后继续运行，不会让线程退出
//!
//! ## 使用
//!
//! 通过 [`KartBuilder`] 启动，返回的 [`Kart`] 在 drop 时停止所有线程并进入安全状态。

mod actuators;
mod autonomous;
mod builder;
pub mod clock;
mod config;
mod error;
pub mod ingestion;
mod kart;
pub mod metrics;
pub mod schedule;
mod stop;
pub mod store;
pub mod supervisor;
pub mod worker;

pub use actuators::{
    ActuatorSet, BrakeHandle, DrivetrainHandle, SharedActuator, SteeringHandle, ThrottleHandle,
};
pub use autonomous::{AutonomousSource, NoAutonomousSource};
pub use builder::KartBuilder;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::KartConfig;
pub use error::KartError;
pub use ingestion::{IngestOutcome, IngestionLoop};
pub use kart::Kart;
pub use metrics::{KartMetrics, MetricsSnapshot};
pub use schedule::{Cadence, PeriodicTask, run_periodic};
pub use stop::StopSignal;
pub use store::{CommandState, CommandStore};
pub use supervisor::{StopCause, Supervisor, SupervisorEvent, SupervisorState};
pub use worker::{BrakeWorker, SteeringWorker, ThrottleWorker, WorkerContext};

// 重新导出常用的协议类型
pub use autokart_protocol::{BrakeCommand, ControlMode, MappedCommand, RawPacket, SteeringDirection};
