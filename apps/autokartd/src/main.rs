//! AutoKart 控制守护进程
//!
//! 从遥控接收机（串口或标准输入）读取数据包，驱动油门 / 转向 / 刹车，
//! 并由安全监督器处理急停。Ctrl+C 时停止所有控制循环并进入安全状态。

mod config;
mod hardware;

use anyhow::{Context, Result};
use autokart_driver::{Kart, KartBuilder, SupervisorEvent};
use clap::Parser;
use config::DaemonConfig;
use crossbeam_channel::RecvTimeoutError;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

/// AutoKart 控制守护进程
#[derive(Parser, Debug)]
#[command(name = "autokartd")]
#[command(about = "AutoKart drive-by-wire control daemon", long_about = None)]
#[command(version)]
struct Args {
    /// 配置文件路径（TOML）
    ///
    /// 默认: 不读取文件，全部使用内置默认值
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 串口设备（覆盖配置文件中的 `serial.device`）
    #[arg(long)]
    device: Option<PathBuf>,

    /// 使用模拟执行器，不访问 GPIO / SPI
    #[arg(long)]
    dry_run: bool,

    /// 从标准输入读取数据包（代替串口）
    #[arg(long)]
    stdin: bool,

    /// 状态日志间隔（毫秒），0 表示关闭
    #[arg(long, default_value_t = 1000)]
    status_interval_ms: u64,
}

fn init_logging() -> Result<()> {
    // rppal 等依赖通过 `log` 输出
    tracing_log::LogTracer::init().context("Failed to install log bridge")?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("autokartd=info,autokart_driver=info,autokart_hal=info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install tracing subscriber")?;
    Ok(())
}

fn log_status(kart: &Kart) {
    let state = kart.snapshot();
    info!(
        "RAW: {} MAPPED: {} seq={} stopped={} | {}",
        state.raw,
        state.mapped,
        state.sequence,
        kart.is_stopped(),
        kart.metrics()
    );
}

fn log_event(event: SupervisorEvent) {
    match event {
        SupervisorEvent::EstopEntered {
            cause,
            at,
            sequence,
        } => debug!("Supervisor event: ESTOP ({}) at {:?}, packet #{}", cause, at, sequence),
        SupervisorEvent::EstopCleared { at, sequence } => {
            debug!("Supervisor event: RUN at {:?}, packet #{}", at, sequence)
        },
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging()?;

    let mut config = match &args.config {
        Some(path) => DaemonConfig::load(path)?,
        None => DaemonConfig::default(),
    };
    if let Some(device) = args.device {
        config.serial.device = device;
    }

    let actuators = hardware::open_actuators(&config, args.dry_run)?;
    let transport = hardware::open_transport(&config, args.stdin)?;

    let mut kart = KartBuilder::new()
        .config(config.control.clone())
        .build(actuators, transport)
        .context("Failed to start control loops")?;

    // Ctrl+C 只置位标志，由主线程完成有序关闭
    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        ctrlc::set_handler(move || {
            running.store(false, Ordering::Release);
        })
        .context("Failed to set signal handler")?;
    }

    info!("autokartd started. Press Ctrl+C to stop.");

    let events = kart.events();
    let status_interval = Duration::from_millis(args.status_interval_ms);
    let mut last_status = Instant::now();

    while running.load(Ordering::Acquire) {
        match events.recv_timeout(Duration::from_millis(100)) {
            Ok(event) => log_event(event),
            Err(RecvTimeoutError::Timeout) => {},
            Err(RecvTimeoutError::Disconnected) => {
                error!("Supervisor stopped unexpectedly");
                break;
            },
        }

        if !kart.is_healthy() {
            error!("A control thread exited unexpectedly");
            break;
        }

        if !status_interval.is_zero() && last_status.elapsed() >= status_interval {
            log_status(&kart);
            last_status = Instant::now();
        }
    }

    info!("Shutting down...");
    kart.shutdown()
        .context("Failed to reach safe state on shutdown")?;
    info!("autokartd stopped");
    Ok(())
}
