//! 刹车工作线程
//!
//! 刹车是双稳态直线执行器，到达行程终点后重复脉冲没有意义，
//! 因此只在指令值变化时调用 `apply()` / `release()`。
//!
//! 急停期间刹车由监督器直接施加；工作线程把 `last` 记为 `Apply`
//! （急停短于本线程周期、两拍之间已结束时同样如此），
//! 恢复运行后如果指令仍是施加就不会重复调用，指令为松开时才发出 `release()`。

use super::{Dispatch, Observation, WorkerContext};
use crate::actuators::BrakeHandle;
use crate::metrics::KartMetrics;
use crate::schedule::PeriodicTask;
use autokart_protocol::BrakeCommand;
use std::time::Duration;
use tracing::{debug, trace};

pub struct BrakeWorker {
    ctx: WorkerContext,
    brake: BrakeHandle,
    period: Duration,
    last: BrakeCommand,
    seen_edges: u64,
}

impl BrakeWorker {
    pub fn new(ctx: WorkerContext, brake: BrakeHandle, period: Duration) -> Self {
        let seen_edges = ctx.stop_edges();
        Self {
            ctx,
            brake,
            period,
            last: BrakeCommand::Release,
            seen_edges,
        }
    }

    /// 最近一次发出（或由监督器施加）的刹车指令
    pub fn last(&self) -> BrakeCommand {
        self.last
    }

    pub fn step(&mut self) {
        let state = match self.ctx.observe(&mut self.seen_edges) {
            Observation::Stopped => {
                self.reconcile_applied();
                return;
            },
            Observation::Running { state, interrupted } => {
                if interrupted {
                    self.reconcile_applied();
                }
                state
            },
        };

        let wanted = state.mapped.brake();
        if wanted == self.last {
            return;
        }

        let ctx = &self.ctx;
        let seen_edges = self.seen_edges;
        let result = self.brake.call(|driver| {
            if ctx.stopped_since(seen_edges) {
                return Ok(Dispatch::Preempted);
            }
            match wanted {
                BrakeCommand::Apply => driver.apply()?,
                BrakeCommand::Release => driver.release()?,
            }
            Ok(Dispatch::Issued)
        });

        match result {
            Ok(Dispatch::Issued) => {
                self.last = wanted;
                KartMetrics::inc(&self.ctx.metrics.brake_commands);
                trace!("Brake {:?}", wanted);
            },
            Ok(Dispatch::Preempted) => self.last = BrakeCommand::Apply,
            // last 保持不变，下个节拍重试
            Err(err) => self.ctx.report("Brake", err),
        }
    }

    /// 监督器在急停中施加了刹车
    fn reconcile_applied(&mut self) {
        if self.last != BrakeCommand::Apply {
            debug!("Brake worker reconciling to APPLY after a stop");
            self.last = BrakeCommand::Apply;
        }
    }
}

impl PeriodicTask for BrakeWorker {
    fn name(&self) -> &'static str {
        "brake"
    }

    fn period(&self) -> Duration {
        self.period
    }

    fn tick(&mut self, _now: Duration) {
        self.step();
    }
}
