//! 数据包接收循环
//!
//! 逐行读取传输层数据，解码成功则发布到指令存储；格式错误的行直接丢弃，不改变存储。
//! 读超时和传输错误只记录后重试，存储中保留最后一个有效指令。

use crate::clock::Clock;
use crate::error::KartError;
use crate::metrics::KartMetrics;
use crate::store::CommandStore;
use autokart_hal::{LineTransport, TransportError};
use autokart_protocol::decode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// 单次读取的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// 发布成功，附带新序号
    Published { sequence: u64 },
    /// 格式错误，已丢弃
    Discarded,
    /// 读超时
    Timeout,
    /// 传输错误
    Failed,
}

pub struct IngestionLoop {
    transport: Box<dyn LineTransport>,
    store: Arc<CommandStore>,
    metrics: Arc<KartMetrics>,
    clock: Arc<dyn Clock>,
    retry: Duration,
    /// 连续传输错误数
    consecutive_errors: u64,
    /// 最近一次被拒绝的读取（传输错误或格式错误）
    last_error: Option<KartError>,
}

impl IngestionLoop {
    pub fn new(
        transport: Box<dyn LineTransport>,
        store: Arc<CommandStore>,
        metrics: Arc<KartMetrics>,
        clock: Arc<dyn Clock>,
        retry: Duration,
    ) -> Self {
        Self {
            transport,
            store,
            metrics,
            clock,
            retry,
            consecutive_errors: 0,
            last_error: None,
        }
    }

    /// 最近一次传输错误或被丢弃的行的原因
    pub fn last_error(&self) -> Option<&KartError> {
        self.last_error.as_ref()
    }

    /// 读取并处理一行
    pub fn poll_once(&mut self) -> IngestOutcome {
        match self.transport.read_line() {
            Ok(line) => {
                if self.consecutive_errors > 0 {
                    info!(
                        "Transport recovered after {} failed reads",
                        self.consecutive_errors
                    );
                    self.consecutive_errors = 0;
                }
                self.ingest_line(&line)
            },
            Err(TransportError::Timeout) => {
                KartMetrics::inc(&self.metrics.transport_timeouts);
                debug!("Transport read timed out, keeping last command");
                IngestOutcome::Timeout
            },
            Err(err) => {
                let err = KartError::from(err);
                KartMetrics::inc(&self.metrics.transport_errors);
                self.consecutive_errors += 1;
                // 只在第一次失败时告警，持续失败降级为 debug
                if self.consecutive_errors == 1 {
                    warn!("{}, retrying every {:?}", err, self.retry);
                } else {
                    debug!("{} ({} in a row)", err, self.consecutive_errors);
                }
                self.last_error = Some(err);
                IngestOutcome::Failed
            },
        }
    }

    fn ingest_line(&mut self, line: &str) -> IngestOutcome {
        match decode(line) {
            Ok((raw, mapped)) => {
                let sequence = self.store.publish(raw, mapped);
                KartMetrics::inc(&self.metrics.packets_decoded);
                trace!("RAW: {} MAPPED: {} (#{})", raw, mapped, sequence);
                IngestOutcome::Published { sequence }
            },
            Err(err) => {
                let err = KartError::from(err);
                KartMetrics::inc(&self.metrics.packets_malformed);
                trace!("Dropping line {:?}: {}", line, err);
                self.last_error = Some(err);
                IngestOutcome::Discarded
            },
        }
    }

    /// 循环读取直到 `is_running` 变为 false
    pub fn run(mut self, is_running: Arc<AtomicBool>) {
        debug!("ingestion loop started");
        while is_running.load(Ordering::Acquire) {
            if self.poll_once() == IngestOutcome::Failed {
                self.clock.sleep(self.retry);
            }
        }
        debug!("ingestion loop stopped");
    }
}
