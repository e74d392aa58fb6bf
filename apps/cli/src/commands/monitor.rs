//! 监控命令
//!
//! 注册 channel 回调，打印事件直到 Ctrl-C 或达到指定条数。

use crate::session;
use anyhow::{Context, Result};
use clap::Args;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use hdmi_cec_driver::{DriverConfig, MonitorState};
use hdmi_cec_protocol::HdmiEvent;
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::warn;

/// 接收循环的检查间隔
const RECV_SLICE: Duration = Duration::from_millis(200);

/// 监控参数
#[derive(Args, Debug)]
pub struct MonitorCommand {
    /// 事件队列容量
    #[arg(long, default_value_t = 64)]
    pub capacity: usize,

    /// 收到指定条数事件后退出
    #[arg(short = 'n', long)]
    pub count: Option<u64>,
}

impl MonitorCommand {
    pub fn execute(&self, config: DriverConfig) -> Result<()> {
        let running = Arc::new(AtomicBool::new(true));
        let running_clone = running.clone();
        ctrlc::set_handler(move || {
            eprintln!("\nReceived interrupt signal. Stopping monitor...");
            running_clone.store(false, Ordering::SeqCst);
        })
        .context("Failed to set signal handler")?;

        let mut cec = session::open_with_monitor(config)?;
        let events = cec.register_channel(self.capacity);

        let stdout = std::io::stdout();
        let received = print_events(&events, &running, self.count, &mut stdout.lock(), || {
            if cec.monitor_state() == Some(MonitorState::Failed) {
                warn!("Event monitor failed to start, no events will arrive");
                return false;
            }
            true
        })?;

        cec.shutdown();
        let metrics = cec.metrics();
        eprintln!(
            "{} events, {} undelivered, {} dropped",
            received,
            metrics.events_undelivered,
            metrics.silently_dropped()
        );
        Ok(())
    }
}

/// 打印事件直到 `running` 被清除、达到 `limit` 或 `healthy` 返回 false
///
/// 返回打印的事件数。
fn print_events(
    events: &Receiver<HdmiEvent>,
    running: &AtomicBool,
    limit: Option<u64>,
    out: &mut impl Write,
    mut healthy: impl FnMut() -> bool,
) -> Result<u64> {
    let mut received = 0u64;
    while running.load(Ordering::SeqCst) {
        if limit.is_some_and(|limit| received >= limit) {
            break;
        }
        match events.recv_timeout(RECV_SLICE) {
            Ok(event) => {
                writeln!(out, "{}", event)?;
                received += 1;
            },
            Err(RecvTimeoutError::Timeout) => {
                if !healthy() {
                    break;
                }
            },
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    Ok(received)
}
