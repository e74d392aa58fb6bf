//! 事件监控线程
//!
//! 阻塞等待状态节点变化，按状态码分类：
//!
//! | 状态码 | 含义 | 动作 |
//! |---|---|---|
//! | 0 / 1 | 断开 / 连接 | 分发 `HotPlug` |
//! | 2 | 有入站帧 | 读帧、解码，分发 `MessageReceived` |
//! | 其他 | 未识别 | 忽略（计数） |
//!
//! 循环内的 IO 错误全部记录后继续；只有启动时打不开状态节点是致命的，
//! 此时状态变为 [`MonitorState::Failed`]，同步接口不受影响。

use crate::config::MonitorConfig;
use crate::error::DriverError;
use crate::handle::DeviceHandle;
use crate::metrics::CecMetrics;
use crate::sink::SinkSlot;
use hdmi_cec_device::{DeviceError, StatusSource};
use hdmi_cec_protocol::{HDMI_CEC_PORT_ID, HdmiEvent};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

/// poll 连续失败时的退避，避免失效的描述符把线程打满
const POLL_ERROR_BACKOFF: Duration = Duration::from_millis(10);

/// 监控线程状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum MonitorState {
    /// 线程已创建，尚未打开状态节点
    #[default]
    Starting = 0,
    /// 正在等待 / 处理事件
    Running = 1,
    /// 打不开状态节点，不会再有异步事件
    Failed = 2,
    /// 已按请求退出
    Stopped = 3,
}

impl MonitorState {
    /// 从 u8 转换，无效值视为 `Starting`
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Running,
            2 => Self::Failed,
            3 => Self::Stopped,
            _ => Self::Starting,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// 是否还可能产生事件
    pub fn is_alive(self) -> bool {
        matches!(self, Self::Starting | Self::Running)
    }
}

impl std::fmt::Display for MonitorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Failed => "failed",
            Self::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// 线程间共享的监控状态
#[derive(Debug, Default)]
pub struct AtomicMonitorState {
    inner: AtomicU8,
}

impl AtomicMonitorState {
    pub fn new(state: MonitorState) -> Self {
        Self {
            inner: AtomicU8::new(state.as_u8()),
        }
    }

    pub fn get(&self) -> MonitorState {
        MonitorState::from_u8(self.inner.load(Ordering::Acquire))
    }

    pub fn set(&self, state: MonitorState) {
        self.inner.store(state.as_u8(), Ordering::Release);
    }
}

/// 状态码分类结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    HotPlug { connected: bool },
    FrameReady,
    Unrecognized,
}

/// 解析状态文本
///
/// 跳过前导空白后读取前导数字：`0x` 前缀为十六进制，其余为十进制。
/// 没有数字或溢出时返回 `None`。
pub fn parse_state_code(payload: &str) -> Option<u64> {
    let s = payload.trim_start();
    let s = s.strip_prefix('+').unwrap_or(s);
    let (digits, radix) = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => (hex, 16),
        None => (s, 10),
    };
    let end = digits
        .find(|c: char| !c.is_digit(radix))
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    u64::from_str_radix(&digits[..end], radix).ok()
}

/// 状态码分类
pub fn classify(code: Option<u64>) -> StatusKind {
    match code {
        Some(0) => StatusKind::HotPlug { connected: false },
        Some(1) => StatusKind::HotPlug { connected: true },
        Some(2) => StatusKind::FrameReady,
        _ => StatusKind::Unrecognized,
    }
}

/// 监控循环依赖的共享对象
#[derive(Debug, Clone)]
pub struct MonitorContext {
    pub device: Arc<DeviceHandle>,
    pub sink: Arc<SinkSlot>,
    pub metrics: Arc<CecMetrics>,
}

impl MonitorContext {
    /// 把一次状态文本转换为事件（可能读取设备）
    pub fn event_for_payload(&self, payload: &str) -> Option<HdmiEvent> {
        let code = parse_state_code(payload);
        debug!("CEC state is {:?}", code);

        match classify(code) {
            StatusKind::HotPlug { connected } => {
                self.metrics.hotplug_events.fetch_add(1, Ordering::Relaxed);
                debug!("Sending hotplug: connected = {}", connected);
                Some(HdmiEvent::HotPlug {
                    connected,
                    port_id: HDMI_CEC_PORT_ID,
                })
            },
            StatusKind::FrameReady => match self.device.with_device(|d| d.read_frame()) {
                Ok(frame) => {
                    self.metrics.messages_received.fetch_add(1, Ordering::Relaxed);
                    let message = frame.decode();
                    trace!("Received CEC message {}", message);
                    Some(HdmiEvent::MessageReceived(message))
                },
                Err(e) => {
                    self.metrics.frame_read_errors.fetch_add(1, Ordering::Relaxed);
                    error!("HDMI CEC read error: {}", e);
                    None
                },
            },
            StatusKind::Unrecognized => {
                self.metrics.unclassified_codes.fetch_add(1, Ordering::Relaxed);
                trace!("Ignoring unrecognized CEC state {:?}", payload.trim());
                None
            },
        }
    }

    /// 同步调用回调
    ///
    /// 回调 panic 时丢弃该事件并计数，监控线程继续运行。
    pub fn dispatch(&self, event: &HdmiEvent) {
        match panic::catch_unwind(AssertUnwindSafe(|| self.sink.dispatch(event))) {
            Ok(true) => {},
            Ok(false) => {
                self.metrics.events_undelivered.fetch_add(1, Ordering::Relaxed);
                debug!("No event callback registered, dropping {}", event);
            },
            Err(_) => {
                self.metrics.callback_panics.fetch_add(1, Ordering::Relaxed);
                error!("Event callback panicked while handling {}", event);
            },
        }
    }
}

/// 监控循环（阻塞直到 `is_running` 为 false）
///
/// 调用前状态节点已经打开。先读一次以丢弃打开时自带的旧通知。
pub fn monitor_loop(
    mut status: impl StatusSource,
    ctx: MonitorContext,
    is_running: Arc<AtomicBool>,
    poll_timeout: Option<Duration>,
) {
    if let Err(e) = status.read_status() {
        warn!("Failed to clear initial CEC state notification: {}", e);
    }

    while is_running.load(Ordering::Acquire) {
        match status.wait_for_change(poll_timeout) {
            Ok(true) => {},
            Ok(false) => continue,
            Err(e) => {
                ctx.metrics.poll_errors.fetch_add(1, Ordering::Relaxed);
                error!("CEC poll failed: {}", e);
                thread::sleep(POLL_ERROR_BACKOFF);
                continue;
            },
        }
        ctx.metrics.wakeups.fetch_add(1, Ordering::Relaxed);

        let payload = match status.read_status() {
            Ok(payload) => payload,
            Err(e) => {
                ctx.metrics.status_read_errors.fetch_add(1, Ordering::Relaxed);
                error!("Unable to read CEC state: {}", e);
                continue;
            },
        };

        if let Some(event) = ctx.event_for_payload(&payload) {
            ctx.dispatch(&event);
        }
    }

    trace!("Monitor thread: is_running flag is false, exiting");
}

/// Extension trait for timeout-capable thread joins
trait JoinTimeout {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()>;
}

impl<T: Send + 'static> JoinTimeout for JoinHandle<T> {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()> {
        let (tx, rx) = crossbeam_channel::bounded(1);

        // 看门狗线程负责 join，超时后留给进程退出回收
        thread::spawn(move || {
            let _ = tx.send(self.join());
        });

        match rx.recv_timeout(timeout) {
            Ok(join_result) => join_result.map(|_| ()),
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

/// 线程异常退出时把状态置为 `Failed`
struct UnwindGuard {
    state: Arc<AtomicMonitorState>,
}

impl Drop for UnwindGuard {
    fn drop(&mut self) {
        if thread::panicking() {
            error!("CEC monitor thread panicked");
            self.state.set(MonitorState::Failed);
        }
    }
}

/// 打开状态源的回调（在监控线程上执行）
pub type StatusOpener = Box<dyn FnOnce() -> Result<Box<dyn StatusSource>, DeviceError> + Send>;

/// 事件监控器（拥有监控线程）
#[derive(Debug)]
pub struct EventMonitor {
    is_running: Arc<AtomicBool>,
    state: Arc<AtomicMonitorState>,
    thread: Option<JoinHandle<()>>,
    join_timeout: Duration,
}

impl EventMonitor {
    /// 启动监控线程
    ///
    /// 状态节点在新线程上打开；打开失败只影响监控器自身（状态变为 `Failed`）。
    ///
    /// # Errors
    /// - `DriverError::MonitorSpawn`: 线程创建失败
    pub fn start(
        open_status: StatusOpener,
        ctx: MonitorContext,
        config: &MonitorConfig,
    ) -> Result<Self, DriverError> {
        let is_running = Arc::new(AtomicBool::new(true));
        let state = Arc::new(AtomicMonitorState::new(MonitorState::Starting));

        let thread_running = is_running.clone();
        let thread_state = state.clone();
        let poll_timeout = config.poll_timeout();

        let thread = thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn(move || {
                let _guard = UnwindGuard {
                    state: thread_state.clone(),
                };
                set_monitor_priority();

                let status = match open_status() {
                    Ok(status) => status,
                    Err(e) => {
                        error!("Not able to open CEC state node: {}", e);
                        thread_state.set(MonitorState::Failed);
                        return;
                    },
                };

                info!("CEC monitor thread running");
                thread_state.set(MonitorState::Running);
                monitor_loop(status, ctx, thread_running, poll_timeout);
                thread_state.set(MonitorState::Stopped);
            })
            .map_err(|e| DriverError::MonitorSpawn(e.to_string()))?;

        Ok(Self {
            is_running,
            state,
            thread: Some(thread),
            join_timeout: config.join_timeout(),
        })
    }

    pub fn state(&self) -> MonitorState {
        self.state.get()
    }

    /// 请求退出并等待线程结束
    ///
    /// poll 为无限等待时，线程要到下一次状态变化才能观察到退出请求，
    /// 此时会在 join 超时后放弃等待。
    pub fn shutdown(&mut self) {
        self.is_running.store(false, Ordering::Release);

        if let Some(handle) = self.thread.take() {
            match handle.join_timeout(self.join_timeout) {
                Ok(()) => debug!("CEC monitor thread joined"),
                Err(_) => error!(
                    "Monitor thread panicked or failed to shut down within {:?}",
                    self.join_timeout
                ),
            }
        }
    }
}

impl Drop for EventMonitor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(feature = "realtime")]
fn set_monitor_priority() {
    use thread_priority::*;

    match set_current_thread_priority(ThreadPriority::Max) {
        Ok(_) => info!("Monitor thread priority set to MAX (realtime)"),
        Err(e) => warn!(
            "Failed to set monitor thread priority: {}. \
            On Linux, you may need to run with CAP_SYS_NICE.",
            e
        ),
    }
}

#[cfg(not(feature = "realtime"))]
fn set_monitor_priority() {}
