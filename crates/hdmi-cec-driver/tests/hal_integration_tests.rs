//! HAL 端到端测试（mock 设备 + mock 状态源）
//!
//! 运行方式：`cargo test -p hdmi-cec-driver --test hal_integration_tests`

use hdmi_cec_driver::device::CecCommand;
use hdmi_cec_driver::device::mock::{MockCecDevice, MockStatusSource};
use hdmi_cec_driver::{DriverConfig, DriverError, HdmiCec, HdmiCecBuilder, MonitorState};
use hdmi_cec_protocol::{
    CecMessage, CecOpcode, HdmiEvent, LogicalAddress, PhysicalAddress, SendOutcome, WireFrame,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

const EVENT_TIMEOUT: Duration = Duration::from_secs(2);

/// 测试日志（`RUST_LOG=hdmi_cec=trace` 查看细节），重复初始化忽略
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn fast_config() -> DriverConfig {
    let mut config = DriverConfig::default();
    config.send.idle_poll_interval_ms = 1;
    config.monitor.poll_timeout_ms = 10;
    config
}

fn build(device: &MockCecDevice, status: &MockStatusSource) -> HdmiCec {
    init_tracing();
    HdmiCecBuilder::new()
        .config(fast_config())
        .with_device(device.clone())
        .with_status_source(status.clone())
        .build()
        .unwrap()
}

fn wait_for(mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + EVENT_TIMEOUT;
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    done()
}

fn hotplug(connected: bool) -> HdmiEvent {
    HdmiEvent::HotPlug {
        connected,
        port_id: 1,
    }
}

#[test]
fn test_claim_then_send_uses_initiator_nibble() {
    let device = MockCecDevice::new();
    let cec = HdmiCecBuilder::new()
        .with_device(device.clone())
        .without_monitor()
        .build()
        .unwrap();

    cec.claim(LogicalAddress::new(4).unwrap()).unwrap();
    assert_eq!(device.logical_address(), Some(LogicalAddress::Playback1));

    for destination in [LogicalAddress::Tv, LogicalAddress::AudioSystem, LogicalAddress::Broadcast] {
        let msg = CecMessage::new(LogicalAddress::Playback1, destination, CecOpcode::ActiveSource, &[0x10, 0x00]);
        assert_eq!(cec.send(&msg).unwrap(), SendOutcome::Success);
    }

    let frames = device.sent_frames();
    assert_eq!(frames.len(), 3);
    for frame in &frames {
        assert_eq!(frame.address >> 4, 0x4);
    }
    assert_eq!(frames[2].address, 0x4F);
}

#[test]
fn test_not_open_operations() {
    let cec = HdmiCecBuilder::new()
        .without_device()
        .without_monitor()
        .build()
        .unwrap();
    let msg = CecMessage::new(LogicalAddress::Playback1, LogicalAddress::Tv, CecOpcode::Standby, &[]);

    assert!(matches!(cec.claim(LogicalAddress::Playback1), Err(DriverError::NotOpen)));
    assert!(matches!(cec.clear(), Err(DriverError::NotOpen)));
    assert!(matches!(cec.physical_address(), Err(DriverError::NotOpen)));
    assert!(matches!(cec.send(&msg), Err(DriverError::NotOpen)));
    assert!(matches!(cec.set_option(1, 1), Err(DriverError::NotOpen)));

    let port = cec.query_ports()[0];
    assert!(!port.cec_supported);
    assert_eq!(port.physical_address, PhysicalAddress(0));
    assert_eq!(cec.metrics().sends_total, 0);
}

#[test]
fn test_closed_after_shutdown_does_not_touch_device() {
    let device = MockCecDevice::new();
    let mut cec = HdmiCecBuilder::new()
        .with_device(device.clone())
        .without_monitor()
        .build()
        .unwrap();
    cec.shutdown();

    let msg = CecMessage::new(LogicalAddress::Playback1, LogicalAddress::Tv, CecOpcode::Standby, &[]);
    assert!(matches!(cec.claim(LogicalAddress::Playback1), Err(DriverError::NotOpen)));
    assert!(matches!(cec.clear(), Err(DriverError::NotOpen)));
    assert!(matches!(cec.physical_address(), Err(DriverError::NotOpen)));
    assert!(matches!(cec.send(&msg), Err(DriverError::NotOpen)));
    assert!(device.calls().is_empty());
}

#[test]
fn test_busy_bus_default_retry_policy() {
    let device = MockCecDevice::new();
    device.set_wake_state(1);
    let cec = HdmiCecBuilder::new()
        .with_device(device.clone())
        .without_monitor()
        .build()
        .unwrap();

    let msg = CecMessage::new(LogicalAddress::Playback1, LogicalAddress::Tv, CecOpcode::ImageViewOn, &[]);
    let start = Instant::now();
    assert_eq!(cec.send(&msg).unwrap(), SendOutcome::Nack);
    let elapsed = start.elapsed();

    assert_eq!(device.call_count(CecCommand::WakeState), 30);
    assert_eq!(device.call_count(CecCommand::SendFrame), 0);
    assert!(elapsed >= Duration::from_millis(29 * 40), "elapsed {:?}", elapsed);
    assert_eq!(cec.metrics().idle_wait_exhausted, 1);
}

#[test]
fn test_result_codes_through_facade() {
    let device = MockCecDevice::new();
    for code in [0, 1, 2, 0x7F] {
        device.queue_result_code(code);
    }
    let cec = HdmiCecBuilder::new()
        .config(fast_config())
        .with_device(device.clone())
        .without_monitor()
        .build()
        .unwrap();

    let msg = CecMessage::new(LogicalAddress::Playback1, LogicalAddress::Tv, CecOpcode::GiveOsdName, &[]);
    let outcomes: Vec<_> = (0..4).map(|_| cec.send(&msg).unwrap()).collect();
    assert_eq!(
        outcomes,
        vec![SendOutcome::Success, SendOutcome::Nack, SendOutcome::Busy, SendOutcome::Fail]
    );

    let metrics = cec.metrics();
    assert_eq!(metrics.sends_total, 4);
    assert_eq!(metrics.sends_success, 1);
    assert_eq!(metrics.sends_fail, 1);
}

#[test]
fn test_report_power_status_is_normalized_on_the_wire() {
    let device = MockCecDevice::new();
    let cec = HdmiCecBuilder::new()
        .with_device(device.clone())
        .without_monitor()
        .build()
        .unwrap();

    let msg = CecMessage::new(LogicalAddress::Playback1, LogicalAddress::Tv, CecOpcode::ReportPowerStatus, &[0x01]);
    cec.send(&msg).unwrap();
    let frame = device.sent_frames()[0];
    assert_eq!(frame.opcode, 0x90);
    assert_eq!(frame.arg_count, 1);
    assert_eq!(frame.args[0], 0);
}

#[test]
fn test_monitor_classifies_status_codes() {
    let device = MockCecDevice::new();
    let status = MockStatusSource::with_initial("1");
    let cec = build(&device, &status);
    let events = cec.register_channel(16);

    let inbound = CecMessage::new(LogicalAddress::Tv, LogicalAddress::Playback1, CecOpcode::GiveDevicePowerStatus, &[]);
    device.queue_inbound(WireFrame::encode(&inbound));

    status.push_code(1);
    status.push_code(0);
    status.push_code(2); // 有帧
    status.push_code(2); // 读帧失败
    status.push_code(9); // 未识别
    status.push_code(1);

    assert_eq!(events.recv_timeout(EVENT_TIMEOUT).unwrap(), hotplug(true));
    assert_eq!(events.recv_timeout(EVENT_TIMEOUT).unwrap(), hotplug(false));
    assert_eq!(
        events.recv_timeout(EVENT_TIMEOUT).unwrap(),
        HdmiEvent::MessageReceived(inbound)
    );
    assert_eq!(events.recv_timeout(EVENT_TIMEOUT).unwrap(), hotplug(true));
    assert!(events.try_recv().is_err());

    let metrics = cec.metrics();
    assert_eq!(metrics.hotplug_events, 3);
    assert_eq!(metrics.messages_received, 1);
    assert_eq!(metrics.frame_read_errors, 1);
    assert_eq!(metrics.unclassified_codes, 1);
    assert_eq!(metrics.silently_dropped(), 2);
}

#[test]
fn test_monitor_with_closure_callback() {
    let device = MockCecDevice::new();
    let status = MockStatusSource::new();
    let cec = build(&device, &status);

    let seen = Arc::new(AtomicUsize::new(0));
    let counter = seen.clone();
    cec.register_callback(move |event: &HdmiEvent| {
        if matches!(event, HdmiEvent::HotPlug { connected: true, .. }) {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    });

    status.push_code(1);
    status.push_code(1);
    assert!(wait_for(|| seen.load(Ordering::Relaxed) == 2));
}

fn panicking_callback(_: &HdmiEvent) {
    panic!("callback failure");
}

#[test]
fn test_panicking_callback_keeps_monitor_running() {
    let device = MockCecDevice::new();
    let status = MockStatusSource::new();
    let cec = build(&device, &status);
    assert!(wait_for(|| cec.monitor_state() == Some(MonitorState::Running)));

    cec.register_callback(panicking_callback);
    status.push_code(1);
    assert!(wait_for(|| cec.metrics().callback_panics == 1));
    assert_eq!(cec.monitor_state(), Some(MonitorState::Running));

    // 替换回调后事件照常送达
    let events = cec.register_channel(4);
    status.push_code(0);
    assert_eq!(events.recv_timeout(EVENT_TIMEOUT).unwrap(), hotplug(false));
    assert_eq!(status.pending(), 0);
}

#[test]
fn test_events_before_registration_are_counted() {
    let device = MockCecDevice::new();
    let status = MockStatusSource::new();
    let cec = build(&device, &status);

    status.push_code(0);
    assert!(wait_for(|| cec.metrics().events_undelivered == 1));

    let events = cec.register_channel(4);
    status.push_code(1);
    assert_eq!(events.recv_timeout(EVENT_TIMEOUT).unwrap(), hotplug(true));
}

#[test]
fn test_monitor_startup_failure_keeps_sync_api() {
    let device = MockCecDevice::new();
    let cec = HdmiCecBuilder::new()
        .config(fast_config())
        .with_device(device.clone())
        .with_status_opener(|| {
            Err(std::io::Error::from(std::io::ErrorKind::NotFound).into())
        })
        .build()
        .unwrap();

    assert!(wait_for(|| cec.monitor_state() == Some(MonitorState::Failed)));

    cec.claim(LogicalAddress::Playback1).unwrap();
    let msg = CecMessage::new(LogicalAddress::Playback1, LogicalAddress::Tv, CecOpcode::Standby, &[]);
    assert_eq!(cec.send(&msg).unwrap(), SendOutcome::Success);
}

#[test]
fn test_send_while_monitor_reads_frames() {
    let device = MockCecDevice::new();
    let status = MockStatusSource::new();
    let cec = Arc::new(build(&device, &status));
    let events = cec.register_channel(64);

    let inbound = CecMessage::new(LogicalAddress::Tv, LogicalAddress::Broadcast, CecOpcode::Standby, &[]);
    for _ in 0..20 {
        device.queue_inbound(WireFrame::encode(&inbound));
        status.push_code(2);
    }

    let sender = {
        let cec = cec.clone();
        thread::spawn(move || {
            let msg = CecMessage::new(LogicalAddress::Playback1, LogicalAddress::Tv, CecOpcode::GiveOsdName, &[]);
            (0..20).filter(|_| cec.send(&msg).unwrap().is_success()).count()
        })
    };

    for _ in 0..20 {
        assert_eq!(
            events.recv_timeout(EVENT_TIMEOUT).unwrap(),
            HdmiEvent::MessageReceived(inbound.clone())
        );
    }
    assert_eq!(sender.join().unwrap(), 20);
}

#[test]
fn test_query_ports_idempotent() {
    let device = MockCecDevice::new();
    device.set_physical_address(Some(0x1200));
    let cec = HdmiCecBuilder::new()
        .with_device(device)
        .without_monitor()
        .build()
        .unwrap();

    let first = cec.query_ports();
    let second = cec.query_ports();
    assert_eq!(first, second);
    assert_eq!(first.len(), 1);
    assert!(first[0].cec_supported);
    assert_eq!(first[0].physical_address.to_string(), "1.2.0.0");
}

#[test]
fn test_drop_stops_monitor() {
    let device = MockCecDevice::new();
    let status = MockStatusSource::new();
    let cec = build(&device, &status);
    assert!(wait_for(|| cec.monitor_state() == Some(MonitorState::Running)));

    let start = Instant::now();
    drop(cec);
    assert!(start.elapsed() < Duration::from_secs(2));

    // 监控线程已退出，不再消费状态变化
    let waits = status.wait_count();
    status.push_code(1);
    thread::sleep(Duration::from_millis(30));
    assert_eq!(status.wait_count(), waits);
    assert_eq!(status.pending(), 1);
}
