//! Linux 后端
//!
//! - [`IoctlCecDevice`]: 通过 `'N'` 系列 ioctl 访问 `/dev/cec`
//! - [`SysfsStatusSource`]: 对 sysfs 状态节点做 `poll(POLLPRI | POLLERR)` + `pread`
//!
//! ## 限制
//!
//! - **仅限 Linux 平台**
//! - **权限要求**：设备节点通常需要 `system` 组权限或 `sudo`

use crate::{CecCommand, CecDevice, DeviceError, StatusSource};
use hdmi_cec_protocol::{LogicalAddress, PhysicalAddress, WireFrame};
use nix::errno::Errno;
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use std::fs::{File, OpenOptions};
use std::os::fd::{AsFd, AsRawFd};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{trace, warn};

/// ioctl 命令定义（magic `'N'`）
mod ioctl {
    use hdmi_cec_protocol::WireFrame;
    use libc::c_int;

    const HDMI_CEC_MAGIC: u8 = b'N';

    // 驱动把发送结果写回同一结构体，但命令号按 _IOW 编码
    nix::ioctl_readwrite_bad!(
        cec_send,
        nix::request_code_write!(HDMI_CEC_MAGIC, 0, std::mem::size_of::<WireFrame>()),
        WireFrame
    );
    nix::ioctl_write_ptr!(cec_enable, HDMI_CEC_MAGIC, 1, c_int);
    nix::ioctl_read!(cec_physical, HDMI_CEC_MAGIC, 2, c_int);
    nix::ioctl_read!(cec_read, HDMI_CEC_MAGIC, 4, WireFrame);
    nix::ioctl_write_ptr!(cec_set_logical, HDMI_CEC_MAGIC, 5, c_int);
    nix::ioctl_write_ptr!(cec_clear_logical, HDMI_CEC_MAGIC, 6, c_int);
    nix::ioctl_read!(cec_wake_state, HDMI_CEC_MAGIC, 7, c_int);
}

/// `/dev/cec` 的 ioctl 实现
#[derive(Debug)]
pub struct IoctlCecDevice {
    file: File,
    path: PathBuf,
}

impl IoctlCecDevice {
    /// 以读写方式打开设备节点
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DeviceError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        trace!("Opened CEC device {}", path.display());
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn check(command: CecCommand, result: nix::Result<libc::c_int>) -> Result<(), DeviceError> {
        result
            .map(|_| ())
            .map_err(|errno| DeviceError::ioctl(command, errno))
    }
}

impl CecDevice for IoctlCecDevice {
    fn set_logical_address(&mut self, addr: LogicalAddress) -> Result<(), DeviceError> {
        let value = addr.nibble() as libc::c_int;
        let fd = self.file.as_raw_fd();
        // SAFETY: fd 在 self 生命周期内有效，参数指向栈上的 c_int
        let ret = unsafe { ioctl::cec_set_logical(fd, &value) };
        Self::check(CecCommand::SetLogicalAddress, ret)
    }

    fn clear_logical_address(&mut self) -> Result<(), DeviceError> {
        let fd = self.file.as_raw_fd();
        // SAFETY: 驱动不解引用该命令的参数
        let ret = unsafe { ioctl::cec_clear_logical(fd, std::ptr::null()) };
        Self::check(CecCommand::ClearLogicalAddress, ret)
    }

    fn physical_address(&mut self) -> Result<PhysicalAddress, DeviceError> {
        let mut value: libc::c_int = 0;
        let fd = self.file.as_raw_fd();
        // SAFETY: 驱动写回一个 c_int
        let ret = unsafe { ioctl::cec_physical(fd, &mut value) };
        Self::check(CecCommand::PhysicalAddress, ret)?;
        Ok(PhysicalAddress(value as u16))
    }

    fn send_frame(&mut self, frame: &mut WireFrame) -> Result<(), DeviceError> {
        let fd = self.file.as_raw_fd();
        // SAFETY: WireFrame 为 #[repr(C)]，与驱动的 cec_framedata 布局一致
        let ret = unsafe { ioctl::cec_send(fd, frame) };
        Self::check(CecCommand::SendFrame, ret)
    }

    fn read_frame(&mut self) -> Result<WireFrame, DeviceError> {
        let mut frame = WireFrame::default();
        let fd = self.file.as_raw_fd();
        // SAFETY: 同 send_frame
        let ret = unsafe { ioctl::cec_read(fd, &mut frame) };
        Self::check(CecCommand::ReadFrame, ret)?;
        Ok(frame)
    }

    fn wake_state(&mut self) -> Result<i32, DeviceError> {
        let mut value: libc::c_int = 0;
        let fd = self.file.as_raw_fd();
        // SAFETY: 驱动写回一个 c_int
        let ret = unsafe { ioctl::cec_wake_state(fd, &mut value) };
        Self::check(CecCommand::WakeState, ret)?;
        Ok(value)
    }

    fn set_enabled(&mut self, enabled: bool) -> Result<(), DeviceError> {
        let value = libc::c_int::from(enabled);
        let fd = self.file.as_raw_fd();
        // SAFETY: 参数指向栈上的 c_int
        let ret = unsafe { ioctl::cec_enable(fd, &value) };
        Self::check(CecCommand::SetEnabled, ret)
    }
}

impl Drop for IoctlCecDevice {
    fn drop(&mut self) {
        trace!("[Auto-Drop] CEC device {} closed", self.path.display());
    }
}

/// 状态节点读取缓冲区大小
const STATUS_BUFFER_LEN: usize = 64;

/// sysfs 状态节点
///
/// 内核在状态变化时调用 `sysfs_notify`，用户态表现为 `POLLPRI`。
/// 每次读取都从偏移 0 开始（`pread`），否则 sysfs 不会重新生成内容。
#[derive(Debug)]
pub struct SysfsStatusSource {
    file: File,
    path: PathBuf,
}

impl SysfsStatusSource {
    /// 只读打开状态节点
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DeviceError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        trace!("Opened CEC status node {}", path.display());
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn poll_timeout(timeout: Option<Duration>) -> PollTimeout {
    match timeout {
        None => PollTimeout::NONE,
        // 最大 65535ms，更长的等待由调用方循环
        Some(timeout) => PollTimeout::from(timeout.as_millis().min(u16::MAX as u128) as u16),
    }
}

impl StatusSource for SysfsStatusSource {
    fn wait_for_change(&mut self, timeout: Option<Duration>) -> Result<bool, DeviceError> {
        let mut fds = [PollFd::new(
            self.file.as_fd(),
            PollFlags::POLLPRI | PollFlags::POLLERR,
        )];

        match poll(&mut fds, poll_timeout(timeout)) {
            Ok(0) => Ok(false),
            Ok(_) => {
                let revents = fds[0].revents().unwrap_or(PollFlags::empty());
                if !revents.contains(PollFlags::POLLPRI) {
                    warn!("Status node woke without POLLPRI: {:?}", revents);
                    return Ok(false);
                }
                Ok(true)
            },
            Err(Errno::EINTR) => Ok(false),
            Err(e) => Err(DeviceError::Io(std::io::Error::other(format!(
                "poll failed: {}",
                e
            )))),
        }
    }

    fn read_status(&mut self) -> Result<String, DeviceError> {
        let mut buf = [0u8; STATUS_BUFFER_LEN];
        let len = nix::sys::uio::pread(&self.file, &mut buf, 0).map_err(std::io::Error::from)?;
        Ok(String::from_utf8_lossy(&buf[..len]).into_owned())
    }
}
