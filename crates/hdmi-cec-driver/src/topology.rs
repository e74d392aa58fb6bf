//! 端口拓扑
//!
//! 固定一个输出端口；每次调用重新查询物理地址，不缓存。

use crate::handle::DeviceHandle;
use hdmi_cec_protocol::{HDMI_CEC_PORT_ID, PhysicalAddress, PortInfo, PortType};
use tracing::warn;

/// 查询端口列表（始终只有一个端口）
///
/// `cec_supported` 仅在设备已打开且物理地址查询成功时为 true，
/// 否则物理地址报告为 0。
pub fn query_ports(device: &DeviceHandle) -> Vec<PortInfo> {
    let (cec_supported, physical_address) = match device.with_device(|d| d.physical_address()) {
        Ok(addr) => (true, addr),
        Err(e) => {
            warn!("Physical address query failed: {}", e);
            (false, PhysicalAddress(0))
        },
    };

    vec![PortInfo {
        port_id: HDMI_CEC_PORT_ID,
        port_type: PortType::Output,
        cec_supported,
        arc_supported: false,
        physical_address,
    }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use hdmi_cec_device::mock::MockCecDevice;

    #[test]
    fn test_single_output_port() {
        let mock = MockCecDevice::new();
        mock.set_physical_address(Some(0x2100));
        let ports = query_ports(&DeviceHandle::new(mock));

        assert_eq!(ports.len(), 1);
        let port = ports[0];
        assert_eq!(port.port_id, 1);
        assert_eq!(port.port_type, PortType::Output);
        assert!(port.cec_supported);
        assert!(!port.arc_supported);
        assert_eq!(port.physical_address, PhysicalAddress(0x2100));
    }

    #[test]
    fn test_query_failure_reports_unsupported() {
        let mock = MockCecDevice::new();
        mock.set_physical_address(None);
        let port = query_ports(&DeviceHandle::new(mock))[0];
        assert!(!port.cec_supported);
        assert_eq!(port.physical_address, PhysicalAddress(0));
    }

    #[test]
    fn test_closed_device_reports_unsupported() {
        let port = query_ports(&DeviceHandle::closed())[0];
        assert!(!port.cec_supported);
        assert_eq!(port.physical_address, PhysicalAddress(0));
    }

    #[test]
    fn test_not_cached() {
        let mock = MockCecDevice::new();
        let handle = DeviceHandle::new(mock.clone());
        let first = query_ports(&handle);
        assert_eq!(query_ports(&handle), first);

        mock.set_physical_address(Some(0x3000));
        assert_eq!(query_ports(&handle)[0].physical_address, PhysicalAddress(0x3000));
    }
}
