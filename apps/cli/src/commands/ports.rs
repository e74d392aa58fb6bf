//! 端口列表命令

use crate::session;
use anyhow::Result;
use hdmi_cec_driver::DriverConfig;
use hdmi_cec_protocol::PortInfo;

pub fn execute(config: DriverConfig) -> Result<()> {
    let cec = session::open(config)?;
    for port in cec.query_ports() {
        println!("{}", format_port(&port));
    }
    Ok(())
}

fn format_port(port: &PortInfo) -> String {
    format!(
        "port {}: {:?} phys={} cec={} arc={}",
        port.port_id, port.port_type, port.physical_address, port.cec_supported, port.arc_supported
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use hdmi_cec_protocol::{PhysicalAddress, PortType};

    #[test]
    fn test_format_port() {
        let port = PortInfo {
            port_id: 1,
            port_type: PortType::Output,
            cec_supported: true,
            arc_supported: false,
            physical_address: PhysicalAddress(0x1000),
        };
        assert_eq!(format_port(&port), "port 1: Output phys=1.0.0.0 cec=true arc=false");
    }
}
