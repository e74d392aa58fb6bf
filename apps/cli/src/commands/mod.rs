//! 命令定义和实现

pub mod address;
pub mod connected;
pub mod enable;
pub mod info;
pub mod monitor;
pub mod ports;
pub mod send;

pub use address::ClaimCommand;
pub use connected::ConnectedCommand;
pub use enable::EnableCommand;
pub use info::InfoCommand;
pub use monitor::MonitorCommand;
pub use send::SendCommand;
