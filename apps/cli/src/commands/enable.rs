//! 启用 / 禁用命令

use crate::session;
use anyhow::Result;
use clap::{Args, ValueEnum};
use hdmi_cec_driver::DriverConfig;
use hdmi_cec_protocol::CecOption;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Switch {
    On,
    Off,
}

/// 启用参数
#[derive(Args, Debug)]
pub struct EnableCommand {
    #[arg(value_enum)]
    pub state: Switch,
}

impl EnableCommand {
    fn option_value(&self) -> i32 {
        match self.state {
            Switch::On => 1,
            Switch::Off => 0,
        }
    }

    pub fn execute(&self, config: DriverConfig) -> Result<()> {
        let cec = session::open(config)?;
        cec.set_option(CecOption::Enable.into(), self.option_value())?;
        println!("cec {}", if self.state == Switch::On { "enabled" } else { "disabled" });
        Ok(())
    }
}
