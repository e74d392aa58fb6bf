//! # HDMI-CEC CLI
//!
//! Command-line interface for the HDMI-CEC HAL.
//!
//! ```bash
//! # 打印版本、厂商 ID 与节点路径
//! hdmi-cec-cli info
//!
//! # 声明 Playback1 并向电视发送 Image View On
//! hdmi-cec-cli claim playback1
//! hdmi-cec-cli send --from 4 --to tv --opcode 04
//!
//! # 打印事件直到 Ctrl-C
//! hdmi-cec-cli --config /etc/hdmi-cec.toml monitor
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod session;

use commands::{
    ClaimCommand, ConnectedCommand, EnableCommand, InfoCommand, MonitorCommand, SendCommand,
};
use session::SessionArgs;

/// HDMI-CEC CLI - CEC 总线命令行工具
#[derive(Parser, Debug)]
#[command(name = "hdmi-cec-cli")]
#[command(about = "Command-line interface for the HDMI-CEC HAL", long_about = None)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    session: SessionArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 打印事件（热插拔 / 入站消息）直到 Ctrl-C
    Monitor {
        #[command(flatten)]
        args: MonitorCommand,
    },

    /// 发送一条 CEC 消息
    Send {
        #[command(flatten)]
        args: SendCommand,
    },

    /// 查询端口列表
    Ports,

    /// 查询物理地址
    Phys,

    /// 声明逻辑地址
    Claim {
        #[command(flatten)]
        args: ClaimCommand,
    },

    /// 清除所有逻辑地址
    Clear,

    /// 查询 HDMI 连接状态
    Connected {
        #[command(flatten)]
        args: ConnectedCommand,
    },

    /// 启用 / 禁用 CEC
    Enable {
        #[command(flatten)]
        args: EnableCommand,
    },

    /// 打印 HAL 版本与配置
    Info {
        #[command(flatten)]
        args: InfoCommand,
    },
}

fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("hdmi_cec=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.session.load_config()?;

    match cli.command {
        Commands::Monitor { args } => args.execute(config),
        Commands::Send { args } => args.execute(config),
        Commands::Ports => commands::ports::execute(config),
        Commands::Phys => commands::address::physical(config),
        Commands::Claim { args } => args.execute(config),
        Commands::Clear => commands::address::clear(config),
        Commands::Connected { args } => args.execute(config),
        Commands::Enable { args } => args.execute(config),
        Commands::Info { args } => args.execute(config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_overrides_after_subcommand() {
        let cli = Cli::try_parse_from(["hdmi-cec-cli", "phys", "--device", "/dev/cec1"]).unwrap();
        assert!(matches!(cli.command, Commands::Phys));
        assert_eq!(cli.session.device.as_deref(), Some(std::path::Path::new("/dev/cec1")));
    }
}
