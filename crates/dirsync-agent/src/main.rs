//! DirSync Agent 入口

use anyhow::Result;
use clap::{Parser, Subcommand};
use dirsync_agent::config::{default_config_yaml, ConfigManager};
use dirsync_agent::{Agent, Collaborators};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dirsync-agent", version, about = "集群协调的用户目录同步守护进程")]
struct Cli {
    /// 配置文件路径（YAML 或 JSON）
    #[arg(short, long, env = "DIRSYNC_CONFIG", default_value = "/etc/dirsync/agent.yaml")]
    config: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// 运行同步守护进程（默认）
    Run,
    /// 输出默认配置
    PrintConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(Command::PrintConfig) = cli.command {
        print!("{}", default_config_yaml()?);
        return Ok(());
    }

    let config = ConfigManager::new(&cli.config)?.into_config();

    // RUST_LOG 优先于配置文件中的日志级别
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let collaborators = Collaborators::standalone(&config)?;
    let agent = Agent::new(config, collaborators).await?;
    agent.start().await?;

    tokio::signal::ctrl_c().await?;
    info!("收到停止信号");
    agent.stop().await?;

    Ok(())
}
