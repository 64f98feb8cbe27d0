//! Scout 命令行入口
//!
//! 用法：`scout [--config path.toml] <query...>`。Ctrl+C 取消当前运行。

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use scout::config::load_config;
use scout::core::SessionSupervisor;
use scout::{build_agent, format, observability};

/// Scout - 自适应工具路由助手
#[derive(Parser, Debug)]
#[command(name = "scout", version, about = "Route a query through tools, check the answer, retry with feedback")]
struct Cli {
    /// 额外的配置文件（覆盖 config/default.toml）
    #[arg(long)]
    config: Option<PathBuf>,

    /// 查询文本，多个参数以空格拼接
    #[arg(required = true, num_args = 1..)]
    query: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    observability::init();

    let query = cli.query.join(" ");
    let cfg = load_config(cli.config).context("Failed to load configuration")?;
    let agent = build_agent(&cfg).context("Failed to build agent")?;

    let supervisor = SessionSupervisor::new();
    supervisor.install_ctrl_c_handler();

    let state = agent
        .run(&query, &supervisor.child_token())
        .await
        .context("Run failed")?;
    println!("{}", format::render_report(&state));

    Ok(())
}
