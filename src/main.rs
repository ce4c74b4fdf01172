//! mint-harness 主入口
//! 命令行子命令或控制台服务器

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use mint_harness::{
    api,
    cli::{self, Cli, Command},
    config::Config,
    infrastructure::init_logging,
};

#[tokio::main]
async fn main() -> ExitCode {
    // 1. 加载 .env
    dotenvy::dotenv().ok();

    // 2. 解析参数：用法错误退出码 1，--help/--version 退出码 0
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    // 3. 加载配置（CONFIG_PATH 指向的 TOML 文件优先）
    let config_path = std::env::var("CONFIG_PATH").ok();
    let config = Config::from_env_and_file(config_path.as_deref())?;
    config.validate()?;

    // 4. 初始化日志
    init_logging(&config.logging)?;

    match cli.command {
        Command::Serve => {
            tracing::info!("🚀 Starting Mint harness dashboard");
            api::serve(config).await
        }
        command => {
            let output = cli::execute(command, &config).await?;
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
    }
}
